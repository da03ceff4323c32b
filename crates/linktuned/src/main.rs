//! linktuned — the linktune daemon.
//!
//! Assembles the telemetry aggregator, the decision engine, and the
//! control client into one control loop.
//!
//! # Usage
//!
//! ```text
//! linktuned run --config /etc/linktune/linktune.toml
//! linktuned once --gnb-host 10.0.0.7
//! linktuned adjust up --ric-host ric.local
//! linktuned config > linktune.toml
//! ```

mod controller;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tokio::sync::{Mutex, watch};
use tracing::info;
use tracing_subscriber::EnvFilter;

use linktune_core::{Direction, TunerConfig};
use linktune_core::config::parse_duration;

use crate::controller::Controller;

const DEFAULT_FILTER: &str = "info,linktuned=debug,linktune=debug";

#[derive(Parser)]
#[command(name = "linktuned", about = "Link-adaptation controller daemon", version)]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the control loop until interrupted.
    Run(ConfigArgs),
    /// Run a single iteration and print the outcome and status as JSON.
    Once(ConfigArgs),
    /// Connect, move the coding index one step, and print the status as JSON.
    Adjust {
        /// "up" or "down".
        direction: Direction,

        #[command(flatten)]
        args: ConfigArgs,
    },
    /// Print the effective configuration as TOML.
    Config(ConfigArgs),
}

/// Configuration file plus per-field overrides.
#[derive(Args, Debug, Default)]
struct ConfigArgs {
    /// Path to a TOML configuration file.
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Lower CQI threshold.
    #[arg(long, env = "CQI_THRESHOLD")]
    cqi_threshold: Option<f64>,

    /// Minimum time between automatic adjustments ("30", "30s", "1m").
    #[arg(long, env = "ADJUSTMENT_INTERVAL", value_parser = parse_interval)]
    adjustment_interval: Option<Duration>,

    /// Control sink host.
    #[arg(long, env = "RIC_HOST")]
    ric_host: Option<String>,

    /// Control sink port.
    #[arg(long, env = "RIC_PORT")]
    ric_port: Option<u16>,

    /// Primary telemetry host.
    #[arg(long, env = "GNB_HOST")]
    gnb_host: Option<String>,

    /// Primary telemetry port.
    #[arg(long, env = "GNB_PORT")]
    gnb_port: Option<u16>,
}

impl ConfigArgs {
    /// Load the file (or defaults), apply overrides, and validate.
    fn load(&self) -> anyhow::Result<TunerConfig> {
        let mut config = match &self.config {
            Some(path) => TunerConfig::from_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => TunerConfig::default(),
        };
        self.apply(&mut config);
        config.validate().context("invalid configuration")?;
        Ok(config)
    }

    fn apply(&self, config: &mut TunerConfig) {
        if let Some(threshold) = self.cqi_threshold {
            config.engine.cqi_threshold = threshold;
        }
        if let Some(interval) = self.adjustment_interval {
            config.engine.adjustment_interval = interval;
        }
        if let Some(host) = &self.ric_host {
            config.sink.host = host.clone();
        }
        if let Some(port) = self.ric_port {
            config.sink.port = port;
        }
        if let Some(host) = &self.gnb_host {
            config.telemetry.primary.host = host.clone();
        }
        if let Some(port) = self.gnb_port {
            config.telemetry.primary.port = port;
        }
    }
}

fn parse_interval(s: &str) -> Result<Duration, String> {
    parse_duration(s).ok_or_else(|| format!("invalid interval '{s}'"))
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Command::Run(args) => run(args.load()?).await,
        Command::Once(args) => once(args.load()?).await,
        Command::Adjust { direction, args } => adjust(args.load()?, direction).await,
        Command::Config(args) => {
            print!("{}", args.load()?.to_toml_string()?);
            Ok(())
        }
    }
}

async fn run(config: TunerConfig) -> anyhow::Result<()> {
    info!(
        gnb = %config.telemetry.primary.address(),
        sink = %config.sink.address(),
        cqi_threshold = config.engine.cqi_threshold,
        "linktune daemon starting"
    );

    let mut controller = Controller::new(&config);
    controller.start().await;
    let controller = Arc::new(Mutex::new(controller));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let loop_handle = tokio::spawn(controller::run(Arc::clone(&controller), shutdown_rx));

    tokio::signal::ctrl_c()
        .await
        .context("installing Ctrl-C handler")?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    loop_handle.await?;
    info!("linktune daemon stopped");
    Ok(())
}

async fn once(config: TunerConfig) -> anyhow::Result<()> {
    let mut controller = Controller::new(&config);
    controller.start().await;

    let result = controller.iteration().await;
    let status = controller.status();
    controller.shutdown().await;

    let report = serde_json::json!({
        "result": result?,
        "status": status,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn adjust(config: TunerConfig, direction: Direction) -> anyhow::Result<()> {
    let mut controller = Controller::new(&config);
    let adjusted = controller.adjust(direction).await;
    let status = controller.status();
    controller.shutdown().await;

    println!("{}", serde_json::to_string_pretty(&status)?);
    anyhow::ensure!(adjusted, "adjustment {direction} failed");
    Ok(())
}
