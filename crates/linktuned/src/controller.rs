//! The control loop: fetch telemetry, decide, dispatch.
//!
//! One `Controller` owns the aggregator, the engine, and the control
//! client. The loop and any manual caller share it behind an async mutex;
//! the lock is held for a single iteration and never across the sleep.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tracing::{debug, error, info, warn};

use linktune_control::{ControlClient, Readiness};
use linktune_core::{Action, Direction, TunerConfig};
use linktune_engine::{DecisionEngine, EngineStatus};
use linktune_telemetry::{AggregatorSummary, ExpositionSource, MetricsAggregator};

/// Pause after a failed iteration.
pub const ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// What one iteration did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// Neither a fresh fetch nor the cache produced a record.
    NoTelemetry,
    /// The engine held the current coding index.
    Hold,
    /// The sink accepted the action and the engine committed it.
    Applied { action: Action },
    /// The sink answered but refused the action.
    Rejected { action: Action },
    /// No connection to the sink could be established; the action was dropped.
    SinkUnavailable { action: Action },
}

#[derive(Debug, Clone, Serialize)]
pub struct SinkStatus {
    pub url: String,
    pub connected: bool,
    pub readiness: Readiness,
    pub consecutive_failures: u32,
}

/// Combined snapshot of every stage.
#[derive(Debug, Clone, Serialize)]
pub struct ControllerStatus {
    pub engine: EngineStatus,
    pub telemetry: AggregatorSummary,
    pub sink: SinkStatus,
}

pub struct Controller {
    aggregator: MetricsAggregator<ExpositionSource, Option<ExpositionSource>>,
    engine: DecisionEngine,
    client: ControlClient,
    interval: Duration,
    report_interval_ms: Option<u64>,
}

impl Controller {
    pub fn new(config: &TunerConfig) -> Self {
        Self {
            aggregator: MetricsAggregator::from_config(&config.telemetry),
            engine: DecisionEngine::new(config.engine.clone()),
            client: ControlClient::new(config.sink.clone()),
            interval: config.engine.adjustment_interval,
            report_interval_ms: config
                .sink
                .subscribe_reports
                .then_some(config.sink.report_interval_ms),
        }
    }

    /// Time between iterations.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Connect to the sink ahead of the first iteration.
    ///
    /// A failure is not fatal; the next action retries the connection.
    pub async fn start(&mut self) -> bool {
        let connected = self.connect_sink().await;
        if !connected {
            warn!(url = %self.client.base_url(), "control sink unavailable at startup, will retry");
        }
        connected
    }

    /// Run one fetch → decide → dispatch pass.
    pub async fn iteration(&mut self) -> anyhow::Result<Outcome> {
        let record = match self.aggregator.fetch().await {
            Some(record) => record,
            None => match self.aggregator.cached() {
                Some(record) => {
                    debug!(source = %record.source, "using cached telemetry");
                    record
                }
                None => {
                    warn!("no telemetry available");
                    return Ok(Outcome::NoTelemetry);
                }
            },
        };

        let Some(action) = self.engine.process(&record) else {
            return Ok(Outcome::Hold);
        };
        info!(%action, "adjustment proposed");

        if !self.ensure_connected().await {
            warn!(%action, "control sink unavailable, action dropped");
            return Ok(Outcome::SinkUnavailable { action });
        }

        if self.engine.apply(action.clone(), &mut self.client).await? {
            Ok(Outcome::Applied { action })
        } else {
            Ok(Outcome::Rejected { action })
        }
    }

    /// Manual single-step adjustment.
    pub async fn adjust(&mut self, direction: Direction) -> bool {
        if !self.ensure_connected().await {
            warn!(%direction, "control sink unavailable, manual adjustment refused");
            return false;
        }
        self.engine.adjust(direction, &mut self.client).await
    }

    /// Snapshot without touching the network.
    pub fn status(&self) -> ControllerStatus {
        let health = self.client.health();
        ControllerStatus {
            engine: self.engine.status(),
            telemetry: self.aggregator.summary(),
            sink: SinkStatus {
                url: self.client.base_url(),
                connected: self.client.connected_flag(),
                readiness: health.readiness(),
                consecutive_failures: health.consecutive_failures(),
            },
        }
    }

    pub async fn shutdown(&mut self) {
        self.client.disconnect().await;
    }

    async fn ensure_connected(&mut self) -> bool {
        self.client.is_connected().await || self.connect_sink().await
    }

    async fn connect_sink(&mut self) -> bool {
        if !self.client.connect().await {
            return false;
        }
        if let Some(interval_ms) = self.report_interval_ms {
            self.client.subscribe_reports(interval_ms).await;
        }
        true
    }
}

/// Drive the controller until `shutdown` fires, then disconnect.
pub async fn run(controller: Arc<Mutex<Controller>>, mut shutdown: watch::Receiver<bool>) {
    let interval = controller.lock().await.interval();
    info!(interval_secs = interval.as_secs_f64(), "control loop started");

    loop {
        let result = controller.lock().await.iteration().await;
        let pause = match result {
            Ok(outcome) => {
                debug!(?outcome, "iteration complete");
                interval
            }
            Err(e) => {
                error!(error = %e, "control iteration failed");
                ERROR_BACKOFF
            }
        };

        tokio::select! {
            _ = tokio::time::sleep(pause) => {}
            _ = shutdown.changed() => {
                info!("control loop shutting down");
                break;
            }
        }
    }

    controller.lock().await.shutdown().await;
    info!("control loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::extract::{Path, State};
    use axum::http::StatusCode;
    use axum::routing::{delete, get, post};
    use axum::{Json, Router};
    use serde_json::Value;

    use linktune_core::{EngineConfig, SinkConfig, SourceConfig, TelemetryConfig};

    /// Serves whatever exposition text is currently stored.
    #[derive(Clone)]
    struct MockGnb {
        body: Arc<std::sync::Mutex<String>>,
    }

    impl MockGnb {
        fn serving(body: &str) -> Self {
            Self {
                body: Arc::new(std::sync::Mutex::new(body.to_string())),
            }
        }
    }

    #[derive(Clone, Default)]
    struct MockSink {
        controls: Arc<std::sync::Mutex<Vec<Value>>>,
        removed: Arc<AtomicUsize>,
    }

    impl MockSink {
        fn sent_mcs(&self) -> Vec<u64> {
            self.controls
                .lock()
                .unwrap()
                .iter()
                .map(|c| c["ricControlMessage"]["parameters"]["mcs"].as_u64().unwrap())
                .collect()
        }
    }

    async fn listen(router: Router) -> u16 {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        port
    }

    async fn start_gnb(gnb: MockGnb) -> u16 {
        async fn metrics(State(gnb): State<MockGnb>) -> String {
            gnb.body.lock().unwrap().clone()
        }
        listen(Router::new().route("/metrics", get(metrics)).with_state(gnb)).await
    }

    async fn start_sink(sink: MockSink) -> u16 {
        async fn controls(State(sink): State<MockSink>, Json(body): Json<Value>) -> StatusCode {
            sink.controls.lock().unwrap().push(body);
            StatusCode::OK
        }
        async fn unregister(State(sink): State<MockSink>, Path(_name): Path<String>) -> StatusCode {
            sink.removed.fetch_add(1, Ordering::SeqCst);
            StatusCode::OK
        }

        let router = Router::new()
            .route("/health", get(|| async { StatusCode::OK }))
            .route("/v1/controls", post(controls))
            .route("/v1/xapps", post(|| async { StatusCode::CREATED }))
            .route("/v1/xapps/{name}", delete(unregister))
            .with_state(sink);
        listen(router).await
    }

    async fn closed_port() -> u16 {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        port
    }

    fn config(gnb_port: u16, sink_port: u16, interval: Duration) -> TunerConfig {
        TunerConfig {
            engine: EngineConfig {
                adjustment_interval: interval,
                ..EngineConfig::default()
            },
            telemetry: TelemetryConfig {
                primary: SourceConfig {
                    host: "127.0.0.1".to_string(),
                    port: gnb_port,
                    ..SourceConfig::default()
                },
                timeout: Duration::from_secs(2),
                ..TelemetryConfig::default()
            },
            sink: SinkConfig {
                host: "127.0.0.1".to_string(),
                port: sink_port,
                timeout: Duration::from_secs(2),
                ..SinkConfig::default()
            },
        }
    }

    #[tokio::test]
    async fn poor_channel_steps_down_after_warmup() {
        let gnb = start_gnb(MockGnb::serving("cqi_value 3.0\nmcs_setting 16\n")).await;
        let sink = MockSink::default();
        let sink_port = start_sink(sink.clone()).await;

        let mut controller = Controller::new(&config(gnb, sink_port, Duration::ZERO));
        assert!(controller.start().await);

        assert_eq!(controller.iteration().await.unwrap(), Outcome::Hold);
        assert_eq!(controller.iteration().await.unwrap(), Outcome::Hold);

        let outcome = controller.iteration().await.unwrap();
        let Outcome::Applied { action } = outcome else {
            panic!("expected an applied action, got {outcome:?}");
        };
        assert_eq!(action.direction, Direction::Down);
        assert_eq!(action.target, 14);

        assert_eq!(sink.sent_mcs(), vec![14]);
        assert_eq!(controller.status().engine.current_mcs, 14);
    }

    #[tokio::test]
    async fn strong_channel_steps_up() {
        let gnb = start_gnb(MockGnb::serving("cqi_value 13.0\n")).await;
        let sink = MockSink::default();
        let sink_port = start_sink(sink.clone()).await;

        let mut controller = Controller::new(&config(gnb, sink_port, Duration::ZERO));
        controller.start().await;
        for _ in 0..3 {
            controller.iteration().await.unwrap();
        }

        assert_eq!(sink.sent_mcs(), vec![18]);
        assert_eq!(controller.status().engine.current_mcs, 18);
    }

    #[tokio::test]
    async fn rate_limit_holds_second_adjustment() {
        let gnb = start_gnb(MockGnb::serving("cqi_value 3.0\n")).await;
        let sink = MockSink::default();
        let sink_port = start_sink(sink.clone()).await;

        let mut controller = Controller::new(&config(gnb, sink_port, Duration::from_secs(3600)));
        controller.start().await;
        for _ in 0..5 {
            controller.iteration().await.unwrap();
        }

        assert_eq!(sink.sent_mcs(), vec![14]);
    }

    #[tokio::test]
    async fn unreachable_telemetry_is_no_telemetry() {
        let sink_port = start_sink(MockSink::default()).await;
        let mut controller = Controller::new(&config(closed_port().await, sink_port, Duration::ZERO));

        assert_eq!(controller.iteration().await.unwrap(), Outcome::NoTelemetry);
        assert!(!controller.status().telemetry.cached_metrics_available);
    }

    #[tokio::test]
    async fn cached_record_covers_a_failed_fetch() {
        let gnb = MockGnb::serving("cqi_value 3.0\n");
        let gnb_port = start_gnb(gnb.clone()).await;
        let sink = MockSink::default();
        let sink_port = start_sink(sink.clone()).await;

        let mut controller = Controller::new(&config(gnb_port, sink_port, Duration::ZERO));
        controller.start().await;
        controller.iteration().await.unwrap();

        // An empty body parses to no fields, so the fetch yields nothing.
        *gnb.body.lock().unwrap() = String::new();
        assert_eq!(controller.iteration().await.unwrap(), Outcome::Hold);
        assert_eq!(controller.status().engine.cqi_history.len(), 2);
    }

    #[tokio::test]
    async fn unavailable_sink_drops_action() {
        let gnb = start_gnb(MockGnb::serving("cqi_value 3.0\n")).await;
        let mut controller = Controller::new(&config(gnb, closed_port().await, Duration::ZERO));
        assert!(!controller.start().await);

        controller.iteration().await.unwrap();
        controller.iteration().await.unwrap();
        let outcome = controller.iteration().await.unwrap();

        assert!(matches!(outcome, Outcome::SinkUnavailable { .. }));
        let status = controller.status();
        assert_eq!(status.engine.current_mcs, 16);
        assert!(status.engine.last_adjustment.is_some());
        assert!(!status.sink.connected);
    }

    #[tokio::test]
    async fn manual_adjust_reconnects_and_steps() {
        let gnb = start_gnb(MockGnb::serving("cqi_value 9.0\n")).await;
        let sink = MockSink::default();
        let sink_port = start_sink(sink.clone()).await;

        let mut controller = Controller::new(&config(gnb, sink_port, Duration::ZERO));
        assert!(controller.adjust(Direction::Up).await);
        assert!(controller.adjust(Direction::Down).await);
        assert!(controller.adjust(Direction::Down).await);

        assert_eq!(sink.sent_mcs(), vec![17, 16, 15]);
        assert_eq!(controller.status().engine.current_mcs, 15);
    }

    #[tokio::test]
    async fn run_loop_stops_on_shutdown_and_disconnects() {
        let gnb = start_gnb(MockGnb::serving("cqi_value 3.0\n")).await;
        let sink = MockSink::default();
        let sink_port = start_sink(sink.clone()).await;

        let mut controller = Controller::new(&config(gnb, sink_port, Duration::from_millis(20)));
        controller.start().await;
        let shared = Arc::new(Mutex::new(controller));

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(run(shared.clone(), rx));

        tokio::time::timeout(Duration::from_secs(5), async {
            while sink.sent_mcs().is_empty() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(sink.removed.load(Ordering::SeqCst), 1);
        assert!(!shared.lock().await.status().sink.connected);
    }

    #[test]
    fn outcome_serializes_with_tag() {
        let value = serde_json::to_value(Outcome::Hold).unwrap();
        assert_eq!(value, serde_json::json!({"outcome": "hold"}));
    }
}
