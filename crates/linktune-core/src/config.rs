//! linktune.toml configuration parser.
//!
//! Every section and field has a default, so an empty file (or no file at
//! all) yields a controller that talks to `srsran-gnb:9091` and
//! `ric-platform:36421`. Durations are written as `"30s"`, `"500ms"` or
//! `"2m"`.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TunerConfig {
    pub engine: EngineConfig,
    pub telemetry: TelemetryConfig,
    pub sink: SinkConfig,
}

/// Decision engine thresholds and bounds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Low CQI threshold. The high threshold is always `cqi_threshold + 3.0`.
    pub cqi_threshold: f64,
    /// Minimum time between two automatic adjustments. Also the loop cadence.
    #[serde(with = "duration_str")]
    pub adjustment_interval: Duration,
    pub mcs_min: u8,
    pub mcs_max: u8,
    /// Coding index assumed at startup.
    pub initial_mcs: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cqi_threshold: 7.0,
            adjustment_interval: Duration::from_secs(30),
            mcs_min: 1,
            mcs_max: 28,
            initial_mcs: 16,
        }
    }
}

/// Where telemetry comes from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Direct exposition endpoint on the radio node. Takes precedence.
    pub primary: SourceConfig,
    /// Aggregated telemetry service. Only fills gaps left by the primary.
    pub secondary: Option<SourceConfig>,
    /// Bounds one whole source fetch, connect included.
    #[serde(with = "duration_str")]
    pub timeout: Duration,
    /// How long the last merged record stays usable as a fallback.
    #[serde(with = "duration_str")]
    pub freshness: Duration,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            primary: SourceConfig::default(),
            secondary: None,
            timeout: Duration::from_secs(5),
            freshness: Duration::from_secs(30),
        }
    }
}

/// A single exposition-format HTTP endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SourceConfig {
    pub host: String,
    pub port: u16,
    pub path: String,
    /// Tag stamped on records produced from this source.
    pub tag: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            host: "srsran-gnb".to_string(),
            port: 9091,
            path: "/metrics".to_string(),
            tag: "gnb".to_string(),
        }
    }
}

impl SourceConfig {
    /// `host:port` for the TCP connection.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// The remote control sink and how this controller identifies itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SinkConfig {
    pub host: String,
    pub port: u16,
    #[serde(with = "duration_str")]
    pub timeout: Duration,
    /// Name used for registration and unregistration.
    pub app_name: String,
    pub app_version: String,
    /// Radio node the control messages target.
    pub target_node_id: String,
    pub requestor_id: u32,
    pub ran_function_id: u32,
    /// Send a periodic report subscription after connecting.
    pub subscribe_reports: bool,
    pub report_interval_ms: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            host: "ric-platform".to_string(),
            port: 36421,
            timeout: Duration::from_secs(10),
            app_name: "beam-tuner".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            target_node_id: "gnb-001".to_string(),
            requestor_id: 1001,
            ran_function_id: 1,
            subscribe_reports: false,
            report_interval_ms: 1000,
        }
    }
}

impl SinkConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl TunerConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: TunerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject configurations the engine cannot honor.
    pub fn validate(&self) -> ConfigResult<()> {
        let e = &self.engine;
        if e.mcs_min > e.mcs_max {
            return Err(ConfigError::Invalid(format!(
                "mcs_min ({}) exceeds mcs_max ({})",
                e.mcs_min, e.mcs_max
            )));
        }
        if !(e.mcs_min..=e.mcs_max).contains(&e.initial_mcs) {
            return Err(ConfigError::Invalid(format!(
                "initial_mcs ({}) outside [{}, {}]",
                e.initial_mcs, e.mcs_min, e.mcs_max
            )));
        }
        if !e.cqi_threshold.is_finite() {
            return Err(ConfigError::Invalid("cqi_threshold must be finite".to_string()));
        }
        if self.telemetry.timeout.is_zero() || self.sink.timeout.is_zero() {
            return Err(ConfigError::Invalid("timeouts must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// Parse a duration string like "5s", "500ms", "1m".
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(secs) = s.strip_suffix('s') {
        if let Some(ms) = secs.strip_suffix('m') {
            ms.parse::<u64>().ok().map(Duration::from_millis)
        } else {
            secs.parse::<u64>().ok().map(Duration::from_secs)
        }
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>().ok().map(|m| Duration::from_secs(m * 60))
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}

/// Render a duration back into the shortest exact form `parse_duration` accepts.
pub fn format_duration(d: Duration) -> String {
    if d.subsec_millis() != 0 || (d.as_secs() == 0 && !d.is_zero()) {
        format!("{}ms", d.as_millis())
    } else if d.as_secs() != 0 && d.as_secs() % 60 == 0 {
        format!("{}m", d.as_secs() / 60)
    } else {
        format!("{}s", d.as_secs())
    }
}

mod duration_str {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_duration(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_duration(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid duration '{raw}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = TunerConfig::from_toml_str("").unwrap();
        assert_eq!(config, TunerConfig::default());
        assert_eq!(config.engine.cqi_threshold, 7.0);
        assert_eq!(config.engine.adjustment_interval, Duration::from_secs(30));
        assert_eq!(config.telemetry.primary.address(), "srsran-gnb:9091");
        assert_eq!(config.sink.address(), "ric-platform:36421");
        assert!(config.telemetry.secondary.is_none());
    }

    #[test]
    fn parse_partial_sections() {
        let config = TunerConfig::from_toml_str(
            r#"
[engine]
cqi_threshold = 6.5
adjustment_interval = "10s"

[telemetry.secondary]
host = "prometheus"
port = 9090
tag = "prometheus"

[sink]
host = "localhost"
timeout = "500ms"
"#,
        )
        .unwrap();

        assert_eq!(config.engine.cqi_threshold, 6.5);
        assert_eq!(config.engine.adjustment_interval, Duration::from_secs(10));
        assert_eq!(config.engine.mcs_max, 28);
        let secondary = config.telemetry.secondary.unwrap();
        assert_eq!(secondary.address(), "prometheus:9090");
        assert_eq!(secondary.path, "/metrics");
        assert_eq!(config.sink.timeout, Duration::from_millis(500));
        assert_eq!(config.sink.port, 36421);
    }

    #[test]
    fn round_trips_through_toml() {
        let mut config = TunerConfig::default();
        config.telemetry.freshness = Duration::from_secs(120);
        config.sink.timeout = Duration::from_millis(1500);
        let rendered = config.to_toml_string().unwrap();
        assert!(rendered.contains("freshness = \"2m\""));
        assert!(rendered.contains("timeout = \"1500ms\""));
        assert_eq!(TunerConfig::from_toml_str(&rendered).unwrap(), config);
    }

    #[test]
    fn rejects_inverted_bounds() {
        let err = TunerConfig::from_toml_str("[engine]\nmcs_min = 20\nmcs_max = 10\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_initial_mcs_out_of_bounds() {
        let err = TunerConfig::from_toml_str("[engine]\ninitial_mcs = 29\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_bad_duration() {
        let err = TunerConfig::from_toml_str("[engine]\nadjustment_interval = \"soon\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn parse_duration_forms() {
        assert_eq!(parse_duration("5s"), Some(Duration::from_secs(5)));
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration("10"), Some(Duration::from_secs(10)));
        assert_eq!(parse_duration("fast"), None);
    }

    #[test]
    fn format_duration_forms() {
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(180)), "3m");
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::ZERO), "0s");
    }

    #[test]
    fn shipped_sample_parses() {
        let config = TunerConfig::from_toml_str(include_str!("../../../linktune.toml")).unwrap();
        assert_eq!(config.engine, EngineConfig::default());
        assert_eq!(config.sink, SinkConfig::default());
        let secondary = config.telemetry.secondary.unwrap();
        assert_eq!(secondary.address(), "prometheus:9090");
        assert_eq!(secondary.tag, "prometheus");
    }
}
