//! Telemetry sources.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use linktune_core::transport;
use linktune_core::{MetricRecord, SourceConfig};

use crate::error::{TelemetryError, TelemetryResult};
use crate::parser::parse_exposition;

/// Something that can produce one `MetricRecord` on demand.
pub trait TelemetrySource {
    /// Tag stamped on records from this source.
    fn tag(&self) -> &str;

    /// Fetch one record. Any failure means "unavailable this round".
    fn fetch(&self) -> impl Future<Output = TelemetryResult<MetricRecord>> + Send;
}

/// An HTTP endpoint serving exposition-format text.
#[derive(Debug, Clone)]
pub struct ExpositionSource {
    address: String,
    path: String,
    tag: String,
    timeout: Duration,
}

impl ExpositionSource {
    pub fn new(config: &SourceConfig, timeout: Duration) -> Self {
        Self {
            address: config.address(),
            path: config.path.clone(),
            tag: config.tag.clone(),
            timeout,
        }
    }

    /// Full URL, for logs and status reports.
    pub fn url(&self) -> String {
        format!("http://{}{}", self.address, self.path)
    }
}

impl TelemetrySource for ExpositionSource {
    fn tag(&self) -> &str {
        &self.tag
    }

    async fn fetch(&self) -> TelemetryResult<MetricRecord> {
        let reply = transport::fetch(&self.address, &self.path, self.timeout).await?;
        if !reply.status.is_success() {
            debug!(status = %reply.status, url = %self.url(), "telemetry endpoint non-2xx");
            return Err(TelemetryError::BadStatus(reply.status.as_u16()));
        }
        parse_exposition(&reply.body, &self.tag)
    }
}

/// An unconfigured source is permanently unavailable.
impl<T: TelemetrySource + Sync> TelemetrySource for Option<T> {
    fn tag(&self) -> &str {
        match self {
            Some(source) => source.tag(),
            None => "none",
        }
    }

    async fn fetch(&self) -> TelemetryResult<MetricRecord> {
        match self {
            Some(source) => source.fetch().await,
            None => Err(TelemetryError::SourceUnavailable("not configured".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::get;

    async fn serve(router: Router) -> u16 {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        port
    }

    fn source_for(port: u16) -> ExpositionSource {
        let config = SourceConfig {
            host: "127.0.0.1".to_string(),
            port,
            path: "/metrics".to_string(),
            tag: "gnb".to_string(),
        };
        ExpositionSource::new(&config, Duration::from_secs(2))
    }

    #[tokio::test]
    async fn fetches_and_parses_endpoint() {
        let port = serve(Router::new().route(
            "/metrics",
            get(|| async { "# TYPE cqi_value gauge\ncqi_value 10.5\nconnected_ues 2\n" }),
        ))
        .await;

        let source = source_for(port);
        assert_eq!(source.url(), format!("http://127.0.0.1:{port}/metrics"));

        let record = source.fetch().await.unwrap();
        assert_eq!(record.cqi, Some(10.5));
        assert_eq!(record.ue_count, Some(2));
        assert_eq!(record.source, "gnb");
    }

    #[tokio::test]
    async fn non_success_status_is_bad_status() {
        let port = serve(Router::new().route(
            "/metrics",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        ))
        .await;

        let err = source_for(port).fetch().await.unwrap_err();
        assert!(matches!(err, TelemetryError::BadStatus(500)));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = source_for(port).fetch().await.unwrap_err();
        assert!(matches!(err, TelemetryError::Transport(_)));
    }

    #[tokio::test]
    async fn missing_source_is_unavailable() {
        let source: Option<ExpositionSource> = None;
        assert_eq!(source.tag(), "none");
        let err = source.fetch().await.unwrap_err();
        assert!(matches!(err, TelemetryError::SourceUnavailable(_)));
    }
}
