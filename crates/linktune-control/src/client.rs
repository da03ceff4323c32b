//! Connection state, registration, and dispatch.

use http::{Method, StatusCode};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use linktune_core::{
    CommandSink, HttpSession, Reply, SinkConfig, TransportResult, epoch_secs_f64,
};

use crate::envelope::{ControlRequest, Registration, SubscriptionRequest};
use crate::health::{ProbeResult, SinkHealth};

pub const HEALTH_PATH: &str = "/health";
pub const CONTROLS_PATH: &str = "/v1/controls";
pub const APPS_PATH: &str = "/v1/xapps";
pub const SUBSCRIPTIONS_PATH: &str = "/v1/subscriptions";

/// Client for the control sink.
///
/// `connected` is only ever true after a successful liveness probe and is
/// cleared by any failed probe or transport error.
pub struct ControlClient {
    config: SinkConfig,
    session: Option<HttpSession>,
    connected: bool,
    health: SinkHealth,
}

impl ControlClient {
    pub fn new(config: SinkConfig) -> Self {
        Self {
            config,
            session: None,
            connected: false,
            health: SinkHealth::default(),
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.config.address())
    }

    /// Connection flag as of the last exchange, without probing.
    pub fn connected_flag(&self) -> bool {
        self.connected
    }

    pub fn health(&self) -> &SinkHealth {
        &self.health
    }

    /// Open a session and verify the sink is alive.
    ///
    /// On success the application is registered; a failed registration is
    /// logged and does not undo the connection.
    pub async fn connect(&mut self) -> bool {
        if self.probe().await {
            self.connected = true;
            info!(url = %self.base_url(), "connected to control sink");
            self.register().await;
            true
        } else {
            error!(url = %self.base_url(), "failed to connect to control sink");
            self.drop_session();
            false
        }
    }

    /// Re-verify liveness. Any failure clears the connected flag.
    pub async fn is_connected(&mut self) -> bool {
        if !self.connected {
            return false;
        }
        if self.probe().await {
            true
        } else {
            warn!(url = %self.base_url(), "control sink liveness check failed");
            self.connected = false;
            false
        }
    }

    /// Dispatch one MCS adjustment. True only if the sink answered 200.
    pub async fn send_adjustment(&mut self, mcs: u8) -> bool {
        if !self.is_connected().await {
            error!(mcs, "control client not connected");
            return false;
        }

        let request = ControlRequest::mcs_adjustment(&self.config, mcs, epoch_secs_f64());
        match self.post(CONTROLS_PATH, &request).await {
            Ok(reply) if reply.status == StatusCode::OK => {
                info!(mcs, target_node = %self.config.target_node_id, "adjustment accepted");
                self.health.record(ProbeResult::Healthy);
                true
            }
            Ok(reply) => {
                error!(
                    mcs,
                    status = %reply.status,
                    body = %String::from_utf8_lossy(&reply.body),
                    "adjustment rejected"
                );
                self.health.record(ProbeResult::Unhealthy);
                false
            }
            Err(e) => {
                error!(mcs, error = %e, "adjustment dispatch failed");
                false
            }
        }
    }

    /// Ask the sink for periodic metric reports. True on 201.
    pub async fn subscribe_reports(&mut self, interval_ms: u64) -> bool {
        if !self.is_connected().await {
            error!("control client not connected for subscription");
            return false;
        }

        let request = SubscriptionRequest::periodic(&self.config, interval_ms);
        match self.post(SUBSCRIPTIONS_PATH, &request).await {
            Ok(reply) if reply.status == StatusCode::CREATED => {
                info!(interval_ms, "metric report subscription active");
                true
            }
            Ok(reply) => {
                error!(status = %reply.status, "metric report subscription refused");
                false
            }
            Err(e) => {
                error!(error = %e, "metric report subscription failed");
                false
            }
        }
    }

    /// Unregister (best effort) and close the session. Safe to call at any time.
    pub async fn disconnect(&mut self) {
        if self.session.is_some() {
            self.unregister().await;
        }
        self.drop_session();
        info!(url = %self.base_url(), "control sink connection closed");
    }

    /// Failures are logged only; the connected flag and sink health are
    /// left as they were.
    async fn register(&mut self) {
        let result = match serde_json::to_vec(&Registration::new(&self.config)) {
            Ok(bytes) => self.request(Method::POST, APPS_PATH, Some(bytes)).await,
            Err(e) => Err(e.into()),
        };
        match result {
            Ok(reply) if matches!(reply.status, StatusCode::OK | StatusCode::CREATED) => {
                info!(app = %self.config.app_name, "registered with control sink");
            }
            Ok(reply) => {
                warn!(app = %self.config.app_name, status = %reply.status, "registration refused");
            }
            Err(e) => {
                warn!(app = %self.config.app_name, error = %e, "registration failed");
            }
        }
    }

    async fn unregister(&mut self) {
        let path = format!("{APPS_PATH}/{}", self.config.app_name);
        match self.request(Method::DELETE, &path, None).await {
            Ok(reply) if reply.status == StatusCode::OK => {
                info!(app = %self.config.app_name, "unregistered from control sink");
            }
            Ok(reply) => {
                warn!(app = %self.config.app_name, status = %reply.status, "unregistration refused");
            }
            Err(e) => {
                warn!(app = %self.config.app_name, error = %e, "unregistration failed");
            }
        }
    }

    /// GET the liveness path and record the outcome.
    async fn probe(&mut self) -> bool {
        match self.exchange(Method::GET, HEALTH_PATH, None).await {
            Ok(reply) if reply.status == StatusCode::OK => {
                self.health.record(ProbeResult::Healthy);
                true
            }
            Ok(reply) => {
                debug!(status = %reply.status, "control sink not healthy");
                self.health.record(ProbeResult::Unhealthy);
                false
            }
            Err(e) => {
                debug!(error = %e, "control sink probe failed");
                false
            }
        }
    }

    async fn post<T: Serialize>(&mut self, path: &str, body: &T) -> TransportResult<Reply> {
        let bytes = serde_json::to_vec(body)?;
        self.exchange(Method::POST, path, Some(bytes)).await
    }

    /// Run one request on the session, opening it first if needed.
    ///
    /// A transport failure drops the session, clears the connected flag,
    /// and counts against sink health.
    async fn exchange(
        &mut self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> TransportResult<Reply> {
        let result = self.request(method, path, body).await;
        if result.is_err() {
            self.drop_session();
            self.health.record(ProbeResult::Failed);
        }
        result
    }

    /// Run one request without touching the connected flag or sink health.
    ///
    /// A failed session is discarded; the next request opens a fresh one.
    async fn request(
        &mut self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> TransportResult<Reply> {
        let result = match self.session().await {
            Ok(session) => session.send(method, path, body).await,
            Err(e) => Err(e),
        };
        if result.is_err() {
            self.session = None;
        }
        result
    }

    async fn session(&mut self) -> TransportResult<&mut HttpSession> {
        let session = match self.session.take() {
            Some(session) if !session.is_closed() => session,
            _ => HttpSession::open(&self.config.address(), self.config.timeout).await?,
        };
        Ok(self.session.insert(session))
    }

    fn drop_session(&mut self) {
        self.session = None;
        self.connected = false;
    }
}

impl CommandSink for ControlClient {
    async fn send_adjustment(&mut self, mcs: u8) -> bool {
        ControlClient::send_adjustment(self, mcs).await
    }
}

impl std::fmt::Debug for ControlClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlClient")
            .field("url", &self.base_url())
            .field("connected", &self.connected)
            .field("readiness", &self.health.readiness())
            .finish()
    }
}
