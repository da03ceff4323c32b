//! Minimal HTTP/1.1 client built directly on hyper.
//!
//! An `HttpSession` owns one TCP connection and the background task that
//! drives it. Every request carries the session timeout; a timeout is
//! reported like any other transport failure.

use std::time::Duration;

use bytes::Bytes;
use http::{Method, Request, StatusCode, header};
use http_body_util::{BodyExt, Full};
use hyper::client::conn::http1::{self, SendRequest};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{TransportError, TransportResult};

const USER_AGENT: &str = concat!("linktune/", env!("CARGO_PKG_VERSION"));

/// Status and body of a completed exchange.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Bytes,
}

/// A live HTTP/1.1 connection to a single peer.
pub struct HttpSession {
    address: String,
    timeout: Duration,
    sender: SendRequest<Full<Bytes>>,
    driver: JoinHandle<()>,
}

impl HttpSession {
    /// Connect and complete the HTTP/1.1 handshake.
    pub async fn open(address: &str, timeout: Duration) -> TransportResult<Self> {
        let connect = async {
            let stream = TcpStream::connect(address)
                .await
                .map_err(|source| TransportError::Connect {
                    address: address.to_string(),
                    source,
                })?;

            let io = TokioIo::new(stream);
            let (sender, conn) = http1::handshake(io)
                .await
                .map_err(TransportError::Handshake)?;

            // Drive the connection in the background.
            let peer = address.to_string();
            let driver = tokio::spawn(async move {
                if let Err(e) = conn.await {
                    debug!(address = %peer, error = %e, "http connection closed");
                }
            });

            Ok::<_, TransportError>(Self {
                address: address.to_string(),
                timeout,
                sender,
                driver,
            })
        };

        tokio::time::timeout(timeout, connect)
            .await
            .map_err(|_| TransportError::Timeout(timeout))?
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Whether the peer has closed the connection.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    pub async fn get(&mut self, path: &str) -> TransportResult<Reply> {
        self.send(Method::GET, path, None).await
    }

    pub async fn delete(&mut self, path: &str) -> TransportResult<Reply> {
        self.send(Method::DELETE, path, None).await
    }

    pub async fn post_json<T: Serialize>(&mut self, path: &str, body: &T) -> TransportResult<Reply> {
        let bytes = serde_json::to_vec(body)?;
        self.send(Method::POST, path, Some(bytes)).await
    }

    /// Perform one request/response round trip.
    pub async fn send(
        &mut self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> TransportResult<Reply> {
        let timeout = self.timeout;
        let exchange = async {
            self.sender.ready().await.map_err(TransportError::Request)?;

            let mut builder = Request::builder()
                .method(method)
                .uri(path)
                .header(header::HOST, self.address.as_str())
                .header(header::USER_AGENT, USER_AGENT);

            let body = match body {
                Some(bytes) => {
                    builder = builder.header(header::CONTENT_TYPE, "application/json");
                    Full::new(Bytes::from(bytes))
                }
                None => Full::new(Bytes::new()),
            };
            let req = builder.body(body)?;

            let resp = self
                .sender
                .send_request(req)
                .await
                .map_err(TransportError::Request)?;
            let status = resp.status();
            let body = resp
                .into_body()
                .collect()
                .await
                .map_err(TransportError::Body)?
                .to_bytes();

            Ok::<_, TransportError>(Reply { status, body })
        };

        tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| TransportError::Timeout(timeout))?
    }
}

impl Drop for HttpSession {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

/// One-shot GET on a fresh connection. `timeout` bounds connect and
/// exchange together.
pub async fn fetch(address: &str, path: &str, timeout: Duration) -> TransportResult<Reply> {
    let exchange = async {
        let mut session = HttpSession::open(address, timeout).await?;
        session.get(path).await
    };
    tokio::time::timeout(timeout, exchange)
        .await
        .map_err(|_| TransportError::Timeout(timeout))?
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::Router;
    use axum::http::StatusCode as AxumStatus;
    use axum::routing::{get, post};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr.to_string()
    }

    #[tokio::test]
    async fn fetch_returns_status_and_body() {
        let addr = serve(Router::new().route("/metrics", get(|| async { "cqi_value 8.5\n" }))).await;

        let reply = fetch(&addr, "/metrics", Duration::from_secs(2)).await.unwrap();
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(&reply.body[..], b"cqi_value 8.5\n");
    }

    #[tokio::test]
    async fn session_reuses_connection_for_multiple_requests() {
        let router = Router::new()
            .route("/health", get(|| async { "ok" }))
            .route("/v1/echo", post(|body: String| async move { body }));
        let addr = serve(router).await;

        let mut session = HttpSession::open(&addr, Duration::from_secs(2)).await.unwrap();
        assert_eq!(session.get("/health").await.unwrap().status, StatusCode::OK);

        let reply = session
            .post_json("/v1/echo", &serde_json::json!({ "mcs": 14 }))
            .await
            .unwrap();
        assert_eq!(reply.status, StatusCode::OK);
        let echoed: serde_json::Value = serde_json::from_slice(&reply.body).unwrap();
        assert_eq!(echoed["mcs"], 14);
        assert!(!session.is_closed());
    }

    #[tokio::test]
    async fn non_success_status_is_not_an_error() {
        let addr = serve(Router::new().route(
            "/health",
            get(|| async { (AxumStatus::SERVICE_UNAVAILABLE, "down") }),
        ))
        .await;

        let reply = fetch(&addr, "/health", Duration::from_secs(2)).await.unwrap();
        assert_eq!(reply.status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn connect_refused_is_transport_error() {
        // Bind then drop to get a port with nothing listening.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let err = fetch(&addr, "/metrics", Duration::from_secs(2)).await.unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }));
    }

    #[tokio::test]
    async fn slow_peer_times_out() {
        let addr = serve(Router::new().route(
            "/metrics",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        ))
        .await;

        let err = fetch(&addr, "/metrics", Duration::from_millis(100)).await.unwrap_err();
        assert!(matches!(err, TransportError::Timeout(_)));
    }

    #[tokio::test]
    async fn fetch_timeout_covers_connect_and_exchange() {
        // Accepts connections and never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });

        let timeout = Duration::from_millis(300);
        let started = std::time::Instant::now();
        let err = fetch(&addr, "/metrics", timeout).await.unwrap_err();

        assert!(matches!(err, TransportError::Timeout(t) if t == timeout));
        assert!(started.elapsed() < timeout + Duration::from_millis(250));
    }
}
