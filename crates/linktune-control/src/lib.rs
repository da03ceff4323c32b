//! linktune-control — the client side of the control sink.
//!
//! # Connection Lifecycle
//!
//! ```text
//! disconnected ──connect()──► probe GET /health ──200──► connected ──► register (best effort)
//!      ▲                              │ other
//!      │                              ▼
//!      ├──────────────────────── disconnected
//!      │
//! connected ──is_connected()/send_adjustment()── probe or transport failure ──► disconnected
//! connected ──disconnect()──► unregister (best effort) ──► disconnected
//! ```
//!
//! The client is an owned value; the controller holds exactly one. No
//! request is retried here.

pub mod client;
pub mod envelope;
pub mod health;

pub use client::ControlClient;
pub use envelope::{ControlRequest, Registration, SubscriptionRequest};
pub use health::{ProbeResult, Readiness, SinkHealth};
