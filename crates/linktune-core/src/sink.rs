//! The command sink seam between the decision engine and the network.

use std::future::Future;

/// Anything that can deliver a coding-index adjustment and report whether
/// the remote side accepted it.
///
/// Implementations perform exactly one attempt per call. Retry policy
/// belongs to the caller.
pub trait CommandSink {
    /// Send the new coding index. Returns `true` only on explicit success.
    fn send_adjustment(&mut self, mcs: u8) -> impl Future<Output = bool> + Send;
}
