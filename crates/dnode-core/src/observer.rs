//! Diagnostic sink for the receive loop.
//!
//! Dispatch failures never reach the peer. They are handed to the
//! instance's [`DispatchObserver`] instead. [`TracingObserver`] logs them,
//! [`NoopObserver`] drops them. Which one an instance gets is chosen with
//! `DnodeBuilder::diagnostics` or replaced with `DnodeBuilder::observer`.

use crate::error::DnodeError;
use crate::message::Message;
use tracing::{debug, warn};

/// Receives loop events. All methods default to doing nothing.
pub trait DispatchObserver: Send + Sync {
    /// A message was decoded and is about to be dispatched.
    fn message_received(&self, _remote: &str, _message: &Message) {}

    /// Dispatching one message failed. The loop continues.
    fn dispatch_failed(&self, _remote: &str, _error: &DnodeError) {}

    /// The transport failed and the loop is returning.
    fn stopped(&self, _remote: &str, _error: &DnodeError) {}
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl DispatchObserver for NoopObserver {}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl DispatchObserver for TracingObserver {
    fn message_received(&self, remote: &str, message: &Message) {
        debug!(
            remote = %remote,
            method = %message.method,
            callbacks = message.callbacks.len(),
            "dnode message received"
        );
    }

    fn dispatch_failed(&self, remote: &str, error: &DnodeError) {
        warn!(remote = %remote, "dnode dispatch failed: {}", error);
    }

    fn stopped(&self, remote: &str, error: &DnodeError) {
        if error.is_closed() {
            debug!(remote = %remote, "dnode connection closed");
        } else {
            warn!(remote = %remote, "dnode receive loop stopped: {}", error);
        }
    }
}
