//! In-process transport pair.

use super::{Properties, Transport};
use crate::error::{DnodeError, Result};
use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

/// One end of an in-memory connection.
///
/// Dropping one end makes `receive` on the other return `Closed` once the
/// already queued messages are drained.
pub struct MemoryTransport {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    rx: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    remote_addr: String,
    properties: Properties,
}

impl MemoryTransport {
    /// Create two connected ends.
    pub fn pair() -> (Self, Self) {
        let (left_tx, right_rx) = mpsc::unbounded_channel();
        let (right_tx, left_rx) = mpsc::unbounded_channel();

        let left = Self {
            tx: left_tx,
            rx: Mutex::new(left_rx),
            remote_addr: "memory:right".to_string(),
            properties: Properties::new(),
        };
        let right = Self {
            tx: right_tx,
            rx: Mutex::new(right_rx),
            remote_addr: "memory:left".to_string(),
            properties: Properties::new(),
        };
        (left, right)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    fn remote_addr(&self) -> String {
        self.remote_addr.clone()
    }

    async fn send(&self, msg: &[u8]) -> Result<()> {
        self.tx.send(msg.to_vec()).map_err(|_| DnodeError::Closed)
    }

    async fn receive(&self) -> Result<Vec<u8>> {
        self.rx.lock().await.recv().await.ok_or(DnodeError::Closed)
    }

    fn properties(&self) -> &Properties {
        &self.properties
    }
}
