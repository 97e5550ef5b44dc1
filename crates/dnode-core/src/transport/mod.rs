//! Message transports.
//!
//! A [`Transport`] moves whole messages between the two sides of one
//! connection. Framing is its business; the dispatcher only sees complete
//! byte messages.
//!
//! - [`MemoryTransport`]: in-process pair, for tests and embedding
//! - [`TcpTransport`]: length-prefixed frames over TCP
//! - [`Detached`]: placeholder for template instances that are only copied

mod frame;
mod memory;
mod tcp;

pub use frame::{read_frame, write_frame};
pub use memory::MemoryTransport;
pub use tcp::TcpTransport;

use crate::error::{DnodeError, Result};
use async_trait::async_trait;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Ordered message exchange with one peer.
///
/// `send` may be called while a `receive` is pending on another task, so
/// implementations must not serialize the two directions behind one lock.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Address of the connected peer.
    fn remote_addr(&self) -> String;

    /// Send a single message.
    async fn send(&self, msg: &[u8]) -> Result<()>;

    /// Receive a single message. An orderly close is `DnodeError::Closed`.
    async fn receive(&self) -> Result<Vec<u8>>;

    /// Connection-scoped metadata owned by the application.
    fn properties(&self) -> &Properties;
}

type Property = Arc<dyn Any + Send + Sync>;

/// String-keyed bag of arbitrary values attached to a connection.
#[derive(Default)]
pub struct Properties {
    values: RwLock<HashMap<String, Property>>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key`, replacing any previous value.
    pub fn insert<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), Arc::new(value));
    }

    /// Fetch the value under `key` if it has type `T`.
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        let value = self
            .values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()?;
        value.downcast::<T>().ok()
    }

    pub fn remove(&self, key: &str) -> bool {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.values.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A transport with no connection behind it.
///
/// Used for an instance that only holds the handler set and is copied onto
/// real transports as connections arrive.
#[derive(Default)]
pub struct Detached {
    properties: Properties,
}

impl Detached {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Transport for Detached {
    fn remote_addr(&self) -> String {
        "detached".to_string()
    }

    async fn send(&self, _msg: &[u8]) -> Result<()> {
        Err(DnodeError::Closed)
    }

    async fn receive(&self) -> Result<Vec<u8>> {
        Err(DnodeError::Closed)
    }

    fn properties(&self) -> &Properties {
        &self.properties
    }
}
