//! Outbound side of a connection: message sending and remote stubs.

use crate::error::Result;
use crate::function::{Callback, Function};
use crate::message::{CallbackMap, Message, MethodId};
use crate::registry::CallbackRegistry;
use crate::scrub::scrub;
use crate::transport::Transport;
use crate::value::{Arguments, Value};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::trace;

/// Everything needed to send a call to the other side.
#[derive(Clone)]
pub(crate) struct Peer {
    transport: Arc<dyn Transport>,
    callbacks: Arc<CallbackRegistry>,
}

impl Peer {
    pub(crate) fn new(transport: Arc<dyn Transport>, callbacks: Arc<CallbackRegistry>) -> Self {
        Self {
            transport,
            callbacks,
        }
    }

    /// Scrub `args`, register the callbacks found in them and send the call.
    ///
    /// If the call cannot be sent, the callbacks registered for it are
    /// removed again.
    pub(crate) async fn send(&self, method: MethodId, args: Arguments) -> Result<CallbackMap> {
        let (tree, callbacks) = scrub(&Value::Array(args.into_vec()), &self.callbacks);
        let ids = callbacks.ids();

        match self.encode_and_send(method, &tree, callbacks).await {
            Ok(sent) => Ok(sent),
            Err(e) => {
                for id in ids {
                    self.callbacks.remove(id);
                }
                Err(e)
            }
        }
    }

    async fn encode_and_send(
        &self,
        method: MethodId,
        tree: &serde_json::Value,
        callbacks: CallbackMap,
    ) -> Result<CallbackMap> {
        let message = Message::new(method, tree, callbacks)?;
        let bytes = message.encode()?;

        trace!(
            method = %message.method,
            callbacks = message.callbacks.len(),
            bytes = bytes.len(),
            remote = %self.transport.remote_addr(),
            "Sending dnode message"
        );

        self.transport.send(&bytes).await?;
        Ok(message.callbacks)
    }

    /// A callback that, when invoked, calls remote callback `id`.
    pub(crate) fn stub(&self, id: u64) -> Callback {
        Callback::new(RemoteCallback {
            id,
            peer: self.clone(),
        })
    }
}

/// Receiver-side stand-in for a callback the peer sent us.
struct RemoteCallback {
    id: u64,
    peer: Peer,
}

#[async_trait]
impl Function for RemoteCallback {
    async fn call(&self, args: Arguments) -> Result<()> {
        self.peer
            .send(MethodId::Callback(self.id), args)
            .await
            .map(|_| ())
    }

    fn remote_id(&self) -> Option<u64> {
        Some(self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{Detached, MemoryTransport};
    use serde_json::json;

    #[tokio::test]
    async fn test_stub_sends_callback_id() {
        let (local, remote) = MemoryTransport::pair();
        let peer = Peer::new(Arc::new(local), Arc::new(CallbackRegistry::new()));

        let stub = peer.stub(7);
        assert_eq!(stub.remote_id(), Some(7));
        stub.call(vec![Value::from("hi")]).await.unwrap();

        let bytes = remote.receive().await.unwrap();
        let wire: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            wire,
            json!({"method": 7, "arguments": ["hi"], "callbacks": {}, "links": []})
        );
    }

    #[tokio::test]
    async fn test_send_registers_callbacks() {
        let (local, remote) = MemoryTransport::pair();
        let registry = Arc::new(CallbackRegistry::new());
        let peer = Peer::new(Arc::new(local), registry.clone());

        let cb = Callback::from_fn(|_| async { Ok(()) });
        let sent = peer
            .send(MethodId::from("subscribe"), vec![Value::from("topic"), Value::from(cb.clone())].into())
            .await
            .unwrap();

        assert_eq!(sent.ids(), vec![0]);
        assert!(registry.get(0).unwrap().ptr_eq(&cb));

        let msg = Message::decode(&remote.receive().await.unwrap()).unwrap();
        assert_eq!(msg.method, MethodId::from("subscribe"));
        assert_eq!(msg.callbacks, sent);
    }

    #[tokio::test]
    async fn test_failed_send_releases_callbacks() {
        let registry = Arc::new(CallbackRegistry::new());
        let peer = Peer::new(Arc::new(Detached::new()), registry.clone());

        let cb = Callback::from_fn(|_| async { Ok(()) });
        let err = peer
            .send(MethodId::from("m"), vec![Value::from(cb.clone()), Value::from(cb)].into())
            .await
            .unwrap_err();

        assert!(err.is_closed());
        assert!(registry.is_empty());
        assert_eq!(registry.next_id(), 2);
    }
}
