//! The dnode message processor.
//!
//! A [`Dnode`] is one side of one connection. It owns the handlers exposed to
//! the peer, the callbacks sent to the peer, and the transport, and runs the
//! receive loop that turns inbound messages into invocations.

use crate::builder::DnodeBuilder;
use crate::error::{DnodeError, Result};
use crate::function::Callback;
use crate::message::{CallbackMap, Message, MethodId};
use crate::observer::DispatchObserver;
use crate::peer::Peer;
use crate::registry::{CallbackRegistry, HandlerRegistry};
use crate::runner::{DirectRunner, Hooks, Invocation, Runner};
use crate::transport::Transport;
use crate::value::Arguments;
use std::sync::Arc;

/// Message processor for one connection.
///
/// Cloning a `Dnode` gives another handle to the same instance. Use
/// [`Dnode::copy`] to serve a different connection with the same handlers.
#[derive(Clone)]
pub struct Dnode {
    handlers: Arc<HandlerRegistry>,
    callbacks: Arc<CallbackRegistry>,
    transport: Arc<dyn Transport>,
    hooks: Hooks,
    observer: Arc<dyn DispatchObserver>,
}

impl Dnode {
    /// Create an instance bound to `transport` with default hooks and
    /// diagnostics disabled.
    pub fn new(transport: impl Transport + 'static) -> Self {
        DnodeBuilder::new().build(transport)
    }

    /// Start configuring an instance.
    pub fn builder() -> DnodeBuilder {
        DnodeBuilder::new()
    }

    pub(crate) fn from_parts(
        transport: Arc<dyn Transport>,
        hooks: Hooks,
        observer: Arc<dyn DispatchObserver>,
    ) -> Self {
        Self {
            handlers: Arc::new(HandlerRegistry::new()),
            callbacks: Arc::new(CallbackRegistry::new()),
            transport,
            hooks,
            observer,
        }
    }

    /// New instance on `transport` sharing this one's handlers, hooks and
    /// observer, with no callbacks.
    pub fn copy(&self, transport: impl Transport + 'static) -> Self {
        Self {
            handlers: self.handlers.clone(),
            callbacks: Arc::new(CallbackRegistry::new()),
            transport: Arc::new(transport),
            hooks: self.hooks.clone(),
            observer: self.observer.clone(),
        }
    }

    /// Register `handler` for `method`.
    ///
    /// # Panics
    ///
    /// If `method` is empty or already has a handler.
    pub fn handle_func(&self, method: &str, handler: impl Into<Callback>) {
        if let Err(e) = self.try_handle_func(method, handler) {
            panic!("dnode: {}", e);
        }
    }

    /// Register `handler` for `method`, returning the misuse instead of
    /// panicking.
    pub fn try_handle_func(&self, method: &str, handler: impl Into<Callback>) -> Result<()> {
        self.handlers.register(method, handler.into())
    }

    pub fn has_handler(&self, method: &str) -> bool {
        self.handlers.contains(method)
    }

    /// Process incoming messages until the transport fails. Blocking.
    ///
    /// Returns the error that stopped the loop; an orderly close is
    /// [`DnodeError::Closed`]. Errors while handling a single message are
    /// passed to the observer and do not stop the loop.
    pub async fn run(&self) -> DnodeError {
        loop {
            let raw = match self.transport.receive().await {
                Ok(raw) => raw,
                Err(err) => {
                    self.observer.stopped(&self.transport.remote_addr(), &err);
                    return err;
                }
            };

            // Handled inline, one at a time, in arrival order. Handlers that
            // want concurrency spawn their own tasks.
            if let Err(err) = self.process_message(&raw).await {
                self.observer.dispatch_failed(&self.transport.remote_addr(), &err);
            }
        }
    }

    /// Decode one message and invoke the handler or callback it names.
    pub async fn process_message(&self, raw: &[u8]) -> Result<()> {
        let mut message = Message::decode(raw)?;
        self.observer
            .message_received(&self.transport.remote_addr(), &message);

        let function = match &message.method {
            MethodId::Name(name) => {
                self.handlers
                    .get(name)
                    .ok_or_else(|| DnodeError::MethodNotFound {
                        method: name.clone(),
                    })?
            }
            MethodId::Callback(id) => self
                .callbacks
                .get(*id)
                .ok_or(DnodeError::CallbackNotFound { id: *id })?,
        };

        message.arguments.bind(self.peer());
        let mut arguments = message.arguments.arguments()?;

        let (wrapper, runner) = self.hooks.for_method(&message.method);
        if let Some(wrap) = wrapper {
            arguments = wrap(arguments, self.transport.as_ref());
        }

        let invocation = Invocation {
            method: message.method,
            function,
            arguments,
            partial: message.arguments,
            transport: self.transport.clone(),
        };

        match runner {
            Some(runner) => runner.run(invocation).await,
            None => DirectRunner.run(invocation).await,
        }
    }

    /// Call a remote method by name, or a remote callback by id.
    ///
    /// Functions inside `args` are registered as callbacks; the returned map
    /// lists where they were found and the ids they were given.
    pub async fn send(
        &self,
        method: impl Into<MethodId>,
        args: impl Into<Arguments>,
    ) -> Result<CallbackMap> {
        self.peer().send(method.into(), args.into()).await
    }

    /// Forget a callback previously sent to the peer. Unknown ids are
    /// ignored.
    pub fn remove_callback(&self, id: u64) {
        self.callbacks.remove(id);
    }

    /// Number of callbacks currently tracked.
    pub fn callback_count(&self) -> usize {
        self.callbacks.len()
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    fn peer(&self) -> Peer {
        Peer::new(self.transport.clone(), self.callbacks.clone())
    }
}
