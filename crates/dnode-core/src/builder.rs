//! Builder for configuring a Dnode instance.

use std::sync::Arc;

use crate::dnode::Dnode;
use crate::observer::{DispatchObserver, NoopObserver, TracingObserver};
use crate::runner::{Hooks, Runner};
use crate::transport::Transport;
use crate::value::Arguments;

/// Builder for configuring a [`Dnode`].
///
/// # Example
///
/// ```rust,ignore
/// use dnode_core::{Dnode, TcpTransport};
///
/// let transport = TcpTransport::connect("127.0.0.1:7070").await?;
/// let dnode = Dnode::builder()
///     .diagnostics(true)
///     .wrap_method_args(|mut args, transport| {
///         args.push(transport.remote_addr());
///         args
///     })
///     .build(transport);
/// ```
pub struct DnodeBuilder {
    hooks: Hooks,
    observer: Option<Arc<dyn DispatchObserver>>,
    diagnostics: bool,
}

impl DnodeBuilder {
    pub fn new() -> Self {
        Self {
            hooks: Hooks::default(),
            observer: None,
            diagnostics: false,
        }
    }

    /// Log dispatch failures and loop termination through `tracing`.
    ///
    /// Ignored when an explicit [`observer`](Self::observer) is set.
    ///
    /// Default: `false`
    pub fn diagnostics(mut self, enable: bool) -> Self {
        self.diagnostics = enable;
        self
    }

    /// Send loop events to a custom observer.
    pub fn observer(mut self, observer: impl DispatchObserver + 'static) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// Transform decoded arguments of every named-method call.
    pub fn wrap_method_args<F>(mut self, wrapper: F) -> Self
    where
        F: Fn(Arguments, &dyn Transport) -> Arguments + Send + Sync + 'static,
    {
        self.hooks.wrap_method_args = Some(Arc::new(wrapper));
        self
    }

    /// Transform decoded arguments of every callback call.
    pub fn wrap_callback_args<F>(mut self, wrapper: F) -> Self
    where
        F: Fn(Arguments, &dyn Transport) -> Arguments + Send + Sync + 'static,
    {
        self.hooks.wrap_callback_args = Some(Arc::new(wrapper));
        self
    }

    /// Replace the default runner for named-method calls.
    pub fn run_method(mut self, runner: impl Runner + 'static) -> Self {
        self.hooks.run_method = Some(Arc::new(runner));
        self
    }

    /// Replace the default runner for callback calls.
    pub fn run_callback(mut self, runner: impl Runner + 'static) -> Self {
        self.hooks.run_callback = Some(Arc::new(runner));
        self
    }

    /// Build the instance on `transport`.
    pub fn build(self, transport: impl Transport + 'static) -> Dnode {
        let observer: Arc<dyn DispatchObserver> = match self.observer {
            Some(observer) => observer,
            None if self.diagnostics => Arc::new(TracingObserver),
            None => Arc::new(NoopObserver),
        };

        Dnode::from_parts(Arc::new(transport), self.hooks, observer)
    }
}

impl Default for DnodeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DnodeError;
    use crate::function::Callback;
    use crate::transport::Detached;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        failures: Mutex<Vec<String>>,
    }

    impl DispatchObserver for Arc<Recorder> {
        fn dispatch_failed(&self, _remote: &str, error: &DnodeError) {
            self.failures.lock().unwrap().push(error.to_string());
        }
    }

    #[tokio::test]
    async fn test_custom_observer_sees_failures() {
        let recorder = Arc::new(Recorder::default());
        let (local, remote) = crate::transport::MemoryTransport::pair();
        let d = Dnode::builder().observer(recorder.clone()).build(local);

        remote.send(br#"{"method":"missing","arguments":[]}"#).await.unwrap();
        drop(remote);
        assert!(d.run().await.is_closed());

        let failures = recorder.failures.lock().unwrap();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].contains("missing"));
    }

    #[tokio::test]
    async fn test_method_wrapper_sees_transport() {
        let seen = Arc::new(Mutex::new(String::new()));
        let sink = seen.clone();

        let d = Dnode::builder()
            .wrap_method_args(|mut args, transport| {
                args.push(transport.remote_addr());
                args
            })
            .build(Detached::new());
        d.handle_func(
            "who",
            Callback::from_fn(move |args| {
                let sink = sink.clone();
                async move {
                    *sink.lock().unwrap() = args.str(0)?.to_string();
                    Ok(())
                }
            }),
        );

        d.process_message(br#"{"method":"who","arguments":[]}"#)
            .await
            .unwrap();
        assert_eq!(*seen.lock().unwrap(), "detached");
    }
}
