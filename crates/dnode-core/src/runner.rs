//! Extension points around invocation: argument wrappers and runners.

use crate::error::Result;
use crate::function::Callback;
use crate::message::MethodId;
use crate::partial::Partial;
use crate::transport::Transport;
use crate::value::Arguments;
use async_trait::async_trait;
use std::sync::Arc;

/// Transforms decoded arguments before they reach the invocable.
pub type Wrapper = Arc<dyn Fn(Arguments, &dyn Transport) -> Arguments + Send + Sync>;

/// One resolved call, ready to run.
pub struct Invocation {
    /// Method name or callback id from the message.
    pub method: MethodId,
    /// The handler or callback the method resolved to.
    pub function: Callback,
    /// Decoded arguments, after the wrapper for this kind of call.
    pub arguments: Arguments,
    /// The undecoded arguments, for runners that want a typed decode.
    pub partial: Partial,
    pub transport: Arc<dyn Transport>,
}

/// Invocation strategy.
#[async_trait]
pub trait Runner: Send + Sync {
    async fn run(&self, invocation: Invocation) -> Result<()>;
}

/// Calls the invocable with the decoded arguments.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectRunner;

#[async_trait]
impl Runner for DirectRunner {
    async fn run(&self, invocation: Invocation) -> Result<()> {
        invocation.function.call(invocation.arguments).await
    }
}

/// Wrappers and runners of one instance, shared by its copies.
#[derive(Clone, Default)]
pub(crate) struct Hooks {
    pub(crate) wrap_method_args: Option<Wrapper>,
    pub(crate) wrap_callback_args: Option<Wrapper>,
    pub(crate) run_method: Option<Arc<dyn Runner>>,
    pub(crate) run_callback: Option<Arc<dyn Runner>>,
}

impl Hooks {
    /// Wrapper and runner for a method call or a callback call.
    pub(crate) fn for_method(&self, method: &MethodId) -> (Option<&Wrapper>, Option<&Arc<dyn Runner>>) {
        match method {
            MethodId::Name(_) => (self.wrap_method_args.as_ref(), self.run_method.as_ref()),
            MethodId::Callback(_) => (self.wrap_callback_args.as_ref(), self.run_callback.as_ref()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Detached;
    use crate::value::Value;
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_direct_runner_calls_function() {
        let seen = Arc::new(Mutex::new(0usize));
        let sink = seen.clone();
        let function = Callback::from_fn(move |args| {
            let sink = sink.clone();
            async move {
                *sink.lock().unwrap() = args.len();
                Ok(())
            }
        });

        DirectRunner
            .run(Invocation {
                method: MethodId::from("m"),
                function,
                arguments: Arguments::new(vec![Value::Null, Value::Null]),
                partial: Partial::default(),
                transport: Arc::new(Detached::new()),
            })
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), 2);
    }

    #[test]
    fn test_hooks_select_by_kind() {
        let method_wrapper: Wrapper = Arc::new(|args: Arguments, _: &dyn Transport| args);
        let hooks = Hooks {
            wrap_method_args: Some(method_wrapper),
            run_callback: Some(Arc::new(DirectRunner)),
            ..Default::default()
        };

        let (wrap, run) = hooks.for_method(&MethodId::from("m"));
        assert!(wrap.is_some() && run.is_none());

        let (wrap, run) = hooks.for_method(&MethodId::from(1u64));
        assert!(wrap.is_none() && run.is_some());
    }
}
