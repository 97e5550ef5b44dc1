//! Invocables: registered handlers, local callbacks and remote stubs.
//!
//! Everything that can be called through the protocol implements
//! [`Function`]: take a generic argument list, return `Ok(())` or an error.
//! Replies are not return values; a peer that wants an answer passes a
//! callback and the handler invokes it.

use crate::error::Result;
use crate::value::Arguments;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// An invocable that can be stored in a registry or passed as an argument.
#[async_trait]
pub trait Function: Send + Sync {
    /// Invoke with the decoded argument list.
    async fn call(&self, args: Arguments) -> Result<()>;

    /// Callback id on the remote side, if this is a stub for a remote callback.
    fn remote_id(&self) -> Option<u64> {
        None
    }
}

/// Cheaply clonable handle to a [`Function`].
#[derive(Clone)]
pub struct Callback {
    inner: Arc<dyn Function>,
}

impl Callback {
    /// Wrap a [`Function`] implementation.
    pub fn new(function: impl Function + 'static) -> Self {
        Self {
            inner: Arc::new(function),
        }
    }

    /// Build a callback from an async closure over the raw argument list.
    ///
    /// ```rust,ignore
    /// let cb = Callback::from_fn(|args| async move {
    ///     println!("got {} args", args.len());
    ///     Ok(())
    /// });
    /// ```
    pub fn from_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self::new(FnFunction(f))
    }

    /// Build a callback whose argument list is decoded into `A` before the
    /// closure runs, usually a tuple matching the expected parameters.
    ///
    /// Function-valued arguments cannot be decoded this way; use
    /// [`Callback::from_fn`] for handlers that receive callbacks.
    pub fn typed<A, F, Fut>(f: F) -> Self
    where
        A: DeserializeOwned + Send + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self::new(TypedFunction {
            f,
            _args: PhantomData,
        })
    }

    /// Invoke the callback.
    pub async fn call(&self, args: impl Into<Arguments>) -> Result<()> {
        self.inner.call(args.into()).await
    }

    /// Remote callback id when this is a stub.
    pub fn remote_id(&self) -> Option<u64> {
        self.inner.remote_id()
    }

    /// True if both handles point at the same invocable.
    pub fn ptr_eq(&self, other: &Callback) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl From<Arc<dyn Function>> for Callback {
    fn from(inner: Arc<dyn Function>) -> Self {
        Self { inner }
    }
}

impl PartialEq for Callback {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.remote_id() {
            Some(id) => write!(f, "Callback(remote {})", id),
            None => write!(f, "Callback(local)"),
        }
    }
}

struct FnFunction<F>(F);

#[async_trait]
impl<F, Fut> Function for FnFunction<F>
where
    F: Fn(Arguments) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send,
{
    async fn call(&self, args: Arguments) -> Result<()> {
        (self.0)(args).await
    }
}

struct TypedFunction<A, F> {
    f: F,
    _args: PhantomData<fn(A)>,
}

#[async_trait]
impl<A, F, Fut> Function for TypedFunction<A, F>
where
    A: DeserializeOwned + Send + 'static,
    F: Fn(A) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send,
{
    async fn call(&self, args: Arguments) -> Result<()> {
        let decoded: A = args.decode()?;
        (self.f)(decoded).await
    }
}
