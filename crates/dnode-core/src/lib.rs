//! Dnode Core - bidirectional remote invocation with callbacks as arguments.
//!
//! Either side of a connection can call named methods on the other. Any
//! function placed inside the arguments, at any depth, travels as a callback
//! id; the receiver gets a stub that calls back across the same connection.
//!
//! The crate is transport-agnostic: a [`Transport`] moves whole messages, and
//! [`MemoryTransport`] and [`TcpTransport`] are provided.
//!
//! # Example
//!
//! ```rust,ignore
//! use dnode_core::{Arguments, Callback, Dnode, TcpTransport, Value};
//!
//! #[tokio::main]
//! async fn main() -> dnode_core::Result<()> {
//!     let dnode = Dnode::new(TcpTransport::connect("127.0.0.1:7070").await?);
//!
//!     let pong = Callback::from_fn(|args: Arguments| async move {
//!         println!("pong: {:?}", args.get(0));
//!         Ok(())
//!     });
//!     dnode.send("ping", vec![Value::from(pong)]).await?;
//!
//!     let err = dnode.run().await;
//!     println!("connection ended: {}", err);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod function;
pub mod message;
pub mod observer;
pub mod partial;
pub mod path;
pub mod registry;
pub mod runner;
pub mod transport;
pub mod value;

mod builder;
mod dnode;
mod peer;
mod scrub;

// Re-export commonly used types
pub use builder::DnodeBuilder;
pub use config::ProtocolConfig;
pub use dnode::Dnode;
pub use error::{DnodeError, ErrorKind, Result};
pub use function::{Callback, Function};
pub use message::{CallbackMap, Message, MethodId};
pub use observer::{DispatchObserver, NoopObserver, TracingObserver};
pub use partial::Partial;
pub use path::Path;
pub use runner::{DirectRunner, Invocation, Runner, Wrapper};
pub use transport::{Detached, MemoryTransport, Properties, TcpTransport, Transport};
pub use value::{Arguments, Value};
