//! Error types for the dnode protocol processor.
//!
//! Errors fall into three tiers, reported by [`DnodeError::kind`]:
//! configuration mistakes made while registering handlers, dispatch failures
//! that are reported but never stop the receive loop, and transport failures
//! that end it.

use thiserror::Error;

/// Main error type for the dnode library.
#[derive(Debug, Error)]
pub enum DnodeError {
    // Configuration errors
    #[error("Invalid handler registration for {method:?}: {reason}")]
    Registration { method: String, reason: String },

    // Dispatch errors
    #[error("Method not found: {method}")]
    MethodNotFound { method: String },

    #[error("Callback not found: {id}")]
    CallbackNotFound { id: u64 },

    #[error("Invalid callback path {path:?}: {reason}")]
    InvalidCallbackPath { path: String, reason: String },

    #[error("Invalid arguments: {message}")]
    InvalidArguments { message: String },

    #[error("Partial has callbacks but is not bound to a peer")]
    Unbound,

    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("Handler failed: {message}")]
    Handler { message: String },

    // Transport errors
    #[error("Connection closed")]
    Closed,

    #[error("Transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Message size {size} exceeds maximum {max}")]
    MessageTooLarge { size: usize, max: usize },
}

/// Result type alias for dnode operations.
pub type Result<T> = std::result::Result<T, DnodeError>;

/// Which tier an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Programming mistake detected at setup time.
    Configuration,
    /// Failure while handling a single message. The receive loop keeps going.
    Dispatch,
    /// The connection is unusable. The receive loop stops.
    Transport,
}

impl From<std::io::Error> for DnodeError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::BrokenPipe => DnodeError::Closed,
            _ => DnodeError::Transport {
                message: err.to_string(),
                source: Some(err),
            },
        }
    }
}

impl From<serde_json::Error> for DnodeError {
    fn from(err: serde_json::Error) -> Self {
        DnodeError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl DnodeError {
    /// Create a handler failure from any displayable error.
    pub fn handler(err: impl std::fmt::Display) -> Self {
        DnodeError::Handler {
            message: err.to_string(),
        }
    }

    /// Create an invalid arguments error.
    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        DnodeError::InvalidArguments {
            message: message.into(),
        }
    }

    /// Classify the error into its tier.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DnodeError::Registration { .. } => ErrorKind::Configuration,

            DnodeError::Closed
            | DnodeError::Transport { .. }
            | DnodeError::MessageTooLarge { .. } => ErrorKind::Transport,

            _ => ErrorKind::Dispatch,
        }
    }

    /// True for an orderly close of the connection.
    pub fn is_closed(&self) -> bool {
        matches!(self, DnodeError::Closed)
    }
}
