//! Pool error types.
//!
//! Every pool in the workspace reports failures through [`PoolError`]. The
//! variants map onto the error taxonomy the pools care about:
//!
//! - **Creation** errors come from a factory or connector failing to produce a
//!   usable resource and are propagated to the caller.
//! - **Validation** errors are absorbed by the pools (the resource is discarded)
//!   and only reach callers when they hand back a broken resource.
//! - **Cancellation** is reported verbatim when the caller's signal fires.
//! - **HTTP** errors are categorized as timeout or connection failures so the
//!   statistics can count them separately.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Boxed error type used for foreign error sources.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while acquiring, validating or releasing pooled resources.
#[derive(Error, Debug)]
pub enum PoolError {
    /// A resource factory or peer connector reported a failure.
    #[error("Factory error: {message}")]
    Factory {
        /// Error message.
        message: String,
    },

    /// Resource creation failed; wraps the underlying cause with context.
    #[error("{context}: {source}")]
    Creation {
        /// What the pool was doing when creation failed.
        context: String,
        /// The underlying failure.
        #[source]
        source: Box<PoolError>,
    },

    /// A resource failed its liveness check.
    #[error("Validation failed: {message}")]
    Validation {
        /// Description of the failure.
        message: String,
    },

    /// The caller's cancellation signal fired while waiting.
    #[error("Operation cancelled")]
    Cancelled,

    /// An operation exceeded its deadline.
    #[error("{operation} timed out after {duration:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// How long the operation waited.
        duration: Duration,
    },

    /// The pool has been stopped.
    #[error("Pool is closed")]
    Closed,

    /// `start()` was called on a pool that is already running.
    #[error("Pool already started")]
    AlreadyStarted,

    /// An HTTP request failed.
    #[error("HTTP {kind} error: {message}")]
    Http {
        /// Category of the failure.
        kind: HttpErrorKind,
        /// Error message.
        message: String,
        /// The underlying client error, if any.
        #[source]
        source: Option<BoxError>,
    },

    /// An operation on a specific peer failed.
    #[error("peer {peer_id}: {source}")]
    Peer {
        /// The peer the operation targeted.
        peer_id: String,
        /// The underlying failure.
        #[source]
        source: Box<PoolError>,
    },

    /// A pool could not be built from an otherwise well-formed configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the problem.
        message: String,
    },

    /// Configuration could not be loaded.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the problem.
        message: String,
    },

    /// I/O error from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Category of an HTTP failure, used to pick the statistics counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpErrorKind {
    /// The request or connection attempt exceeded a deadline.
    Timeout,
    /// The connection could not be established or was dropped.
    Connection,
    /// The host name could not be resolved.
    Dns,
    /// The request itself was malformed (bad URL, body error, ...).
    Request,
}

impl fmt::Display for HttpErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => f.write_str("timeout"),
            Self::Connection => f.write_str("connection"),
            Self::Dns => f.write_str("dns"),
            Self::Request => f.write_str("request"),
        }
    }
}

/// Coarse classification of a [`PoolError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Creating a resource failed.
    Creation,
    /// A resource failed validation.
    Validation,
    /// The caller cancelled the operation.
    Cancelled,
    /// A deadline expired.
    Timeout,
    /// A connection-level failure.
    Connection,
    /// The pool is not usable (stopped or already started).
    Lifecycle,
    /// Configuration problem.
    Config,
    /// Anything else.
    Other,
}

impl PoolError {
    /// Create a factory error.
    pub fn factory(message: impl Into<String>) -> Self {
        Self::Factory {
            message: message.into(),
        }
    }

    /// Wrap a creation failure with context.
    pub fn creation(context: impl Into<String>, source: PoolError) -> Self {
        Self::Creation {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create an HTTP error without an underlying source.
    pub fn http(kind: HttpErrorKind, message: impl Into<String>) -> Self {
        Self::Http {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Wrap a failure with the peer it concerns.
    pub fn peer(peer_id: impl Into<String>, source: PoolError) -> Self {
        Self::Peer {
            peer_id: peer_id.into(),
            source: Box::new(source),
        }
    }

    /// Create an invalid-configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Get the error kind.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Factory { .. } => ErrorKind::Creation,
            Self::Creation { source, .. } => match source.kind() {
                ErrorKind::Timeout => ErrorKind::Timeout,
                _ => ErrorKind::Creation,
            },
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Closed | Self::AlreadyStarted => ErrorKind::Lifecycle,
            Self::Http { kind, .. } => match kind {
                HttpErrorKind::Timeout => ErrorKind::Timeout,
                HttpErrorKind::Connection | HttpErrorKind::Dns => ErrorKind::Connection,
                HttpErrorKind::Request => ErrorKind::Other,
            },
            Self::Peer { source, .. } => source.kind(),
            Self::InvalidConfig { .. } | Self::Config { .. } | Self::Json(_) => ErrorKind::Config,
            Self::Io(e) => match e.kind() {
                std::io::ErrorKind::TimedOut => ErrorKind::Timeout,
                std::io::ErrorKind::ConnectionRefused
                | std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::ConnectionAborted
                | std::io::ErrorKind::NotConnected
                | std::io::ErrorKind::BrokenPipe => ErrorKind::Connection,
                _ => ErrorKind::Other,
            },
        }
    }

    /// Whether retrying the failed operation could succeed.
    ///
    /// Cancellation, lifecycle and configuration errors are never retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Creation | ErrorKind::Timeout | ErrorKind::Connection
        )
    }

    /// Whether this error reports a cancelled operation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
