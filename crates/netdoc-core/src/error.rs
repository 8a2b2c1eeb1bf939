//! Error types for netdoc
//!
//! [`Error`] is the crate-wide error used by adapters, stores and the
//! registry. [`SyncError`] is the typed outcome of a failed sync run and is
//! what callers of the engine and coordinator see.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ProviderId;

/// Result type alias for netdoc operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failure classes surfaced to callers
///
/// Every [`Error`] maps onto exactly one kind via [`Error::kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Required connection field missing or malformed; fix the config
    Config,
    /// Credentials rejected by the provider
    Auth,
    /// Host unreachable or timed out; safe to retry manually
    Unreachable,
    /// Transport security requirement or port policy violated
    TransportPolicy,
    /// A run is already in flight for the provider
    ConcurrentRun,
    /// Snapshot retrieval failed after a successful connection test
    Fetch,
    /// Adapter broke its contract (e.g. mixed provenance in a snapshot)
    Contract,
    /// Anything else
    Other,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Config => "config",
            ErrorKind::Auth => "auth",
            ErrorKind::Unreachable => "unreachable",
            ErrorKind::TransportPolicy => "transport_policy",
            ErrorKind::ConcurrentRun => "concurrent_run",
            ErrorKind::Fetch => "fetch",
            ErrorKind::Contract => "contract",
            ErrorKind::Other => "other",
        };
        f.write_str(name)
    }
}

/// Core error type for netdoc
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Host or endpoint unreachable
    #[error("Unreachable: {0}")]
    Unreachable(String),

    /// Provider call exceeded its time budget
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Transport security policy violated
    #[error("Transport policy violation: {0}")]
    TransportPolicy(String),

    /// Snapshot fetch failed
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// A sync run is already in progress for this provider
    #[error("Sync already in progress for provider {0}")]
    ConcurrentRun(ProviderId),

    /// Provider id was never registered
    #[error("Unknown provider: {0}")]
    UnknownProvider(ProviderId),

    /// Adapter contract violation
    #[error("Contract violation: {0}")]
    Contract(String),

    /// Document store errors
    #[error("Document store error: {0}")]
    DocumentStore(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create an unreachable-host error
    pub fn unreachable(msg: impl Into<String>) -> Self {
        Self::Unreachable(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create a transport policy error
    pub fn transport_policy(msg: impl Into<String>) -> Self {
        Self::TransportPolicy(msg.into())
    }

    /// Create a fetch error
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    /// Create a contract violation error
    pub fn contract(msg: impl Into<String>) -> Self {
        Self::Contract(msg.into())
    }

    /// Create a document store error
    pub fn document_store(msg: impl Into<String>) -> Self {
        Self::DocumentStore(msg.into())
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(_) | Error::UnknownProvider(_) => ErrorKind::Config,
            Error::Authentication(_) => ErrorKind::Auth,
            Error::Unreachable(_) | Error::Timeout(_) => ErrorKind::Unreachable,
            Error::TransportPolicy(_) => ErrorKind::TransportPolicy,
            Error::Fetch(_) => ErrorKind::Fetch,
            Error::ConcurrentRun(_) => ErrorKind::ConcurrentRun,
            Error::Contract(_) => ErrorKind::Contract,
            Error::DocumentStore(_) | Error::Io(_) | Error::Json(_) | Error::Other(_) => {
                ErrorKind::Other
            }
        }
    }

    /// The bare message, without the category prefix
    ///
    /// Adapters put the provider's own wording in here (e.g. `401 Unauthorized`)
    /// and that wording is what ends up in run state and [`SyncError`].
    pub fn detail(&self) -> String {
        match self {
            Error::Config(msg)
            | Error::Authentication(msg)
            | Error::Unreachable(msg)
            | Error::Timeout(msg)
            | Error::TransportPolicy(msg)
            | Error::Fetch(msg)
            | Error::Contract(msg)
            | Error::DocumentStore(msg)
            | Error::Other(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

/// Typed failure of a sync run
///
/// `Display` renders the message alone so the provider's wording reaches
/// the caller unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct SyncError {
    /// Provider the run was for
    pub provider: ProviderId,
    /// Failure class
    pub kind: ErrorKind,
    /// Human-readable reason
    pub message: String,
}

impl SyncError {
    /// Create a sync error
    pub fn new(provider: ProviderId, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            provider,
            kind,
            message: message.into(),
        }
    }

    /// Wrap a core error for the given provider
    pub fn from_error(provider: ProviderId, err: &Error) -> Self {
        Self::new(provider, err.kind(), err.detail())
    }

    /// Rejected because a run is already in flight
    pub fn already_running(provider: ProviderId) -> Self {
        let message = Error::ConcurrentRun(provider.clone()).to_string();
        Self::new(provider, ErrorKind::ConcurrentRun, message)
    }

    /// Whether this is a rejected request rather than a failed run
    pub fn is_rejection(&self) -> bool {
        self.kind == ErrorKind::ConcurrentRun
    }
}
