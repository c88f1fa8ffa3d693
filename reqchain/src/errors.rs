//! Error types for the reqchain engine.
//!
//! Every failure a chain can surface lives here: configuration resolution,
//! transport, URL safety, result mapping, and stage-shape parsing. The
//! umbrella [`ChainError`] carries `#[from]` conversions for each of them.

use thiserror::Error;

/// The main error type for chain operations.
#[derive(Debug, Error)]
pub enum ChainError {
    /// A stage's config factory failed to produce a request descriptor.
    #[error("{0}")]
    Config(#[from] ConfigResolutionError),

    /// The adapter failed to complete a dispatch.
    #[error("{0}")]
    Transport(#[from] TransportError),

    /// The URL guard rejected a request target before dispatch.
    #[error("{0}")]
    Ssrf(#[from] SsrfValidationError),

    /// A stage's result mapper failed.
    #[error("{0}")]
    Mapper(#[from] MapperError),

    /// A stage literal matched no known stage shape.
    #[error("{0}")]
    UnknownStage(#[from] UnknownStageError),
}

/// Error raised when a stage's config factory fails.
///
/// Config resolution runs before dispatch, so this error is never retried:
/// a factory that cannot build a descriptor will not do better on a second
/// call with the same inputs.
#[derive(Debug, Clone, Error)]
#[error("Config resolution failed at stage {stage_index}: {message}")]
pub struct ConfigResolutionError {
    /// Index of the failing stage in append order.
    pub stage_index: usize,
    /// The factory's failure message.
    pub message: String,
}

impl ConfigResolutionError {
    /// Creates a new config resolution error.
    #[must_use]
    pub fn new(stage_index: usize, message: impl Into<String>) -> Self {
        Self {
            stage_index,
            message: message.into(),
        }
    }
}

/// Classification of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    /// The connection could not be established.
    Connect,
    /// The request timed out before a response arrived.
    Timeout,
    /// A response arrived with a non-success HTTP status.
    Status,
    /// The response body could not be decoded.
    Decode,
    /// Any other transport-level failure.
    Other,
}

impl TransportErrorKind {
    /// Whether this kind describes a connection-level failure, one where no
    /// HTTP response was received at all.
    #[must_use]
    pub const fn is_connection_level(self) -> bool {
        matches!(self, Self::Connect | Self::Timeout)
    }
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Connect => "connect",
            Self::Timeout => "timeout",
            Self::Status => "status",
            Self::Decode => "decode",
            Self::Other => "other",
        };
        f.write_str(label)
    }
}

/// Error raised when the adapter fails to complete a dispatch.
///
/// This is the only error kind the retry evaluator consults; everything
/// else aborts the chain immediately.
#[derive(Debug, Clone, Error)]
#[error("Transport failure ({kind}): {message}")]
pub struct TransportError {
    /// What went wrong at the transport level.
    pub kind: TransportErrorKind,
    /// The HTTP status, when a response was received.
    pub status: Option<u16>,
    /// Human-readable detail.
    pub message: String,
}

impl TransportError {
    /// Creates a new transport error.
    #[must_use]
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
        }
    }

    /// Creates a connection failure.
    #[must_use]
    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Connect, message)
    }

    /// Creates a timeout failure.
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    /// Creates a failure for a non-success HTTP status.
    #[must_use]
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Status,
            status: Some(status),
            message: message.into(),
        }
    }

    /// Creates a body-decode failure.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Decode, message)
    }

    /// Sets the HTTP status.
    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

/// The specific safety rule a URL violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SsrfViolation {
    /// The scheme is not in the allow-list.
    Scheme,
    /// The host is a loopback address or name.
    Loopback,
    /// The host is a private or link-local network address.
    PrivateNetwork,
    /// The URL has no host component.
    MissingHost,
    /// The URL could not be parsed at all.
    Malformed,
}

impl std::fmt::Display for SsrfViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Scheme => "scheme not allowed",
            Self::Loopback => "loopback address",
            Self::PrivateNetwork => "private network address",
            Self::MissingHost => "missing host",
            Self::Malformed => "malformed URL",
        };
        f.write_str(label)
    }
}

/// Error raised when the URL guard rejects a request target.
///
/// A rejected URL never reaches the transport: the guard runs before any
/// socket is opened.
#[derive(Debug, Clone, Error)]
#[error("URL '{url}' blocked: {violation}")]
pub struct SsrfValidationError {
    /// The offending URL as given.
    pub url: String,
    /// Which rule it violated.
    pub violation: SsrfViolation,
}

impl SsrfValidationError {
    /// Creates a new URL validation error.
    #[must_use]
    pub fn new(url: impl Into<String>, violation: SsrfViolation) -> Self {
        Self {
            url: url.into(),
            violation,
        }
    }
}

/// Error raised when a stage's result mapper fails.
#[derive(Debug, Clone, Error)]
#[error("Mapper failed at stage {stage_index}: {message}")]
pub struct MapperError {
    /// Index of the failing stage in append order.
    pub stage_index: usize,
    /// The mapper's failure message.
    pub message: String,
}

impl MapperError {
    /// Creates a new mapper error.
    #[must_use]
    pub fn new(stage_index: usize, message: impl Into<String>) -> Self {
        Self {
            stage_index,
            message: message.into(),
        }
    }
}

/// Error raised when a stage literal matches no known stage shape.
#[derive(Debug, Clone, Error)]
#[error("Unknown stage shape: {detail}")]
pub struct UnknownStageError {
    /// What made the literal unrecognizable.
    pub detail: String,
}

impl UnknownStageError {
    /// Creates a new unknown stage error.
    #[must_use]
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}
