use crate::classify::{classify_status_code, classify_transport};

/// Terminal category of a failed call.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// Expected to resolve on its own (rate limiting, server error, network blip).
    Transient,
    /// Will not resolve by retrying.
    Fatal,
    /// The cancellation signal fired while waiting between attempts.
    Cancelled,
    /// Every permitted attempt failed with a transient error.
    Exhausted,
}

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum DeeplError {
    /// Network or request execution error from `reqwest`.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// Non-success HTTP status code.
    #[error("{status} - {message}")]
    Http { status: u16, message: String },
    /// Cancellation fired during a backoff wait.
    #[error("request cancelled")]
    Cancelled,
    /// All attempts were consumed by transient failures.
    #[error("giving up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        /// The transient failure observed on the final attempt.
        last: Box<DeeplError>,
    },
    /// Streaming request body could not be produced.
    #[error("request body production failed: {0}")]
    Production(#[source] std::io::Error),
    /// Rejected client, retry or backoff configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// Rejected request option value.
    #[error("invalid value for option `{name}`: {value}")]
    InvalidOption { name: &'static str, value: String },
    /// Response decoding or protocol-shape validation error.
    #[error("decode error: {0}")]
    Decode(String),
}

impl DeeplError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(err) => classify_transport(err),
            Self::Http { status, .. } => classify_status_code(*status).unwrap_or(ErrorKind::Fatal),
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Exhausted { .. } => ErrorKind::Exhausted,
            Self::Production(_)
            | Self::Config(_)
            | Self::InvalidOption { .. }
            | Self::Decode(_) => ErrorKind::Fatal,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }

    /// HTTP status carried by this error, looking through [`DeeplError::Exhausted`].
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Exhausted { last, .. } => last.status(),
            _ => None,
        }
    }
}
