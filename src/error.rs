/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Missing or invalid operator input; no attempt was made.
    #[error("configuration error: {0}")]
    Config(String),
    /// Network or request execution error from `reqwest`.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// Non-success HTTP status whose body is not a JSON-RPC envelope.
    #[error("http error {status}: {body}")]
    Http { status: u16, body: String },
    /// Response body is not a well-formed, correlated JSON-RPC envelope.
    #[error("decode error: {0}")]
    Decode(String),
    /// The endpoint understood the call and rejected it.
    #[error("rpc error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code.
        code: i64,
        /// Error message text from the endpoint.
        message: String,
        /// Optional structured error detail.
        data: Option<serde_json::Value>,
    },
    /// Every permitted attempt failed.
    #[error("all {attempts} relay attempt(s) failed; last error: {last}")]
    Exhausted {
        attempts: usize,
        last: Box<RelayError>,
    },
    /// The run was cancelled between attempts.
    #[error("relay cancelled after {attempts} attempt(s)")]
    Cancelled {
        attempts: usize,
        last: Option<Box<RelayError>>,
    },
}

/// Coarse classification of a [`RelayError`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum FailureKind {
    Config,
    /// Connection, timeout, unreadable body or non-RPC HTTP status.
    Transport,
    /// Malformed or uncorrelated response envelope.
    Decode,
    /// Explicit rejection carrying an RPC error object.
    Application,
    Exhausted,
    Cancelled,
}

impl RelayError {
    /// Returns the failure class of this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Config(_) => FailureKind::Config,
            Self::Transport(_) | Self::Http { .. } => FailureKind::Transport,
            Self::Decode(_) => FailureKind::Decode,
            Self::Rpc { .. } => FailureKind::Application,
            Self::Exhausted { .. } => FailureKind::Exhausted,
            Self::Cancelled { .. } => FailureKind::Cancelled,
        }
    }

    /// Returns the error of the final failed attempt for terminal errors,
    /// or `self` for per-attempt errors.
    pub fn last_attempt_error(&self) -> Option<&RelayError> {
        match self {
            Self::Exhausted { last, .. } => Some(last.as_ref()),
            Self::Cancelled { last, .. } => last.as_deref(),
            other => Some(other),
        }
    }
}
