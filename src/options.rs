use crate::{RelayError, Result};

/// Configures request timeout, retry budget and backoff.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RelayOptions {
    /// Per-attempt request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum number of attempts, including the first one.
    pub max_attempts: usize,
    /// Backoff unit in milliseconds (linear strategy).
    pub backoff_unit_ms: u64,
    /// JSON-RPC method used to submit the payload.
    pub method: String,
}

/// Default JSON-RPC method for raw transaction submission.
pub const DEFAULT_METHOD: &str = "eth_sendRawTransaction";

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 8_000,
            max_attempts: 3,
            backoff_unit_ms: 1_000,
            method: DEFAULT_METHOD.to_owned(),
        }
    }
}

impl RelayOptions {
    /// Rejects a zero attempt budget or a zero per-attempt timeout.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(RelayError::Config(
                "max_attempts must be at least 1".to_owned(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(RelayError::Config(
                "timeout_ms must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }
}
