use crate::{Endpoints, RelayError, RelayOptions, Result};

/// Validated inputs of one relay run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelayConfig {
    pub endpoints: Endpoints,
    /// Raw transaction, passed through untouched.
    pub payload: String,
    pub options: RelayOptions,
}

impl RelayConfig {
    /// Builds a configuration from operator inputs.
    ///
    /// - `rpcs` — comma-separated endpoint list (required)
    /// - `raw_tx` — pre-signed transaction payload (required)
    /// - `attempts` — retry budget, defaults to 3, must be positive
    ///
    /// Returns [`RelayError::Config`] before any network activity if a
    /// required input is missing or blank.
    pub fn from_inputs(
        rpcs: Option<&str>,
        raw_tx: Option<&str>,
        attempts: Option<usize>,
    ) -> Result<Self> {
        let rpcs = rpcs
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| RelayError::Config("missing endpoint list (RPCS)".to_owned()))?;
        let payload = raw_tx
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| RelayError::Config("missing transaction payload (RAWTX)".to_owned()))?;

        let mut options = RelayOptions::default();
        if let Some(attempts) = attempts {
            if attempts == 0 {
                return Err(RelayError::Config(
                    "attempts must be a positive integer".to_owned(),
                ));
            }
            options.max_attempts = attempts;
        }

        Ok(Self {
            endpoints: Endpoints::parse_list(rpcs)?,
            payload: payload.to_owned(),
            options,
        })
    }

    /// Overrides the per-attempt timeout, which must be positive.
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Result<Self> {
        if timeout_ms == 0 {
            return Err(RelayError::Config(
                "timeout must be a positive number of milliseconds".to_owned(),
            ));
        }
        self.options.timeout_ms = timeout_ms;
        Ok(self)
    }

    /// Overrides the backoff unit.
    pub fn with_backoff_unit_ms(mut self, backoff_unit_ms: u64) -> Self {
        self.options.backoff_unit_ms = backoff_unit_ms;
        self
    }

    /// Overrides the JSON-RPC method.
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.options.method = method.into();
        self
    }
}
