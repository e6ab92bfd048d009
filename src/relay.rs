use std::fmt;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::{
    backoff::{linear_backoff, Sleeper, TokioSleeper},
    endpoints::{EndpointSelector, Endpoints, RandomSelector},
    transport::{HttpTransport, Transport},
    Attempt, RelayError, RelayOptions, RelayReceipt, RelayState, Result,
};

/// Relays one payload to randomly chosen endpoints until one accepts it or
/// the attempt budget runs out.
///
/// Attempts are strictly sequential. Every transport failure is retried,
/// whatever its kind; only the last one is surfaced, wrapped in
/// [`RelayError::Exhausted`].
pub struct Relay<T = HttpTransport, S = RandomSelector, Z = TokioSleeper> {
    transport: T,
    selector: S,
    sleeper: Z,
    endpoints: Endpoints,
    options: RelayOptions,
    cancel: Option<CancellationToken>,
}

impl<T, S, Z> fmt::Debug for Relay<T, S, Z> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relay")
            .field("endpoints", &self.endpoints)
            .field("options", &self.options)
            .field("cancellable", &self.cancel.is_some())
            .finish()
    }
}

impl Relay {
    /// Creates a relay over HTTP with random endpoint selection and
    /// tokio-based backoff.
    pub fn new(endpoints: Endpoints) -> Self {
        Self {
            transport: HttpTransport::new(),
            selector: RandomSelector,
            sleeper: TokioSleeper,
            endpoints,
            options: RelayOptions::default(),
            cancel: None,
        }
    }
}

impl<T, S, Z> Relay<T, S, Z> {
    /// Applies timeout, budget and backoff options.
    pub fn with_options(mut self, opts: RelayOptions) -> Self {
        self.options = opts;
        self
    }

    /// Replaces the transport.
    pub fn with_transport<T2>(self, transport: T2) -> Relay<T2, S, Z> {
        Relay {
            transport,
            selector: self.selector,
            sleeper: self.sleeper,
            endpoints: self.endpoints,
            options: self.options,
            cancel: self.cancel,
        }
    }

    /// Replaces the endpoint selector.
    pub fn with_selector<S2>(self, selector: S2) -> Relay<T, S2, Z> {
        Relay {
            transport: self.transport,
            selector,
            sleeper: self.sleeper,
            endpoints: self.endpoints,
            options: self.options,
            cancel: self.cancel,
        }
    }

    /// Replaces the sleeper used for backoff.
    pub fn with_sleeper<Z2>(self, sleeper: Z2) -> Relay<T, S, Z2> {
        Relay {
            transport: self.transport,
            selector: self.selector,
            sleeper,
            endpoints: self.endpoints,
            options: self.options,
            cancel: self.cancel,
        }
    }

    /// Stops the run between attempts once `token` is cancelled.
    ///
    /// An attempt already in flight is never interrupted; a pending backoff
    /// is cut short.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn options(&self) -> &RelayOptions {
        &self.options
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}

impl<T, S, Z> Relay<T, S, Z>
where
    T: Transport,
    S: EndpointSelector,
    Z: Sleeper,
{
    /// Submits `payload` until an endpoint accepts it.
    ///
    /// The payload is passed to the transport unchanged on every attempt.
    pub async fn relay(&self, payload: &str) -> Result<RelayReceipt> {
        self.options.validate()?;
        let budget = self.options.max_attempts;

        let timeout = Duration::from_millis(self.options.timeout_ms);
        let unit = Duration::from_millis(self.options.backoff_unit_ms);
        let mut state = RelayState::Pending;
        log_state(state);
        let mut last_error: Option<RelayError> = None;

        while !state.is_terminal() {
            if self.is_cancelled() {
                state = RelayState::Cancelled {
                    attempts: state.attempts(),
                };
                log_state(state);
                return Err(RelayError::Cancelled {
                    attempts: state.attempts(),
                    last: last_error.map(Box::new),
                });
            }

            let attempt = state.attempts() + 1;
            state = RelayState::Attempting { attempt };
            log_state(state);
            let endpoint = self.pick_endpoint();
            log_attempt_started(attempt, budget, endpoint);

            match self
                .transport
                .submit(endpoint, &self.options.method, payload, timeout)
                .await
            {
                Ok(result) => {
                    log_state(RelayState::Succeeded { attempts: attempt });
                    return Ok(RelayReceipt {
                        endpoint: endpoint.to_owned(),
                        attempts: attempt,
                        result,
                    });
                }
                Err(err) => {
                    let backoff = if attempt < budget {
                        linear_backoff(attempt, unit)
                    } else {
                        state = RelayState::Exhausted { attempts: attempt };
                        Duration::ZERO
                    };
                    log_attempt_failed(
                        &Attempt {
                            index: attempt,
                            budget,
                            endpoint,
                            failure: err.kind(),
                            backoff,
                        },
                        &err,
                    );
                    last_error = Some(err);

                    if !backoff.is_zero() {
                        self.wait(backoff).await;
                    }
                }
            }
        }

        log_state(state);
        match last_error {
            Some(last) => Err(RelayError::Exhausted {
                attempts: state.attempts(),
                last: Box::new(last),
            }),
            None => Err(RelayError::Config("no relay attempt was made".to_owned())),
        }
    }

    fn pick_endpoint(&self) -> &str {
        let len = self.endpoints.len();
        // Out-of-range picks from a custom selector wrap around.
        let index = self.selector.pick(len) % len;
        self.endpoints.get(index).unwrap_or_default()
    }

    async fn wait(&self, delay: Duration) {
        match &self.cancel {
            Some(token) => {
                tokio::select! {
                    _ = self.sleeper.sleep(delay) => {}
                    _ = token.cancelled() => {}
                }
            }
            None => self.sleeper.sleep(delay).await,
        }
    }
}

fn log_attempt_started(attempt: usize, budget: usize, endpoint: &str) {
    #[cfg(feature = "tracing")]
    tracing::info!(attempt, budget, endpoint, "attempt {attempt}/{budget} -> {endpoint}");

    #[cfg(not(feature = "tracing"))]
    let _ = (attempt, budget, endpoint);
}

fn log_attempt_failed(attempt: &Attempt<'_>, err: &RelayError) {
    #[cfg(feature = "tracing")]
    tracing::warn!(
        attempt = attempt.index,
        endpoint = attempt.endpoint,
        kind = ?attempt.failure,
        backoff_ms = attempt.backoff.as_millis() as u64,
        error = %err,
        "{attempt}"
    );

    #[cfg(not(feature = "tracing"))]
    let _ = (attempt, err);
}

fn log_state(state: RelayState) {
    #[cfg(feature = "tracing")]
    match state {
        RelayState::Succeeded { attempts } => {
            tracing::info!(attempts, "relay succeeded");
        }
        RelayState::Exhausted { attempts } => {
            tracing::error!(attempts, "relay attempts exhausted");
        }
        RelayState::Cancelled { attempts } => {
            tracing::warn!(attempts, "relay cancelled");
        }
        RelayState::Pending | RelayState::Attempting { .. } => {
            tracing::debug!(?state, "relay state");
        }
    }

    #[cfg(not(feature = "tracing"))]
    let _ = state;
}
