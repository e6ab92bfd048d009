//! `relaynet` relays a pre-signed transaction to one of several redundant
//! JSON-RPC endpoints.
//!
//! Each attempt picks an endpoint uniformly at random from the full list,
//! submits the payload once, and on any failure waits a linearly growing
//! backoff before trying again, until an endpoint accepts the payload or the
//! attempt budget runs out:
//! - [`Relay::relay`]
//! - [`Transport::submit`]
//! - [`linear_backoff`]

mod backoff;
mod config;
mod decode;
mod endpoints;
mod error;
mod options;
mod relay;
mod transport;
mod types;
mod wire;

pub use backoff::{linear_backoff, Sleeper, TokioSleeper};
pub use config::RelayConfig;
pub use endpoints::{EndpointSelector, Endpoints, RandomSelector, SeededSelector};
pub use error::{FailureKind, RelayError};
pub use options::{RelayOptions, DEFAULT_METHOD};
pub use relay::Relay;
pub use transport::{HttpTransport, Transport};
pub use types::{Attempt, RelayReceipt, RelayState};

pub use tokio_util::sync::CancellationToken;

pub type Result<T> = std::result::Result<T, RelayError>;
