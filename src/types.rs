use std::fmt;
use std::time::Duration;

use crate::FailureKind;

/// Successful relay outcome.
#[derive(Clone, Debug, PartialEq)]
pub struct RelayReceipt {
    /// Endpoint that accepted the submission.
    pub endpoint: String,
    /// Number of attempts used, including the successful one.
    pub attempts: usize,
    /// `result` member of the accepting response, usually the tx hash.
    pub result: serde_json::Value,
}

/// Lifecycle of a single relay run.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RelayState {
    Pending,
    Attempting { attempt: usize },
    Succeeded { attempts: usize },
    Exhausted { attempts: usize },
    Cancelled { attempts: usize },
}

impl RelayState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::Attempting { .. })
    }

    /// Attempts started so far, including one in flight.
    pub fn attempts(&self) -> usize {
        match *self {
            Self::Pending => 0,
            Self::Attempting { attempt } => attempt,
            Self::Succeeded { attempts }
            | Self::Exhausted { attempts }
            | Self::Cancelled { attempts } => attempts,
        }
    }
}

/// Record of one failed attempt; logged, then dropped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attempt<'a> {
    /// 1-based attempt index.
    pub index: usize,
    pub budget: usize,
    pub endpoint: &'a str,
    pub failure: FailureKind,
    /// Delay before the next attempt; zero after the last one.
    pub backoff: Duration,
}

impl fmt::Display for Attempt<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "attempt {}/{} via {} failed ({:?}), next in {:?}",
            self.index, self.budget, self.endpoint, self.failure, self.backoff
        )
    }
}
