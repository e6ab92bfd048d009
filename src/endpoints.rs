use std::sync::Mutex;

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{RelayError, Result};

/// Non-empty, immutable list of relay endpoints.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints(Vec<String>);

impl Endpoints {
    /// Builds an endpoint list, validating every entry as an absolute
    /// `http`/`https` URL.
    pub fn new<I, S>(urls: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let urls: Vec<String> = urls.into_iter().map(Into::into).collect();
        if urls.is_empty() {
            return Err(RelayError::Config("endpoint list is empty".to_owned()));
        }
        for raw in &urls {
            validate_endpoint(raw)?;
        }
        Ok(Self(urls))
    }

    /// Parses a comma-separated endpoint list.
    ///
    /// Entries are whitespace-trimmed and empty entries are dropped, so
    /// `" http://a , ,http://b,"` yields two endpoints.
    pub fn parse_list(list: &str) -> Result<Self> {
        Self::new(
            list.split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty()),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }
}

fn validate_endpoint(raw: &str) -> Result<()> {
    let parsed = url::Url::parse(raw)
        .map_err(|err| RelayError::Config(format!("invalid endpoint '{raw}': {err}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(RelayError::Config(format!(
            "unsupported scheme '{other}' in endpoint '{raw}'"
        ))),
    }
}

/// Source of per-attempt endpoint choices.
///
/// `pick(len)` must return an index in `0..len`; `len` is never zero.
pub trait EndpointSelector: Send + Sync {
    fn pick(&self, len: usize) -> usize;
}

impl<E: EndpointSelector + ?Sized> EndpointSelector for Box<E> {
    fn pick(&self, len: usize) -> usize {
        (**self).pick(len)
    }
}

/// Uniform choice from the thread-local RNG.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomSelector;

impl EndpointSelector for RandomSelector {
    fn pick(&self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }
}

/// Uniform choice from a seeded RNG, for reproducible runs.
#[derive(Debug)]
pub struct SeededSelector {
    rng: Mutex<StdRng>,
}

impl SeededSelector {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl EndpointSelector for SeededSelector {
    fn pick(&self, len: usize) -> usize {
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        rng.gen_range(0..len)
    }
}
