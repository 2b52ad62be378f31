use portable_atomic::{AtomicUsize, Ordering};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{CounterStore, Endpoint, Error, Result, ScopeKey, StoreError};

/// Number of attempts [`SequenceGenerator::next`] makes unless configured
/// otherwise.
pub const DEFAULT_RETRY_TIMES: usize = 5;

/// A store-backed ID generator that round-robins across a fixed pool of
/// counter stores.
///
/// Every attempt takes the next [`Endpoint`] from a shared cursor and asks its
/// store to atomically increment the counter for `(tag, year, day)`. A failed
/// attempt is logged and the next attempt goes to the next endpoint, so a dead
/// node is skipped without any health checking. The cursor moves on every
/// attempt, successful or not.
///
/// Values are unique within a scope as long as the stores hand out disjoint
/// values (see [`increment_script`]). There is no ordering guarantee across
/// calls.
///
/// [`increment_script`]: crate::increment_script
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use idforge::{Endpoint, MemoryStore, ScopeKey, SequenceGenerator};
///
/// let endpoints = (0..3)
///     .map(|i| {
///         let store = MemoryStore::new(i, 3);
///         let script = store.load_script("incr");
///         Endpoint::new(format!("node-{i}"), store, script)
///     })
///     .collect();
///
/// let generator = SequenceGenerator::new(endpoints).unwrap();
/// let scope = ScopeKey::new("orders", NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
/// assert_eq!(generator.next_in(&scope).unwrap(), 1);
/// assert_eq!(generator.next_in(&scope).unwrap(), 2);
/// assert_eq!(generator.next_in(&scope).unwrap(), 3);
/// assert_eq!(generator.next_in(&scope).unwrap(), 4);
///
/// // Today's scope is a different counter.
/// assert!(generator.next("orders").is_ok());
/// ```
#[derive(Debug)]
pub struct SequenceGenerator<S> {
    endpoints: Vec<Endpoint<S>>,
    next_endpoint: AtomicUsize,
    retry_times: usize,
}

impl<S> SequenceGenerator<S>
where
    S: CounterStore,
{
    /// Creates a generator over `endpoints` with [`DEFAULT_RETRY_TIMES`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `endpoints` is empty.
    pub fn new(endpoints: Vec<Endpoint<S>>) -> Result<Self> {
        Self::builder().endpoints(endpoints).build()
    }

    pub fn builder() -> SequenceGeneratorBuilder<S> {
        SequenceGeneratorBuilder::default()
    }

    /// Returns the index of the next endpoint (round-robin).
    ///
    /// Uses a relaxed atomic increment; a lost race only skews load, it can
    /// not produce duplicate values.
    fn next_endpoint_index(&self) -> usize {
        self.next_endpoint.fetch_add(1, Ordering::Relaxed) % self.endpoints.len()
    }

    /// Returns the next counter value for `tag` in today's scope.
    ///
    /// The local date is read again on every attempt, so a retry that crosses
    /// midnight lands in the new day's scope.
    ///
    /// Not idempotent: each success consumes one value of a remote counter. A
    /// call that fails locally after the store committed leaves a gap, never a
    /// duplicate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GenerationExhausted`] after `retry_times` failed
    /// attempts.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self)))]
    pub fn next(&self, tag: &str) -> Result<u64> {
        self.next_with(|| ScopeKey::today(tag))
    }

    /// Returns the next counter value for an explicit `scope`.
    ///
    /// Same retry behavior as [`Self::next`], for callers that pin the date
    /// themselves (backfills, tests).
    ///
    /// # Errors
    ///
    /// Returns [`Error::GenerationExhausted`] after `retry_times` failed
    /// attempts.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self)))]
    pub fn next_in(&self, scope: &ScopeKey) -> Result<u64> {
        self.next_with(|| scope.clone())
    }

    fn next_with(&self, scope_for_attempt: impl Fn() -> ScopeKey) -> Result<u64> {
        for _attempt in 1..=self.retry_times {
            let endpoint = &self.endpoints[self.next_endpoint_index()];
            match Self::try_endpoint(endpoint, &scope_for_attempt()) {
                Ok(id) => return Ok(id),
                Err(_e) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        endpoint = endpoint.address(),
                        attempt = _attempt,
                        error = %_e,
                        "generate id error"
                    );
                }
            }
        }

        #[cfg(feature = "tracing")]
        tracing::error!(attempts = self.retry_times, "can not generate id");
        Err(Error::GenerationExhausted {
            attempts: self.retry_times,
        })
    }

    fn try_endpoint(endpoint: &Endpoint<S>, scope: &ScopeKey) -> Result<u64, StoreError> {
        let reply = endpoint.store().eval_counter(endpoint.script(), scope)?;
        u64::try_from(reply).map_err(|_| StoreError::InvalidReply {
            reply: reply.to_string(),
        })
    }

    pub fn endpoints(&self) -> &[Endpoint<S>] {
        &self.endpoints
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Always `false`: construction rejects an empty pool.
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub const fn retry_times(&self) -> usize {
        self.retry_times
    }
}

/// Builder for [`SequenceGenerator`].
#[derive(Debug)]
pub struct SequenceGeneratorBuilder<S> {
    endpoints: Vec<Endpoint<S>>,
    retry_times: usize,
}

impl<S> Default for SequenceGeneratorBuilder<S> {
    fn default() -> Self {
        Self {
            endpoints: Vec::new(),
            retry_times: DEFAULT_RETRY_TIMES,
        }
    }
}

impl<S> SequenceGeneratorBuilder<S>
where
    S: CounterStore,
{
    /// Appends one endpoint. Order determines round-robin order.
    #[must_use]
    pub fn endpoint(mut self, endpoint: Endpoint<S>) -> Self {
        self.endpoints.push(endpoint);
        self
    }

    #[must_use]
    pub fn endpoints(mut self, endpoints: impl IntoIterator<Item = Endpoint<S>>) -> Self {
        self.endpoints.extend(endpoints);
        self
    }

    #[must_use]
    pub fn retry_times(mut self, retry_times: usize) -> Self {
        self.retry_times = retry_times;
        self
    }

    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if no endpoint was added or
    /// `retry_times` is zero.
    pub fn build(self) -> Result<SequenceGenerator<S>> {
        if self.endpoints.is_empty() {
            return Err(Error::invalid_argument("endpoint list must not be empty"));
        }
        if self.retry_times == 0 {
            return Err(Error::invalid_argument("retry times must be greater than 0"));
        }
        Ok(SequenceGenerator {
            endpoints: self.endpoints,
            next_endpoint: AtomicUsize::new(0),
            retry_times: self.retry_times,
        })
    }
}
