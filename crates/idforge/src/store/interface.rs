use core::fmt;

use crate::ScopeKey;

/// Content-hash reference to a script preloaded into a counter store.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScriptHash(String);

impl ScriptHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScriptHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single failed call to a counter store.
///
/// These never reach callers of [`SequenceGenerator::next`]; the retry loop
/// logs them and moves on to the next endpoint.
///
/// [`SequenceGenerator::next`]: crate::SequenceGenerator::next
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum StoreError {
    /// The store could not be reached or the connection dropped.
    #[error("connection error: {context}")]
    Connection { context: String },

    /// The store did not answer within the configured timeout.
    #[error("store call timed out")]
    Timeout,

    /// The store rejected or failed to run the script.
    #[error("script error: {context}")]
    Script { context: String },

    /// The script answered with something that is not a valid counter.
    #[error("invalid reply: {reply}")]
    InvalidReply { reply: String },
}

/// The narrow capability the sequence generator needs from a counter store:
/// run a preloaded increment script against a [`ScopeKey`] and return the new
/// counter value.
///
/// Implementations are shared by all callers of one generator, so they must be
/// callable concurrently. Connection teardown happens on `Drop`.
///
/// # Example
///
/// ```
/// use idforge::{CounterStore, ScopeKey, ScriptHash, StoreError};
///
/// struct Constant;
/// impl CounterStore for Constant {
///     fn eval_counter(&self, _: &ScriptHash, _: &ScopeKey) -> Result<i64, StoreError> {
///         Ok(7)
///     }
/// }
/// ```
pub trait CounterStore: Send + Sync {
    /// Runs the script referenced by `script` with `scope.args()` and returns
    /// the counter it produced.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on any communication, timeout or script
    /// failure.
    fn eval_counter(&self, script: &ScriptHash, scope: &ScopeKey) -> Result<i64, StoreError>;
}

impl<S> CounterStore for std::sync::Arc<S>
where
    S: CounterStore + ?Sized,
{
    fn eval_counter(&self, script: &ScriptHash, scope: &ScopeKey) -> Result<i64, StoreError> {
        (**self).eval_counter(script, scope)
    }
}

impl<S> CounterStore for Box<S>
where
    S: CounterStore + ?Sized,
{
    fn eval_counter(&self, script: &ScriptHash, scope: &ScopeKey) -> Result<i64, StoreError> {
        (**self).eval_counter(script, scope)
    }
}
