use core::fmt;
use std::sync::OnceLock;

use crate::{
    CounterStore, Result, SequenceGenerator,
    mutex::{self, Mutex},
};

/// Tag used by [`GeneratorFactory::next_order_id`] unless overridden.
pub const ORDER_TAG: &str = "";

/// Lazily builds one [`SequenceGenerator`] and hands out order IDs from it.
///
/// Prefer constructing the generator at startup and passing it to consumers.
/// The factory exists for code that must defer construction to first use:
///
/// - `init` runs at most once successfully; concurrent first callers wait on
///   a mutex instead of racing.
/// - If `init` fails, the error goes to the caller that triggered it and the
///   factory stays empty. The next call runs `init` again, once.
///
/// Share the factory by reference or `Arc`, or place it in a `static` via
/// `LazyLock` for a process-wide instance.
///
/// # Example
/// ```
/// use idforge::{Endpoint, GeneratorFactory, MemoryStore, SequenceGenerator};
///
/// let factory = GeneratorFactory::new(|| {
///     let store = MemoryStore::default();
///     let script = store.load_script("incr");
///     SequenceGenerator::new(vec![Endpoint::new("memory", store, script)])
/// });
///
/// assert_eq!(factory.next_order_id().unwrap(), 1);
/// assert_eq!(factory.next_order_id().unwrap(), 2);
/// ```
pub struct GeneratorFactory<S, F> {
    init: F,
    tag: String,
    generator: OnceLock<SequenceGenerator<S>>,
    init_lock: Mutex<()>,
}

impl<S, F> GeneratorFactory<S, F>
where
    S: CounterStore,
    F: Fn() -> Result<SequenceGenerator<S>>,
{
    pub fn new(init: F) -> Self {
        Self {
            init,
            tag: ORDER_TAG.to_owned(),
            generator: OnceLock::new(),
            init_lock: Mutex::new(()),
        }
    }

    /// Overrides the tag used by [`Self::next_order_id`].
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn is_initialized(&self) -> bool {
        self.generator.get().is_some()
    }

    /// Returns the generator, building it on first use.
    ///
    /// # Errors
    ///
    /// Returns whatever `init` returned if construction fails.
    pub fn generator(&self) -> Result<&SequenceGenerator<S>> {
        if let Some(generator) = self.generator.get() {
            return Ok(generator);
        }

        let _guard = mutex::lock(&self.init_lock)?;
        if let Some(generator) = self.generator.get() {
            return Ok(generator);
        }

        let generator = (self.init)().inspect_err(|_e| {
            #[cfg(feature = "tracing")]
            tracing::error!(error = %_e, "failed to build sequence generator");
        })?;

        #[cfg(feature = "tracing")]
        tracing::info!(
            endpoints = generator.len(),
            retry_times = generator.retry_times(),
            "sequence generator ready"
        );
        Ok(self.generator.get_or_init(|| generator))
    }

    /// Next ID for the factory's tag.
    ///
    /// # Errors
    ///
    /// Returns construction errors from the first use, or
    /// [`Error::GenerationExhausted`] from the generator.
    ///
    /// [`Error::GenerationExhausted`]: crate::Error::GenerationExhausted
    pub fn next_order_id(&self) -> Result<u64> {
        self.generator()?.next(&self.tag)
    }
}

impl<S, F> fmt::Debug for GeneratorFactory<S, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorFactory")
            .field("tag", &self.tag)
            .field("initialized", &self.generator.get().is_some())
            .finish_non_exhaustive()
    }
}
