use core::fmt;

use crate::{CounterStore, ScriptHash};

/// One counter-store target: a store handle plus the hash of the increment
/// script already loaded into it.
///
/// Immutable once built. `address` is only used for logging and should not
/// carry credentials.
pub struct Endpoint<S> {
    address: String,
    store: S,
    script: ScriptHash,
}

impl<S> Endpoint<S>
where
    S: CounterStore,
{
    pub fn new(address: impl Into<String>, store: S, script: ScriptHash) -> Self {
        Self {
            address: address.into(),
            store,
            script,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn script(&self) -> &ScriptHash {
        &self.script
    }
}

impl<S> fmt::Debug for Endpoint<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("address", &self.address)
            .field("script", &self.script)
            .finish_non_exhaustive()
    }
}
