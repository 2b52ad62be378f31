use std::{
    collections::{HashMap, HashSet},
    hash::{DefaultHasher, Hash, Hasher},
    sync::Mutex,
};

use portable_atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::{CounterStore, ScopeKey, ScriptHash, StoreError};

/// An in-process [`CounterStore`].
///
/// Behaves like one node of a store cluster running the increment script: the
/// first increment of a key yields `node_index + 1` and later increments add
/// `node_count`, so `node_count` stores configured with distinct indexes never
/// hand out the same value for a key.
///
/// Useful for tests, benchmarks and single-process deployments. Failures can be
/// injected with [`Self::set_failing`].
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use idforge::{CounterStore, MemoryStore, ScopeKey};
///
/// let store = MemoryStore::new(1, 3);
/// let script = store.load_script("incr");
/// let scope = ScopeKey::new("orders", NaiveDate::from_ymd_opt(2026, 7, 1).unwrap());
/// assert_eq!(store.eval_counter(&script, &scope).unwrap(), 2);
/// assert_eq!(store.eval_counter(&script, &scope).unwrap(), 5);
/// ```
#[derive(Debug)]
pub struct MemoryStore {
    offset: i64,
    step: i64,
    counters: Mutex<HashMap<String, i64>>,
    scripts: Mutex<HashSet<ScriptHash>>,
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(0, 1)
    }
}

impl MemoryStore {
    /// Creates node `node_index` of a `node_count`-node group.
    ///
    /// # Panics
    ///
    /// Panics if `node_count` is zero or `node_index >= node_count`.
    pub fn new(node_index: u32, node_count: u32) -> Self {
        assert!(
            node_index < node_count,
            "node index {node_index} out of range for {node_count} nodes"
        );
        Self {
            offset: i64::from(node_index) + 1,
            step: i64::from(node_count),
            counters: Mutex::new(HashMap::new()),
            scripts: Mutex::new(HashSet::new()),
            calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        }
    }

    /// Registers a script and returns its hash. The source is not
    /// interpreted; any registered hash runs the increment.
    pub fn load_script(&self, source: &str) -> ScriptHash {
        let mut hasher = DefaultHasher::new();
        source.hash(&mut hasher);
        let hash = ScriptHash::new(format!("{:016x}", hasher.finish()));
        if let Ok(mut scripts) = self.scripts.lock() {
            scripts.insert(hash.clone());
        }
        hash
    }

    /// When `true`, every call fails with [`StoreError::Connection`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Release);
    }

    /// Number of `eval_counter` calls received, including failed ones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Acquire)
    }

    /// Current value stored under `key`, if any.
    pub fn counter(&self, key: &str) -> Option<i64> {
        self.counters.lock().ok()?.get(key).copied()
    }
}

impl CounterStore for MemoryStore {
    fn eval_counter(&self, script: &ScriptHash, scope: &ScopeKey) -> Result<i64, StoreError> {
        self.calls.fetch_add(1, Ordering::AcqRel);

        if self.failing.load(Ordering::Acquire) {
            return Err(StoreError::Connection {
                context: "memory store marked as failing".into(),
            });
        }

        let known = self
            .scripts
            .lock()
            .map_err(|_| poisoned())?
            .contains(script);
        if !known {
            return Err(StoreError::Script {
                context: format!("NOSCRIPT no matching script {script}"),
            });
        }

        let mut counters = self.counters.lock().map_err(|_| poisoned())?;
        let value = counters
            .entry(scope.counter_key())
            .and_modify(|v| *v += self.step)
            .or_insert(self.offset);
        Ok(*value)
    }
}

fn poisoned() -> StoreError {
    StoreError::Connection {
        context: "memory store lock poisoned".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn scope(tag: &str, day: u32) -> ScopeKey {
        ScopeKey::new(tag, NaiveDate::from_ymd_opt(2026, 1, day).unwrap())
    }

    #[test]
    fn nodes_hand_out_disjoint_values() {
        let nodes: Vec<_> = (0..3).map(|i| MemoryStore::new(i, 3)).collect();
        let scripts: Vec<_> = nodes.iter().map(|n| n.load_script("incr")).collect();

        let mut seen = HashSet::new();
        for _ in 0..10 {
            for (node, script) in nodes.iter().zip(&scripts) {
                let v = node.eval_counter(script, &scope("a", 1)).unwrap();
                assert!(seen.insert(v), "duplicate {v}");
            }
        }
        let mut all: Vec<_> = seen.into_iter().collect();
        all.sort_unstable();
        assert_eq!(all, (1..=30).collect::<Vec<_>>());
    }

    #[test]
    fn counters_are_scoped() {
        let store = MemoryStore::default();
        let script = store.load_script("incr");
        assert_eq!(store.eval_counter(&script, &scope("a", 1)).unwrap(), 1);
        assert_eq!(store.eval_counter(&script, &scope("a", 1)).unwrap(), 2);
        assert_eq!(store.eval_counter(&script, &scope("a", 2)).unwrap(), 1);
        assert_eq!(store.eval_counter(&script, &scope("b", 1)).unwrap(), 1);
        assert_eq!(store.counter(&scope("a", 1).counter_key()), Some(2));
    }

    #[test]
    fn unknown_script_and_injected_failures() {
        let store = MemoryStore::default();
        let bogus = ScriptHash::new("deadbeef");
        assert!(matches!(
            store.eval_counter(&bogus, &scope("a", 1)),
            Err(StoreError::Script { .. })
        ));

        let script = store.load_script("incr");
        store.set_failing(true);
        assert!(matches!(
            store.eval_counter(&script, &scope("a", 1)),
            Err(StoreError::Connection { .. })
        ));
        store.set_failing(false);
        assert_eq!(store.eval_counter(&script, &scope("a", 1)).unwrap(), 1);
        assert_eq!(store.calls(), 3);
    }
}
