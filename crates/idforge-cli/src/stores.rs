//! Builds the Redis-backed [`SequenceGenerator`] from configuration.
//!
//! Scripts are loaded into every endpoint before the generator exists, so a
//! node that is down at startup aborts the process instead of silently
//! shrinking the pool. Node `i` gets the `i`-th custom script, or the built-in
//! increment script rendered for its index.

use anyhow::Context;
use idforge::{Endpoint, RedisStore, SequenceGenerator, increment_script};

use crate::config::Config;

pub fn build_sequence_generator(config: &Config) -> anyhow::Result<SequenceGenerator<RedisStore>> {
    let node_count = u32::try_from(config.endpoints.len()).context("too many endpoints")?;
    let mut builder = SequenceGenerator::builder().retry_times(config.retry_times);

    for (node_index, url) in (0..node_count).zip(&config.endpoints) {
        let store = RedisStore::open(url, config.timeout)
            .with_context(|| format!("invalid endpoint #{}", node_index + 1))?;
        let address = store.address();

        let source = match config.scripts.get(node_index as usize) {
            Some(source) => source.clone(),
            None => increment_script(node_index, node_count),
        };
        let script = store
            .load_script(&source)
            .with_context(|| format!("failed to load script into {address}"))?;

        tracing::info!(%address, %script, node_index, "script loaded");
        builder = builder.endpoint(Endpoint::new(address, store, script));
    }

    Ok(builder.build()?)
}
