#![doc = include_str!("../README.md")]

mod config;
mod stores;
mod telemetry;

use std::io::{BufWriter, Write};

use clap::Parser;
use config::{CliArgs, Config, Mode};
use idforge::{SnowflakeGenerator, SystemClock};
use stores::build_sequence_generator;
use telemetry::init_telemetry;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = Config::try_from(args)?;

    init_telemetry()?;
    log_startup_info(&config);

    let mut out = BufWriter::new(std::io::stdout().lock());
    match config.mode {
        Mode::Snowflake => {
            let generator = SnowflakeGenerator::with_identity(config.node, SystemClock::default());
            for _ in 0..config.count {
                writeln!(out, "{}", generator.next_id()?)?;
            }
        }
        Mode::Sequence => {
            let generator = build_sequence_generator(&config)?;
            for _ in 0..config.count {
                writeln!(out, "{}", generator.next(&config.tag)?)?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

fn log_startup_info(config: &Config) {
    match config.mode {
        Mode::Snowflake => tracing::info!(
            worker_id = config.node.worker_id(),
            datacenter_id = config.node.datacenter_id(),
            count = config.count,
            "Generating snowflake IDs"
        ),
        Mode::Sequence => tracing::info!(
            endpoints = config.endpoints.len(),
            retry_times = config.retry_times,
            tag = %config.tag,
            count = config.count,
            "Generating sequence IDs"
        ),
    }
}
