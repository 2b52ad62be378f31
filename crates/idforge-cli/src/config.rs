use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, ValueEnum};
use idforge::{DEFAULT_RETRY_TIMES, NodeIdentity, ORDER_TAG};

/// Which generator to drive.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Local Snowflake IDs, no network.
    Snowflake,
    /// Redis-backed scoped sequence.
    Sequence,
}

/// Runtime configuration for the `idforge` binary.
///
/// All values are parsed from CLI arguments or environment variables (a `.env`
/// file is loaded first).
#[derive(Parser, Debug, Clone)]
#[command(
    name = "idforge",
    version,
    about = "Generate unique 64-bit IDs (Snowflake or Redis-backed sequence)"
)]
pub struct CliArgs {
    /// Generator to use.
    ///
    /// Environment variable: `IDFORGE_MODE`
    #[arg(long, env = "IDFORGE_MODE", value_enum, default_value_t = Mode::Snowflake)]
    pub mode: Mode,

    /// Snowflake worker ID, 0-31. Must be unique per datacenter across the
    /// deployment.
    ///
    /// Environment variable: `IDFORGE_WORKER_ID`
    #[arg(long, env = "IDFORGE_WORKER_ID", default_value_t = 0, allow_negative_numbers = true)]
    pub worker_id: i64,

    /// Snowflake datacenter ID, 0-31.
    ///
    /// Environment variable: `IDFORGE_DATACENTER_ID`
    #[arg(long, env = "IDFORGE_DATACENTER_ID", default_value_t = 0, allow_negative_numbers = true)]
    pub datacenter_id: i64,

    /// Redis endpoints for `sequence` mode, e.g. `redis://:pass@host:6379/`.
    /// Order sets the round-robin order and each node's script offset.
    ///
    /// Environment variable: `REDIS_ENDPOINTS` (comma separated)
    #[arg(long = "endpoint", env = "REDIS_ENDPOINTS", value_delimiter = ',')]
    pub endpoints: Vec<String>,

    /// Lua scripts replacing the built-in one, one per endpoint in endpoint
    /// order. Each node's script must hand out values no other node's script
    /// can return for the same key.
    ///
    /// Environment variable: `IDFORGE_SCRIPTS` (comma separated)
    #[arg(long = "script", env = "IDFORGE_SCRIPTS", value_delimiter = ',')]
    pub scripts: Vec<PathBuf>,

    /// Attempts per ID before giving up.
    ///
    /// Environment variable: `IDFORGE_RETRY_TIMES`
    #[arg(long, env = "IDFORGE_RETRY_TIMES", default_value_t = DEFAULT_RETRY_TIMES)]
    pub retry_times: usize,

    /// Connect/read/write timeout per store call, in milliseconds.
    ///
    /// Environment variable: `IDFORGE_TIMEOUT_MS`
    #[arg(long, env = "IDFORGE_TIMEOUT_MS", default_value_t = 1000)]
    pub timeout_ms: u64,

    /// Sequence tag (counter namespace).
    ///
    /// Environment variable: `IDFORGE_TAG`
    #[arg(long, env = "IDFORGE_TAG", default_value_t = String::from(ORDER_TAG))]
    pub tag: String,

    /// Number of IDs to print.
    ///
    /// Environment variable: `IDFORGE_COUNT`
    #[arg(short = 'n', long, env = "IDFORGE_COUNT", default_value_t = 1)]
    pub count: usize,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub mode: Mode,
    pub node: NodeIdentity,
    pub endpoints: Vec<String>,
    /// Custom script sources, empty or one per endpoint.
    pub scripts: Vec<String>,
    pub retry_times: usize,
    pub timeout: Duration,
    pub tag: String,
    pub count: usize,
}

impl TryFrom<CliArgs> for Config {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.count == 0 {
            bail!("IDFORGE_COUNT must be greater than 0");
        }

        if args.retry_times == 0 {
            bail!("IDFORGE_RETRY_TIMES must be greater than 0");
        }

        if args.timeout_ms == 0 {
            bail!("IDFORGE_TIMEOUT_MS must be greater than 0");
        }

        let node = NodeIdentity::new(args.datacenter_id, args.worker_id)
            .context("invalid snowflake node identity")?;

        let endpoints: Vec<String> = args
            .endpoints
            .into_iter()
            .map(|e| e.trim().to_owned())
            .filter(|e| !e.is_empty())
            .collect();

        if args.mode == Mode::Sequence && endpoints.is_empty() {
            bail!("sequence mode requires at least one endpoint (REDIS_ENDPOINTS)");
        }

        if !args.scripts.is_empty() && args.scripts.len() != endpoints.len() {
            bail!(
                "IDFORGE_SCRIPTS needs one script per endpoint ({} scripts, {} endpoints)",
                args.scripts.len(),
                endpoints.len()
            );
        }

        let scripts = args
            .scripts
            .iter()
            .map(|path| {
                std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read script {}", path.display()))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Self {
            mode: args.mode,
            node,
            endpoints,
            scripts,
            retry_times: args.retry_times,
            timeout: Duration::from_millis(args.timeout_ms),
            tag: args.tag,
            count: args.count,
        })
    }
}
