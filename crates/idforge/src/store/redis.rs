use core::{fmt, time::Duration};
use std::sync::Mutex;

use redis::{Client, Connection, ErrorKind, RedisError};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{CounterStore, ScopeKey, ScriptHash, StoreError};

/// Connect, read and write timeout used when none is given.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_millis(1000);

/// Idle connections kept per store. Concurrent callers beyond this open extra
/// connections that are closed after use.
pub const MAX_IDLE_CONNECTIONS: usize = 8;

/// Lifetime of a scoped counter key. Keys are per day, so two days covers the
/// day boundary plus clock drift between application hosts.
pub const COUNTER_TTL_SECS: u64 = 2 * 24 * 60 * 60;

/// Renders the increment script for node `node_index` of `node_count`.
///
/// The script increments the key `KEYS[1] .. KEYS[2] .. KEYS[3]`. The first
/// call for a key seeds `node_index + 1` and sets a TTL; later calls add
/// `node_count`. Nodes with distinct indexes therefore produce disjoint
/// values for the same scope.
///
/// # Example
/// ```
/// let script = idforge::increment_script(0, 3);
/// assert!(script.contains("INCRBY"));
/// ```
pub fn increment_script(node_index: u32, node_count: u32) -> String {
    let offset = u64::from(node_index) + 1;
    format!(
        "local key = KEYS[1] .. KEYS[2] .. KEYS[3]\n\
         if redis.call('SET', key, {offset}, 'NX', 'EX', {COUNTER_TTL_SECS}) then\n\
         \x20 return {offset}\n\
         end\n\
         return redis.call('INCRBY', key, {node_count})\n"
    )
}

/// A [`CounterStore`] backed by a single Redis server.
///
/// Connections are pooled: a call takes an idle connection (or opens one,
/// bounded by the configured timeout), and returns it after a successful round
/// trip. A connection that saw any error is dropped, so the next call
/// reconnects. A timeout counts as a failed attempt like any other error.
pub struct RedisStore {
    client: Client,
    timeout: Duration,
    idle: Mutex<Vec<Connection>>,
}

impl RedisStore {
    /// Opens a client for `url` (e.g. `redis://:secret@10.0.0.1:6379/`).
    ///
    /// No connection is made until the first call.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Connection`] if the URL can not be parsed.
    pub fn open(url: &str, timeout: Duration) -> Result<Self, StoreError> {
        let client = Client::open(url).map_err(|e| StoreError::Connection {
            context: e.to_string(),
        })?;
        Ok(Self {
            client,
            timeout,
            idle: Mutex::new(Vec::new()),
        })
    }

    /// The server address without credentials, for logging.
    pub fn address(&self) -> String {
        self.client.get_connection_info().addr.to_string()
    }

    /// Number of pooled connections waiting for the next call.
    pub fn idle_connections(&self) -> usize {
        self.idle.lock().map_or(0, |idle| idle.len())
    }

    /// Loads `source` with `SCRIPT LOAD` and returns its hash.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the server is unreachable or rejects the
    /// script.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self, source)))]
    pub fn load_script(&self, source: &str) -> Result<ScriptHash, StoreError> {
        let hash: String =
            self.with_connection(|conn| redis::cmd("SCRIPT").arg("LOAD").arg(source).query(conn))?;
        Ok(ScriptHash::new(hash))
    }

    /// Runs `f` on a pooled connection. The connection goes back to the pool
    /// only if `f` succeeded.
    fn with_connection<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> redis::RedisResult<T>,
    ) -> Result<T, StoreError> {
        let mut conn = match self.checkout()? {
            Some(conn) => conn,
            None => self.connect()?,
        };
        let value = f(&mut conn).map_err(map_redis_error)?;
        self.checkin(conn)?;
        Ok(value)
    }

    fn checkout(&self) -> Result<Option<Connection>, StoreError> {
        Ok(self.idle.lock().map_err(|_| poisoned())?.pop())
    }

    fn checkin(&self, conn: Connection) -> Result<(), StoreError> {
        let mut idle = self.idle.lock().map_err(|_| poisoned())?;
        if idle.len() < MAX_IDLE_CONNECTIONS {
            idle.push(conn);
        }
        Ok(())
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        let conn = self
            .client
            .get_connection_with_timeout(self.timeout)
            .map_err(map_redis_error)?;
        conn.set_read_timeout(Some(self.timeout))
            .map_err(map_redis_error)?;
        conn.set_write_timeout(Some(self.timeout))
            .map_err(map_redis_error)?;
        Ok(conn)
    }
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("address", &self.address())
            .field("timeout", &self.timeout)
            .field("idle", &self.idle_connections())
            .finish()
    }
}

impl CounterStore for RedisStore {
    fn eval_counter(&self, script: &ScriptHash, scope: &ScopeKey) -> Result<i64, StoreError> {
        let [tag, year, day] = scope.args();
        self.with_connection(|conn| {
            redis::cmd("EVALSHA")
                .arg(script.as_str())
                .arg(3)
                .arg(tag)
                .arg(year)
                .arg(day)
                .query(conn)
        })
    }
}

fn poisoned() -> StoreError {
    StoreError::Connection {
        context: "redis connection pool lock poisoned".into(),
    }
}

fn map_redis_error(err: RedisError) -> StoreError {
    if err.is_timeout() {
        StoreError::Timeout
    } else if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
        StoreError::Connection {
            context: err.to_string(),
        }
    } else if err.kind() == ErrorKind::TypeError {
        StoreError::InvalidReply {
            reply: err.to_string(),
        }
    } else {
        StoreError::Script {
            context: err.to_string(),
        }
    }
}
