use core::fmt;

use crate::{Error, Result};

/// A 64-bit Snowflake ID.
///
/// - 1 bit reserved (always 0, so the value fits a signed 64-bit integer)
/// - 41 bits timestamp (ms since the generator's epoch, ~69 years)
/// - 5 bits datacenter ID
/// - 5 bits worker ID
/// - 12 bits sequence
///
/// ```text
///  Bit Index:  63           63 62            22 21         17 16     12 11             0
///              +--------------+----------------+-------------+---------+---------------+
///  Field:      | reserved (1) | timestamp (41) | datacenter  | worker  | sequence (12) |
///              +--------------+----------------+-------------+---------+---------------+
///              |<----------- MSB ---------- 64 bits ----------- LSB ------------------>|
/// ```
///
/// # Example
///
/// ```
/// use idforge::SnowflakeId;
///
/// let id = SnowflakeId::from_components(1000, 3, 7, 1);
/// assert_eq!(id.timestamp(), 1000);
/// assert_eq!(id.datacenter_id(), 3);
/// assert_eq!(id.worker_id(), 7);
/// assert_eq!(id.sequence(), 1);
/// assert_eq!(SnowflakeId::from_raw(id.to_raw()), id);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct SnowflakeId {
    id: u64,
}

impl SnowflakeId {
    pub const SEQUENCE_BITS: u64 = 12;
    pub const WORKER_ID_BITS: u64 = 5;
    pub const DATACENTER_ID_BITS: u64 = 5;
    pub const TIMESTAMP_BITS: u64 = 41;

    pub const WORKER_ID_SHIFT: u64 = Self::SEQUENCE_BITS;
    pub const DATACENTER_ID_SHIFT: u64 = Self::WORKER_ID_SHIFT + Self::WORKER_ID_BITS;
    pub const TIMESTAMP_SHIFT: u64 = Self::DATACENTER_ID_SHIFT + Self::DATACENTER_ID_BITS;

    pub const MAX_SEQUENCE: u64 = (1 << Self::SEQUENCE_BITS) - 1;
    pub const MAX_WORKER_ID: u64 = (1 << Self::WORKER_ID_BITS) - 1;
    pub const MAX_DATACENTER_ID: u64 = (1 << Self::DATACENTER_ID_BITS) - 1;
    pub const MAX_TIMESTAMP: u64 = (1 << Self::TIMESTAMP_BITS) - 1;

    /// Packs the four fields into an ID. Each field is masked to its width, so
    /// an out-of-range timestamp wraps; generators range-check it first.
    pub const fn from_components(
        timestamp: u64,
        datacenter_id: u64,
        worker_id: u64,
        sequence: u64,
    ) -> Self {
        let t = (timestamp & Self::MAX_TIMESTAMP) << Self::TIMESTAMP_SHIFT;
        let d = (datacenter_id & Self::MAX_DATACENTER_ID) << Self::DATACENTER_ID_SHIFT;
        let w = (worker_id & Self::MAX_WORKER_ID) << Self::WORKER_ID_SHIFT;
        let s = sequence & Self::MAX_SEQUENCE;
        Self { id: t | d | w | s }
    }

    /// Wraps a raw value without validation. See [`Self::is_valid`].
    pub const fn from_raw(raw: u64) -> Self {
        Self { id: raw }
    }

    pub const fn to_raw(&self) -> u64 {
        self.id
    }

    /// Milliseconds since the generator's epoch.
    pub const fn timestamp(&self) -> u64 {
        (self.id >> Self::TIMESTAMP_SHIFT) & Self::MAX_TIMESTAMP
    }

    pub const fn datacenter_id(&self) -> u64 {
        (self.id >> Self::DATACENTER_ID_SHIFT) & Self::MAX_DATACENTER_ID
    }

    pub const fn worker_id(&self) -> u64 {
        (self.id >> Self::WORKER_ID_SHIFT) & Self::MAX_WORKER_ID
    }

    pub const fn sequence(&self) -> u64 {
        self.id & Self::MAX_SEQUENCE
    }

    /// Returns `true` when the reserved sign bit is clear.
    pub const fn is_valid(&self) -> bool {
        self.id >> 63 == 0
    }
}

impl fmt::Display for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl fmt::Debug for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnowflakeId")
            .field("id", &self.id)
            .field("timestamp", &self.timestamp())
            .field("datacenter_id", &self.datacenter_id())
            .field("worker_id", &self.worker_id())
            .field("sequence", &self.sequence())
            .finish()
    }
}

impl From<SnowflakeId> for u64 {
    fn from(id: SnowflakeId) -> Self {
        id.to_raw()
    }
}

/// The `(datacenter, worker)` pair that makes a generator's IDs distinct from
/// every other generator in the deployment.
///
/// Only the range of each field is checked here. Uniqueness across processes
/// is a provisioning concern outside this crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeIdentity {
    datacenter_id: u64,
    worker_id: u64,
}

impl NodeIdentity {
    /// Validates both fields against `[0, 31]`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if either value is out of range.
    pub fn new(datacenter_id: i64, worker_id: i64) -> Result<Self> {
        let datacenter_id = check_range(
            "datacenter id",
            datacenter_id,
            SnowflakeId::MAX_DATACENTER_ID,
        )?;
        let worker_id = check_range("worker id", worker_id, SnowflakeId::MAX_WORKER_ID)?;
        Ok(Self {
            datacenter_id,
            worker_id,
        })
    }

    pub const fn datacenter_id(&self) -> u64 {
        self.datacenter_id
    }

    pub const fn worker_id(&self) -> u64 {
        self.worker_id
    }
}

fn check_range(name: &str, value: i64, max: u64) -> Result<u64> {
    match u64::try_from(value) {
        Ok(v) if v <= max => Ok(v),
        _ => Err(Error::invalid_argument(format_args!(
            "{name} can't be greater than {max} or less than 0 (got {value})"
        ))),
    }
}
