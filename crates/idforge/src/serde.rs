/// Serialize a [`SnowflakeId`] as its native integer representation.
///
/// Use with `#[serde(with = "idforge::as_native_snow")]`.
///
/// [`SnowflakeId`]: crate::SnowflakeId
pub mod as_native_snow {
    use ::serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::SnowflakeId;

    /// Serialize a snowflake ID as its native integer representation.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying serializer fails.
    pub fn serialize<S>(id: &SnowflakeId, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        id.to_raw().serialize(s)
    }

    /// Deserialize a snowflake ID from its native integer representation.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The underlying deserializer fails
    /// - The value has the reserved sign bit set
    pub fn deserialize<'de, D>(d: D) -> Result<SnowflakeId, D::Error>
    where
        D: Deserializer<'de>,
    {
        let n = u64::deserialize(d)?;
        let id = SnowflakeId::from_raw(n);
        if !id.is_valid() {
            return Err(::serde::de::Error::custom(format_args!(
                "snowflake id {n} has the reserved bit set"
            )));
        }
        Ok(id)
    }
}
