//! Serde adapters for identifier wire formats.
//!
//! Identifiers cross the wire either as a native unsigned 64-bit integer or,
//! for text-based protocols without native u64 support (JSON consumers in
//! JavaScript, for instance), as a decimal string. Both adapters reject
//! values with the reserved bit set on the way in.

/// Serialize an identifier as its native integer representation.
pub mod as_u64 {
    use crate::SnowflakeId;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// # Errors
    ///
    /// Returns an error if the underlying serializer fails.
    pub fn serialize<S>(id: &SnowflakeId, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        id.to_raw().serialize(s)
    }

    /// # Errors
    ///
    /// Returns an error if the underlying deserializer fails or the value has
    /// the reserved bit set.
    pub fn deserialize<'de, D>(d: D) -> Result<SnowflakeId, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = u64::deserialize(d)?;
        let id = SnowflakeId::from_raw(raw);
        if !id.is_valid() {
            return Err(serde::de::Error::custom(format!(
                "identifier {raw} has the reserved bit set"
            )));
        }
        Ok(id)
    }
}

/// Serialize an identifier as a decimal string.
pub mod as_decimal_str {
    use crate::SnowflakeId;
    use serde::{Deserializer, Serializer};

    /// # Errors
    ///
    /// Returns an error if the underlying serializer fails.
    pub fn serialize<S>(id: &SnowflakeId, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.collect_str(id)
    }

    /// # Errors
    ///
    /// Returns an error if the underlying deserializer fails, the string is
    /// not a decimal u64, or the value has the reserved bit set.
    pub fn deserialize<'de, D>(d: D) -> Result<SnowflakeId, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DecimalVisitor;

        impl serde::de::Visitor<'_> for DecimalVisitor {
            type Value = SnowflakeId;

            fn expecting(&self, formatter: &mut core::fmt::Formatter) -> core::fmt::Result {
                formatter.write_str("a decimal string encoding an unsigned 64-bit identifier")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                let raw: u64 = v
                    .parse()
                    .map_err(|_| E::custom(format!("not a decimal u64: {v:?}")))?;
                let id = SnowflakeId::from_raw(raw);
                if !id.is_valid() {
                    return Err(E::custom(format!(
                        "identifier {raw} has the reserved bit set"
                    )));
                }
                Ok(id)
            }
        }

        d.deserialize_str(DecimalVisitor)
    }
}
