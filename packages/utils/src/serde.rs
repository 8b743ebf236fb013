//! Custom serde representations used by the wire and config types.

/// Serialize a number as a decimal string.
///
/// Used for 256-bit token amounts, which JSON numbers cannot carry losslessly.
pub mod number_as_string {
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize `number` with its `Display` implementation.
    /// # Errors
    /// Returns an error if the serializer rejects the string.
    pub fn serialize<T, S>(number: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: ToString,
        S: Serializer,
    {
        serializer.serialize_str(&number.to_string())
    }

    /// Deserialize a number from a string with its `FromStr` implementation.
    /// # Errors
    /// Returns an error if the value is not a string or does not parse.
    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Serialize a byte vector as a lowercase hex string without a `0x` prefix.
pub mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize `bytes` as hex.
    /// # Errors
    /// Returns an error if the serializer rejects the string.
    pub fn serialize<S>(bytes: impl AsRef<[u8]>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    /// Deserialize hex, with or without a `0x` prefix.
    /// # Errors
    /// Returns an error if the string is not valid hex.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom)
    }
}

/// Serialize a list of byte vectors as a list of hex strings.
pub mod hex_bytes_vec {
    use serde::{ser::SerializeSeq, Deserialize, Deserializer, Serializer};

    /// Serialize every element as hex.
    /// # Errors
    /// Returns an error if the serializer fails.
    pub fn serialize<S>(items: &[Vec<u8>], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(items.len()))?;
        for item in items {
            seq.serialize_element(&hex::encode(item))?;
        }
        seq.end()
    }

    /// Deserialize a list of hex strings.
    /// # Errors
    /// Returns an error if any element is not valid hex.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Vec::<String>::deserialize(deserializer)?
            .into_iter()
            .map(|s| hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom))
            .collect()
    }
}
