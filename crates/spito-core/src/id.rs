use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// The public short identifier of a spit.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpitId(String);

impl SpitId {
    /// Wraps an ID without checking its format.
    ///
    /// Format checks depend on the alphabets in effect, see
    /// [`Storager::validate_id`](crate::Storager::validate_id).
    pub fn new_unchecked(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Generates the full public URL based on the provided base URL.
    pub fn to_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.0)
    }
}

impl Display for SpitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SpitId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The raw counter value(s) an ID was encoded from, one per counter shard.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawId(Vec<u64>);

impl RawId {
    pub fn single(value: u64) -> Self {
        Self(vec![value])
    }

    pub fn shards(values: Vec<u64>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[u64] {
        &self.0
    }
}

/// A freshly minted identifier together with the counters it came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MintedId {
    pub id: SpitId,
    pub raw: RawId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_url_handles_trailing_slash() {
        let id = SpitId::new_unchecked("aB3");
        assert_eq!(id.to_url("http://spi.to"), "http://spi.to/aB3");
        assert_eq!(id.to_url("http://spi.to/"), "http://spi.to/aB3");
    }

    #[test]
    fn ids_serialize_as_plain_values() {
        let id = SpitId::new_unchecked("xyz");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"xyz\"");
        assert_eq!(
            serde_json::to_string(&RawId::shards(vec![3, 0, 7])).unwrap(),
            "[3,0,7]"
        );
    }
}
