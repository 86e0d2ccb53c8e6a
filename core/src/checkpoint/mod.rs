/// Checkpoint Registry
///
/// Checkpoints pin block heights to known-good hashes. They are layered on top
/// of proof-of-work consensus and provide:
/// - Rejection of blocks that contradict a pinned height
/// - A bound on how deep an alternative chain may fork (reorg depth cap)
/// - An optional cumulative-difficulty pin per height
///
/// Three sources feed the registry, in decreasing order of trust:
/// compiled defaults, an operator-curated JSON file, and DNS TXT records.
pub mod defaults;
pub mod error;
pub mod loader;
pub mod merge;
pub mod registry;
pub mod store;

pub use error::{CheckpointError, CheckpointResult, MergeError, SourceKind};
pub use loader::{DohTxtResolver, SourceRecord, StaticTxtResolver, TxtResolver};
pub use merge::{MergeReport, RejectedRecord, merge_checkpoints};
pub use registry::CheckpointRegistry;
pub use store::{BlockCheck, Checkpoints};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// 32-byte block hash, written as 64 hex characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct BlockHash(pub [u8; 32]);

impl BlockHash {
    pub const LEN: usize = 32;

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for BlockHash {
    type Err = CheckpointError;

    /// Exactly 64 hex characters, no prefix, no whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != Self::LEN * 2 {
            return Err(CheckpointError::MalformedHash(s.to_string()));
        }
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|_| CheckpointError::MalformedHash(s.to_string()))?;
        Ok(BlockHash(bytes))
    }
}

impl From<[u8; 32]> for BlockHash {
    fn from(bytes: [u8; 32]) -> Self {
        BlockHash(bytes)
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockHash({})", self.to_hex())
    }
}

impl Serialize for BlockHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for BlockHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH: &str = "b922e51c7cccba7f7fd12b395b942a6092566c47879862b127405dc16c3b415a";

    #[test]
    fn test_hash_parse_and_display() {
        let h: BlockHash = HASH.parse().unwrap();
        assert_eq!(h.to_string(), HASH);
        assert_eq!(h.as_bytes()[0], 0xb9);
    }

    #[test]
    fn test_hash_rejects_bad_length_and_chars() {
        assert!(matches!(
            HASH[..63].parse::<BlockHash>(),
            Err(CheckpointError::MalformedHash(_))
        ));
        let with_prefix = format!("0x{}", &HASH[2..]);
        assert!(with_prefix.parse::<BlockHash>().is_err());
        let non_hex = format!("zz{}", &HASH[2..]);
        assert!(non_hex.parse::<BlockHash>().is_err());
        assert!("".parse::<BlockHash>().is_err());
    }

    #[test]
    fn test_hash_serde_as_hex_string() {
        let h: BlockHash = HASH.parse().unwrap();
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, format!("\"{}\"", HASH));
        let back: BlockHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
    }
}
