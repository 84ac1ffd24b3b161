//! Content-fingerprint value types.

use serde::{Deserialize, Serialize};

/// A single entry in a snapshot's delta: either the file's new hash, or a
/// tombstone marking that the file was removed at this state.
///
/// Serializes as the hex digest string, or JSON `null` for a tombstone,
/// matching the wire shape expected by callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileHashDelta {
    /// The file's SHA-256 digest, as lowercase hex.
    Hash(String),
    /// The file was present in the previous full set and is absent now.
    Tombstone,
}

impl FileHashDelta {
    /// Returns the hex digest, if this is not a tombstone.
    pub fn as_hash(&self) -> Option<&str> {
        match self {
            Self::Hash(h) => Some(h),
            Self::Tombstone => None,
        }
    }

    /// Returns `true` if this entry marks a deletion.
    pub fn is_tombstone(&self) -> bool {
        matches!(self, Self::Tombstone)
    }
}

impl Serialize for FileHashDelta {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Self::Hash(h) => serializer.serialize_str(h),
            Self::Tombstone => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for FileHashDelta {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let opt: Option<String> = Option::deserialize(deserializer)?;
        Ok(match opt {
            Some(h) => Self::Hash(h),
            None => Self::Tombstone,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_round_trips_through_json() {
        let delta = FileHashDelta::Hash("deadbeef".to_string());
        let json = serde_json::to_string(&delta).unwrap();
        assert_eq!(json, "\"deadbeef\"");
        let back: FileHashDelta = serde_json::from_str(&json).unwrap();
        assert_eq!(back, delta);
    }

    #[test]
    fn tombstone_round_trips_as_null() {
        let delta = FileHashDelta::Tombstone;
        let json = serde_json::to_string(&delta).unwrap();
        assert_eq!(json, "null");
        let back: FileHashDelta = serde_json::from_str(&json).unwrap();
        assert!(back.is_tombstone());
    }
}
