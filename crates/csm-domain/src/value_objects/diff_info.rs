//! Typed representation of the `git_diff_info` payload stored on a snapshot.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Structured diff summary attached to a transition's snapshot.
///
/// Persisted as an opaque JSON string (`git_diff_info` on the state row); this
/// type is the in-memory, typed counterpart, converted at the storage
/// boundary via [`GitDiffInfo::to_json_string`] / [`GitDiffInfo::from_json_str`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GitDiffInfo {
    /// Paths new at this state.
    pub added: Vec<String>,
    /// Paths whose content hash changed.
    pub modified: Vec<String>,
    /// Paths present previously and absent now.
    pub deleted: Vec<String>,
    /// Per-path unified diff (modified) or full body (added), text files only.
    pub content_diffs: HashMap<String, String>,
}

impl GitDiffInfo {
    /// Builds the genesis shape: every fingerprinted path is `added`, nothing
    /// else populated.
    pub fn genesis(paths: impl IntoIterator<Item = String>) -> Self {
        Self {
            added: paths.into_iter().collect(),
            modified: Vec::new(),
            deleted: Vec::new(),
            content_diffs: HashMap::new(),
        }
    }

    /// Serializes to the JSON string stored alongside the snapshot.
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string(self).map_err(Error::from)
    }

    /// Parses the stored JSON string back into a typed value.
    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_shape_has_only_added() {
        let info = GitDiffInfo::genesis(["main.py".to_string()]);
        assert_eq!(info.added, vec!["main.py".to_string()]);
        assert!(info.modified.is_empty());
        assert!(info.deleted.is_empty());
        assert!(info.content_diffs.is_empty());
    }

    #[test]
    fn round_trips_through_json_string() {
        let mut info = GitDiffInfo::default();
        info.modified.push("main.py".to_string());
        info.content_diffs
            .insert("main.py".to_string(), "-a\n+b\n".to_string());
        let json = info.to_json_string().unwrap();
        let back = GitDiffInfo::from_json_str(&json).unwrap();
        assert_eq!(back, info);
    }
}
