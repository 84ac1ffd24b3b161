//! The snapshot ("State") value type.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::file_hash::FileHashDelta;

/// An immutable, numbered snapshot of the working copy.
///
/// `file_hashes` is `Some` only for the genesis snapshot (state 0); every
/// later snapshot reconstructs its full fingerprint set on demand by folding
/// `file_hash_deltas` forward from genesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct State {
    /// Dense, monotonically assigned snapshot number; `0` is genesis.
    pub state_number: u64,
    /// Free-form, sanitized description of caller intent.
    pub user_prompt: String,
    /// Branch name captured from the filesystem at creation time, or a
    /// reserved sentinel (see [`crate::constants`]).
    pub branch_name: String,
    /// Opaque JSON payload; parse with [`crate::value_objects::GitDiffInfo::from_json_str`].
    pub git_diff_info: String,
    /// Content-addressed digest over `(state_number, user_prompt, branch_name, git_diff_info)`.
    pub hash: String,
    /// Snapshot creation instant, UTC.
    pub created_at: DateTime<Utc>,
    /// Full fingerprint map; populated only for genesis.
    pub file_hashes: Option<HashMap<String, String>>,
    /// Delta against the previous snapshot; genesis stores the full map here too.
    pub file_hash_deltas: HashMap<String, FileHashDelta>,
}

impl State {
    /// Computes the content-addressed hash for a snapshot's identifying
    /// fields.
    pub fn compute_hash(
        state_number: u64,
        user_prompt: &str,
        branch_name: &str,
        git_diff_info: &str,
    ) -> String {
        let mut hasher = Sha256::new();
        hasher.update(state_number.to_le_bytes());
        hasher.update(b"\0");
        hasher.update(user_prompt.as_bytes());
        hasher.update(b"\0");
        hasher.update(branch_name.as_bytes());
        hasher.update(b"\0");
        hasher.update(git_diff_info.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Builds a new state with `hash` derived from its own fields.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        state_number: u64,
        user_prompt: String,
        branch_name: String,
        git_diff_info: String,
        created_at: DateTime<Utc>,
        file_hashes: Option<HashMap<String, String>>,
        file_hash_deltas: HashMap<String, FileHashDelta>,
    ) -> Self {
        let hash = Self::compute_hash(state_number, &user_prompt, &branch_name, &git_diff_info);
        Self {
            state_number,
            user_prompt,
            branch_name,
            git_diff_info,
            hash,
            created_at,
            file_hashes,
            file_hash_deltas,
        }
    }

    /// `true` for the genesis snapshot.
    pub fn is_genesis(&self) -> bool {
        self.state_number == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic_over_identifying_fields() {
        let a = State::compute_hash(1, "prompt", "main", "{}");
        let b = State::compute_hash(1, "prompt", "main", "{}");
        assert_eq!(a, b);
    }

    #[test]
    fn hash_changes_with_any_field() {
        let base = State::compute_hash(1, "prompt", "main", "{}");
        assert_ne!(base, State::compute_hash(2, "prompt", "main", "{}"));
        assert_ne!(base, State::compute_hash(1, "other", "main", "{}"));
        assert_ne!(base, State::compute_hash(1, "prompt", "dev", "{}"));
        assert_ne!(base, State::compute_hash(1, "prompt", "main", "{\"a\":1}"));
    }

    #[test]
    fn new_derives_hash_from_fields() {
        let state = State::new(
            0,
            "genesis".to_string(),
            "main".to_string(),
            "{}".to_string(),
            Utc::now(),
            Some(HashMap::new()),
            HashMap::new(),
        );
        assert_eq!(
            state.hash,
            State::compute_hash(0, "genesis", "main", "{}")
        );
        assert!(state.is_genesis());
    }
}
