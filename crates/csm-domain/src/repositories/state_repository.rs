//! Snapshot storage contract.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::value_objects::{FileHashDelta, State};

/// Storage-backend-agnostic contract for persisting and querying snapshots.
///
/// Both the relational and graph backends implement this trait identically
/// from the service's point of view; allocation of `state_number` and
/// finalization of `hash` happen atomically inside [`StateRepository::create_next`].
#[async_trait]
pub trait StateRepository: Send + Sync {
    /// Inserts a fully-formed snapshot (used only for genesis, whose
    /// `state_number` is fixed at `0`).
    async fn create(&self, state: State) -> Result<()>;

    /// Allocates `next = max(state_number) + 1`, finalizes `hash` from the
    /// allocated number and the given fields, inserts the new snapshot, and
    /// returns it. Atomic with respect to concurrent callers.
    async fn create_next(
        &self,
        user_prompt: String,
        branch_name: String,
        git_diff_info: String,
        file_hash_deltas: HashMap<String, FileHashDelta>,
        created_at: DateTime<Utc>,
    ) -> Result<State>;

    /// Fetches a snapshot by its number.
    async fn get_by_number(&self, state_number: u64) -> Result<Option<State>>;

    /// Fetches the current snapshot: the explicit current-state pointer when
    /// the backend supports one, else `max(state_number)`.
    async fn get_current(&self) -> Result<Option<State>>;

    /// Returns every snapshot, ordered by `state_number`.
    async fn get_all(&self) -> Result<Vec<State>>;

    /// `true` if a snapshot with this number exists.
    async fn exists(&self, state_number: u64) -> Result<bool>;

    /// Total number of snapshots.
    async fn count(&self) -> Result<u64>;

    /// Substring search over `user_prompt`, returning matching snapshots.
    async fn search(&self, text: &str) -> Result<Vec<State>>;

    /// Deletes a snapshot by number. Exposed for test/repair tooling; the
    /// service's public operations never delete snapshots.
    async fn delete(&self, state_number: u64) -> Result<()>;

    /// Moves the explicit current-state pointer to `state_number`. Returns
    /// `false` when the backend has no such pointer and the service must
    /// fall back to `current = max(state_number)`.
    async fn set_current(&self, state_number: u64) -> Result<bool>;

    /// Replaces a snapshot's `user_prompt` in place. The only case that
    /// permits mutating a persisted snapshot: a jump target's
    /// placeholder prompt, replaced the first time it is reached.
    async fn update_user_prompt(&self, state_number: u64, user_prompt: String) -> Result<()>;
}
