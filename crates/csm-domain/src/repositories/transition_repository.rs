//! Transition (edge) storage contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::value_objects::Transition;

/// Storage-backend-agnostic contract for persisting and querying transitions.
#[async_trait]
pub trait TransitionRepository: Send + Sync {
    /// Inserts a fully-formed transition.
    async fn create(&self, transition: Transition) -> Result<()>;

    /// Allocates `transition_id = max(transition_id) + 1`, inserts the edge,
    /// and returns it. Atomic with respect to concurrent callers.
    async fn create_next(
        &self,
        current_state: u64,
        next_state: u64,
        user_prompt: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Result<Transition>;

    /// Fetches a transition by id.
    async fn get_by_id(&self, transition_id: u64) -> Result<Option<Transition>>;

    /// Returns every edge originating at `state_number`.
    async fn get_by_state(&self, state_number: u64) -> Result<Vec<Transition>>;

    /// Returns the last `k` transitions, timestamp-descending.
    async fn get_last(&self, k: usize) -> Result<Vec<Transition>>;

    /// Total number of transitions.
    async fn count(&self) -> Result<u64>;
}
