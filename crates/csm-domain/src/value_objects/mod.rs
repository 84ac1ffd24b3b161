//! Plain data types shared by every layer.

mod diff_info;
mod file_hash;
mod state;
mod transition;

pub use diff_info::GitDiffInfo;
pub use file_hash::FileHashDelta;
pub use state::State;
pub use transition::{Transition, PLACEHOLDER_PROMPT};
