//! Version-control adapter port.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

/// A `(relPath, isDir) -> ignore?` predicate, shared with the fingerprinter
/// and handed to [`VcsAdapter::clone_to_volume`] so the managed copy honors
/// the same ignore rules as everything else.
pub type IgnorePredicate = Arc<dyn Fn(&Path, bool) -> bool + Send + Sync>;

/// Thin interface over an external version-control tool.
///
/// Implementations run the external tool under a per-call timeout and
/// translate failures into [`crate::error::Error::Vcs`] /
/// [`crate::error::Error::VcsTimeout`]; callers (the state service) are
/// responsible for mapping those into the branch-name sentinels described in
/// this port.
#[async_trait]
pub trait VcsAdapter: Send + Sync {
    /// `true` if `path` is the root of (or inside) a version-controlled tree.
    async fn is_repo(&self, path: &Path) -> Result<bool>;

    /// The current branch name, or `None` when HEAD is detached.
    async fn current_branch(&self, path: &Path) -> Result<Option<String>>;

    /// A short identifier for the current commit, used to build the
    /// `detached_<shortHash>` sentinel.
    async fn short_head(&self, path: &Path) -> Result<Option<String>>;

    /// Unified diff of the working tree against its last recorded state.
    async fn working_diff(&self, path: &Path) -> Result<String>;

    /// Initializes a fresh repository at `path`.
    async fn init_repo(&self, path: &Path) -> Result<()>;

    /// Creates and checks out a new branch named `name` at `path`.
    async fn create_branch(&self, name: &str, path: &Path) -> Result<()>;

    /// Recursively copies `src` into `dst`, skipping entries the predicate
    /// rejects.
    async fn clone_to_volume(&self, src: &Path, dst: &Path, ignore: IgnorePredicate) -> Result<()>;
}
