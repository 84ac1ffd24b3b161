//! Shell-out VCS adapter built on the `GIT_DIR`/`GIT_WORK_TREE` invocation
//! pattern, covering the operation set this adapter exposes.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use csm_domain::error::{Error, Result};
use csm_domain::ports::vcs::{IgnorePredicate, VcsAdapter};
use tokio::process::Command;

/// Runs the system `git` binary under a per-call timeout.
pub struct ShellVcsAdapter {
    timeout: Duration,
}

impl ShellVcsAdapter {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    async fn run(&self, path: &Path, args: &[&str]) -> Result<std::process::Output> {
        let path = path.to_path_buf();
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let timeout = self.timeout;

        let future = Command::new("git")
            .args(&args)
            .current_dir(&path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output();

        match tokio::time::timeout(timeout, future).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(Error::vcs(format!("failed to spawn git {}: {e}", args.join(" ")))),
            Err(_) => Err(Error::VcsTimeout {
                seconds: timeout.as_secs(),
            }),
        }
    }

    async fn run_ok(&self, path: &Path, args: &[&str]) -> Result<String> {
        let output = self.run(path, args).await?;
        if !output.status.success() {
            return Err(Error::vcs(format!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl VcsAdapter for ShellVcsAdapter {
    async fn is_repo(&self, path: &Path) -> Result<bool> {
        Ok(path.join(".git").is_dir())
    }

    async fn current_branch(&self, path: &Path) -> Result<Option<String>> {
        let branch = self.run_ok(path, &["branch", "--show-current"]).await?;
        if branch.is_empty() {
            Ok(None)
        } else {
            Ok(Some(branch))
        }
    }

    async fn short_head(&self, path: &Path) -> Result<Option<String>> {
        match self.run_ok(path, &["rev-parse", "--short", "HEAD"]).await {
            Ok(hash) if !hash.is_empty() => Ok(Some(hash)),
            _ => Ok(None),
        }
    }

    async fn working_diff(&self, path: &Path) -> Result<String> {
        let output = self.run(path, &["diff", "--no-ext-diff", "HEAD"]).await?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn init_repo(&self, path: &Path) -> Result<()> {
        self.run_ok(path, &["init"]).await?;
        self.run_ok(path, &["config", "user.email", "csm@codebase.local"])
            .await?;
        self.run_ok(path, &["config", "user.name", "Codebase State Machine"])
            .await?;
        Ok(())
    }

    async fn create_branch(&self, name: &str, path: &Path) -> Result<()> {
        self.run_ok(path, &["checkout", "-b", name]).await?;
        Ok(())
    }

    async fn clone_to_volume(&self, src: &Path, dst: &Path, ignore: IgnorePredicate) -> Result<()> {
        let src = src.to_path_buf();
        let dst = dst.to_path_buf();
        tokio::task::spawn_blocking(move || copy_tree(&src, &dst, &ignore))
            .await
            .map_err(|e| Error::internal(format!("clone_to_volume task panicked: {e}")))??;
        Ok(())
    }
}

/// Recursively copies `src` into `dst`, replacing `dst` entirely first so
/// stale files from a prior copy never linger alongside fresh ones.
fn copy_tree(src: &Path, dst: &Path, ignore: &Arc<dyn Fn(&Path, bool) -> bool + Send + Sync>) -> Result<()> {
    if dst.exists() {
        std::fs::remove_dir_all(dst)
            .map_err(|e| Error::io_with_source(format!("failed to clear volume at {}", dst.display()), e))?;
    }
    std::fs::create_dir_all(dst)
        .map_err(|e| Error::io_with_source(format!("failed to create volume at {}", dst.display()), e))?;
    copy_dir_recursive(src, src, dst, ignore)
}

fn copy_dir_recursive(
    root: &Path,
    current: &Path,
    dst_root: &Path,
    ignore: &Arc<dyn Fn(&Path, bool) -> bool + Send + Sync>,
) -> Result<()> {
    for entry in std::fs::read_dir(current)
        .map_err(|e| Error::io_with_source(format!("failed to read {}", current.display()), e))?
    {
        let entry = entry.map_err(|e| Error::io_with_source("failed to read directory entry", e))?;
        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(&path);
        let is_dir = path.is_dir();

        if ignore(relative, is_dir) {
            continue;
        }

        let target = dst_root.join(relative);
        if is_dir {
            std::fs::create_dir_all(&target)
                .map_err(|e| Error::io_with_source(format!("failed to create {}", target.display()), e))?;
            copy_dir_recursive(root, &path, dst_root, ignore)?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| Error::io_with_source(format!("failed to create {}", parent.display()), e))?;
            }
            std::fs::copy(&path, &target).map_err(|e| {
                Error::io_with_source(format!("failed to copy {} to {}", path.display(), target.display()), e)
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc as StdArc;

    #[tokio::test]
    async fn non_repo_directory_reports_not_a_repo() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = ShellVcsAdapter::new(5);
        assert!(!adapter.is_repo(dir.path()).await.unwrap());
    }

    #[tokio::test]
    async fn init_repo_makes_it_a_repo() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = ShellVcsAdapter::new(5);
        adapter.init_repo(dir.path()).await.unwrap();
        assert!(adapter.is_repo(dir.path()).await.unwrap());
    }

    #[tokio::test]
    async fn clone_to_volume_skips_ignored_entries() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        std::fs::write(src.path().join("keep.txt"), "hello").unwrap();
        std::fs::create_dir(src.path().join("node_modules")).unwrap();
        std::fs::write(src.path().join("node_modules/dep.js"), "ignored").unwrap();

        let ignore: IgnorePredicate = StdArc::new(|path: &Path, _is_dir: bool| {
            path.components().any(|c| c.as_os_str() == "node_modules")
        });

        let adapter = ShellVcsAdapter::new(5);
        adapter
            .clone_to_volume(src.path(), dst.path(), ignore)
            .await
            .unwrap();

        assert!(dst.path().join("keep.txt").exists());
        assert!(!dst.path().join("node_modules").exists());
    }
}
