//! Branch-detection policy, applied on every write so the
//! snapshot's `branch_name` is always read live, never from a stored field.

use std::path::Path;

use csm_domain::constants::{BRANCH_DETACHED_HEAD, BRANCH_GIT_ERROR, BRANCH_NOT_VERSIONED};
use csm_domain::ports::VcsAdapter;

/// Resolves the branch name to record for a snapshot created at `path`,
/// following:
/// ```text
/// if !isRepo(path)                  -> "not_versioned"
/// try currentBranch(path):
///    ok, nonEmpty  -> sanitize(name)
///    ok, empty     -> shortHead(path) ? "detached_"+hash : "detached_head"
///    error         -> "git_error"
/// ```
pub async fn detect_branch(vcs: &dyn VcsAdapter, path: &Path) -> String {
    match vcs.is_repo(path).await {
        Ok(true) => {}
        Ok(false) => return BRANCH_NOT_VERSIONED.to_string(),
        Err(_) => return BRANCH_GIT_ERROR.to_string(),
    }

    match vcs.current_branch(path).await {
        Ok(Some(name)) if !name.is_empty() => sanitize_branch_name(&name),
        Ok(_) => match vcs.short_head(path).await {
            Ok(Some(hash)) => format!("detached_{hash}"),
            _ => BRANCH_DETACHED_HEAD.to_string(),
        },
        Err(_) => BRANCH_GIT_ERROR.to_string(),
    }
}

/// Replaces path separators with `_`, drops any character outside
/// `[A-Za-z0-9_-]`, and truncates to 255 characters.
pub fn sanitize_branch_name(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    out.truncate(255);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_path_separators() {
        assert_eq!(sanitize_branch_name("feature/my-branch"), "feature_my-branch");
    }

    #[test]
    fn drops_disallowed_characters() {
        assert_eq!(sanitize_branch_name("weird branch!name"), "weirdbranchname");
    }

    #[test]
    fn truncates_to_255() {
        let long = "a".repeat(400);
        assert_eq!(sanitize_branch_name(&long).len(), 255);
    }
}
