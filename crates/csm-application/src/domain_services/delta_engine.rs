//! Delta computation and diff-payload assembly between two fingerprint sets
//!.

use std::collections::HashMap;
use std::path::Path;

use csm_domain::value_objects::{FileHashDelta, GitDiffInfo};

use super::fingerprinter::is_binary_file;

/// Result of comparing a new fingerprint set against the previous one.
pub struct ChangeSet {
    /// Structured diff summary, ready to be persisted as `git_diff_info`.
    pub diff_info: GitDiffInfo,
    /// Per-path delta relative to `last_full_hashes`.
    pub delta: HashMap<String, FileHashDelta>,
}

/// Computes the genesis change set: every fingerprinted path is `added`, the
/// full map becomes the delta (tombstones are impossible at genesis).
pub fn compute_genesis_changes(current_hashes: &HashMap<String, String>) -> ChangeSet {
    let delta = current_hashes
        .iter()
        .map(|(path, hash)| (path.clone(), FileHashDelta::Hash(hash.clone())))
        .collect();
    let diff_info = GitDiffInfo::genesis(current_hashes.keys().cloned());
    ChangeSet { diff_info, delta }
}

/// Computes the change set for a sequential transition: which paths were
/// added, modified or deleted, and the resulting delta. `content_diffs` is
/// left empty here; call [`attach_content_diffs`] afterwards to fill it in
/// from the live project tree and reference tree, since that step needs
/// filesystem access this function (pure over fingerprint maps) does not.
pub fn compute_transition_changes(
    current_hashes: &HashMap<String, String>,
    last_full_hashes: &HashMap<String, String>,
) -> ChangeSet {
    let mut delta = HashMap::new();
    let mut added = Vec::new();
    let mut modified = Vec::new();
    let content_diffs = HashMap::new();

    for (path, hash) in current_hashes {
        match last_full_hashes.get(path) {
            None => {
                added.push(path.clone());
                delta.insert(path.clone(), FileHashDelta::Hash(hash.clone()));
            }
            Some(prev_hash) if prev_hash != hash => {
                modified.push(path.clone());
                delta.insert(path.clone(), FileHashDelta::Hash(hash.clone()));
            }
            Some(_) => {}
        }
    }

    let mut deleted = Vec::new();
    for path in last_full_hashes.keys() {
        if !current_hashes.contains_key(path) {
            deleted.push(path.clone());
            delta.insert(path.clone(), FileHashDelta::Tombstone);
        }
    }

    added.sort();
    modified.sort();
    deleted.sort();

    ChangeSet {
        diff_info: GitDiffInfo {
            added,
            modified,
            deleted,
            content_diffs,
        },
        delta,
    }
}

/// Fills in `content_diffs` using the live project tree as the "current"
/// side and `volume_ref_dir` (when present) as the "previous" side. Kept
/// separate from [`compute_transition_changes`] so that function can stay
/// pure over fingerprint maps; this step needs filesystem access to both
/// trees at once.
pub fn attach_content_diffs(
    change_set: &mut ChangeSet,
    project_dir: &Path,
    volume_ref_dir: Option<&Path>,
) {
    for path in &change_set.diff_info.added {
        let current_path = project_dir.join(path);
        if is_binary_file(&current_path) {
            continue;
        }
        if let Ok(body) = std::fs::read_to_string(&current_path) {
            change_set.diff_info.content_diffs.insert(path.clone(), body);
        }
    }

    for path in &change_set.diff_info.modified {
        let current_path = project_dir.join(path);
        if is_binary_file(&current_path) {
            continue;
        }
        let Ok(current_body) = std::fs::read_to_string(&current_path) else {
            continue;
        };
        let previous_body = volume_ref_dir
            .map(|dir| dir.join(path))
            .filter(|p| p.is_file() && !is_binary_file(p))
            .and_then(|p| std::fs::read_to_string(p).ok())
            .unwrap_or_default();

        let diff = similar::TextDiff::from_lines(&previous_body, &current_body)
            .unified_diff()
            .header(path, path)
            .to_string();
        change_set.diff_info.content_diffs.insert(path.clone(), diff);
    }
}

/// Folds `deltas` (genesis full map, then every transition's delta in order)
/// forward, reconstructing the complete fingerprint set at the final state
///.
pub fn fold_deltas<'a>(
    deltas: impl IntoIterator<Item = &'a HashMap<String, FileHashDelta>>,
) -> HashMap<String, String> {
    let mut current = HashMap::new();
    for delta in deltas {
        for (path, entry) in delta {
            match entry {
                FileHashDelta::Hash(h) => {
                    current.insert(path.clone(), h.clone());
                }
                FileHashDelta::Tombstone => {
                    current.remove(path);
                }
            }
        }
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hashmap(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn genesis_marks_everything_added() {
        let hashes = hashmap(&[("main.py", "abc")]);
        let changes = compute_genesis_changes(&hashes);
        assert_eq!(changes.diff_info.added, vec!["main.py".to_string()]);
        assert!(changes.diff_info.modified.is_empty());
        assert!(matches!(
            changes.delta.get("main.py"),
            Some(FileHashDelta::Hash(h)) if h == "abc"
        ));
    }

    #[test]
    fn transition_detects_added_modified_deleted() {
        let last = hashmap(&[("a.py", "h1"), ("b.py", "h2")]);
        let current = hashmap(&[("a.py", "h1-new"), ("c.py", "h3")]);
        let changes = compute_transition_changes(&current, &last);
        assert_eq!(changes.diff_info.added, vec!["c.py".to_string()]);
        assert_eq!(changes.diff_info.modified, vec!["a.py".to_string()]);
        assert_eq!(changes.diff_info.deleted, vec!["b.py".to_string()]);
        assert!(changes.delta.get("b.py").unwrap().is_tombstone());
    }

    #[test]
    fn unchanged_paths_are_omitted_from_delta() {
        let last = hashmap(&[("a.py", "h1")]);
        let current = hashmap(&[("a.py", "h1")]);
        let changes = compute_transition_changes(&current, &last);
        assert!(changes.delta.is_empty());
        assert!(changes.diff_info.added.is_empty());
        assert!(changes.diff_info.modified.is_empty());
        assert!(changes.diff_info.deleted.is_empty());
    }

    #[test]
    fn fold_deltas_reconstructs_full_set() {
        let genesis: HashMap<String, FileHashDelta> =
            [("a.py".to_string(), FileHashDelta::Hash("h1".to_string()))]
                .into_iter()
                .collect();
        let t1: HashMap<String, FileHashDelta> =
            [("b.py".to_string(), FileHashDelta::Hash("h2".to_string()))]
                .into_iter()
                .collect();
        let t2: HashMap<String, FileHashDelta> =
            [("a.py".to_string(), FileHashDelta::Tombstone)]
                .into_iter()
                .collect();
        let full = fold_deltas([&genesis, &t1, &t2]);
        assert_eq!(full.len(), 1);
        assert_eq!(full.get("b.py"), Some(&"h2".to_string()));
    }
}
