//! End-to-end coverage of `StateService` against in-memory fakes for every
//! port.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use csm_application::use_cases::state_service::StateService;
use csm_domain::error::Result;
use csm_domain::ports::{AuditEvent, AuditLogger, IgnorePredicate, VcsAdapter};
use csm_domain::repositories::{StateRepository, TransitionRepository};
use csm_domain::value_objects::{FileHashDelta, State, Transition};
use tokio::sync::Mutex as AsyncMutex;

/// In-memory `StateRepository`, append-only except for the repair/test-only
/// `delete`, mirroring the contract both real backends implement.
#[derive(Default)]
struct InMemoryStates {
    rows: AsyncMutex<Vec<State>>,
    current: AsyncMutex<Option<u64>>,
}

#[async_trait]
impl StateRepository for InMemoryStates {
    async fn create(&self, state: State) -> Result<()> {
        self.rows.lock().await.push(state);
        Ok(())
    }

    async fn create_next(
        &self,
        user_prompt: String,
        branch_name: String,
        git_diff_info: String,
        file_hash_deltas: HashMap<String, FileHashDelta>,
        created_at: DateTime<Utc>,
    ) -> Result<State> {
        let mut rows = self.rows.lock().await;
        let next = rows.iter().map(|s| s.state_number).max().map_or(0, |m| m + 1);
        let state = State::new(
            next,
            user_prompt,
            branch_name,
            git_diff_info,
            created_at,
            None,
            file_hash_deltas,
        );
        rows.push(state.clone());
        Ok(state)
    }

    async fn get_by_number(&self, state_number: u64) -> Result<Option<State>> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .find(|s| s.state_number == state_number)
            .cloned())
    }

    async fn get_current(&self) -> Result<Option<State>> {
        let current = *self.current.lock().await;
        let rows = self.rows.lock().await;
        match current {
            Some(n) => Ok(rows.iter().find(|s| s.state_number == n).cloned()),
            None => Ok(rows.iter().max_by_key(|s| s.state_number).cloned()),
        }
    }

    async fn get_all(&self) -> Result<Vec<State>> {
        let mut rows = self.rows.lock().await.clone();
        rows.sort_by_key(|s| s.state_number);
        Ok(rows)
    }

    async fn exists(&self, state_number: u64) -> Result<bool> {
        Ok(self.rows.lock().await.iter().any(|s| s.state_number == state_number))
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.rows.lock().await.len() as u64)
    }

    async fn search(&self, text: &str) -> Result<Vec<State>> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .filter(|s| s.user_prompt.contains(text))
            .cloned()
            .collect())
    }

    async fn delete(&self, state_number: u64) -> Result<()> {
        self.rows.lock().await.retain(|s| s.state_number != state_number);
        Ok(())
    }

    async fn set_current(&self, state_number: u64) -> Result<bool> {
        *self.current.lock().await = Some(state_number);
        Ok(true)
    }

    async fn update_user_prompt(&self, state_number: u64, user_prompt: String) -> Result<()> {
        if let Some(s) = self
            .rows
            .lock()
            .await
            .iter_mut()
            .find(|s| s.state_number == state_number)
        {
            s.user_prompt = user_prompt;
        }
        Ok(())
    }
}

#[derive(Default)]
struct InMemoryTransitions {
    rows: AsyncMutex<Vec<Transition>>,
}

#[async_trait]
impl TransitionRepository for InMemoryTransitions {
    async fn create(&self, transition: Transition) -> Result<()> {
        self.rows.lock().await.push(transition);
        Ok(())
    }

    async fn create_next(
        &self,
        current_state: u64,
        next_state: u64,
        user_prompt: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Result<Transition> {
        let mut rows = self.rows.lock().await;
        let next_id = rows.iter().map(|t| t.transition_id).max().map_or(1, |m| m + 1);
        let transition = Transition {
            transition_id: next_id,
            current_state,
            next_state,
            user_prompt,
            timestamp,
        };
        rows.push(transition.clone());
        Ok(transition)
    }

    async fn get_by_id(&self, transition_id: u64) -> Result<Option<Transition>> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .find(|t| t.transition_id == transition_id)
            .cloned())
    }

    async fn get_by_state(&self, state_number: u64) -> Result<Vec<Transition>> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .filter(|t| t.current_state == state_number)
            .cloned()
            .collect())
    }

    async fn get_last(&self, k: usize) -> Result<Vec<Transition>> {
        let mut rows = self.rows.lock().await.clone();
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        rows.truncate(k);
        Ok(rows)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.rows.lock().await.len() as u64)
    }
}

/// Treats the project as never version-controlled and performs a real
/// recursive copy honoring the ignore predicate, so genesis/transition
/// fingerprinting sees the files the tests actually write to disk.
struct FakeVcs;

#[async_trait]
impl VcsAdapter for FakeVcs {
    async fn is_repo(&self, _path: &Path) -> Result<bool> {
        Ok(false)
    }

    async fn current_branch(&self, _path: &Path) -> Result<Option<String>> {
        Ok(None)
    }

    async fn short_head(&self, _path: &Path) -> Result<Option<String>> {
        Ok(None)
    }

    async fn working_diff(&self, _path: &Path) -> Result<String> {
        Ok(String::new())
    }

    async fn init_repo(&self, _path: &Path) -> Result<()> {
        Ok(())
    }

    async fn create_branch(&self, _name: &str, _path: &Path) -> Result<()> {
        Ok(())
    }

    async fn clone_to_volume(&self, src: &Path, dst: &Path, ignore: IgnorePredicate) -> Result<()> {
        copy_dir(src, dst, &ignore)
    }
}

fn copy_dir(src: &Path, dst: &Path, ignore: &IgnorePredicate) -> Result<()> {
    std::fs::create_dir_all(dst).map_err(|e| csm_domain::error::Error::io_with_source("mkdir", e))?;
    for entry in std::fs::read_dir(src).map_err(|e| csm_domain::error::Error::io_with_source("readdir", e))? {
        let entry = entry.map_err(|e| csm_domain::error::Error::io_with_source("readdir entry", e))?;
        let path = entry.path();
        let rel = path.strip_prefix(src).unwrap();
        let is_dir = path.is_dir();
        if ignore(rel, is_dir) {
            continue;
        }
        let target = dst.join(rel);
        if is_dir {
            copy_dir(&path, &target, ignore)?;
        } else {
            std::fs::copy(&path, &target)
                .map_err(|e| csm_domain::error::Error::io_with_source("copy file", e))?;
        }
    }
    Ok(())
}

struct NullAudit;

impl AuditLogger for NullAudit {
    fn log(&self, _event: AuditEvent) {}
}

fn build_service() -> StateService {
    StateService::new(
        Arc::new(InMemoryStates::default()),
        Arc::new(InMemoryTransitions::default()),
        Arc::new(FakeVcs),
        Arc::new(NullAudit),
    )
}

#[tokio::test]
async fn scenario_1_empty_project_no_vcs() {
    let dir = tempfile::tempdir().unwrap();
    let project = dir.path().join("project");
    let volume = dir.path().join("volume");
    std::fs::create_dir_all(&project).unwrap();
    std::fs::write(project.join("main.py"), "print('hi')").unwrap();

    let service = build_service();
    let genesis = service.genesis(project.clone(), volume.clone()).await.unwrap();

    assert_eq!(genesis.state_number, 0);
    assert_eq!(genesis.branch_name, "codebase-state-machine");
    let hashes = genesis.file_hashes.expect("genesis keeps a full hash map");
    assert_eq!(hashes.len(), 1);
    let expected = sha256_hex("print('hi')");
    assert_eq!(hashes.get("main.py"), Some(&expected));
    assert!(volume.join(".codebase_state_initialized").exists());
}

#[tokio::test]
async fn scenario_2_one_modification_produces_a_delta_and_unified_diff() {
    let dir = tempfile::tempdir().unwrap();
    let project = dir.path().join("project");
    let volume = dir.path().join("volume");
    std::fs::create_dir_all(&project).unwrap();
    std::fs::write(project.join("main.py"), "print('hi')").unwrap();

    let service = build_service();
    service.genesis(project.clone(), volume).await.unwrap();

    std::fs::write(project.join("main.py"), "print('hello')").unwrap();
    let next = service
        .new_state_transition("fix greeting".to_string())
        .await
        .unwrap();

    assert_eq!(next.state_number, 1);
    assert!(next.file_hashes.is_none());
    let delta = next.file_hash_deltas.get("main.py").expect("main.py changed");
    assert_eq!(delta.as_hash(), Some(sha256_hex("print('hello')").as_str()));

    let diff_info = csm_domain::value_objects::GitDiffInfo::from_json_str(&next.git_diff_info).unwrap();
    assert_eq!(diff_info.modified, vec!["main.py".to_string()]);
    let content_diff = diff_info.content_diffs.get("main.py").expect("diff recorded");
    assert!(content_diff.contains("-print('hi')"));
    assert!(content_diff.contains("+print('hello')"));
}

#[tokio::test]
async fn scenario_3_add_then_delete_leaves_a_tombstone() {
    let dir = tempfile::tempdir().unwrap();
    let project = dir.path().join("project");
    let volume = dir.path().join("volume");
    std::fs::create_dir_all(&project).unwrap();
    std::fs::write(project.join("main.py"), "print('hi')").unwrap();

    let service = build_service();
    service.genesis(project.clone(), volume).await.unwrap();
    std::fs::write(project.join("main.py"), "print('hello')").unwrap();
    service.new_state_transition("fix greeting".to_string()).await.unwrap();

    std::fs::write(project.join("util.py"), "def f(): pass").unwrap();
    let added = service.new_state_transition("add util".to_string()).await.unwrap();
    assert_eq!(added.state_number, 2);
    assert!(added.file_hash_deltas.get("util.py").unwrap().as_hash().is_some());

    std::fs::remove_file(project.join("util.py")).unwrap();
    let deleted = service.new_state_transition("drop util".to_string()).await.unwrap();
    assert_eq!(deleted.state_number, 3);
    assert!(deleted.file_hash_deltas.get("util.py").unwrap().is_tombstone());

    let diff_info = csm_domain::value_objects::GitDiffInfo::from_json_str(&deleted.git_diff_info).unwrap();
    assert_eq!(diff_info.deleted, vec!["util.py".to_string()]);
}

#[tokio::test]
async fn scenario_4_arbitrary_jump_adds_an_edge_without_a_new_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let project = dir.path().join("project");
    let volume = dir.path().join("volume");
    std::fs::create_dir_all(&project).unwrap();
    std::fs::write(project.join("main.py"), "print('hi')").unwrap();

    let service = build_service();
    service.genesis(project.clone(), volume).await.unwrap();
    std::fs::write(project.join("main.py"), "print('hello')").unwrap();
    service.new_state_transition("s1".to_string()).await.unwrap();
    std::fs::write(project.join("util.py"), "x = 1").unwrap();
    service.new_state_transition("s2".to_string()).await.unwrap();
    std::fs::remove_file(project.join("util.py")).unwrap();
    service.new_state_transition("s3".to_string()).await.unwrap();

    let before = service.total_states().await.unwrap();
    let jump = service.arbitrary_state_transition(1, None).await.unwrap();
    assert_eq!(jump.current_state, 3);
    assert_eq!(jump.next_state, 1);
    assert!(jump.is_jump());

    let after = service.total_states().await.unwrap();
    assert_eq!(before, after, "a jump never creates a new snapshot");

    let current = service.get_current_state().await.unwrap().unwrap();
    assert_eq!(current.state_number, 1);

    let tracked = service.track_transitions().await.unwrap();
    assert_eq!(tracked[0].transition_id, jump.transition_id);
}

#[tokio::test]
async fn scenario_5_binary_file_is_excluded_from_the_delta() {
    let dir = tempfile::tempdir().unwrap();
    let project = dir.path().join("project");
    let volume = dir.path().join("volume");
    std::fs::create_dir_all(&project).unwrap();
    std::fs::write(project.join("main.py"), "print('hi')").unwrap();

    let service = build_service();
    service.genesis(project.clone(), volume).await.unwrap();

    std::fs::write(project.join("image.png"), [0u8, 1, 2, 0, 255, 0, 3]).unwrap();
    let next = service.new_state_transition("add image".to_string()).await.unwrap();

    assert!(!next.file_hash_deltas.contains_key("image.png"));
    let diff_info = csm_domain::value_objects::GitDiffInfo::from_json_str(&next.git_diff_info).unwrap();
    assert!(!diff_info.content_diffs.contains_key("image.png"));
}

#[tokio::test]
async fn genesis_twice_is_a_no_op_failure() {
    let dir = tempfile::tempdir().unwrap();
    let project = dir.path().join("project");
    let volume = dir.path().join("volume");
    std::fs::create_dir_all(&project).unwrap();
    std::fs::write(project.join("main.py"), "print('hi')").unwrap();

    let service = build_service();
    service.genesis(project.clone(), volume.clone()).await.unwrap();
    let err = service.genesis(project, volume).await.unwrap_err();
    assert_eq!(err.category(), "validation_failure");
}

#[tokio::test]
async fn genesis_rejects_a_volume_nested_inside_the_project() {
    let dir = tempfile::tempdir().unwrap();
    let project = dir.path().join("project");
    std::fs::create_dir_all(&project).unwrap();
    let volume = project.join("volume");

    let service = build_service();
    let err = service.genesis(project, volume).await.unwrap_err();
    assert_eq!(err.category(), "validation_failure");
}

#[tokio::test]
async fn jump_to_the_current_state_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let project = dir.path().join("project");
    let volume = dir.path().join("volume");
    std::fs::create_dir_all(&project).unwrap();
    std::fs::write(project.join("main.py"), "print('hi')").unwrap();

    let service = build_service();
    service.genesis(project, volume).await.unwrap();
    let err = service.arbitrary_state_transition(0, None).await.unwrap_err();
    assert_eq!(err.category(), "invalid_transition");
}

#[tokio::test]
async fn prompt_with_shell_metacharacters_is_rejected_and_state_is_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let project = dir.path().join("project");
    let volume = dir.path().join("volume");
    std::fs::create_dir_all(&project).unwrap();
    std::fs::write(project.join("main.py"), "print('hi')").unwrap();

    let service = build_service();
    service.genesis(project.clone(), volume).await.unwrap();
    let before = service.total_states().await.unwrap();

    let err = service
        .new_state_transition("rm -rf $HOME; echo done".to_string())
        .await
        .unwrap_err();
    assert_eq!(err.category(), "validation_failure");

    let after = service.total_states().await.unwrap();
    assert_eq!(before, after);
}

fn sha256_hex(content: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
