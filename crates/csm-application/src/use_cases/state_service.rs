//! State-machine orchestration: genesis, sequential transitions, jumps, and
//! readers.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use csm_domain::constants::{
    GENESIS_STATE_NUMBER, MAX_STATE_NUMBER, SYNTHETIC_GENESIS_BRANCH,
};
use csm_domain::error::{Error, Result};
use csm_domain::ports::{AuditEvent, AuditEventType, AuditLogger, VcsAdapter};
use csm_domain::repositories::{StateRepository, TransitionRepository};
use csm_domain::value_objects::{State, Transition, PLACEHOLDER_PROMPT};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::domain_services::{
    branch_policy, delta_engine, fingerprinter, ignore_resolver, validation,
};
use crate::use_cases::integrity::{ConsistencyIssue, IntegrityChecker, RepairReport};

const GENESIS_PROMPT: &str = "Genesis state - state machine initialized";
const INIT_FLAG_FILENAME: &str = ".codebase_state_initialized";
const CODEBASE_SUBDIR: &str = "codebase";

/// Paths captured at genesis and held for the remainder of the process
/// lifetime, since the tool surface's later operations take no
/// path arguments of their own.
#[derive(Clone)]
struct RuntimePaths {
    project_dir: PathBuf,
    volume_dir: PathBuf,
}

impl RuntimePaths {
    fn codebase_dir(&self) -> PathBuf {
        self.volume_dir.join(CODEBASE_SUBDIR)
    }

    fn init_flag_path(&self) -> PathBuf {
        self.volume_dir.join(INIT_FLAG_FILENAME)
    }
}

/// Orchestrates the state machine's write and read operations over whichever
/// storage backend it was constructed with.
pub struct StateService {
    states: Arc<dyn StateRepository>,
    transitions: Arc<dyn TransitionRepository>,
    vcs: Arc<dyn VcsAdapter>,
    audit: Arc<dyn AuditLogger>,
    write_lock: Mutex<()>,
    paths: RwLock<Option<RuntimePaths>>,
}

impl StateService {
    /// Builds a service over the given collaborators. `paths` is `None`
    /// until [`StateService::genesis`] succeeds (or is supplied up front when
    /// resuming against an already-initialized volume — see
    /// [`StateService::resume`]).
    pub fn new(
        states: Arc<dyn StateRepository>,
        transitions: Arc<dyn TransitionRepository>,
        vcs: Arc<dyn VcsAdapter>,
        audit: Arc<dyn AuditLogger>,
    ) -> Self {
        Self {
            states,
            transitions,
            vcs,
            audit,
            write_lock: Mutex::new(()),
            paths: RwLock::new(None),
        }
    }

    /// Re-attaches `project_dir`/`volume_dir` after a restart against a
    /// volume that was already initialized in a previous process lifetime.
    pub async fn resume(&self, project_dir: PathBuf, volume_dir: PathBuf) {
        *self.paths.write().await = Some(RuntimePaths {
            project_dir,
            volume_dir,
        });
    }

    async fn require_paths(&self) -> Result<RuntimePaths> {
        self.paths
            .read()
            .await
            .clone()
            .ok_or_else(|| Error::not_initialized("call genesis first"))
    }

    /// Creates snapshot 0 and flips the init flag.
    pub async fn genesis(&self, project_path: PathBuf, volume_path: PathBuf) -> Result<State> {
        let _guard = self.write_lock.lock().await;
        let start = Instant::now();

        if is_descendant(&volume_path, &project_path) {
            let msg = "volume path must not be inside the project path";
            self.audit
                .log(AuditEvent::success("genesis", AuditEventType::Genesis).failed(msg));
            return Err(Error::invalid_argument(msg));
        }

        if volume_path.join(INIT_FLAG_FILENAME).exists() {
            let msg = "state manager already initialized. Call reset first.";
            self.audit
                .log(AuditEvent::success("genesis", AuditEventType::Genesis).failed(msg));
            return Err(Error::validation(msg));
        }

        std::fs::create_dir_all(&volume_path)
            .map_err(|e| Error::io_with_source("failed to create volume directory", e))?;
        let codebase_dir = volume_path.join(CODEBASE_SUBDIR);

        let ignore = ignore_resolver::build_ignore_predicate(&project_path);

        let branch_name = if self.vcs.is_repo(&project_path).await.unwrap_or(false) {
            self.vcs
                .clone_to_volume(&project_path, &codebase_dir, ignore.clone())
                .await?;
            branch_policy::detect_branch(self.vcs.as_ref(), &project_path).await
        } else {
            self.vcs
                .clone_to_volume(&project_path, &codebase_dir, ignore.clone())
                .await?;
            self.vcs.init_repo(&codebase_dir).await?;
            self.vcs
                .create_branch(SYNTHETIC_GENESIS_BRANCH, &codebase_dir)
                .await?;
            SYNTHETIC_GENESIS_BRANCH.to_string()
        };

        let hashes = fingerprinter::fingerprint_dir(&project_path, &ignore);
        if hashes.is_empty() {
            warn!("genesis fingerprinted zero files");
        }
        let changes = delta_engine::compute_genesis_changes(&hashes);
        let git_diff_info = changes.diff_info.to_json_string()?;

        let created_at = Utc::now();
        let hash = State::compute_hash(GENESIS_STATE_NUMBER, GENESIS_PROMPT, &branch_name, &git_diff_info);
        let state = State {
            state_number: GENESIS_STATE_NUMBER,
            user_prompt: GENESIS_PROMPT.to_string(),
            branch_name,
            git_diff_info,
            hash,
            created_at,
            file_hashes: Some(hashes),
            file_hash_deltas: changes.delta,
        };

        self.states.create(state.clone()).await?;
        self.states.set_current(GENESIS_STATE_NUMBER).await.ok();

        std::fs::write(volume_path.join(INIT_FLAG_FILENAME), []).map_err(|e| {
            Error::io_with_source("failed to write initialization flag", e)
        })?;

        *self.paths.write().await = Some(RuntimePaths {
            project_dir: project_path,
            volume_dir: volume_path,
        });

        self.audit.log(
            AuditEvent::success("genesis", AuditEventType::Genesis)
                .with_state_number(0)
                .with_duration_ms(start.elapsed().as_millis() as u64),
        );
        info!(state_number = 0, "genesis complete");
        Ok(state)
    }

    /// Creates snapshot `n+1` and the sequential edge `(n -> n+1)` in one
    /// logical unit.
    pub async fn new_state_transition(&self, user_prompt: String) -> Result<State> {
        let _guard = self.write_lock.lock().await;
        let start = Instant::now();
        let paths = self.require_paths().await?;
        let prompt = validation::sanitize_prompt(&user_prompt)?;

        let current = self
            .states
            .get_current()
            .await?
            .ok_or_else(|| Error::not_initialized("no current state found. Call genesis first."))?;

        let branch_name = branch_policy::detect_branch(self.vcs.as_ref(), &paths.project_dir).await;

        let last_full_hashes = self.full_hashes_at(current.state_number).await?;
        let ignore = ignore_resolver::build_ignore_predicate(&paths.project_dir);
        let current_hashes = fingerprinter::fingerprint_dir(&paths.project_dir, &ignore);

        let mut changes = delta_engine::compute_transition_changes(&current_hashes, &last_full_hashes);
        let codebase_dir = paths.codebase_dir();
        delta_engine::attach_content_diffs(&mut changes, &paths.project_dir, Some(&codebase_dir));

        let git_diff_info = changes.diff_info.to_json_string()?;
        let created_at = Utc::now();

        let new_state = self
            .states
            .create_next(
                prompt.clone(),
                branch_name,
                git_diff_info,
                changes.delta,
                created_at,
            )
            .await?;

        if let Err(e) = self
            .transitions
            .create_next(current.state_number, new_state.state_number, Some(prompt), created_at)
            .await
        {
            warn!(error = %e, "rolling back snapshot after transition-edge failure");
            self.states.delete(new_state.state_number).await.ok();
            self.audit.log(
                AuditEvent::success("new_state_transition", AuditEventType::StateTransition)
                    .failed(e.to_string()),
            );
            return Err(e);
        }

        self.states.set_current(new_state.state_number).await.ok();

        if let Err(e) = self
            .vcs
            .clone_to_volume(&paths.project_dir, &codebase_dir, ignore)
            .await
        {
            warn!(error = %e, "best-effort resync of codebase reference tree failed");
        }

        self.audit.log(
            AuditEvent::success("new_state_transition", AuditEventType::StateTransition)
                .with_state_number(new_state.state_number)
                .with_duration_ms(start.elapsed().as_millis() as u64),
        );
        Ok(new_state)
    }

    /// Creates only a new edge `(current -> target)`, moving the
    /// current-state pointer without fingerprinting or snapshotting
    ///.
    pub async fn arbitrary_state_transition(
        &self,
        target: u64,
        user_prompt: Option<String>,
    ) -> Result<Transition> {
        let _guard = self.write_lock.lock().await;
        self.require_paths().await?;

        if target > MAX_STATE_NUMBER {
            return Err(Error::invalid_argument("target state number out of range"));
        }

        let total = self.states.count().await?;
        if target >= total {
            return Err(Error::invalid_transition(format!(
                "invalid state number: {target}"
            )));
        }

        let current = self
            .states
            .get_current()
            .await?
            .ok_or_else(|| Error::not_initialized("no current state found. Call genesis first."))?;

        if target == current.state_number {
            return Err(Error::invalid_transition("self-jump rejected"));
        }

        let target_state = self
            .states
            .get_by_number(target)
            .await?
            .ok_or_else(|| Error::not_found(format!("state {target}")))?;

        let edge_prompt = match &user_prompt {
            Some(p) if !p.is_empty() => Some(validation::sanitize_prompt(p)?),
            _ => Some(PLACEHOLDER_PROMPT.to_string()),
        };

        if target_state.user_prompt.is_empty() || target_state.user_prompt == PLACEHOLDER_PROMPT {
            if let Some(p) = &edge_prompt {
                self.states.update_user_prompt(target, p.clone()).await?;
            }
        }

        let transition = self
            .transitions
            .create_next(current.state_number, target, edge_prompt, Utc::now())
            .await?;

        self.states.set_current(target).await.ok();

        self.audit.log(
            AuditEvent::success(
                "arbitrary_state_transition",
                AuditEventType::ArbitraryTransition,
            )
            .with_state_number(target),
        );
        Ok(transition)
    }

    /// Reconstructs the full fingerprint set at `state_number` by folding
    /// every snapshot's delta forward from genesis.
    async fn full_hashes_at(&self, state_number: u64) -> Result<HashMap<String, String>> {
        let mut deltas = Vec::with_capacity(state_number as usize + 1);
        for n in 0..=state_number {
            let state = self
                .states
                .get_by_number(n)
                .await?
                .ok_or_else(|| Error::internal(format!("missing snapshot {n} while reconstructing history")))?;
            deltas.push(state.file_hash_deltas);
        }
        Ok(delta_engine::fold_deltas(deltas.iter()))
    }

    /// `getCurrentState`.
    pub async fn get_current_state(&self) -> Result<Option<State>> {
        self.require_paths().await?;
        self.states.get_current().await
    }

    /// `getStateInfo(n)`.
    pub async fn get_state_info(&self, n: u64) -> Result<State> {
        self.require_paths().await?;
        self.states
            .get_by_number(n)
            .await?
            .ok_or_else(|| Error::not_found(format!("state {n}")))
    }

    /// `totalStates`.
    pub async fn total_states(&self) -> Result<u64> {
        self.require_paths().await?;
        self.states.count().await
    }

    /// `searchStates(text)`.
    pub async fn search_states(&self, text: &str) -> Result<Vec<State>> {
        self.require_paths().await?;
        self.states.search(text).await
    }

    /// `getStateTransitions(n)`.
    pub async fn get_state_transitions(&self, n: u64) -> Result<Vec<Transition>> {
        self.require_paths().await?;
        self.transitions.get_by_state(n).await
    }

    /// `getTransitionInfo(id)`.
    pub async fn get_transition_info(&self, id: u64) -> Result<Transition> {
        self.require_paths().await?;
        self.transitions
            .get_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("transition {id}")))
    }

    /// `trackTransitions`: the last five, timestamp-descending.
    pub async fn track_transitions(&self) -> Result<Vec<Transition>> {
        self.require_paths().await?;
        self.transitions.get_last(5).await
    }

    /// `checkConsistency`.
    pub async fn check_consistency(&self) -> Result<Vec<ConsistencyIssue>> {
        let paths = self.require_paths().await?;
        let checker = IntegrityChecker::new(Arc::clone(&self.states), paths.volume_dir);
        checker.check_all().await
    }

    /// `repairConsistency`: auto-fixes the safe subset of issues.
    pub async fn repair_consistency(&self) -> Result<RepairReport> {
        let paths = self.require_paths().await?;
        let checker = IntegrityChecker::new(Arc::clone(&self.states), paths.volume_dir);
        checker.auto_repair().await
    }
}

fn is_descendant(candidate: &Path, ancestor: &Path) -> bool {
    let candidate = std::fs::canonicalize(candidate).unwrap_or_else(|_| candidate.to_path_buf());
    let ancestor = std::fs::canonicalize(ancestor).unwrap_or_else(|_| ancestor.to_path_buf());
    candidate == ancestor || candidate.starts_with(&ancestor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descendant_detection_flags_nested_paths() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("project");
        std::fs::create_dir_all(&project).unwrap();
        let volume_inside = project.join("volume");
        std::fs::create_dir_all(&volume_inside).unwrap();
        assert!(is_descendant(&volume_inside, &project));

        let volume_outside = dir.path().join("volume");
        std::fs::create_dir_all(&volume_outside).unwrap();
        assert!(!is_descendant(&volume_outside, &project));
    }
}
