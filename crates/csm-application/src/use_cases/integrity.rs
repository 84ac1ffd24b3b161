//! Initialization-flag / storage consistency checks and bounded auto-repair.

use std::path::PathBuf;
use std::sync::Arc;

use csm_domain::error::Result;
use csm_domain::repositories::StateRepository;
use serde::{Deserialize, Serialize};

const INIT_FLAG_FILENAME: &str = ".codebase_state_initialized";
const CODEBASE_SUBDIR: &str = "codebase";

/// Severity of a detected consistency issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// The state machine cannot operate at all.
    Critical,
    /// Operable but a required invariant is violated.
    Error,
    /// Cosmetic or advisory.
    Warning,
}

/// One detected deviation between the init flag, storage contents, and
/// volume layout.
#[derive(Debug, Clone, Serialize)]
pub struct ConsistencyIssue {
    /// How severe the issue is.
    pub severity: Severity,
    /// Short machine-readable category, e.g. `"missing_init_flag"`.
    pub category: String,
    /// Human-readable description.
    pub message: String,
    /// Whether [`IntegrityChecker::auto_repair`] knows how to fix this.
    pub auto_fixable: bool,
    /// Internal action key used by `auto_repair` to dispatch the fix.
    #[serde(skip)]
    fix_action: Option<FixAction>,
}

#[derive(Debug, Clone, Copy)]
enum FixAction {
    RecreateInitFlag,
    ResetCurrentToLatest,
}

/// Outcome of an `auto_repair` pass.
#[derive(Debug, Clone, Serialize)]
pub struct RepairReport {
    /// Issues successfully fixed.
    pub repaired: Vec<String>,
    /// Issues whose fix attempt failed.
    pub failed: Vec<String>,
    /// Issues that remain (not auto-fixable, or not checked again yet).
    pub remaining_issues: Vec<ConsistencyIssue>,
}

/// Runs the diagnostic pass and, optionally, repairs the safe subset.
pub struct IntegrityChecker {
    states: Arc<dyn StateRepository>,
    volume_dir: PathBuf,
}

impl IntegrityChecker {
    /// Builds a checker scoped to `volume_dir`.
    pub fn new(states: Arc<dyn StateRepository>, volume_dir: PathBuf) -> Self {
        Self { states, volume_dir }
    }

    /// Enumerates consistency issues.
    pub async fn check_all(&self) -> Result<Vec<ConsistencyIssue>> {
        let mut issues = Vec::new();

        if !self.volume_dir.is_dir() {
            issues.push(ConsistencyIssue {
                severity: Severity::Critical,
                category: "volume_missing".to_string(),
                message: format!("volume directory {} does not exist", self.volume_dir.display()),
                auto_fixable: false,
                fix_action: None,
            });
            return Ok(issues);
        }

        let count = match self.states.count().await {
            Ok(c) => c,
            Err(e) => {
                issues.push(ConsistencyIssue {
                    severity: Severity::Critical,
                    category: "storage_unreachable".to_string(),
                    message: format!("storage backend unreachable: {e}"),
                    auto_fixable: false,
                    fix_action: None,
                });
                return Ok(issues);
            }
        };

        let genesis_exists = self.states.exists(0).await?;
        if count > 0 && !genesis_exists {
            issues.push(ConsistencyIssue {
                severity: Severity::Critical,
                category: "genesis_missing".to_string(),
                message: "storage has snapshots but genesis snapshot 0 is absent".to_string(),
                auto_fixable: false,
                fix_action: None,
            });
        }

        let flag_present = self.volume_dir.join(INIT_FLAG_FILENAME).is_file();
        if count > 0 && !flag_present {
            issues.push(ConsistencyIssue {
                severity: Severity::Error,
                category: "missing_init_flag".to_string(),
                message: "storage has snapshots but the initialization flag is missing".to_string(),
                auto_fixable: true,
                fix_action: Some(FixAction::RecreateInitFlag),
            });
        }

        if count > 0 && self.states.get_current().await?.is_none() {
            issues.push(ConsistencyIssue {
                severity: Severity::Error,
                category: "current_pointer_unset".to_string(),
                message: "snapshots exist but no current-state pointer is set".to_string(),
                auto_fixable: true,
                fix_action: Some(FixAction::ResetCurrentToLatest),
            });
        }

        if count > 0 && !self.volume_dir.join(CODEBASE_SUBDIR).is_dir() {
            issues.push(ConsistencyIssue {
                severity: Severity::Warning,
                category: "codebase_dir_missing".to_string(),
                message: "volumeDir/codebase working-copy reference tree is missing".to_string(),
                auto_fixable: false,
                fix_action: None,
            });
        }

        if count > 0 {
            if let Some(gap) = self.find_sequence_gap(count).await? {
                issues.push(ConsistencyIssue {
                    severity: Severity::Warning,
                    category: "non_contiguous_sequence".to_string(),
                    message: format!("state_number sequence has a gap at {gap}"),
                    auto_fixable: false,
                    fix_action: None,
                });
            }
        }

        Ok(issues)
    }

    async fn find_sequence_gap(&self, count: u64) -> Result<Option<u64>> {
        for n in 0..count {
            if !self.states.exists(n).await? {
                return Ok(Some(n));
            }
        }
        Ok(None)
    }

    /// Executes every auto-fixable issue from a fresh [`IntegrityChecker::check_all`]
    /// pass and reports what happened.
    pub async fn auto_repair(&self) -> Result<RepairReport> {
        let issues = self.check_all().await?;
        let mut repaired = Vec::new();
        let mut failed = Vec::new();
        let mut remaining = Vec::new();

        for issue in issues {
            match issue.fix_action {
                Some(FixAction::RecreateInitFlag) => {
                    match std::fs::write(self.volume_dir.join(INIT_FLAG_FILENAME), []) {
                        Ok(()) => repaired.push(issue.category.clone()),
                        Err(e) => failed.push(format!("{}: {e}", issue.category)),
                    }
                }
                Some(FixAction::ResetCurrentToLatest) => {
                    let max = self.states.count().await?.saturating_sub(1);
                    match self.states.set_current(max).await {
                        Ok(true) => repaired.push(issue.category.clone()),
                        Ok(false) | Err(_) => failed.push(issue.category.clone()),
                    }
                }
                None => remaining.push(issue),
            }
        }

        Ok(RepairReport {
            repaired,
            failed,
            remaining_issues: remaining,
        })
    }
}

/// Renders a short human-readable summary, grouped by severity.
pub fn summarize(issues: &[ConsistencyIssue]) -> String {
    let critical = issues.iter().filter(|i| i.severity == Severity::Critical).count();
    let error = issues.iter().filter(|i| i.severity == Severity::Error).count();
    let warning = issues.iter().filter(|i| i.severity == Severity::Warning).count();
    if issues.is_empty() {
        "no consistency issues detected".to_string()
    } else {
        format!("{critical} critical, {error} error, {warning} warning issue(s) detected")
    }
}
