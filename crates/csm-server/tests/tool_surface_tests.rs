//! Exercises the MCP tool surface end-to-end against a real SQLite-backed
//! `AppServices`, bypassing the stdio transport by calling the handler
//! methods directly (the same entry points `route_tool_call` uses).

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use csm_domain::error::Result;
use csm_domain::ports::{IgnorePredicate, VcsAdapter};
use csm_infrastructure::audit::NullAuditLogger;
use csm_infrastructure::rate_limit::NoopRateLimiter;
use csm_infrastructure::AppServices;
use csm_providers::storage::{open_pool, SqliteStateRepository, SqliteTransitionRepository};
use csm_server::args::{GenesisArgs, GetCurrentStateInfoArgs, NewStateTransitionArgs, TotalStatesArgs};
use csm_server::handlers::{ReadHandlers, WriteHandlers};
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::CallToolResult;

/// Never version-controlled; performs a real recursive copy so genesis and
/// transitions see the files the test actually writes.
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

fn build_services(db_path: &Path) -> Arc<AppServices> {
    let pool = open_pool(db_path).expect("open sqlite pool");
    let states = Arc::new(SqliteStateRepository::new(pool.clone()));
    let transitions = Arc::new(SqliteTransitionRepository::new(pool));
    let state_service = Arc::new(csm_application::use_cases::state_service::StateService::new(
        states,
        transitions,
        Arc::new(FakeVcs),
        Arc::new(NullAuditLogger),
    ));
    Arc::new(AppServices {
        state_service,
        rate_limiter: Arc::new(NoopRateLimiter),
        audit: Arc::new(NullAuditLogger),
    })
}

fn extract_text(result: &CallToolResult) -> String {
    result
        .content
        .iter()
        .filter_map(|c| match &c.raw {
            rmcp::model::RawContent::Text(text_content) => Some(text_content.text.clone()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("")
}

#[tokio::test]
async fn genesis_then_transition_then_read_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let project = dir.path().join("project");
    std::fs::create_dir_all(&project).unwrap();
    std::fs::write(project.join("main.py"), "print('hi')").unwrap();
    let volume = dir.path().join("volume");
    let db_path = dir.path().join("csm.sqlite3");

    let services = build_services(&db_path);
    let writers = WriteHandlers::new(Arc::clone(&services));
    let readers = ReadHandlers::new(Arc::clone(&services));

    let genesis_result = writers
        .genesis(Parameters(GenesisArgs {
            project_path: project.to_string_lossy().to_string(),
            volume_path: volume.to_string_lossy().to_string(),
            client_id: "test-client".to_string(),
        }))
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_str(&extract_text(&genesis_result)).unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["state"]["state_number"], 0);

    std::fs::write(project.join("main.py"), "print('hello')").unwrap();
    let transition_result = writers
        .new_state_transition(Parameters(NewStateTransitionArgs {
            user_prompt: "fix greeting".to_string(),
            client_id: "test-client".to_string(),
        }))
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_str(&extract_text(&transition_result)).unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["state"]["state_number"], 1);

    let total_result = readers
        .total_states(Parameters(TotalStatesArgs {
            client_id: "test-client".to_string(),
        }))
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_str(&extract_text(&total_result)).unwrap();
    assert_eq!(body["total_states"], 2);

    let current_result = readers
        .get_current_state_info(Parameters(GetCurrentStateInfoArgs {
            client_id: "test-client".to_string(),
        }))
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_str(&extract_text(&current_result)).unwrap();
    assert_eq!(body["state"]["state_number"], 1);
}

#[tokio::test]
async fn genesis_twice_returns_a_typed_failure_instead_of_raising() {
    let dir = tempfile::tempdir().unwrap();
    let project = dir.path().join("project");
    std::fs::create_dir_all(&project).unwrap();
    std::fs::write(project.join("main.py"), "print('hi')").unwrap();
    let volume = dir.path().join("volume");
    let db_path = dir.path().join("csm.sqlite3");

    let services = build_services(&db_path);
    let writers = WriteHandlers::new(services);

    let args = GenesisArgs {
        project_path: project.to_string_lossy().to_string(),
        volume_path: volume.to_string_lossy().to_string(),
        client_id: "test-client".to_string(),
    };
    writers
        .genesis(Parameters(GenesisArgs {
            project_path: args.project_path.clone(),
            volume_path: args.volume_path.clone(),
            client_id: args.client_id.clone(),
        }))
        .await
        .unwrap();

    let second = writers.genesis(Parameters(args)).await.unwrap();
    assert!(!second.is_error.unwrap_or(false), "domain errors never raise an MCP error");
    let body: serde_json::Value = serde_json::from_str(&extract_text(&second)).unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "validation_failure");
}
