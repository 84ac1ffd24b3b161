//! Composition root: wires concrete adapters behind the ports that
//! `csm-application` depends on.
//!
//! Uses a manual builder rather than a macro-based DI container: the object
//! graph here is small and static, so explicit `Arc<dyn Trait>` wiring stays
//! readable without pulling in a framework.

use std::sync::Arc;

use csm_application::use_cases::state_service::StateService;
use csm_domain::error::Result;
use csm_domain::ports::audit::AuditLogger;
use csm_domain::ports::rate_limit::RateLimiter;
use csm_domain::ports::vcs::VcsAdapter;
use csm_domain::repositories::{StateRepository, TransitionRepository};
use csm_providers::storage::{
    connect_graph, open_pool, GraphStateRepository, GraphTransitionRepository,
    SqliteStateRepository, SqliteTransitionRepository,
};
use csm_providers::vcs::ShellVcsAdapter;
use tracing::warn;

use crate::audit::{NullAuditLogger, TracingAuditLogger};
use crate::config::types::{AppConfig, DbMode};
use crate::rate_limit::{NoopRateLimiter, SlidingWindowRateLimiter};

/// The fully-wired set of services the tool surface calls into.
pub struct AppServices {
    /// The orchestrating state machine.
    pub state_service: Arc<StateService>,
    /// Per-call rate limiter, applied by the tool surface before dispatch.
    pub rate_limiter: Arc<dyn RateLimiter>,
    /// Audit logger, shared with [`AppServices::state_service`] and
    /// available to the tool surface for denials it detects itself (e.g.
    /// rate limiting) before a use case ever runs.
    pub audit: Arc<dyn AuditLogger>,
}

/// Builds an [`AppServices`] from a loaded [`AppConfig`].
///
/// Storage backend selection follows `config.storage.db_mode`. A graph
/// backend that fails to connect at startup falls back to the relational
/// backend rather than failing the whole process.
pub async fn bootstrap(config: &AppConfig) -> Result<AppServices> {
    let (states, transitions) = build_repositories(config).await?;

    let vcs: Arc<dyn VcsAdapter> = Arc::new(ShellVcsAdapter::new(config.volume.git_timeout_secs));

    let audit: Arc<dyn AuditLogger> = if config.logging.audit_enabled {
        Arc::new(TracingAuditLogger::new())
    } else {
        Arc::new(NullAuditLogger)
    };

    let rate_limiter: Arc<dyn RateLimiter> = if config.limits.rate_limit_enabled {
        Arc::new(SlidingWindowRateLimiter::new(
            config.limits.rate_limit_max_calls,
            config.limits.rate_limit_window_secs,
        ))
    } else {
        Arc::new(NoopRateLimiter)
    };

    let state_service = Arc::new(StateService::new(
        states,
        transitions,
        vcs,
        Arc::clone(&audit),
    ));

    Ok(AppServices {
        state_service,
        rate_limiter,
        audit,
    })
}

type Repositories = (Arc<dyn StateRepository>, Arc<dyn TransitionRepository>);

async fn build_repositories(config: &AppConfig) -> Result<Repositories> {
    match config.storage.db_mode {
        DbMode::Relational => build_relational(config),
        DbMode::Graph => match build_graph(config).await {
            Ok(repos) => Ok(repos),
            Err(e) => {
                warn!(
                    error = %e,
                    "graph backend unavailable at startup, falling back to relational"
                );
                build_relational(config)
            }
        },
    }
}

fn build_relational(config: &AppConfig) -> Result<Repositories> {
    let pool = open_pool(std::path::Path::new(&config.storage.sqlite_path))?;
    let states: Arc<dyn StateRepository> = Arc::new(SqliteStateRepository::new(pool.clone()));
    let transitions: Arc<dyn TransitionRepository> =
        Arc::new(SqliteTransitionRepository::new(pool));
    Ok((states, transitions))
}

async fn build_graph(config: &AppConfig) -> Result<Repositories> {
    let graph_config = &config.storage.graph;
    let graph =
        connect_graph(&graph_config.uri, &graph_config.user, &graph_config.password).await?;
    let states: Arc<dyn StateRepository> = Arc::new(GraphStateRepository::new(graph.clone()));
    let transitions: Arc<dyn TransitionRepository> =
        Arc::new(GraphTransitionRepository::new(graph));
    Ok((states, transitions))
}
