//! Relational storage backend over `rusqlite`/`r2d2`, with the schema and
//! lock-retry semantics this crate relies on.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use csm_domain::constants::{
    SQLITE_RETRY_BACKOFF_FACTOR, SQLITE_RETRY_INITIAL_DELAY_MS, SQLITE_RETRY_MAX_ATTEMPTS,
    SQLITE_RETRY_MAX_DELAY_MS,
};
use csm_domain::error::{Error, Result};
use csm_domain::repositories::{StateRepository, TransitionRepository};
use csm_domain::value_objects::{FileHashDelta, State, Transition};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension};

const CURRENT_STATE_KEY: &str = "current_state";

/// Opens (or creates) a SQLite-backed connection pool at `path`, in WAL
/// mode, and ensures the schema exists.
pub fn open_pool(path: &Path) -> Result<Pool<SqliteConnectionManager>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| Error::storage_with_source("failed to create sqlite data directory", e))?;
    }

    let manager = SqliteConnectionManager::file(path).with_init(|conn| {
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;")
    });
    let pool = Pool::builder()
        .build(manager)
        .map_err(|e| Error::storage_with_source("failed to build sqlite connection pool", e))?;

    let conn = pool
        .get()
        .map_err(|e| Error::storage_with_source("failed to acquire sqlite connection", e))?;
    init_schema(&conn)?;
    Ok(pool)
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS states (
            state_number INTEGER PRIMARY KEY,
            user_prompt TEXT NOT NULL,
            branch_name TEXT NOT NULL,
            git_diff_info TEXT,
            hash TEXT UNIQUE NOT NULL,
            created_at TEXT NOT NULL,
            file_hashes TEXT,
            file_hash_deltas TEXT
        );
        CREATE TABLE IF NOT EXISTS metadata (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS transitions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            current_state INTEGER NOT NULL,
            next_state INTEGER NOT NULL,
            user_prompt TEXT,
            timestamp TEXT NOT NULL
        );",
    )
    .map_err(|e| Error::storage_with_source("failed to initialize sqlite schema", e))
}

/// Runs `op` against a pooled connection on a blocking thread, retrying
/// with exponential backoff while the database reports contention.
async fn with_retry<T, F>(pool: &Pool<SqliteConnectionManager>, op: F) -> Result<T>
where
    T: Send + 'static,
    F: Fn(&Connection) -> rusqlite::Result<T> + Send + Sync + 'static,
{
    let op = Arc::new(op);
    let mut delay_ms = SQLITE_RETRY_INITIAL_DELAY_MS;

    for attempt in 1..=SQLITE_RETRY_MAX_ATTEMPTS {
        let pool = pool.clone();
        let op = Arc::clone(&op);
        let outcome = tokio::task::spawn_blocking(move || {
            let conn = pool
                .get()
                .map_err(|e| Error::storage_with_source("failed to acquire sqlite connection", e))?;
            op(&conn).map_err(map_rusqlite_error)
        })
        .await
        .map_err(|e| Error::internal(format!("sqlite worker task panicked: {e}")))?;

        match outcome {
            Ok(value) => return Ok(value),
            Err(Error::StorageContention { message }) if attempt < SQLITE_RETRY_MAX_ATTEMPTS => {
                tracing::warn!(attempt, delay_ms, "sqlite database locked, retrying: {message}");
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                delay_ms = ((delay_ms as f64) * SQLITE_RETRY_BACKOFF_FACTOR)
                    .min(SQLITE_RETRY_MAX_DELAY_MS as f64) as u64;
            }
            Err(e) => return Err(e),
        }
    }

    Err(Error::storage_contention(
        "sqlite database remained locked after all retry attempts",
    ))
}

fn map_rusqlite_error(err: rusqlite::Error) -> Error {
    if let rusqlite::Error::SqliteFailure(sqlite_err, ref message) = err {
        if matches!(
            sqlite_err.code,
            rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
        ) {
            return Error::storage_contention(
                message.clone().unwrap_or_else(|| "database is locked".to_string()),
            );
        }
    }
    Error::storage_with_source("sqlite operation failed", err)
}

fn row_to_state(row: &rusqlite::Row) -> rusqlite::Result<State> {
    let state_number: i64 = row.get("state_number")?;
    let user_prompt: String = row.get("user_prompt")?;
    let branch_name: String = row.get("branch_name")?;
    let git_diff_info: Option<String> = row.get("git_diff_info")?;
    let hash: String = row.get("hash")?;
    let created_at: String = row.get("created_at")?;
    let file_hashes_json: Option<String> = row.get("file_hashes")?;
    let file_hash_deltas_json: Option<String> = row.get("file_hash_deltas")?;
    Ok(State {
        state_number: state_number as u64,
        user_prompt,
        branch_name,
        git_diff_info: git_diff_info.unwrap_or_default(),
        hash,
        created_at: parse_timestamp(&created_at),
        file_hashes: file_hashes_json
            .as_deref()
            .and_then(|s| serde_json::from_str(s).ok()),
        file_hash_deltas: file_hash_deltas_json
            .as_deref()
            .and_then(|s| serde_json::from_str::<HashMap<String, FileHashDelta>>(s).ok())
            .unwrap_or_default(),
    })
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc.timestamp_opt(0, 0).single().unwrap_or_default())
}

/// SQLite-backed [`StateRepository`].
pub struct SqliteStateRepository {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteStateRepository {
    pub fn new(pool: Pool<SqliteConnectionManager>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StateRepository for SqliteStateRepository {
    async fn create(&self, state: State) -> Result<()> {
        with_retry(&self.pool, move |conn| {
            let file_hashes_json = state
                .file_hashes
                .as_ref()
                .map(|m| serde_json::to_string(m).unwrap_or_default());
            let deltas_json = serde_json::to_string(&state.file_hash_deltas).unwrap_or_default();
            conn.execute(
                "INSERT OR IGNORE INTO states
                    (state_number, user_prompt, branch_name, git_diff_info, hash, created_at, file_hashes, file_hash_deltas)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    state.state_number as i64,
                    state.user_prompt,
                    state.branch_name,
                    state.git_diff_info,
                    state.hash,
                    state.created_at.to_rfc3339(),
                    file_hashes_json,
                    deltas_json,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn create_next(
        &self,
        user_prompt: String,
        branch_name: String,
        git_diff_info: String,
        file_hash_deltas: HashMap<String, FileHashDelta>,
        created_at: DateTime<Utc>,
    ) -> Result<State> {
        with_retry(&self.pool, move |conn| {
            let tx = conn.unchecked_transaction()?;

            let max_state: Option<i64> = tx
                .query_row("SELECT MAX(state_number) FROM states", [], |row| row.get::<_, Option<i64>>(0))
                .optional()?
                .flatten();
            let next_state_number = max_state.map_or(0, |n| n + 1);

            let hash = State::compute_hash(
                next_state_number as u64,
                &user_prompt,
                &branch_name,
                &git_diff_info,
            );
            let deltas_json = serde_json::to_string(&file_hash_deltas).unwrap_or_default();

            tx.execute(
                "INSERT INTO states
                    (state_number, user_prompt, branch_name, git_diff_info, hash, created_at, file_hashes, file_hash_deltas)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, ?7)",
                params![
                    next_state_number,
                    user_prompt,
                    branch_name,
                    git_diff_info,
                    hash,
                    created_at.to_rfc3339(),
                    deltas_json,
                ],
            )?;
            tx.commit()?;

            Ok(State {
                state_number: next_state_number as u64,
                user_prompt,
                branch_name,
                git_diff_info,
                hash,
                created_at,
                file_hashes: None,
                file_hash_deltas,
            })
        })
        .await
    }

    async fn get_by_number(&self, state_number: u64) -> Result<Option<State>> {
        with_retry(&self.pool, move |conn| {
            conn.query_row(
                "SELECT * FROM states WHERE state_number = ?1",
                params![state_number as i64],
                row_to_state,
            )
            .optional()
        })
        .await
    }

    async fn get_current(&self) -> Result<Option<State>> {
        let pointer: Option<i64> = with_retry(&self.pool, |conn| {
            conn.query_row(
                "SELECT value FROM metadata WHERE key = ?1",
                params![CURRENT_STATE_KEY],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map(|opt| opt.and_then(|v| v.parse().ok()))
        })
        .await?;

        if let Some(state_number) = pointer {
            return self.get_by_number(state_number as u64).await;
        }

        with_retry(&self.pool, |conn| {
            conn.query_row(
                "SELECT * FROM states ORDER BY state_number DESC LIMIT 1",
                [],
                row_to_state,
            )
            .optional()
        })
        .await
    }

    async fn get_all(&self) -> Result<Vec<State>> {
        with_retry(&self.pool, |conn| {
            let mut stmt = conn.prepare("SELECT * FROM states ORDER BY state_number")?;
            let rows = stmt.query_map([], row_to_state)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })
        .await
    }

    async fn exists(&self, state_number: u64) -> Result<bool> {
        with_retry(&self.pool, move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM states WHERE state_number = ?1",
                params![state_number as i64],
                |row| row.get::<_, i64>(0),
            )
            .map(|count| count > 0)
        })
        .await
    }

    async fn count(&self) -> Result<u64> {
        with_retry(&self.pool, |conn| {
            conn.query_row("SELECT COUNT(*) FROM states", [], |row| row.get::<_, i64>(0))
                .map(|count| count as u64)
        })
        .await
    }

    async fn search(&self, text: &str) -> Result<Vec<State>> {
        let pattern = format!("%{text}%");
        with_retry(&self.pool, move |conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM states WHERE user_prompt LIKE ?1 ORDER BY state_number",
            )?;
            let rows = stmt.query_map(params![pattern], row_to_state)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })
        .await
    }

    async fn delete(&self, state_number: u64) -> Result<()> {
        with_retry(&self.pool, move |conn| {
            conn.execute(
                "DELETE FROM states WHERE state_number = ?1",
                params![state_number as i64],
            )?;
            Ok(())
        })
        .await
    }

    async fn set_current(&self, state_number: u64) -> Result<bool> {
        with_retry(&self.pool, move |conn| {
            let exists: i64 = conn.query_row(
                "SELECT COUNT(*) FROM states WHERE state_number = ?1",
                params![state_number as i64],
                |row| row.get(0),
            )?;
            if exists == 0 {
                return Ok(false);
            }
            conn.execute(
                "INSERT INTO metadata (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![CURRENT_STATE_KEY, state_number.to_string()],
            )?;
            Ok(true)
        })
        .await
    }

    async fn update_user_prompt(&self, state_number: u64, user_prompt: String) -> Result<()> {
        with_retry(&self.pool, move |conn| {
            conn.execute(
                "UPDATE states SET user_prompt = ?1 WHERE state_number = ?2",
                params![user_prompt, state_number as i64],
            )?;
            Ok(())
        })
        .await
    }
}

/// SQLite-backed [`TransitionRepository`].
pub struct SqliteTransitionRepository {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteTransitionRepository {
    pub fn new(pool: Pool<SqliteConnectionManager>) -> Self {
        Self { pool }
    }
}

fn row_to_transition(row: &rusqlite::Row) -> rusqlite::Result<Transition> {
    let transition_id: i64 = row.get("id")?;
    let current_state: i64 = row.get("current_state")?;
    let next_state: i64 = row.get("next_state")?;
    let user_prompt: Option<String> = row.get("user_prompt")?;
    let timestamp: String = row.get("timestamp")?;
    Ok(Transition {
        transition_id: transition_id as u64,
        current_state: current_state as u64,
        next_state: next_state as u64,
        user_prompt,
        timestamp: parse_timestamp(&timestamp),
    })
}

#[async_trait]
impl TransitionRepository for SqliteTransitionRepository {
    async fn create(&self, transition: Transition) -> Result<()> {
        with_retry(&self.pool, move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO transitions (id, current_state, next_state, user_prompt, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    transition.transition_id as i64,
                    transition.current_state as i64,
                    transition.next_state as i64,
                    transition.user_prompt,
                    transition.timestamp.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn create_next(
        &self,
        current_state: u64,
        next_state: u64,
        user_prompt: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Result<Transition> {
        with_retry(&self.pool, move |conn| {
            let tx = conn.unchecked_transaction()?;

            let max_id: Option<i64> = tx
                .query_row("SELECT MAX(id) FROM transitions", [], |row| row.get::<_, Option<i64>>(0))
                .optional()?
                .flatten();
            let next_id = max_id.map_or(1, |n| n + 1);

            tx.execute(
                "INSERT INTO transitions (id, current_state, next_state, user_prompt, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    next_id,
                    current_state as i64,
                    next_state as i64,
                    user_prompt,
                    timestamp.to_rfc3339(),
                ],
            )?;
            tx.commit()?;

            Ok(Transition {
                transition_id: next_id as u64,
                current_state,
                next_state,
                user_prompt,
                timestamp,
            })
        })
        .await
    }

    async fn get_by_id(&self, transition_id: u64) -> Result<Option<Transition>> {
        with_retry(&self.pool, move |conn| {
            conn.query_row(
                "SELECT * FROM transitions WHERE id = ?1",
                params![transition_id as i64],
                row_to_transition,
            )
            .optional()
        })
        .await
    }

    async fn get_by_state(&self, state_number: u64) -> Result<Vec<Transition>> {
        with_retry(&self.pool, move |conn| {
            let mut stmt = conn.prepare("SELECT * FROM transitions WHERE current_state = ?1")?;
            let rows = stmt.query_map(params![state_number as i64], row_to_transition)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })
        .await
    }

    async fn get_last(&self, k: usize) -> Result<Vec<Transition>> {
        with_retry(&self.pool, move |conn| {
            let mut stmt =
                conn.prepare("SELECT * FROM transitions ORDER BY timestamp DESC LIMIT ?1")?;
            let rows = stmt.query_map(params![k as i64], row_to_transition)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })
        .await
    }

    async fn count(&self) -> Result<u64> {
        with_retry(&self.pool, |conn| {
            conn.query_row("SELECT COUNT(*) FROM transitions", [], |row| {
                row.get::<_, i64>(0)
            })
            .map(|count| count as u64)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_pool() -> Pool<SqliteConnectionManager> {
        let dir = tempfile::tempdir().unwrap();
        open_pool(&dir.path().join("csm.sqlite3")).unwrap()
    }

    #[tokio::test]
    async fn genesis_then_sequential_transition_round_trips() {
        let pool = test_pool();
        let states = SqliteStateRepository::new(pool.clone());
        let transitions = SqliteTransitionRepository::new(pool);

        let genesis = State::new(
            0,
            "genesis".to_string(),
            "main".to_string(),
            "{}".to_string(),
            Utc::now(),
            Some(HashMap::new()),
            HashMap::new(),
        );
        states.create(genesis).await.unwrap();

        let next = states
            .create_next(
                "do a thing".to_string(),
                "main".to_string(),
                "{}".to_string(),
                HashMap::new(),
                Utc::now(),
            )
            .await
            .unwrap();
        assert_eq!(next.state_number, 1);

        let transition = transitions
            .create_next(0, 1, None, Utc::now())
            .await
            .unwrap();
        assert_eq!(transition.transition_id, 1);
        assert!(transition.is_sequential());

        assert_eq!(states.count().await.unwrap(), 2);
        assert_eq!(transitions.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn set_current_rejects_unknown_state() {
        let pool = test_pool();
        let states = SqliteStateRepository::new(pool);
        assert!(!states.set_current(42).await.unwrap());
    }

    #[tokio::test]
    async fn search_matches_substring_in_prompt() {
        let pool = test_pool();
        let states = SqliteStateRepository::new(pool);
        states
            .create(State::new(
                0,
                "refactor the parser".to_string(),
                "main".to_string(),
                "{}".to_string(),
                Utc::now(),
                Some(HashMap::new()),
                HashMap::new(),
            ))
            .await
            .unwrap();

        let found = states.search("parser").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].state_number, 0);
    }
}
