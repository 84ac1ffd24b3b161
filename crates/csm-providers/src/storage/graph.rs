//! Graph storage backend over Neo4j via `neo4rs`, the crate the Rust
//! ecosystem reaches for here (see DESIGN.md for why it was added to this
//! workspace's dependency set).

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use csm_domain::error::{Error, Result};
use csm_domain::repositories::{StateRepository, TransitionRepository};
use csm_domain::value_objects::{FileHashDelta, State, Transition};
use neo4rs::{query, Graph, Node, Relation};

/// Opens a Neo4j driver at `uri` and ensures the uniqueness constraints the
/// state model relies on exist.
pub async fn connect(uri: &str, user: &str, password: &str) -> Result<Graph> {
    let graph = Graph::new(uri, user, password)
        .await
        .map_err(|e| Error::storage_with_source("failed to connect to neo4j", e))?;

    graph
        .run(query(
            "CREATE CONSTRAINT IF NOT EXISTS FOR (s:State) REQUIRE s.state_number IS UNIQUE",
        ))
        .await
        .map_err(|e| Error::storage_with_source("failed to create state_number constraint", e))?;
    graph
        .run(query(
            "CREATE CONSTRAINT IF NOT EXISTS FOR (s:State) REQUIRE s.hash IS UNIQUE",
        ))
        .await
        .map_err(|e| Error::storage_with_source("failed to create hash constraint", e))?;

    Ok(graph)
}

fn node_to_state(node: &Node) -> Result<State> {
    let state_number: i64 = node
        .get("state_number")
        .map_err(|e| Error::storage_with_source("malformed state node", e))?;
    let user_prompt: String = node.get("user_prompt").unwrap_or_default();
    let branch_name: String = node.get("branch_name").unwrap_or_default();
    let git_diff_info: String = node.get("git_diff_info").unwrap_or_default();
    let hash: String = node.get("hash").unwrap_or_default();
    let created_at: Option<String> = node.get("created_at").ok();
    let file_hashes_json: Option<String> = node.get("file_hashes").ok();
    let file_hash_deltas_json: Option<String> = node.get("file_hash_deltas").ok();

    Ok(State {
        state_number: state_number as u64,
        user_prompt,
        branch_name,
        git_diff_info,
        hash,
        created_at: created_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.timestamp_opt(0, 0).single().unwrap_or_default()),
        file_hashes: file_hashes_json
            .as_deref()
            .and_then(|s| serde_json::from_str(s).ok()),
        file_hash_deltas: file_hash_deltas_json
            .as_deref()
            .and_then(|s| serde_json::from_str::<HashMap<String, FileHashDelta>>(s).ok())
            .unwrap_or_default(),
    })
}

/// Neo4j-backed [`StateRepository`].
pub struct GraphStateRepository {
    graph: Graph,
}

impl GraphStateRepository {
    pub fn new(graph: Graph) -> Self {
        Self { graph }
    }
}

#[async_trait]
impl StateRepository for GraphStateRepository {
    async fn create(&self, state: State) -> Result<()> {
        let file_hash_deltas_json = serde_json::to_string(&state.file_hash_deltas).ok();
        self.graph
            .run(
                query(
                    "MERGE (s:State {state_number: $state_number})
                     SET s.user_prompt = $user_prompt,
                         s.branch_name = $branch_name,
                         s.git_diff_info = $git_diff_info,
                         s.hash = $hash,
                         s.created_at = $created_at,
                         s.file_hash_deltas = $file_hash_deltas",
                )
                .param("state_number", state.state_number as i64)
                .param("user_prompt", state.user_prompt)
                .param("branch_name", state.branch_name)
                .param("git_diff_info", state.git_diff_info)
                .param("hash", state.hash)
                .param("created_at", state.created_at.to_rfc3339())
                .param("file_hash_deltas", file_hash_deltas_json.unwrap_or_default()),
            )
            .await
            .map_err(|e| Error::storage_with_source("failed to create state node", e))
    }

    async fn create_next(
        &self,
        user_prompt: String,
        branch_name: String,
        git_diff_info: String,
        file_hash_deltas: HashMap<String, FileHashDelta>,
        created_at: DateTime<Utc>,
    ) -> Result<State> {
        let mut txn = self
            .graph
            .start_txn()
            .await
            .map_err(|e| Error::storage_with_source("failed to start neo4j transaction", e))?;

        let mut max_result = txn
            .execute(query("MATCH (s:State) RETURN MAX(s.state_number) AS max_state"))
            .await
            .map_err(|e| Error::storage_with_source("failed to query max state_number", e))?;
        let max_state: Option<i64> = max_result
            .next(&mut txn)
            .await
            .map_err(|e| Error::storage_with_source("failed to read max state_number", e))?
            .and_then(|row| row.get::<i64>("max_state").ok());
        let next_state_number = max_state.map_or(0, |n| n + 1);

        let hash = State::compute_hash(next_state_number as u64, &user_prompt, &branch_name, &git_diff_info);
        let deltas_json = serde_json::to_string(&file_hash_deltas).unwrap_or_default();

        txn.run(
            query(
                "CREATE (s:State {
                    state_number: $state_number,
                    user_prompt: $user_prompt,
                    branch_name: $branch_name,
                    git_diff_info: $git_diff_info,
                    hash: $hash,
                    created_at: $created_at,
                    file_hash_deltas: $file_hash_deltas
                })",
            )
            .param("state_number", next_state_number)
            .param("user_prompt", user_prompt.clone())
            .param("branch_name", branch_name.clone())
            .param("git_diff_info", git_diff_info.clone())
            .param("hash", hash.clone())
            .param("created_at", created_at.to_rfc3339())
            .param("file_hash_deltas", deltas_json),
        )
        .await
        .map_err(|e| Error::storage_with_source("failed to create next state node", e))?;

        txn.commit()
            .await
            .map_err(|e| Error::storage_with_source("failed to commit state creation", e))?;

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
    }

    async fn get_by_number(&self, state_number: u64) -> Result<Option<State>> {
        let mut result = self
            .graph
            .execute(
                query("MATCH (s:State {state_number: $state_number}) RETURN s")
                    .param("state_number", state_number as i64),
            )
            .await
            .map_err(|e| Error::storage_with_source("failed to query state by number", e))?;

        match result
            .next()
            .await
            .map_err(|e| Error::storage_with_source("failed to read state row", e))?
        {
            Some(row) => {
                let node: Node = row
                    .get("s")
                    .map_err(|e| Error::storage_with_source("malformed state row", e))?;
                Ok(Some(node_to_state(&node)?))
            }
            None => Ok(None),
        }
    }

    async fn get_current(&self) -> Result<Option<State>> {
        let mut result = self
            .graph
            .execute(query("MATCH (s:State) RETURN MAX(s.state_number) AS max_state"))
            .await
            .map_err(|e| Error::storage_with_source("failed to query current state", e))?;

        let max_state: Option<i64> = result
            .next()
            .await
            .map_err(|e| Error::storage_with_source("failed to read current state row", e))?
            .and_then(|row| row.get::<i64>("max_state").ok());

        match max_state {
            Some(state_number) => self.get_by_number(state_number as u64).await,
            None => Ok(None),
        }
    }

    async fn get_all(&self) -> Result<Vec<State>> {
        let mut result = self
            .graph
            .execute(query("MATCH (s:State) RETURN s ORDER BY s.state_number"))
            .await
            .map_err(|e| Error::storage_with_source("failed to query all states", e))?;

        let mut states = Vec::new();
        while let Some(row) = result
            .next()
            .await
            .map_err(|e| Error::storage_with_source("failed to read state row", e))?
        {
            let node: Node = row
                .get("s")
                .map_err(|e| Error::storage_with_source("malformed state row", e))?;
            states.push(node_to_state(&node)?);
        }
        Ok(states)
    }

    async fn exists(&self, state_number: u64) -> Result<bool> {
        Ok(self.get_by_number(state_number).await?.is_some())
    }

    async fn count(&self) -> Result<u64> {
        let mut result = self
            .graph
            .execute(query("MATCH (s:State) RETURN COUNT(s) AS count"))
            .await
            .map_err(|e| Error::storage_with_source("failed to count states", e))?;
        let count: i64 = result
            .next()
            .await
            .map_err(|e| Error::storage_with_source("failed to read state count", e))?
            .and_then(|row| row.get::<i64>("count").ok())
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn search(&self, text: &str) -> Result<Vec<State>> {
        let mut result = self
            .graph
            .execute(
                query(
                    "MATCH (s:State) WHERE s.user_prompt CONTAINS $text
                     RETURN s ORDER BY s.state_number",
                )
                .param("text", text),
            )
            .await
            .map_err(|e| Error::storage_with_source("failed to search states", e))?;

        let mut states = Vec::new();
        while let Some(row) = result
            .next()
            .await
            .map_err(|e| Error::storage_with_source("failed to read search row", e))?
        {
            let node: Node = row
                .get("s")
                .map_err(|e| Error::storage_with_source("malformed search row", e))?;
            states.push(node_to_state(&node)?);
        }
        Ok(states)
    }

    async fn delete(&self, state_number: u64) -> Result<()> {
        self.graph
            .run(
                query("MATCH (s:State {state_number: $state_number}) DETACH DELETE s")
                    .param("state_number", state_number as i64),
            )
            .await
            .map_err(|e| Error::storage_with_source("failed to delete state", e))
    }

    async fn set_current(&self, state_number: u64) -> Result<bool> {
        if !self.exists(state_number).await? {
            return Ok(false);
        }
        self.graph
            .run(
                query(
                    "MERGE (c:CurrentState {id: 1})
                     SET c.state_number = $state_number",
                )
                .param("state_number", state_number as i64),
            )
            .await
            .map_err(|e| Error::storage_with_source("failed to set current state pointer", e))?;
        Ok(true)
    }

    async fn update_user_prompt(&self, state_number: u64, user_prompt: String) -> Result<()> {
        self.graph
            .run(
                query("MATCH (s:State {state_number: $state_number}) SET s.user_prompt = $user_prompt")
                    .param("state_number", state_number as i64)
                    .param("user_prompt", user_prompt),
            )
            .await
            .map_err(|e| Error::storage_with_source("failed to update user prompt", e))
    }
}

/// Neo4j-backed [`TransitionRepository`].
pub struct GraphTransitionRepository {
    graph: Graph,
}

impl GraphTransitionRepository {
    pub fn new(graph: Graph) -> Self {
        Self { graph }
    }
}

fn relation_to_transition(rel: &Relation, current_state: i64, next_state: i64) -> Transition {
    let transition_id: i64 = rel.get("transition_id").unwrap_or(0);
    let user_prompt: Option<String> = rel.get("user_prompt").ok();
    let timestamp: Option<String> = rel.get("timestamp").ok();
    Transition {
        transition_id: transition_id as u64,
        current_state: current_state as u64,
        next_state: next_state as u64,
        user_prompt,
        timestamp: timestamp
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.timestamp_opt(0, 0).single().unwrap_or_default()),
    }
}

#[async_trait]
impl TransitionRepository for GraphTransitionRepository {
    async fn create(&self, transition: Transition) -> Result<()> {
        self.graph
            .run(
                query(
                    "MERGE (from:State {state_number: $current_state})
                     MERGE (to:State {state_number: $next_state})
                     CREATE (from)-[t:TRANSITION {
                        transition_id: $transition_id,
                        user_prompt: $user_prompt,
                        timestamp: $timestamp
                     }]->(to)",
                )
                .param("transition_id", transition.transition_id as i64)
                .param("current_state", transition.current_state as i64)
                .param("next_state", transition.next_state as i64)
                .param("user_prompt", transition.user_prompt.unwrap_or_default())
                .param("timestamp", transition.timestamp.to_rfc3339()),
            )
            .await
            .map_err(|e| Error::storage_with_source("failed to create transition edge", e))
    }

    async fn create_next(
        &self,
        current_state: u64,
        next_state: u64,
        user_prompt: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Result<Transition> {
        let mut txn = self
            .graph
            .start_txn()
            .await
            .map_err(|e| Error::storage_with_source("failed to start neo4j transaction", e))?;

        let mut max_result = txn
            .execute(query("MATCH ()-[t:TRANSITION]->() RETURN MAX(t.transition_id) AS max_id"))
            .await
            .map_err(|e| Error::storage_with_source("failed to query max transition_id", e))?;
        let max_id: Option<i64> = max_result
            .next(&mut txn)
            .await
            .map_err(|e| Error::storage_with_source("failed to read max transition_id", e))?
            .and_then(|row| row.get::<i64>("max_id").ok());
        let next_id = max_id.map_or(1, |n| n + 1);

        txn.run(
            query(
                "MERGE (from:State {state_number: $current_state})
                 MERGE (to:State {state_number: $next_state})
                 CREATE (from)-[t:TRANSITION {
                    transition_id: $transition_id,
                    user_prompt: $user_prompt,
                    timestamp: $timestamp
                 }]->(to)",
            )
            .param("transition_id", next_id)
            .param("current_state", current_state as i64)
            .param("next_state", next_state as i64)
            .param("user_prompt", user_prompt.clone().unwrap_or_default())
            .param("timestamp", timestamp.to_rfc3339()),
        )
        .await
        .map_err(|e| Error::storage_with_source("failed to create next transition edge", e))?;

        txn.commit()
            .await
            .map_err(|e| Error::storage_with_source("failed to commit transition creation", e))?;

        Ok(Transition {
            transition_id: next_id as u64,
            current_state,
            next_state,
            user_prompt,
            timestamp,
        })
    }

    async fn get_by_id(&self, transition_id: u64) -> Result<Option<Transition>> {
        let mut result = self
            .graph
            .execute(
                query(
                    "MATCH (from:State)-[t:TRANSITION {transition_id: $transition_id}]->(to:State)
                     RETURN t, from.state_number AS current_state, to.state_number AS next_state",
                )
                .param("transition_id", transition_id as i64),
            )
            .await
            .map_err(|e| Error::storage_with_source("failed to query transition by id", e))?;

        match result
            .next()
            .await
            .map_err(|e| Error::storage_with_source("failed to read transition row", e))?
        {
            Some(row) => {
                let rel: Relation = row
                    .get("t")
                    .map_err(|e| Error::storage_with_source("malformed transition row", e))?;
                let current_state: i64 = row.get("current_state").unwrap_or(0);
                let next_state: i64 = row.get("next_state").unwrap_or(0);
                Ok(Some(relation_to_transition(&rel, current_state, next_state)))
            }
            None => Ok(None),
        }
    }

    async fn get_by_state(&self, state_number: u64) -> Result<Vec<Transition>> {
        let mut result = self
            .graph
            .execute(
                query(
                    "MATCH (s:State {state_number: $state_number})
                     OPTIONAL MATCH (s)-[t:TRANSITION]->(next:State)
                     RETURN t, s.state_number AS current_state, next.state_number AS next_state",
                )
                .param("state_number", state_number as i64),
            )
            .await
            .map_err(|e| Error::storage_with_source("failed to query transitions by state", e))?;

        let mut transitions = Vec::new();
        while let Some(row) = result
            .next()
            .await
            .map_err(|e| Error::storage_with_source("failed to read transition row", e))?
        {
            if let Ok(rel) = row.get::<Relation>("t") {
                let current_state: i64 = row.get("current_state").unwrap_or(0);
                let next_state: i64 = row.get("next_state").unwrap_or(0);
                transitions.push(relation_to_transition(&rel, current_state, next_state));
            }
        }
        Ok(transitions)
    }

    async fn get_last(&self, k: usize) -> Result<Vec<Transition>> {
        let mut result = self
            .graph
            .execute(
                query(
                    "MATCH (from:State)-[t:TRANSITION]->(to:State)
                     WITH from, t, to ORDER BY t.timestamp DESC LIMIT $limit
                     RETURN t, from.state_number AS current_state, to.state_number AS next_state",
                )
                .param("limit", k as i64),
            )
            .await
            .map_err(|e| Error::storage_with_source("failed to query last transitions", e))?;

        let mut transitions = Vec::new();
        while let Some(row) = result
            .next()
            .await
            .map_err(|e| Error::storage_with_source("failed to read transition row", e))?
        {
            let rel: Relation = row
                .get("t")
                .map_err(|e| Error::storage_with_source("malformed transition row", e))?;
            let current_state: i64 = row.get("current_state").unwrap_or(0);
            let next_state: i64 = row.get("next_state").unwrap_or(0);
            transitions.push(relation_to_transition(&rel, current_state, next_state));
        }
        Ok(transitions)
    }

    async fn count(&self) -> Result<u64> {
        let mut result = self
            .graph
            .execute(query("MATCH ()-[t:TRANSITION]->() RETURN COUNT(t) AS count"))
            .await
            .map_err(|e| Error::storage_with_source("failed to count transitions", e))?;
        let count: i64 = result
            .next()
            .await
            .map_err(|e| Error::storage_with_source("failed to read transition count", e))?
            .and_then(|row| row.get::<i64>("count").ok())
            .unwrap_or(0);
        Ok(count as u64)
    }
}
