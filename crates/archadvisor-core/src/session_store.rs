//! Durable per-session state over a key/value backend.
//!
//! One document per session under `archadvisor:session:{id}` with a 24h TTL,
//! plus one capped recency list. The workflow task is the only writer during
//! a session's lifetime, so plain read-modify-write is sufficient.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use redis::AsyncCommands;
use tokio::sync::RwLock;

use archadvisor_types::{AgentMessage, SessionState, SessionStatus};

pub const SESSION_TTL_SECS: u64 = 86_400;
const KEY_PREFIX: &str = "archadvisor:session:";
const RECENT_KEY: &str = "archadvisor:session:recent";
const RECENT_CAP: usize = 100;

/// Minimal key/value surface the store needs from its backend.
#[async_trait]
pub trait KvBackend: Send + Sync {
    async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) -> anyhow::Result<()>;
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn delete(&self, key: &str) -> anyhow::Result<()>;
    async fn exists(&self, key: &str) -> anyhow::Result<bool>;
    /// Prepend to a list and trim it to `cap` entries.
    async fn push_capped(&self, key: &str, value: String, cap: usize) -> anyhow::Result<()>;
    async fn list_range(&self, key: &str, limit: usize) -> anyhow::Result<Vec<String>>;
    async fn ping(&self) -> anyhow::Result<()>;
}

pub struct RedisBackend {
    manager: redis::aio::ConnectionManager,
}

impl RedisBackend {
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(url).context("invalid redis url")?;
        let manager = redis::aio::ConnectionManager::new(client)
            .await
            .context("redis connection failed")?;
        Ok(Self { manager })
    }
}

#[async_trait]
impl KvBackend for RedisBackend {
    async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) -> anyhow::Result<()> {
        let mut conn = self.manager.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs()).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let mut conn = self.manager.clone();
        Ok(conn.get(key).await?)
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        let mut conn = self.manager.clone();
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> anyhow::Result<bool> {
        let mut conn = self.manager.clone();
        Ok(conn.exists(key).await?)
    }

    async fn push_capped(&self, key: &str, value: String, cap: usize) -> anyhow::Result<()> {
        let mut conn = self.manager.clone();
        conn.lpush::<_, _, ()>(key, value).await?;
        conn.ltrim::<_, ()>(key, 0, cap as isize - 1).await?;
        Ok(())
    }

    async fn list_range(&self, key: &str, limit: usize) -> anyhow::Result<Vec<String>> {
        let mut conn = self.manager.clone();
        Ok(conn.lrange(key, 0, limit as isize - 1).await?)
    }

    async fn ping(&self) -> anyhow::Result<()> {
        let mut conn = self.manager.clone();
        redis::cmd("PING").query_async::<()>(&mut conn).await?;
        Ok(())
    }
}

/// In-memory backend with the same TTL semantics. Used when Redis is
/// unreachable at boot and as the test substrate.
#[derive(Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, (String, Option<Instant>)>>,
    lists: RwLock<HashMap<String, Vec<String>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvBackend for MemoryBackend {
    async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) -> anyhow::Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), (value, Some(Instant::now() + ttl)));
        Ok(())
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).and_then(|(value, expiry)| {
            match expiry {
                Some(expiry) if *expiry <= Instant::now() => None,
                _ => Some(value.clone()),
            }
        }))
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> anyhow::Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    async fn push_capped(&self, key: &str, value: String, cap: usize) -> anyhow::Result<()> {
        let mut lists = self.lists.write().await;
        let list = lists.entry(key.to_string()).or_default();
        list.insert(0, value);
        list.truncate(cap);
        Ok(())
    }

    async fn list_range(&self, key: &str, limit: usize) -> anyhow::Result<Vec<String>> {
        Ok(self
            .lists
            .read()
            .await
            .get(key)
            .map(|list| list.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn KvBackend>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self { backend }
    }

    fn key(session_id: &str) -> String {
        format!("{KEY_PREFIX}{session_id}")
    }

    /// Write the initial state and prepend the id to the recency list.
    pub async fn create(&self, state: &SessionState) -> anyhow::Result<()> {
        let value = serde_json::to_string(state)?;
        self.backend
            .set_with_ttl(&Self::key(&state.session_id), value, Duration::from_secs(SESSION_TTL_SECS))
            .await?;
        self.backend
            .push_capped(RECENT_KEY, state.session_id.clone(), RECENT_CAP)
            .await?;
        tracing::info!(session_id = %state.session_id, "session_created");
        Ok(())
    }

    /// None when absent or expired.
    pub async fn get(&self, session_id: &str) -> anyhow::Result<Option<SessionState>> {
        match self.backend.get(&Self::key(session_id)).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Read-modify-write. Fails if the session is absent. Last writer wins;
    /// the workflow task is the single writer in the core flow.
    pub async fn update(
        &self,
        session_id: &str,
        mutate: impl FnOnce(&mut SessionState) + Send,
    ) -> anyhow::Result<()> {
        let mut state = self
            .get(session_id)
            .await?
            .with_context(|| format!("session {session_id} not found"))?;
        mutate(&mut state);
        let value = serde_json::to_string(&state)?;
        self.backend
            .set_with_ttl(&Self::key(session_id), value, Duration::from_secs(SESSION_TTL_SECS))
            .await
    }

    pub async fn update_status(&self, session_id: &str, status: SessionStatus) -> anyhow::Result<()> {
        self.update(session_id, |state| state.status = status).await
    }

    pub async fn append_message(&self, session_id: &str, message: AgentMessage) -> anyhow::Result<()> {
        self.update(session_id, |state| state.messages.push(message)).await
    }

    /// Promote the workflow-terminal state into the stored record. A stored
    /// `cancelled` status wins over a late workflow write.
    pub async fn store_output(&self, session_id: &str, terminal: &SessionState) -> anyhow::Result<()> {
        let terminal = terminal.clone();
        self.update(session_id, move |state| {
            if state.status == SessionStatus::Cancelled {
                return;
            }
            state.status = terminal.status;
            state.current_design = terminal.current_design;
            state.review_findings = terminal.review_findings;
            state.cost_analysis = terminal.cost_analysis;
            state.final_document = terminal.final_document;
            state.rendered_markdown = terminal.rendered_markdown;
            state.diagrams = terminal.diagrams;
            state.messages = terminal.messages;
            state.validation_report = terminal.validation_report;
            state.validation_passed = terminal.validation_passed;
            state.validation_score = terminal.validation_score;
            state.validation_round = terminal.validation_round;
            state.debate_round = terminal.debate_round;
            state.total_cost_usd = terminal.total_cost_usd;
            state.errors = terminal.errors;
            state.completed_at = terminal.completed_at;
        })
        .await
    }

    /// Recent session ids, newest first.
    pub async fn list_recent(&self, limit: usize) -> anyhow::Result<Vec<String>> {
        self.backend.list_range(RECENT_KEY, limit).await
    }

    pub async fn delete(&self, session_id: &str) -> anyhow::Result<()> {
        self.backend.delete(&Self::key(session_id)).await?;
        tracing::info!(session_id, "session_deleted");
        Ok(())
    }

    pub async fn exists(&self, session_id: &str) -> anyhow::Result<bool> {
        self.backend.exists(&Self::key(session_id)).await
    }

    pub async fn ping(&self) -> anyhow::Result<()> {
        self.backend.ping().await
    }
}
