use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::models::{PlanOutcome, PlanRecord, PlanResult};
use crate::types::{AppResult, PlannerError};

pub type SessionId = Uuid;

/// API key supplied by the user. Lives in memory only and never prints.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Blank input is treated as "no credential".
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into().trim().to_string();
        (!key.is_empty()).then_some(Self(key))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub credential: Option<Credential>,
    /// Latest attempt, successful or not
    pub last_plan: Option<PlanRecord>,
    /// Latest plan that completed; this is what gets exported
    pub last_success: Option<PlanResult>,
    pub created_at: DateTime<Utc>,
    pub last_used: DateTime<Utc>,
}

impl Session {
    fn new(credential: Option<Credential>, now: DateTime<Utc>) -> Self {
        Self {
            credential,
            last_plan: None,
            last_success: None,
            created_at: now,
            last_used: now,
        }
    }
}

pub const DEFAULT_IDLE_TTL_MINUTES: i64 = 60;

/// Per-session state, keyed so concurrent sessions never see each other's data.
///
/// Sessions untouched for longer than the idle TTL are dropped the next time
/// a session is created, or when `purge_idle` is called.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<SessionId, Session>>>,
    default_credential: Option<Credential>,
    idle_ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(None)
    }
}

impl SessionStore {
    /// New sessions start with `default_credential` (e.g. from `OPENAI_API_KEY`).
    pub fn new(default_credential: Option<Credential>) -> Self {
        Self::with_ttl(default_credential, Duration::minutes(DEFAULT_IDLE_TTL_MINUTES))
    }

    pub fn with_ttl(default_credential: Option<Credential>, idle_ttl: Duration) -> Self {
        Self {
            inner: Arc::default(),
            default_credential,
            idle_ttl,
        }
    }

    pub async fn create(&self) -> SessionId {
        let now = Utc::now();
        self.purge_idle_at(now).await;

        let id = Uuid::new_v4();
        let mut guard = self.inner.write().await;
        guard.insert(id, Session::new(self.default_credential.clone(), now));
        id
    }

    /// Snapshot of the session. Counts as activity.
    pub async fn get(&self, id: SessionId) -> AppResult<Session> {
        let mut guard = self.inner.write().await;
        let session = guard.get_mut(&id).ok_or_else(|| not_found(id))?;
        session.last_used = Utc::now();
        Ok(session.clone())
    }

    pub async fn set_credential(&self, id: SessionId, credential: Option<Credential>) -> AppResult<()> {
        let mut guard = self.inner.write().await;
        let session = guard.get_mut(&id).ok_or_else(|| not_found(id))?;
        session.credential = credential;
        session.last_used = Utc::now();
        Ok(())
    }

    pub async fn clear_credential(&self, id: SessionId) -> AppResult<()> {
        self.set_credential(id, None).await
    }

    pub async fn credential(&self, id: SessionId) -> AppResult<Option<Credential>> {
        Ok(self.get(id).await?.credential)
    }

    pub async fn record_plan(&self, id: SessionId, record: PlanRecord) -> AppResult<()> {
        let mut guard = self.inner.write().await;
        let session = guard.get_mut(&id).ok_or_else(|| not_found(id))?;
        if let PlanOutcome::Completed(plan) = &record.outcome {
            session.last_success = Some(plan.clone());
        }
        session.last_plan = Some(record);
        session.last_used = Utc::now();
        Ok(())
    }

    pub async fn last_plan(&self, id: SessionId) -> AppResult<Option<PlanRecord>> {
        Ok(self.get(id).await?.last_plan)
    }

    /// Most recent completed plan, even if a later attempt failed.
    pub async fn last_success(&self, id: SessionId) -> AppResult<Option<PlanResult>> {
        Ok(self.get(id).await?.last_success)
    }

    pub async fn remove(&self, id: SessionId) -> bool {
        let mut guard = self.inner.write().await;
        guard.remove(&id).is_some()
    }

    /// Drop every session idle for longer than the TTL. Returns how many went.
    pub async fn purge_idle(&self) -> usize {
        self.purge_idle_at(Utc::now()).await
    }

    async fn purge_idle_at(&self, now: DateTime<Utc>) -> usize {
        let mut guard = self.inner.write().await;
        let before = guard.len();
        guard.retain(|_, session| now - session.last_used <= self.idle_ttl);
        let purged = before - guard.len();
        if purged > 0 {
            debug!(purged, remaining = guard.len(), "Expired idle sessions");
        }
        purged
    }

    pub async fn count(&self) -> usize {
        self.inner.read().await.len()
    }
}

fn not_found(id: SessionId) -> PlannerError {
    PlannerError::SessionNotFound(id.to_string())
}
