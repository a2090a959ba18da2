//! In-memory session store.
//!
//! Sessions live for the lifetime of the process. Each one sits behind its own
//! async mutex, so two requests from the same client run one after the other
//! while different clients proceed in parallel.

use async_trait::async_trait;
use promptwright_core::error::SessionError;
use promptwright_core::session::{Session, SessionHandle, SessionId, SessionLease, SessionStore};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info};

struct Entry {
    handle: SessionHandle,
    last_access: Instant,
}

/// A process-local [`SessionStore`] with capacity and idle-time limits.
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Entry>>,
    max_sessions: usize,
    idle_ttl: Option<Duration>,
}

impl InMemorySessionStore {
    /// `idle_ttl = None` keeps sessions until capacity eviction.
    pub fn new(max_sessions: usize, idle_ttl: Option<Duration>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions: max_sessions.max(1),
            idle_ttl,
        }
    }

    pub fn from_config(config: &promptwright_config::SessionConfig) -> Self {
        let idle_ttl = (config.idle_ttl_minutes > 0)
            .then(|| Duration::from_secs(config.idle_ttl_minutes * 60));
        Self::new(config.max_sessions, idle_ttl)
    }

    fn is_expired(&self, entry: &Entry, now: Instant) -> bool {
        self.idle_ttl
            .is_some_and(|ttl| now.duration_since(entry.last_access) >= ttl)
    }

    fn purge_locked(&self, sessions: &mut HashMap<SessionId, Entry>, now: Instant) -> usize {
        let before = sessions.len();
        sessions.retain(|_, entry| !self.is_expired(entry, now));
        before - sessions.len()
    }

    /// Remove the least recently used session.
    fn evict_oldest(sessions: &mut HashMap<SessionId, Entry>) {
        if let Some(oldest) = sessions
            .iter()
            .min_by_key(|(_, entry)| entry.last_access)
            .map(|(id, _)| id.clone())
        {
            sessions.remove(&oldest);
            info!(session = %oldest, "Session store at capacity, evicted least recently used");
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::from_config(&promptwright_config::SessionConfig::default())
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn get_or_create(&self, id: Option<&SessionId>) -> Result<SessionLease, SessionError> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;

        let purged = self.purge_locked(&mut sessions, now);
        if purged > 0 {
            debug!(purged, "Expired idle sessions");
        }

        if let Some(id) = id {
            if let Some(entry) = sessions.get_mut(id) {
                entry.last_access = now;
                return Ok(SessionLease {
                    id: id.clone(),
                    handle: entry.handle.clone(),
                    created: false,
                });
            }
        }

        if sessions.len() >= self.max_sessions {
            Self::evict_oldest(&mut sessions);
        }

        // Unknown ids are never adopted; the client always gets a fresh one.
        let new_id = SessionId::new();
        let handle = Arc::new(Mutex::new(Session::new(new_id.clone())));
        sessions.insert(
            new_id.clone(),
            Entry {
                handle: handle.clone(),
                last_access: now,
            },
        );
        debug!(session = %new_id, total = sessions.len(), "Session created");

        Ok(SessionLease {
            id: new_id,
            handle,
            created: true,
        })
    }

    async fn get(&self, id: &SessionId) -> Result<Option<SessionHandle>, SessionError> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(id) {
            Some(entry) if !self.is_expired(entry, now) => {
                entry.last_access = now;
                Ok(Some(entry.handle.clone()))
            }
            Some(_) => {
                sessions.remove(id);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn remove(&self, id: &SessionId) -> Result<bool, SessionError> {
        Ok(self.sessions.write().await.remove(id).is_some())
    }

    async fn count(&self) -> Result<usize, SessionError> {
        Ok(self.sessions.read().await.len())
    }

    async fn purge_expired(&self) -> Result<usize, SessionError> {
        let mut sessions = self.sessions.write().await;
        Ok(self.purge_locked(&mut sessions, Instant::now()))
    }
}
