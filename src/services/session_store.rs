// src/services/session_store.rs
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::info;
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::errors::FitGeniusError;
use crate::models::{StyleMode, ViewState};
use crate::session::{Session, SessionSnapshot};

/// In-memory sessions; nothing outlives the process.
///
/// With an idle TTL, a session untouched for longer than the TTL is treated as
/// gone: lookups report `SessionNotFound` and sweeps drop it from the map.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Session>>,
    idle_ttl: Option<chrono::Duration>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: Uuid,
    pub view: ViewState,
    pub active_style: StyleMode,
    pub has_analysis: bool,
    pub updated_at: DateTime<Utc>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` keeps sessions until they are deleted.
    pub fn with_idle_ttl(ttl: Option<Duration>) -> Self {
        Self {
            sessions: RwLock::default(),
            idle_ttl: ttl.and_then(|ttl| chrono::Duration::from_std(ttl).ok()),
        }
    }

    fn is_expired(&self, session: &Session, now: DateTime<Utc>) -> bool {
        self.idle_ttl
            .is_some_and(|ttl| now.signed_duration_since(session.updated_at) > ttl)
    }

    fn evict(&self, sessions: &mut HashMap<Uuid, Session>) -> usize {
        let now = Utc::now();
        let before = sessions.len();
        sessions.retain(|_, s| !self.is_expired(s, now));
        before - sessions.len()
    }

    pub async fn create(&self) -> SessionSnapshot {
        let session = Session::new();
        let snapshot = session.snapshot();
        let mut sessions = self.sessions.write().await;
        let evicted = self.evict(&mut sessions);
        if evicted > 0 {
            info!("Evicted {} idle session(s)", evicted);
        }
        sessions.insert(session.id, session);
        info!("Created session {}", snapshot.id);
        snapshot
    }

    /// Drops every session idle for longer than the TTL.
    pub async fn purge_expired(&self) -> usize {
        let evicted = self.evict(&mut *self.sessions.write().await);
        if evicted > 0 {
            info!("Evicted {} idle session(s)", evicted);
        }
        evicted
    }

    /// Runs `purge_expired` every `every` until the runtime shuts down.
    pub fn spawn_sweeper(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                self.purge_expired().await;
            }
        })
    }

    /// Runs `f` under the write lock. Never hold this across an await on the model.
    pub async fn update<F, R>(&self, id: Uuid, f: F) -> Result<R, FitGeniusError>
    where
        F: FnOnce(&mut Session) -> R,
    {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&id) {
            Some(session) if !self.is_expired(session, Utc::now()) => Ok(f(session)),
            Some(_) => {
                sessions.remove(&id);
                info!("Evicted idle session {}", id);
                Err(FitGeniusError::SessionNotFound(id))
            }
            None => Err(FitGeniusError::SessionNotFound(id)),
        }
    }

    pub async fn read<F, R>(&self, id: Uuid, f: F) -> Result<R, FitGeniusError>
    where
        F: FnOnce(&Session) -> R,
    {
        let sessions = self.sessions.read().await;
        let session = sessions
            .get(&id)
            .filter(|s| !self.is_expired(s, Utc::now()))
            .ok_or(FitGeniusError::SessionNotFound(id))?;
        Ok(f(session))
    }

    pub async fn snapshot(&self, id: Uuid) -> Result<SessionSnapshot, FitGeniusError> {
        self.read(id, Session::snapshot).await
    }

    pub async fn list(&self) -> Vec<SessionSummary> {
        let sessions = self.sessions.read().await;
        let now = Utc::now();
        let mut summaries: Vec<SessionSummary> = sessions
            .values()
            .filter(|s| !self.is_expired(s, now))
            .map(|s| SessionSummary {
                id: s.id,
                view: s.view,
                active_style: s.active_style,
                has_analysis: s.analysis.is_some(),
                updated_at: s.updated_at,
            })
            .collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        summaries
    }

    pub async fn remove(&self, id: Uuid) -> Result<(), FitGeniusError> {
        self.sessions
            .write()
            .await
            .remove(&id)
            .map(|_| info!("Dropped session {}", id))
            .ok_or(FitGeniusError::SessionNotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sessions_are_isolated() {
        let store = SessionStore::new();
        let a = store.create().await;
        let b = store.create().await;

        store.update(a.id, |s| s.start()).await.unwrap().unwrap();

        assert_eq!(store.snapshot(a.id).await.unwrap().view, ViewState::Uploading);
        assert_eq!(store.snapshot(b.id).await.unwrap().view, ViewState::Landing);
        assert_eq!(store.list().await.len(), 2);
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let store = SessionStore::new();
        let err = store.snapshot(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, FitGeniusError::SessionNotFound(_)));

        let created = store.create().await;
        store.remove(created.id).await.unwrap();
        assert!(store.remove(created.id).await.is_err());
    }

    fn idle_for(session: &mut Session, hours: i64) {
        session.updated_at = Utc::now() - chrono::Duration::hours(hours);
    }

    #[tokio::test]
    async fn idle_sessions_expire() {
        let store = SessionStore::with_idle_ttl(Some(Duration::from_secs(3600)));
        let stale = store.create().await;
        let fresh = store.create().await;

        store.update(stale.id, |s| idle_for(s, 2)).await.unwrap();

        let err = store.snapshot(stale.id).await.unwrap_err();
        assert!(matches!(err, FitGeniusError::SessionNotFound(id) if id == stale.id));
        assert!(store.snapshot(fresh.id).await.is_ok());
        assert_eq!(store.list().await.len(), 1);

        let err = store.update(stale.id, |s| s.start()).await.unwrap_err();
        assert!(matches!(err, FitGeniusError::SessionNotFound(_)));
        assert_eq!(store.purge_expired().await, 0);
    }

    #[tokio::test]
    async fn creating_a_session_sweeps_idle_ones() {
        let store = SessionStore::with_idle_ttl(Some(Duration::from_secs(60)));
        let first = store.create().await;
        let second = store.create().await;
        store.update(first.id, |s| idle_for(s, 1)).await.unwrap();
        store.update(second.id, |s| idle_for(s, 1)).await.unwrap();

        store.create().await;
        assert_eq!(store.sessions.read().await.len(), 1);
    }

    #[tokio::test]
    async fn sweep_drops_only_expired_sessions() {
        let store = SessionStore::with_idle_ttl(Some(Duration::from_secs(60)));
        let stale = store.create().await;
        let fresh = store.create().await;
        store.update(stale.id, |s| idle_for(s, 1)).await.unwrap();

        assert_eq!(store.purge_expired().await, 1);
        assert!(store.snapshot(fresh.id).await.is_ok());
    }

    #[tokio::test]
    async fn no_ttl_keeps_sessions_forever() {
        let store = SessionStore::new();
        let old = store.create().await;
        store.update(old.id, |s| idle_for(s, 24 * 365)).await.unwrap();

        assert_eq!(store.purge_expired().await, 0);
        assert!(store.snapshot(old.id).await.is_ok());
    }
}
