use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::debug;

use super::Officer;
use crate::storage::RepositoryError;
use crate::verification::Clock;

/// Bearer session handed out at login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub token: String,
    pub officer: Officer,
    pub expires_at: DateTime<Utc>,
}

/// Persistent token table. Every service instance pointed at the same backend
/// sees the same sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn save_session(&self, session: &Session) -> Result<(), RepositoryError>;

    /// Session for `token` unless it expired at or before `now`.
    async fn find_session(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, RepositoryError>;

    /// Returns `false` when no session carried `token`.
    async fn delete_session(&self, token: &str) -> Result<bool, RepositoryError>;

    /// Drops sessions that expired at or before `now`, returning how many.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError>;
}

/// Mints tokens and applies the session lifetime on top of a [`SessionStore`].
pub struct SessionRegistry {
    store: Arc<dyn SessionStore>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn SessionStore>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self { store, ttl, clock }
    }

    pub async fn open(&self, officer: Officer) -> Result<Session, RepositoryError> {
        let now = self.clock.now();
        let purged = self.store.purge_expired(now).await?;
        if purged > 0 {
            debug!(purged, "expired sessions removed");
        }

        let session = Session {
            token: uuid::Uuid::new_v4().simple().to_string(),
            officer,
            expires_at: now + self.ttl,
        };
        self.store.save_session(&session).await?;
        Ok(session)
    }

    /// Live session for `token`, if any.
    pub async fn resolve(&self, token: &str) -> Result<Option<Officer>, RepositoryError> {
        let session = self.store.find_session(token, self.clock.now()).await?;
        Ok(session.map(|session| session.officer))
    }

    pub async fn close(&self, token: &str) -> Result<bool, RepositoryError> {
        self.store.delete_session(token).await
    }
}
