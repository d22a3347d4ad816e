//! Persistence for garden sessions.
//!
//! A session is saved whole: the session row and every step, replaced in a
//! single transaction. Loading re-checks the history invariants so a record
//! edited by hand cannot slip a malformed journey back into the engine.

mod sqlite;

pub use sqlite::SqliteStorage;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageResult;
use crate::garden::{Session, SessionStatus};

/// Short description of a saved session, used for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    pub traveler: String,
    pub status: SessionStatus,
    /// Number of islands visited.
    pub steps: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Storage for whole sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert or replace the session and its full history.
    async fn save(&self, session: &Session) -> StorageResult<()>;

    /// Load a session. Fails with `SessionNotFound` when absent and
    /// `CorruptData` when the stored record breaks the history invariants.
    async fn load(&self, id: &str) -> StorageResult<Session>;

    /// All saved sessions, most recently updated first.
    async fn list(&self) -> StorageResult<Vec<SessionSummary>>;

    /// Remove a session and its steps.
    async fn delete(&self, id: &str) -> StorageResult<()>;
}
