//! Server module for MCP protocol handling.
//!
//! This module provides:
//! - MCP server implementation over stdio
//! - Garden tool handlers and routing
//! - Shared application state, including per-session locks

mod handlers;
mod mcp;

pub use handlers::*;
pub use mcp::*;

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tokio::sync::Mutex;

use crate::config::Config;
use crate::garden::PathEngine;
use crate::storage::SqliteStorage;

/// Application state shared across handlers.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// SQLite session store.
    pub storage: SqliteStorage,
    /// Engine that drives every session mutation.
    pub engine: PathEngine,
    session_locks: Mutex<HashMap<String, Weak<Mutex<()>>>>,
}

impl AppState {
    /// Create new application state
    pub fn new(config: Config, storage: SqliteStorage, engine: PathEngine) -> Self {
        tracing::info!(
            scenario_pipe = %config.pipes.scenario,
            vision_pipe = %config.pipes.vision,
            "AppState initializing with pipe configuration"
        );

        Self {
            config,
            storage,
            engine,
            session_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Lock guarding read-modify-write cycles on one session.
    ///
    /// Operations on different sessions never contend. The registry only
    /// holds weak handles, so an entry lives as long as some caller holds
    /// or waits on its lock.
    pub async fn session_lock(&self, session_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.session_locks.lock().await;
        if let Some(lock) = locks.get(session_id).and_then(Weak::upgrade) {
            return lock;
        }

        locks.retain(|_, lock| lock.strong_count() > 0);
        let lock = Arc::new(Mutex::new(()));
        locks.insert(session_id.to_string(), Arc::downgrade(&lock));
        lock
    }

    /// Number of sessions whose lock is currently held or awaited.
    pub async fn active_session_locks(&self) -> usize {
        self.session_locks
            .lock()
            .await
            .values()
            .filter(|lock| lock.strong_count() > 0)
            .count()
    }
}

/// Shared application state handle
pub type SharedState = Arc<AppState>;
