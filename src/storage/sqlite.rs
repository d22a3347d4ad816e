use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{debug, info};

use super::{SessionStore, SessionSummary};
use crate::config::DatabaseConfig;
use crate::error::{StorageError, StorageResult};
use crate::garden::{AstralCard, ScenarioStep, Session, SessionParts, SessionStatus, Side};

/// Static migrator that embeds migrations at compile time
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// SQLite-backed session store
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Open (creating if needed) the database file named in `config`.
    pub async fn new(config: &DatabaseConfig) -> StorageResult<Self> {
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Connection {
                message: format!("Failed to create database directory: {}", e),
            })?;
        }

        let database_url = format!("sqlite://{}?mode=rwc", config.path.display());

        let options = SqliteConnectOptions::from_str(&database_url)
            .map_err(|e| StorageError::Connection {
                message: format!("Invalid database URL: {}", e),
            })?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to connect to database: {}", e),
            })?;

        let storage = Self { pool };
        storage.run_migrations().await?;

        Ok(storage)
    }

    /// Private in-memory database, mostly for tests.
    ///
    /// Limited to one connection since every SQLite memory connection sees
    /// its own database.
    pub async fn new_in_memory() -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| StorageError::Connection {
                message: format!("Invalid database URL: {}", e),
            })?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to open in-memory database: {}", e),
            })?;

        let storage = Self { pool };
        storage.run_migrations().await?;

        Ok(storage)
    }

    async fn run_migrations(&self) -> StorageResult<()> {
        info!("Running database migrations...");

        MIGRATOR.run(&self.pool).await.map_err(|e| StorageError::Migration {
            message: format!("Failed to run migrations: {}", e),
        })?;

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Get the underlying pool for advanced queries
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl SessionStore for SqliteStorage {
    async fn save(&self, session: &Session) -> StorageResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO sessions (id, traveler, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                traveler = excluded.traveler,
                status = excluded.status,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(session.id())
        .bind(session.traveler().as_str())
        .bind(session.status().to_string())
        .bind(timestamp(session.created_at()))
        .bind(timestamp(session.updated_at()))
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM steps WHERE session_id = ?")
            .bind(session.id())
            .execute(&mut *tx)
            .await?;

        for (position, step) in session.history().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO steps (session_id, position, scenario_text, left_option, right_option,
                                   chosen_side, vision_text, astral_card)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(session.id())
            .bind(position as i64)
            .bind(&step.scenario_text)
            .bind(&step.left_option)
            .bind(&step.right_option)
            .bind(step.chosen_side.as_str())
            .bind(&step.vision_text)
            .bind(step.astral_card.map(|card| card.as_str()))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!(
            session_id = %session.id(),
            steps = session.history().len(),
            "Session saved"
        );
        Ok(())
    }

    async fn load(&self, id: &str) -> StorageResult<Session> {
        let row: Option<SessionRow> = sqlx::query_as(
            r#"
            SELECT id, traveler, status, created_at, updated_at
            FROM sessions
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let row = row.ok_or_else(|| StorageError::SessionNotFound {
            session_id: id.to_string(),
        })?;

        let steps: Vec<StepRow> = sqlx::query_as(
            r#"
            SELECT position, scenario_text, left_option, right_option,
                   chosen_side, vision_text, astral_card
            FROM steps
            WHERE session_id = ?
            ORDER BY position ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let corrupt = |reason: String| StorageError::CorruptData {
            session_id: id.to_string(),
            reason,
        };

        let mut history = Vec::with_capacity(steps.len());
        for (expected, step) in steps.into_iter().enumerate() {
            if step.position != expected as i64 {
                return Err(corrupt(format!(
                    "step positions are not contiguous: expected {}, found {}",
                    expected, step.position
                )));
            }
            history.push(step.into_step().map_err(corrupt)?);
        }

        let parts = SessionParts {
            status: row.status.parse::<SessionStatus>().map_err(corrupt)?,
            created_at: parse_timestamp(&row.created_at).map_err(corrupt)?,
            updated_at: parse_timestamp(&row.updated_at).map_err(corrupt)?,
            id: row.id,
            traveler: row.traveler,
            history,
        };

        Session::reconstitute(parts).map_err(corrupt)
    }

    async fn list(&self) -> StorageResult<Vec<SessionSummary>> {
        let rows: Vec<SummaryRow> = sqlx::query_as(
            r#"
            SELECT s.id, s.traveler, s.status, s.created_at, s.updated_at,
                   COUNT(st.position) AS steps
            FROM sessions s
            LEFT JOIN steps st ON st.session_id = s.id
            GROUP BY s.id
            ORDER BY s.updated_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let corrupt = |reason: String| StorageError::CorruptData {
                    session_id: row.id.clone(),
                    reason,
                };
                Ok(SessionSummary {
                    status: row.status.parse().map_err(corrupt)?,
                    created_at: parse_timestamp(&row.created_at).map_err(corrupt)?,
                    updated_at: parse_timestamp(&row.updated_at).map_err(corrupt)?,
                    steps: u32::try_from(row.steps).unwrap_or(u32::MAX),
                    id: row.id.clone(),
                    traveler: row.traveler,
                })
            })
            .collect()
    }

    async fn delete(&self, id: &str) -> StorageResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM steps WHERE session_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::SessionNotFound {
                session_id: id.to_string(),
            });
        }

        tx.commit().await?;
        info!(session_id = %id, "Session deleted");
        Ok(())
    }
}

/// Fixed-width UTC timestamps so that text ordering matches time ordering.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("invalid timestamp '{}': {}", raw, e))
}

// Internal row types for SQLx mapping
#[derive(sqlx::FromRow)]
struct SessionRow {
    id: String,
    traveler: String,
    status: String,
    created_at: String,
    updated_at: String,
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
    id: String,
    traveler: String,
    status: String,
    created_at: String,
    updated_at: String,
    steps: i64,
}

#[derive(sqlx::FromRow)]
struct StepRow {
    position: i64,
    scenario_text: String,
    left_option: String,
    right_option: String,
    chosen_side: String,
    vision_text: Option<String>,
    astral_card: Option<String>,
}

impl StepRow {
    fn into_step(self) -> Result<ScenarioStep, String> {
        let chosen_side = self.chosen_side.parse::<Side>()?;
        let astral_card = self
            .astral_card
            .as_deref()
            .map(AstralCard::from_str)
            .transpose()?;

        Ok(ScenarioStep {
            scenario_text: self.scenario_text,
            left_option: self.left_option,
            right_option: self.right_option,
            chosen_side,
            vision_text: self.vision_text,
            astral_card,
        })
    }
}
