//! Integration tests for the SQLite session store.

mod common;

use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;

use common::{fork, ScriptedNarrator, ARTORIAS};
use forking_paths::config::DatabaseConfig;
use forking_paths::error::StorageError;
use forking_paths::garden::{
    AstralCard, NarrationDraft, PathEngine, ScenarioStep, Session, SessionParts, SessionStatus,
    Side, TravelerIdentity,
};
use forking_paths::storage::{SessionStore, SqliteStorage};

async fn create_test_storage() -> SqliteStorage {
    SqliteStorage::new_in_memory()
        .await
        .expect("Failed to create in-memory storage")
}

fn step(n: usize, side: Side) -> ScenarioStep {
    ScenarioStep {
        scenario_text: format!("Island {}", n),
        left_option: format!("Left {}", n),
        right_option: format!("Right {}", n),
        chosen_side: side,
        vision_text: None,
        astral_card: None,
    }
}

fn session_with(id: &str, history: Vec<ScenarioStep>, updated_minutes_ago: i64) -> Session {
    let now = Utc::now();
    Session::reconstitute(SessionParts {
        id: id.to_string(),
        traveler: ARTORIAS.to_string(),
        history,
        status: SessionStatus::Active,
        created_at: now - Duration::hours(1),
        updated_at: now - Duration::minutes(updated_minutes_ago),
    })
    .unwrap()
}

/// Three islands, the last undecided, with a vision on the second.
async fn played_session() -> Session {
    let narrator = ScriptedNarrator::new(vec![
        fork(1),
        common::Scripted::Draft(
            NarrationDraft::new("A campfire", "Sit down", "Walk past")
                .with_vision("You see your fallen friends laughing")
                .with_astral_card(AstralCard::EchoOfRegret),
        ),
        fork(3),
    ]);
    let engine = PathEngine::new(narrator);

    let (mut session, outcome) = engine
        .begin(TravelerIdentity::new(ARTORIAS).unwrap())
        .await;
    outcome.unwrap();
    engine.choose(&mut session, Side::Left).unwrap();
    engine.advance(&mut session).await.unwrap();
    engine.choose(&mut session, Side::Right).unwrap();
    engine.advance(&mut session).await.unwrap();
    session
}

#[tokio::test]
async fn test_save_then_load_round_trips() {
    let storage = create_test_storage().await;
    let session = played_session().await;

    storage.save(&session).await.unwrap();
    let loaded = storage.load(session.id()).await.unwrap();

    assert_eq!(loaded, session);
    assert_eq!(loaded.history()[1].astral_card, Some(AstralCard::EchoOfRegret));
    assert_eq!(loaded.history()[2].chosen_side, Side::Undecided);
}

#[tokio::test]
async fn test_save_of_empty_session_round_trips() {
    let storage = create_test_storage().await;
    let session = Session::new(TravelerIdentity::new("A wandering bard").unwrap());

    storage.save(&session).await.unwrap();
    assert_eq!(storage.load(session.id()).await.unwrap(), session);
}

#[tokio::test]
async fn test_save_replaces_previous_record() {
    let storage = create_test_storage().await;
    let narrator = ScriptedNarrator::new(vec![fork(1), fork(2)]);
    let engine = PathEngine::new(narrator);

    let (mut session, _) = engine.begin(TravelerIdentity::new(ARTORIAS).unwrap()).await;
    storage.save(&session).await.unwrap();

    engine.choose(&mut session, Side::Right).unwrap();
    engine.advance(&mut session).await.unwrap();
    engine.end(&mut session).unwrap();
    storage.save(&session).await.unwrap();

    let loaded = storage.load(session.id()).await.unwrap();
    assert_eq!(loaded.history().len(), 2);
    assert_eq!(loaded.status(), SessionStatus::Ended);
    assert_eq!(loaded, session);
}

#[tokio::test]
async fn test_load_missing_session() {
    let storage = create_test_storage().await;
    let err = storage.load("no-such-session").await.unwrap_err();
    assert!(matches!(err, StorageError::SessionNotFound { ref session_id } if session_id == "no-such-session"));
}

#[tokio::test]
async fn test_load_rejects_undecided_step_in_the_middle() {
    let storage = create_test_storage().await;
    let session = session_with("s1", vec![step(1, Side::Left), step(2, Side::Left)], 0);
    storage.save(&session).await.unwrap();

    sqlx::query("UPDATE steps SET chosen_side = 'undecided' WHERE session_id = ? AND position = 0")
        .bind("s1")
        .execute(storage.pool())
        .await
        .unwrap();

    let err = storage.load("s1").await.unwrap_err();
    assert!(matches!(err, StorageError::CorruptData { .. }));
    assert!(err.to_string().contains("undecided"));
}

#[tokio::test]
async fn test_load_rejects_unknown_side() {
    let storage = create_test_storage().await;
    storage
        .save(&session_with("s1", vec![step(1, Side::Left)], 0))
        .await
        .unwrap();

    sqlx::query("UPDATE steps SET chosen_side = 'up' WHERE session_id = ?")
        .bind("s1")
        .execute(storage.pool())
        .await
        .unwrap();

    let err = storage.load("s1").await.unwrap_err();
    assert!(matches!(err, StorageError::CorruptData { .. }));
}

#[tokio::test]
async fn test_load_rejects_identical_options() {
    let storage = create_test_storage().await;
    storage
        .save(&session_with("s1", vec![step(1, Side::Undecided)], 0))
        .await
        .unwrap();

    sqlx::query("UPDATE steps SET right_option = left_option WHERE session_id = ?")
        .bind("s1")
        .execute(storage.pool())
        .await
        .unwrap();

    assert!(matches!(
        storage.load("s1").await,
        Err(StorageError::CorruptData { .. })
    ));
}

#[tokio::test]
async fn test_load_rejects_gap_in_positions() {
    let storage = create_test_storage().await;
    storage
        .save(&session_with(
            "s1",
            vec![step(1, Side::Left), step(2, Side::Undecided)],
            0,
        ))
        .await
        .unwrap();

    sqlx::query("UPDATE steps SET position = 5 WHERE session_id = ? AND position = 1")
        .bind("s1")
        .execute(storage.pool())
        .await
        .unwrap();

    let err = storage.load("s1").await.unwrap_err();
    assert!(err.to_string().contains("contiguous"));
}

#[tokio::test]
async fn test_load_rejects_bad_status_and_timestamp() {
    let storage = create_test_storage().await;
    storage.save(&session_with("s1", vec![], 0)).await.unwrap();
    storage.save(&session_with("s2", vec![], 0)).await.unwrap();

    sqlx::query("UPDATE sessions SET status = 'paused' WHERE id = 's1'")
        .execute(storage.pool())
        .await
        .unwrap();
    sqlx::query("UPDATE sessions SET created_at = 'last tuesday' WHERE id = 's2'")
        .execute(storage.pool())
        .await
        .unwrap();

    assert!(matches!(storage.load("s1").await, Err(StorageError::CorruptData { .. })));
    assert!(matches!(storage.load("s2").await, Err(StorageError::CorruptData { .. })));
}

#[tokio::test]
async fn test_list_orders_by_most_recent_update() {
    let storage = create_test_storage().await;
    storage
        .save(&session_with("old", vec![step(1, Side::Undecided)], 30))
        .await
        .unwrap();
    storage
        .save(&session_with(
            "new",
            vec![step(1, Side::Left), step(2, Side::Undecided)],
            1,
        ))
        .await
        .unwrap();
    storage.save(&session_with("mid", vec![], 10)).await.unwrap();

    let summaries = storage.list().await.unwrap();
    let ids: Vec<_> = summaries.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["new", "mid", "old"]);

    assert_eq!(summaries[0].steps, 2);
    assert_eq!(summaries[1].steps, 0);
    assert_eq!(summaries[2].steps, 1);
    assert_eq!(summaries[0].traveler, ARTORIAS);
    assert_eq!(summaries[0].status, SessionStatus::Active);
}

#[tokio::test]
async fn test_list_empty_store() {
    let storage = create_test_storage().await;
    assert!(storage.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_removes_session_and_steps() {
    let storage = create_test_storage().await;
    let session = played_session().await;
    storage.save(&session).await.unwrap();

    storage.delete(session.id()).await.unwrap();

    assert!(matches!(
        storage.load(session.id()).await,
        Err(StorageError::SessionNotFound { .. })
    ));
    let (remaining,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM steps")
        .fetch_one(storage.pool())
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}

#[tokio::test]
async fn test_delete_missing_session() {
    let storage = create_test_storage().await;
    assert!(matches!(
        storage.delete("ghost").await,
        Err(StorageError::SessionNotFound { .. })
    ));
}

#[tokio::test]
async fn test_on_disk_database_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = DatabaseConfig {
        path: dir.path().join("nested").join("garden.db"),
        max_connections: 2,
    };
    let session = played_session().await;

    {
        let storage = SqliteStorage::new(&config).await.unwrap();
        storage.save(&session).await.unwrap();
        storage.pool().close().await;
    }

    let reopened = SqliteStorage::new(&config).await.unwrap();
    assert_eq!(reopened.load(session.id()).await.unwrap(), session);
}
