use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use super::SharedState;
use crate::error::{McpError, McpResult};
use crate::garden::{ScenarioStep, Session, SessionStatus, Side, TravelerIdentity};
use crate::storage::SessionStore;

/// Route tool calls to appropriate handlers
pub async fn handle_tool_call(
    state: &SharedState,
    tool_name: &str,
    arguments: Option<Value>,
) -> McpResult<Value> {
    info!(tool = %tool_name, "Routing tool call");

    match tool_name {
        "garden_start" => handle_start(state, arguments).await,
        "garden_choose" => handle_choose(state, arguments).await,
        "garden_advance" => handle_advance(state, arguments).await,
        "garden_end" => handle_end(state, arguments).await,
        "garden_load" => handle_load(state, arguments).await,
        "garden_list" => handle_list(state).await,
        "garden_delete" => handle_delete(state, arguments).await,
        _ => Err(McpError::UnknownTool {
            tool_name: tool_name.to_string(),
        }),
    }
}

/// What the traveler may see of one island. The astral card stays hidden.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepView {
    pub island: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vision: Option<String>,
    pub scenario: String,
    pub left_path: String,
    pub right_path: String,
    pub chosen: Side,
}

/// Tool-facing view of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionView {
    pub session_id: String,
    pub status: SessionStatus,
    pub islands: usize,
    /// The latest island, absent before the journey begins.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<StepView>,
    /// Every island, only filled in by `garden_load`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<StepView>>,
}

impl StepView {
    fn new(index: usize, step: &ScenarioStep) -> Self {
        Self {
            island: index + 1,
            vision: step.vision_text.clone(),
            scenario: step.scenario_text.clone(),
            left_path: step.left_option.clone(),
            right_path: step.right_option.clone(),
            chosen: step.chosen_side,
        }
    }
}

impl SessionView {
    pub fn current(session: &Session) -> Self {
        let islands = session.history().len();
        Self {
            session_id: session.id().to_string(),
            status: session.status(),
            islands,
            current: session
                .current_step()
                .map(|step| StepView::new(islands - 1, step)),
            history: None,
        }
    }

    pub fn full(session: &Session) -> Self {
        Self {
            history: Some(
                session
                    .history()
                    .iter()
                    .enumerate()
                    .map(|(index, step)| StepView::new(index, step))
                    .collect(),
            ),
            ..Self::current(session)
        }
    }
}

#[derive(Debug, Deserialize)]
struct StartParams {
    traveler: Option<String>,
    session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChooseParams {
    session_id: String,
    side: String,
}

#[derive(Debug, Deserialize)]
struct SessionParams {
    session_id: String,
}

/// Handle garden_start: begin a new journey, or retry the opening of an
/// existing session whose first narration failed.
async fn handle_start(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: StartParams = parse_arguments("garden_start", arguments)?;

    if let Some(session_id) = params.session_id {
        return mutate_session(state, &session_id, |engine, session| {
            Box::pin(engine.start(session))
        })
        .await;
    }

    let traveler = match params.traveler {
        Some(traveler) => TravelerIdentity::new(traveler)?,
        None => {
            return Err(McpError::InvalidParameters {
                tool_name: "garden_start".to_string(),
                message: "either traveler or session_id is required".to_string(),
            })
        }
    };

    let (session, outcome) = state.engine.begin(traveler).await;
    let lock = state.session_lock(session.id()).await;
    let _guard = lock.lock().await;

    // The empty session is kept either way so the opening can be retried.
    state.storage.save(&session).await?;

    match outcome {
        Ok(()) => to_value(SessionView::current(&session)),
        Err(e) => {
            warn!(session_id = %session.id(), error = %e, "Opening narration failed");
            Err(McpError::ExecutionFailed {
                message: format!(
                    "{} (session {} was saved; call garden_start with session_id to retry)",
                    e,
                    session.id()
                ),
            })
        }
    }
}

async fn handle_choose(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: ChooseParams = parse_arguments("garden_choose", arguments)?;
    let side: Side = params
        .side
        .parse()
        .map_err(|message| McpError::InvalidParameters {
            tool_name: "garden_choose".to_string(),
            message,
        })?;

    mutate_session(state, &params.session_id, move |engine, session| {
        Box::pin(async move { engine.choose(session, side) })
    })
    .await
}

async fn handle_advance(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: SessionParams = parse_arguments("garden_advance", arguments)?;
    mutate_session(state, &params.session_id, |engine, session| {
        Box::pin(engine.advance(session))
    })
    .await
}

async fn handle_end(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: SessionParams = parse_arguments("garden_end", arguments)?;
    mutate_session(state, &params.session_id, |engine, session| {
        Box::pin(async move { engine.end(session) })
    })
    .await
}

async fn handle_load(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: SessionParams = parse_arguments("garden_load", arguments)?;
    let session = state.storage.load(&params.session_id).await?;
    to_value(SessionView::full(&session))
}

async fn handle_list(state: &SharedState) -> McpResult<Value> {
    let sessions = state.storage.list().await?;
    Ok(serde_json::json!({
        "count": sessions.len(),
        "sessions": sessions,
    }))
}

async fn handle_delete(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: SessionParams = parse_arguments("garden_delete", arguments)?;
    let lock = state.session_lock(&params.session_id).await;
    let _guard = lock.lock().await;
    state.storage.delete(&params.session_id).await?;

    Ok(serde_json::json!({
        "session_id": params.session_id,
        "deleted": true,
    }))
}

type EngineFuture<'a> =
    std::pin::Pin<Box<dyn std::future::Future<Output = crate::error::EngineResult<()>> + Send + 'a>>;

/// Lock the session, load it, apply one engine operation and save the
/// result. Nothing is written when the operation fails.
async fn mutate_session<F>(state: &SharedState, session_id: &str, operation: F) -> McpResult<Value>
where
    F: for<'a> FnOnce(&'a crate::garden::PathEngine, &'a mut Session) -> EngineFuture<'a>,
{
    let lock = state.session_lock(session_id).await;
    let _guard = lock.lock().await;

    let mut session = state.storage.load(session_id).await?;
    operation(&state.engine, &mut session).await?;
    state.storage.save(&session).await?;

    to_value(SessionView::current(&session))
}

fn parse_arguments<T: serde::de::DeserializeOwned>(
    tool_name: &str,
    arguments: Option<Value>,
) -> McpResult<T> {
    match arguments {
        Some(args) => serde_json::from_value(args).map_err(|e| McpError::InvalidParameters {
            tool_name: tool_name.to_string(),
            message: e.to_string(),
        }),
        None => Err(McpError::InvalidParameters {
            tool_name: tool_name.to_string(),
            message: "Missing arguments".to_string(),
        }),
    }
}

fn to_value<T: Serialize>(value: T) -> McpResult<Value> {
    serde_json::to_value(value).map_err(McpError::Json)
}
