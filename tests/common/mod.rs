//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use forking_paths::error::{LangbaseError, NarratorError, NarratorResult};
use forking_paths::garden::{NarrationDraft, Narrator, ScenarioStep, TravelerIdentity};

/// What the scripted narrator does on one call.
pub enum Scripted {
    Draft(NarrationDraft),
    Fail,
}

/// One call as the narrator saw it.
#[derive(Debug, Clone)]
pub struct Call {
    pub traveler: String,
    pub history: Vec<ScenarioStep>,
}

/// Narrator that replays a fixed script and records every call.
#[derive(Clone, Default)]
pub struct ScriptedNarrator {
    script: Arc<Mutex<VecDeque<Scripted>>>,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl ScriptedNarrator {
    pub fn new(script: Vec<Scripted>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Narrator for ScriptedNarrator {
    async fn generate(
        &self,
        traveler: &TravelerIdentity,
        history: &[ScenarioStep],
    ) -> NarratorResult<NarrationDraft> {
        self.calls.lock().unwrap().push(Call {
            traveler: traveler.as_str().to_string(),
            history: history.to_vec(),
        });

        match self.script.lock().unwrap().pop_front() {
            Some(Scripted::Draft(draft)) => Ok(draft),
            Some(Scripted::Fail) | None => Err(NarratorError::Backend(LangbaseError::Timeout {
                timeout_ms: 30000,
            })),
        }
    }
}

/// A well-formed fork numbered `n`.
pub fn fork(n: usize) -> Scripted {
    Scripted::Draft(NarrationDraft::new(
        format!("Island {} rises from the mist", n),
        format!("Take the stone stair {}", n),
        format!("Follow the river bank {}", n),
    ))
}

pub const ARTORIAS: &str = "My name is Artorias, a knight from the Empire. \
I live in a little village near the capital and I'm in love with Princess Elara.";
