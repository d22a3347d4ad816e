use serde::{Deserialize, Serialize};

use crate::config::PipeConfig;
use crate::prompts::{SCENARIO_PROMPT, VISION_PROMPT};

/// Speaker of a chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// One chat turn sent to a pipe
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Body of `POST /v1/pipes/run`. Runs are never streamed.
#[derive(Debug, Clone, Serialize)]
pub struct PipeRun {
    pub name: String,
    pub messages: Vec<Message>,
    stream: bool,
}

impl PipeRun {
    pub fn new(name: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            name: name.into(),
            messages,
            stream: false,
        }
    }
}

/// The completion text of a pipe run. Other response fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct PipeOutput {
    pub completion: String,
}

/// Body of `POST /v1/pipes`: a pipe definition, upserted by name.
#[derive(Debug, Clone, Serialize)]
pub struct PipeDefinition {
    pub name: String,
    pub description: String,
    pub model: String,
    upsert: bool,
    /// Ask the model for JSON-only output.
    pub json: bool,
    pub temperature: f64,
    pub max_tokens: u32,
    pub messages: Vec<Message>,
}

impl PipeDefinition {
    fn base(name: &str, description: &str, model: &str, system_prompt: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            model: model.to_string(),
            upsert: true,
            json: false,
            temperature: 1.0,
            max_tokens: 400,
            messages: vec![Message::system(system_prompt)],
        }
    }

    /// The pipe that writes a scenario and its two paths as JSON.
    pub fn scenario(pipes: &PipeConfig) -> Self {
        Self {
            json: true,
            temperature: 0.9,
            max_tokens: 800,
            ..Self::base(
                &pipes.scenario,
                "Garden of Forking Paths: scenario and two paths",
                &pipes.model,
                SCENARIO_PROMPT,
            )
        }
    }

    /// The pipe that writes the vision shown after a choice.
    pub fn vision(pipes: &PipeConfig) -> Self {
        Self::base(
            &pipes.vision,
            "Garden of Forking Paths: vision after a choice",
            &pipes.model,
            VISION_PROMPT,
        )
    }
}

/// Acknowledgement returned for a created or updated pipe
#[derive(Debug, Clone, Deserialize)]
pub struct PipeCreated {
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
}
