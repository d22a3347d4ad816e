use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::astral::AstralCard;
use super::narrator::{NarrationDraft, Narrator};
use super::transcript::render_history;
use super::types::{ScenarioStep, TravelerIdentity};
use crate::config::PipeConfig;
use crate::error::{NarratorError, NarratorResult};
use crate::langbase::{LangbaseClient, Message, PipeRun};
use crate::prompts::{GARDEN_ENTRANCE, NEXT_ISLAND, SCENARIO_PROMPT, VISION_PROMPT};

/// Narrator backed by two Langbase pipes: one for the scenario and its two
/// paths, one for the vision that follows a choice.
pub struct PipeNarrator {
    langbase: LangbaseClient,
    scenario_pipe: String,
    vision_pipe: String,
    /// Overrides the random draw; used to make tests reproducible.
    fixed_card: Option<AstralCard>,
}

/// Scenario pipe output as the model writes it.
#[derive(Debug, Deserialize)]
struct ScenarioPayload {
    #[serde(rename = "Scenario", alias = "scenario")]
    scenario: Option<String>,
    #[serde(alias = "Left_path", alias = "left")]
    left_path: Option<String>,
    #[serde(alias = "Right_path", alias = "right")]
    right_path: Option<String>,
}

impl PipeNarrator {
    pub fn new(langbase: LangbaseClient, pipes: &PipeConfig) -> Self {
        Self {
            langbase,
            scenario_pipe: pipes.scenario.clone(),
            vision_pipe: pipes.vision.clone(),
            fixed_card: None,
        }
    }

    /// Always draw `card` instead of a random one.
    pub fn with_fixed_card(mut self, card: AstralCard) -> Self {
        self.fixed_card = Some(card);
        self
    }

    fn draw_card(&self) -> AstralCard {
        self.fixed_card
            .unwrap_or_else(|| AstralCard::draw(&mut rand::thread_rng()))
    }

    async fn scenario(
        &self,
        traveler: &TravelerIdentity,
        history: &[ScenarioStep],
    ) -> NarratorResult<ScenarioPayload> {
        let messages = build_scenario_messages(traveler, history);
        let response = self
            .langbase
            .run_pipe(&PipeRun::new(&self.scenario_pipe, messages))
            .await?;

        let json = extract_json_from_completion(&response.completion)
            .map_err(|message| NarratorError::Unparseable { message })?;

        serde_json::from_str::<ScenarioPayload>(json).map_err(|e| NarratorError::Unparseable {
            message: format!("scenario JSON did not match the expected shape: {}", e),
        })
    }

    async fn vision(
        &self,
        traveler: &TravelerIdentity,
        history: &[ScenarioStep],
        card: AstralCard,
    ) -> NarratorResult<String> {
        let messages = build_vision_messages(traveler, history, card);
        let response = self
            .langbase
            .run_pipe(&PipeRun::new(&self.vision_pipe, messages))
            .await?;
        Ok(response.completion.trim().to_string())
    }
}

#[async_trait]
impl Narrator for PipeNarrator {
    async fn generate(
        &self,
        traveler: &TravelerIdentity,
        history: &[ScenarioStep],
    ) -> NarratorResult<NarrationDraft> {
        // The opening scenario has no choice behind it, so no vision.
        let (vision_text, astral_card) = if history.is_empty() {
            (None, None)
        } else {
            let card = self.draw_card();
            match self.vision(traveler, history, card).await {
                Ok(vision) => (Some(vision), Some(card)),
                Err(e) => {
                    warn!(error = %e, "Vision pipe failed, continuing without a vision");
                    (None, None)
                }
            }
        };

        let payload = self.scenario(traveler, history).await?;
        debug!(
            islands = history.len(),
            has_vision = vision_text.is_some(),
            "Narration drafted"
        );

        Ok(NarrationDraft {
            scenario_text: payload.scenario,
            left_option: payload.left_path,
            right_option: payload.right_path,
            vision_text,
            astral_card,
        })
    }
}

fn build_scenario_messages(traveler: &TravelerIdentity, history: &[ScenarioStep]) -> Vec<Message> {
    let mut prompt = String::new();
    if history.is_empty() {
        prompt.push_str(GARDEN_ENTRANCE);
        prompt.push_str("\n\nThis is the traveler:\n");
        prompt.push_str(traveler.as_str());
    } else {
        prompt.push_str(NEXT_ISLAND);
        prompt.push_str("\n\nThis is the traveler:\n");
        prompt.push_str(traveler.as_str());
        prompt.push_str("\n\nThis is their history:\n");
        prompt.push_str(&render_history(history));
    }

    vec![Message::system(SCENARIO_PROMPT), Message::user(prompt)]
}

fn build_vision_messages(
    traveler: &TravelerIdentity,
    history: &[ScenarioStep],
    card: AstralCard,
) -> Vec<Message> {
    let prompt = format!(
        "This is the traveler:\n{}\n\nThis is their astral card, unknown to them:\n{}\n\nAnd this is the history of their travel through the Garden of Forking Paths:\n{}",
        traveler,
        card,
        render_history(history)
    );
    vec![Message::system(VISION_PROMPT), Message::user(prompt)]
}

/// Extract JSON from a completion string, handling markdown code blocks.
fn extract_json_from_completion(completion: &str) -> Result<&str, String> {
    let trimmed = completion.trim();
    if trimmed.starts_with('{') {
        return Ok(trimmed);
    }

    if completion.contains("```json") {
        return completion
            .split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "Found ```json block but content was empty or malformed".to_string());
    }

    if completion.contains("```") {
        return completion
            .split("```")
            .nth(1)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "Found ``` block but content was empty or malformed".to_string());
    }

    // Models sometimes wrap the object in prose.
    if let (Some(start), Some(end)) = (completion.find('{'), completion.rfind('}')) {
        if start < end {
            return Ok(&completion[start..=end]);
        }
    }

    Err(format!(
        "No JSON found in response. First 100 chars: '{}'",
        completion.chars().take(100).collect::<String>()
    ))
}
