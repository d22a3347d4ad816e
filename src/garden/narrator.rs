use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::astral::AstralCard;
use super::types::{options_match, ScenarioStep, TravelerIdentity};
use crate::error::{EngineError, EngineResult, NarratorResult};

/// Produces the next scenario of a journey.
///
/// `history` is read-only context in chronological order; every step but the
/// last is resolved, and for `advance` the last one is resolved too. Calls are
/// not assumed deterministic.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Narrator: Send + Sync {
    async fn generate(
        &self,
        traveler: &TravelerIdentity,
        history: &[ScenarioStep],
    ) -> NarratorResult<NarrationDraft>;
}

/// Unvalidated narrator output. Any field may be missing or blank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrationDraft {
    pub scenario_text: Option<String>,
    pub left_option: Option<String>,
    pub right_option: Option<String>,
    pub vision_text: Option<String>,
    pub astral_card: Option<AstralCard>,
}

/// A narration that passed structural validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Narration {
    pub scenario_text: String,
    pub left_option: String,
    pub right_option: String,
    pub vision_text: Option<String>,
    pub astral_card: Option<AstralCard>,
}

impl NarrationDraft {
    /// Draft carrying just a scenario and its two paths.
    pub fn new(
        scenario_text: impl Into<String>,
        left_option: impl Into<String>,
        right_option: impl Into<String>,
    ) -> Self {
        Self {
            scenario_text: Some(scenario_text.into()),
            left_option: Some(left_option.into()),
            right_option: Some(right_option.into()),
            vision_text: None,
            astral_card: None,
        }
    }

    pub fn with_vision(mut self, vision_text: impl Into<String>) -> Self {
        self.vision_text = Some(vision_text.into());
        self
    }

    pub fn with_astral_card(mut self, card: AstralCard) -> Self {
        self.astral_card = Some(card);
        self
    }

    /// Trim and check the draft. Missing or blank scenario text, missing
    /// options, and matching options are generation failures.
    pub fn validate(self) -> EngineResult<Narration> {
        let scenario_text = required(self.scenario_text, "scenario text")?;
        let left_option = required(self.left_option, "left option")?;
        let right_option = required(self.right_option, "right option")?;

        if options_match(&left_option, &right_option) {
            return Err(EngineError::generation(format!(
                "left and right options are identical: '{}'",
                left_option
            )));
        }

        let vision_text = self
            .vision_text
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        Ok(Narration {
            scenario_text,
            left_option,
            right_option,
            // A card without the vision it colored carries no meaning.
            astral_card: vision_text.as_ref().and(self.astral_card),
            vision_text,
        })
    }
}

fn required(value: Option<String>, field: &str) -> EngineResult<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        Some(_) => Err(EngineError::generation(format!("{} is empty", field))),
        None => Err(EngineError::generation(format!("{} is missing", field))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_trims_fields() {
        let narration = NarrationDraft::new("  A fork  ", " Go left ", "Go right\n")
            .validate()
            .unwrap();
        assert_eq!(narration.scenario_text, "A fork");
        assert_eq!(narration.left_option, "Go left");
        assert_eq!(narration.right_option, "Go right");
        assert!(narration.vision_text.is_none());
    }

    #[test]
    fn test_validate_rejects_missing_scenario() {
        let draft = NarrationDraft {
            scenario_text: None,
            ..NarrationDraft::new("", "a", "b")
        };
        let err = draft.validate().unwrap_err();
        assert!(matches!(err, EngineError::Generation { .. }));
        assert!(err.to_string().contains("scenario text is missing"));
    }

    #[test]
    fn test_validate_rejects_blank_option() {
        let err = NarrationDraft::new("A fork", "   ", "b")
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("left option is empty"));
    }

    #[test]
    fn test_validate_rejects_identical_options() {
        let err = NarrationDraft::new("A fork", "Walk on", "walk on ")
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("identical"));
    }

    #[test]
    fn test_validate_drops_blank_vision_and_its_card() {
        let narration = NarrationDraft::new("A fork", "a", "b")
            .with_vision("   ")
            .with_astral_card(AstralCard::StarOfHope)
            .validate()
            .unwrap();
        assert!(narration.vision_text.is_none());
        assert!(narration.astral_card.is_none());
    }

    #[test]
    fn test_validate_keeps_vision_and_card() {
        let narration = NarrationDraft::new("A fork", "a", "b")
            .with_vision("You see a lantern")
            .with_astral_card(AstralCard::EchoOfRegret)
            .validate()
            .unwrap();
        assert_eq!(narration.vision_text.as_deref(), Some("You see a lantern"));
        assert_eq!(narration.astral_card, Some(AstralCard::EchoOfRegret));
    }
}
