use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::astral::AstralCard;
use super::narrator::Narration;
use crate::error::{EngineError, EngineResult};

/// Free-text self-description of the traveler (name, backstory).
///
/// Supplied once when a session is created and sent verbatim with every
/// narration request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TravelerIdentity(String);

impl TravelerIdentity {
    /// Create an identity from a description. Blank descriptions are rejected.
    pub fn new(description: impl Into<String>) -> EngineResult<Self> {
        let description = description.into();
        if description.trim().is_empty() {
            return Err(EngineError::invalid_state(
                "start",
                "traveler description cannot be empty",
            ));
        }
        Ok(Self(description))
    }

    /// The description exactly as supplied.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TravelerIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which of the two paths the traveler took at a step.
///
/// `Left` and `Right` are positional labels only; neither is a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
    /// The step is still waiting for a choice.
    Undecided,
}

impl Side {
    /// Get the side name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
            Side::Undecided => "undecided",
        }
    }

    /// Whether a choice has been recorded.
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Side::Undecided)
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "left" => Ok(Side::Left),
            "right" => Ok(Side::Right),
            "undecided" => Ok(Side::Undecided),
            _ => Err(format!("Unknown side: {}", s)),
        }
    }
}

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// The journey continues.
    #[default]
    Active,
    /// The journey is over. No further steps can be appended.
    Ended,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Active => write!(f, "active"),
            SessionStatus::Ended => write!(f, "ended"),
        }
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(SessionStatus::Active),
            "ended" => Ok(SessionStatus::Ended),
            _ => Err(format!("Unknown session status: {}", s)),
        }
    }
}

/// One island of the journey: a scenario and the two paths offered there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioStep {
    /// The narrated situation.
    pub scenario_text: String,
    pub left_option: String,
    pub right_option: String,
    /// The path taken. `Undecided` only on the most recent step.
    pub chosen_side: Side,
    /// Aside shown between the previous choice and this scenario.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vision_text: Option<String>,
    /// Hidden card that colored the vision. Never shown to the traveler.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub astral_card: Option<AstralCard>,
}

impl ScenarioStep {
    /// A fresh, undecided step built from a validated narration.
    pub fn pending(narration: Narration) -> Self {
        Self {
            scenario_text: narration.scenario_text,
            left_option: narration.left_option,
            right_option: narration.right_option,
            chosen_side: Side::Undecided,
            vision_text: narration.vision_text,
            astral_card: narration.astral_card,
        }
    }

    /// The option text for the chosen side, if a choice was made.
    pub fn chosen_option(&self) -> Option<&str> {
        match self.chosen_side {
            Side::Left => Some(&self.left_option),
            Side::Right => Some(&self.right_option),
            Side::Undecided => None,
        }
    }

    /// Check the per-step shape rules shared by narration and persistence.
    pub fn check_shape(&self) -> Result<(), String> {
        if self.scenario_text.trim().is_empty() {
            return Err("scenario text is empty".to_string());
        }
        if self.left_option.trim().is_empty() || self.right_option.trim().is_empty() {
            return Err("an option is empty".to_string());
        }
        if options_match(&self.left_option, &self.right_option) {
            return Err("left and right options are identical".to_string());
        }
        Ok(())
    }
}

/// Two options count as the same path when they differ only in case or
/// surrounding whitespace.
pub(crate) fn options_match(left: &str, right: &str) -> bool {
    left.trim().to_lowercase() == right.trim().to_lowercase()
}

/// A traveler's journey through the garden.
///
/// The history is append-only. Only the [`PathEngine`](super::PathEngine)
/// mutates a session; everything else reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SessionParts")]
pub struct Session {
    id: String,
    traveler: TravelerIdentity,
    history: Vec<ScenarioStep>,
    status: SessionStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Raw parts of a persisted session, validated by [`Session::reconstitute`].
#[derive(Debug, Clone, Deserialize)]
pub struct SessionParts {
    pub id: String,
    pub traveler: String,
    pub history: Vec<ScenarioStep>,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create an active session with an empty history.
    pub fn new(traveler: TravelerIdentity) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            traveler,
            history: Vec::new(),
            status: SessionStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild a session from persisted parts, rejecting records that
    /// break the history invariants.
    pub fn reconstitute(parts: SessionParts) -> Result<Self, String> {
        let traveler = TravelerIdentity::new(parts.traveler)
            .map_err(|_| "traveler description is empty".to_string())?;
        let session = Self {
            id: parts.id,
            traveler,
            history: parts.history,
            status: parts.status,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
        };
        session.check_invariants()?;
        Ok(session)
    }

    /// Verify that every step is well formed and that only the last step
    /// may be undecided.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("session id is empty".to_string());
        }
        let last = self.history.len().saturating_sub(1);
        for (index, step) in self.history.iter().enumerate() {
            step.check_shape()
                .map_err(|reason| format!("step {}: {}", index + 1, reason))?;
            if index < last && !step.chosen_side.is_resolved() {
                return Err(format!(
                    "step {} is undecided but is not the latest step",
                    index + 1
                ));
            }
        }
        Ok(())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn traveler(&self) -> &TravelerIdentity {
        &self.traveler
    }

    /// Steps in chronological order.
    pub fn history(&self) -> &[ScenarioStep] {
        &self.history
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_ended(&self) -> bool {
        self.status == SessionStatus::Ended
    }

    /// The most recent step, if any.
    pub fn current_step(&self) -> Option<&ScenarioStep> {
        self.history.last()
    }

    /// The step awaiting a choice, if the traveler is standing at a fork.
    pub fn pending_step(&self) -> Option<&ScenarioStep> {
        self.history
            .last()
            .filter(|step| step.chosen_side == Side::Undecided)
    }

    pub(super) fn push_step(&mut self, step: ScenarioStep) {
        self.history.push(step);
        self.touch();
    }

    pub(super) fn resolve_current(&mut self, side: Side) {
        if let Some(step) = self.history.last_mut() {
            step.chosen_side = side;
            self.touch();
        }
    }

    pub(super) fn mark_ended(&mut self) {
        self.status = SessionStatus::Ended;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl TryFrom<SessionParts> for Session {
    type Error = String;

    fn try_from(parts: SessionParts) -> Result<Self, Self::Error> {
        Session::reconstitute(parts)
    }
}
