//! The Garden of Forking Paths: sessions, the engine that drives them, and
//! the narrators that write each island.

mod astral;
mod engine;
mod narrator;
mod pipe_narrator;
mod transcript;
mod types;

pub use astral::AstralCard;
pub use engine::PathEngine;
pub use narrator::{Narration, NarrationDraft, Narrator};
pub use pipe_narrator::PipeNarrator;
pub use transcript::{island_heading, render_history};
pub use types::{ScenarioStep, Session, SessionParts, SessionStatus, Side, TravelerIdentity};
