//! Operator commands for saved journeys.
//!
//! These act on the session store directly and never call a narrator.

use chrono::{DateTime, Utc};
use clap::Subcommand;

use crate::garden::{island_heading, Session};
use crate::storage::{SessionStore, SessionSummary};

const RULE: &str = "═══════════════════════════════════════════════════════════════════════════════";

/// `saves` subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum SavesCommands {
    /// List saved journeys, most recent first
    List,

    /// Show a journey island by island
    Show {
        /// Session ID
        id: String,

        /// Also reveal the astral card drawn for each vision
        #[arg(long)]
        reveal_cards: bool,
    },

    /// Delete a saved journey
    Delete {
        /// Session ID
        id: String,
    },
}

/// Result of CLI command execution.
#[derive(Debug)]
pub struct CliResult {
    /// Exit code (0 = success)
    pub exit_code: i32,
    pub message: String,
}

impl CliResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            exit_code: 1,
            message: message.into(),
        }
    }
}

/// Execute a `saves` command against `store`.
pub async fn execute_command<S: SessionStore + ?Sized>(command: SavesCommands, store: &S) -> CliResult {
    match command {
        SavesCommands::List => match store.list().await {
            Ok(summaries) => CliResult::success(format_list(&summaries, Utc::now())),
            Err(e) => CliResult::error(format!("Failed to list sessions: {}", e)),
        },
        SavesCommands::Show { id, reveal_cards } => match store.load(&id).await {
            Ok(session) => CliResult::success(format_session(&session, reveal_cards)),
            Err(e) => CliResult::error(format!("Failed to load session: {}", e)),
        },
        SavesCommands::Delete { id } => match store.delete(&id).await {
            Ok(()) => CliResult::success(format!("Deleted session {}", id)),
            Err(e) => CliResult::error(format!("Failed to delete session: {}", e)),
        },
    }
}

fn format_list(summaries: &[SessionSummary], now: DateTime<Utc>) -> String {
    if summaries.is_empty() {
        return "No saved journeys.".to_string();
    }

    let mut output = String::new();
    output.push_str("\nSaved Journeys\n");
    output.push_str(RULE);
    output.push_str("\n\n");

    for summary in summaries {
        output.push_str(&format!(
            "  {}  [{}] {} islands, updated {} ago\n      {}\n",
            summary.id,
            summary.status,
            summary.steps,
            format_age(now - summary.updated_at),
            first_line(&summary.traveler, 70)
        ));
    }

    output
}

fn format_session(session: &Session, reveal_cards: bool) -> String {
    let mut output = String::new();
    output.push_str(&format!("\nJourney {} [{}]\n", session.id(), session.status()));
    output.push_str(RULE);
    output.push_str(&format!("\n\nTraveler: {}\n", session.traveler()));

    if session.history().is_empty() {
        output.push_str("\nThe traveler has not entered the garden yet.\n");
        return output;
    }

    for (index, step) in session.history().iter().enumerate() {
        output.push_str(&format!("\n{}\n", island_heading(index)));
        if let Some(vision) = &step.vision_text {
            output.push_str(&format!("  Vision: {}\n", vision));
            if reveal_cards {
                if let Some(card) = step.astral_card {
                    output.push_str(&format!("  Astral card: {}\n", card.title()));
                }
            }
        }
        output.push_str(&format!("  {}\n", step.scenario_text));
        output.push_str(&format!("  Left:  {}\n", step.left_option));
        output.push_str(&format!("  Right: {}\n", step.right_option));
        match step.chosen_option() {
            Some(option) => output.push_str(&format!("  Chose {}: {}\n", step.chosen_side, option)),
            None => output.push_str("  Awaiting a choice\n"),
        }
    }

    output
}

fn first_line(text: &str, max_chars: usize) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() > max_chars {
        format!("{}...", line.chars().take(max_chars).collect::<String>())
    } else {
        line.to_string()
    }
}

fn format_age(age: chrono::Duration) -> String {
    if age.num_days() > 0 {
        format!("{}d", age.num_days())
    } else if age.num_hours() > 0 {
        format!("{}h", age.num_hours())
    } else if age.num_minutes() > 0 {
        format!("{}m", age.num_minutes())
    } else {
        format!("{}s", age.num_seconds().max(0))
    }
}
