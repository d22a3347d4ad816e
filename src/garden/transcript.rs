//! Renders a journey as the island-by-island transcript the narrator reads.
//!
//! Visions are left out on purpose: they are asides for the traveler and are
//! not fed back into later narration.

use std::fmt::Write;

use super::types::ScenarioStep;

/// Heading for the island at `index` (zero based).
pub fn island_heading(index: usize) -> String {
    if index == 0 {
        "# First island:".to_string()
    } else {
        format!("# Island {}:", index + 1)
    }
}

/// Render the history in chronological order. An undecided step is shown
/// without a choice line.
pub fn render_history(history: &[ScenarioStep]) -> String {
    let mut out = String::new();
    for (index, step) in history.iter().enumerate() {
        if index > 0 {
            out.push('\n');
        }
        // Writing to a String cannot fail.
        let _ = writeln!(out, "{}", island_heading(index));
        let _ = writeln!(out, "The Goddess Words Echo: \"{}\"", step.scenario_text);
        let _ = writeln!(out, "The Left Path: {}", step.left_option);
        let _ = writeln!(out, "The Right Path: {}", step.right_option);
        if let Some(option) = step.chosen_option() {
            let _ = writeln!(
                out,
                "The Traveler Chose: The {} Path ({})",
                capitalized(step.chosen_side.as_str()),
                option
            );
        }
    }
    out
}

fn capitalized(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
