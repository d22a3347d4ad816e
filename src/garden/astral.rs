//! Astral cards: hidden fortunes drawn each time the traveler commits to a
//! path. The card colors the vision that follows and is recorded on the
//! step, but the traveler never sees it.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A hidden fortune card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AstralCard {
    StarOfHope,
    ShadowOfDespair,
    FlameOfPassion,
    WhisperOfBetrayal,
    EmbraceOfComfort,
    ChillOfIsolation,
    SongOfTriumph,
    EchoOfRegret,
    LightOfGuidance,
    VeilOfMystery,
}

impl AstralCard {
    /// Every card in the deck.
    pub const DECK: [AstralCard; 10] = [
        AstralCard::StarOfHope,
        AstralCard::ShadowOfDespair,
        AstralCard::FlameOfPassion,
        AstralCard::WhisperOfBetrayal,
        AstralCard::EmbraceOfComfort,
        AstralCard::ChillOfIsolation,
        AstralCard::SongOfTriumph,
        AstralCard::EchoOfRegret,
        AstralCard::LightOfGuidance,
        AstralCard::VeilOfMystery,
    ];

    /// Draw one card uniformly from the deck.
    pub fn draw<R: Rng + ?Sized>(rng: &mut R) -> Self {
        *Self::DECK
            .choose(rng)
            .unwrap_or(&AstralCard::VeilOfMystery)
    }

    /// Stable identifier used in storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            AstralCard::StarOfHope => "star_of_hope",
            AstralCard::ShadowOfDespair => "shadow_of_despair",
            AstralCard::FlameOfPassion => "flame_of_passion",
            AstralCard::WhisperOfBetrayal => "whisper_of_betrayal",
            AstralCard::EmbraceOfComfort => "embrace_of_comfort",
            AstralCard::ChillOfIsolation => "chill_of_isolation",
            AstralCard::SongOfTriumph => "song_of_triumph",
            AstralCard::EchoOfRegret => "echo_of_regret",
            AstralCard::LightOfGuidance => "light_of_guidance",
            AstralCard::VeilOfMystery => "veil_of_mystery",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            AstralCard::StarOfHope => "The Star of Hope",
            AstralCard::ShadowOfDespair => "The Shadow of Despair",
            AstralCard::FlameOfPassion => "The Flame of Passion",
            AstralCard::WhisperOfBetrayal => "The Whisper of Betrayal",
            AstralCard::EmbraceOfComfort => "The Embrace of Comfort",
            AstralCard::ChillOfIsolation => "The Chill of Isolation",
            AstralCard::SongOfTriumph => "The Song of Triumph",
            AstralCard::EchoOfRegret => "The Echo of Regret",
            AstralCard::LightOfGuidance => "The Light of Guidance",
            AstralCard::VeilOfMystery => "The Veil of Mystery",
        }
    }

    /// How the card bends the traveler's fortune.
    pub fn omen(&self) -> &'static str {
        match self {
            AstralCard::StarOfHope => "Brings a renewed sense of purpose and strength.",
            AstralCard::ShadowOfDespair => {
                "Casts a dark cloud, leading to moments of doubt and fear."
            }
            AstralCard::FlameOfPassion => "Ignites a burning desire to achieve one's goals.",
            AstralCard::WhisperOfBetrayal => "Reveals hidden treachery from a trusted ally.",
            AstralCard::EmbraceOfComfort => "Offers solace and healing from past wounds.",
            AstralCard::ChillOfIsolation => {
                "Enforces a sense of loneliness and separation from others."
            }
            AstralCard::SongOfTriumph => {
                "Celebrates a recent victory and encourages further successes."
            }
            AstralCard::EchoOfRegret => "Haunts with memories of past mistakes.",
            AstralCard::LightOfGuidance => {
                "Illuminates the path forward, providing clarity and direction."
            }
            AstralCard::VeilOfMystery => {
                "Shrouds the future in uncertainty, creating an air of suspense."
            }
        }
    }
}

impl std::fmt::Display for AstralCard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.title(), self.omen())
    }
}

impl std::str::FromStr for AstralCard {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        Self::DECK
            .iter()
            .copied()
            .find(|card| card.as_str() == key)
            .ok_or_else(|| format!("Unknown astral card: {}", s))
    }
}
