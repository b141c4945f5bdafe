use crate::{Error, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Closed set of sound effects a turn may request.
///
/// Wire names are the clip file names so the generated script can be read
/// as-is; `nothing` is the only variant without a clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum EffectId {
    #[serde(rename = "nothing")]
    Nothing,
    #[serde(rename = "intro.mp3")]
    Intro,
    #[serde(rename = "transition.mp3")]
    Transition,
    #[serde(rename = "click.mp3")]
    Click,
    #[serde(rename = "paper.mp3")]
    Paper,
    #[serde(rename = "crumpled_paper.mp3")]
    RippedPaper,
    #[serde(rename = "amogus.mp3")]
    Amogus,
    #[serde(rename = "outro.mp3")]
    Outro,
}

impl EffectId {
    /// Every variant backed by a clip, in catalog order
    pub const CLIPS: [Self; 7] = [
        Self::Intro,
        Self::Transition,
        Self::Click,
        Self::Paper,
        Self::RippedPaper,
        Self::Amogus,
        Self::Outro,
    ];

    /// Position in [`Self::CLIPS`], `None` for [`Self::Nothing`]
    #[must_use]
    pub const fn clip_index(self) -> Option<usize> {
        match self {
            Self::Nothing => None,
            Self::Intro => Some(0),
            Self::Transition => Some(1),
            Self::Click => Some(2),
            Self::Paper => Some(3),
            Self::RippedPaper => Some(4),
            Self::Amogus => Some(5),
            Self::Outro => Some(6),
        }
    }

    /// Clip file name inside the sound effects directory
    #[must_use]
    pub const fn file_name(self) -> Option<&'static str> {
        match self {
            Self::Nothing => None,
            Self::Intro => Some("intro.mp3"),
            Self::Transition => Some("transition.mp3"),
            Self::Click => Some("click.mp3"),
            Self::Paper => Some("paper.mp3"),
            Self::RippedPaper => Some("crumpled_paper.mp3"),
            Self::Amogus => Some("amogus.mp3"),
            Self::Outro => Some("outro.mp3"),
        }
    }
}

/// One speaker utterance with its bracketing sound effects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Turn {
    pub speaker: String,
    pub text: String,
    pub sound_effect_before: EffectId,
    pub sound_effect_after: EffectId,
}

impl Turn {
    #[must_use]
    pub fn new(speaker: &str, text: &str) -> Self {
        Self {
            speaker: speaker.to_string(),
            text: text.to_string(),
            sound_effect_before: EffectId::Nothing,
            sound_effect_after: EffectId::Nothing,
        }
    }

    #[must_use]
    pub const fn with_before(mut self, effect: EffectId) -> Self {
        self.sound_effect_before = effect;
        self
    }

    #[must_use]
    pub const fn with_after(mut self, effect: EffectId) -> Self {
        self.sound_effect_after = effect;
        self
    }
}

/// JSON schema of a whole script, handed to the generator
#[must_use]
pub fn script_schema() -> serde_json::Value {
    serde_json::to_value(schemars::schema_for!(Vec<Turn>)).unwrap_or_default()
}

/// Parse a generated script, rejecting anything outside the turn schema
pub fn parse_script(json: &str) -> Result<Vec<Turn>> {
    serde_json::from_str(json).map_err(|e| Error::Script(format!("invalid script: {e}")))
}

pub async fn save_script(path: &Path, turns: &[Turn]) -> Result<()> {
    let json = serde_json::to_string_pretty(turns)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}

pub async fn load_script(path: &Path) -> Result<Vec<Turn>> {
    let json = tokio::fs::read_to_string(path).await?;
    parse_script(&json)
}
