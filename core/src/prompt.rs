//! Task modes and the prompt templates that wrap user input for each of them.
//!
//! The mapping from [`Mode`] to template lives in a single table so every mode
//! is covered and the builder stays a pure function of its inputs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the fixed task categories offered by the lab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Chat,
    Summarize,
    Sentiment,
    Translate,
}

/// Static metadata describing a mode in the UI.
#[derive(Clone, Copy, Serialize)]
pub struct ModeInfo {
    pub id: Mode,
    pub label: &'static str,
    pub description: &'static str,
    #[serde(skip)]
    template: fn(&str) -> String,
}

pub static MODES: [ModeInfo; 4] = [
    ModeInfo {
        id: Mode::Chat,
        label: "Smart Assistant",
        description: "Ask anything to Gemini",
        template: passthrough,
    },
    ModeInfo {
        id: Mode::Summarize,
        label: "Summarizer",
        description: "Get key insights from long text",
        template: summarize,
    },
    ModeInfo {
        id: Mode::Sentiment,
        label: "Sentiment Analysis",
        description: "Analyze tone and emotions",
        template: sentiment,
    },
    ModeInfo {
        id: Mode::Translate,
        label: "Translator",
        description: "Translate to any language",
        template: translate,
    },
];

impl fmt::Debug for ModeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModeInfo")
            .field("id", &self.id)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

impl Mode {
    pub fn id(self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Summarize => "summarize",
            Self::Sentiment => "sentiment",
            Self::Translate => "translate",
        }
    }

    pub fn info(self) -> &'static ModeInfo {
        // MODES is ordered like the enum declaration.
        &MODES[self as usize]
    }

    /// Parse a mode identifier, treating anything unrecognised as chat.
    pub fn from_id_lossy(id: &str) -> Self {
        id.parse().unwrap_or_default()
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MODES
            .iter()
            .map(|info| info.id)
            .find(|mode| mode.id() == s.trim())
            .ok_or_else(|| format!("unknown mode: {s}"))
    }
}

/// Wrap `input` in the template for `mode`.
pub fn build_prompt(mode: Mode, input: &str) -> String {
    (mode.info().template)(input)
}

fn passthrough(input: &str) -> String {
    input.to_string()
}

fn summarize(input: &str) -> String {
    format!("Summarize the following text briefly and capture the main points:\n\n{input}")
}

fn sentiment(input: &str) -> String {
    format!(
        "Analyze the sentiment of the following text. Be specific about the tone, emotion, and confidence level:\n\n{input}"
    )
}

fn translate(input: &str) -> String {
    format!(
        "Identify the language of the following text and translate it into clear, natural-sounding English. If it is already English, translate it to Spanish:\n\n{input}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: [&str; 4] = ["", "hello", "  padded  ", "Bonjour, ça va ?\nligne deux"];

    #[test]
    fn chat_passes_input_through() {
        for text in SAMPLES {
            assert_eq!(build_prompt(Mode::Chat, text), text);
        }
    }

    #[test]
    fn every_mode_embeds_input_deterministically() {
        for info in MODES {
            for text in SAMPLES {
                let first = build_prompt(info.id, text);
                assert_eq!(first, build_prompt(info.id, text));
                assert!(first.contains(text), "{} lost its input", info.id);
            }
        }
    }

    #[test]
    fn templates_put_input_after_instruction() {
        let prompt = build_prompt(Mode::Summarize, "the text");
        assert!(prompt.starts_with("Summarize the following text briefly"));
        assert!(prompt.ends_with(":\n\nthe text"));
        assert!(build_prompt(Mode::Sentiment, "x").contains("confidence level"));
        assert!(build_prompt(Mode::Translate, "x").contains("translate it to Spanish"));
    }

    #[test]
    fn unknown_mode_falls_back_to_chat() {
        assert_eq!(Mode::from_id_lossy("poetry"), Mode::Chat);
        assert_eq!(
            build_prompt(Mode::from_id_lossy("poetry"), "keep me"),
            "keep me"
        );
        assert_eq!(
            build_prompt(Mode::from_id_lossy(" translate "), "hola"),
            build_prompt(Mode::Translate, "hola")
        );
    }

    #[test]
    fn table_matches_enum_order() {
        for (idx, info) in MODES.iter().enumerate() {
            assert_eq!(info.id as usize, idx);
            assert_eq!(info.id.to_string().parse::<Mode>(), Ok(info.id));
        }
    }

    #[test]
    fn mode_serializes_as_identifier() {
        assert_eq!(serde_json::to_string(&Mode::Sentiment).unwrap(), "\"sentiment\"");
        let parsed: Mode = serde_json::from_str("\"summarize\"").unwrap();
        assert_eq!(parsed, Mode::Summarize);
    }
}
