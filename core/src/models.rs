//! Compiled-in catalogue of Gemini models the lab lets the user pick from.

use serde::Serialize;

use crate::errors::LabError;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ModelOption {
    pub id: &'static str,
    pub label: &'static str,
}

/// Selectable models; the first entry is the default.
pub static AVAILABLE_MODELS: [ModelOption; 7] = [
    ModelOption {
        id: "gemini-2.0-flash",
        label: "Gemini 2.0 Flash (Next Gen Fast)",
    },
    ModelOption {
        id: "gemini-2.5-flash",
        label: "Gemini 2.5 Flash (Ultra Fast)",
    },
    ModelOption {
        id: "gemini-2.5-pro",
        label: "Gemini 2.5 Pro (Most Advanced)",
    },
    ModelOption {
        id: "gemini-2.0-flash-lite",
        label: "Gemini 2.0 Flash Lite",
    },
    ModelOption {
        id: "gemini-flash-latest",
        label: "Gemini Flash (Latest)",
    },
    ModelOption {
        id: "gemini-pro-latest",
        label: "Gemini Pro (Latest)",
    },
    ModelOption {
        id: "gemma-3-27b-it",
        label: "Gemma 3 27B (Open Model)",
    },
];

const NAMESPACE_PREFIX: &str = "models/";

/// A model identifier known to be part of [`AVAILABLE_MODELS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ModelSelection(&'static str);

impl ModelSelection {
    pub fn new(id: &str) -> Result<Self, LabError> {
        let wanted = strip_namespace(id.trim());
        AVAILABLE_MODELS
            .iter()
            .find(|m| m.id == wanted)
            .map(|m| Self(m.id))
            .ok_or_else(|| LabError::UnknownModel(id.to_string()))
    }

    pub fn id(&self) -> &'static str {
        self.0
    }
}

impl Default for ModelSelection {
    fn default() -> Self {
        Self(AVAILABLE_MODELS[0].id)
    }
}

/// Drop the `models/` resource prefix the REST API puts on model names.
pub fn strip_namespace(name: &str) -> &str {
    name.strip_prefix(NAMESPACE_PREFIX).unwrap_or(name)
}
