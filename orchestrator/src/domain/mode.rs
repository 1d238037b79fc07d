//! Mode classification (Stage 0)

use serde::{Deserialize, Serialize};
use std::fmt;

/// The three modes a raw utterance can be routed to (`spec.md` 3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeKind {
    Chat,
    Task,
    Dev,
}

impl fmt::Display for ModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chat => write!(f, "chat"),
            Self::Task => write!(f, "task"),
            Self::Dev => write!(f, "dev"),
        }
    }
}

/// Classification result for Stage 0
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mode {
    pub kind: ModeKind,
    pub confidence: f32,
    pub reasoning: String,
}

impl Mode {
    pub fn new(kind: ModeKind, confidence: f32, reasoning: impl Into<String>) -> Self {
        Self {
            kind,
            confidence: confidence.clamp(0.0, 1.0),
            reasoning: reasoning.into(),
        }
    }
}
