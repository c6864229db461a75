//! Generation provider seam.
//!
//! The router never talks to a concrete model API directly; it goes through
//! [`GenerationProvider`], which accepts a model identity, a system
//! instruction, and the conversation turns, and returns generated text or a
//! [`ProviderError`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Who produced a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    Caller,
    Model,
}

/// A single turn in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub text: String,
}

impl ChatTurn {
    /// Create a caller turn.
    pub fn caller(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Caller,
            text: text.into(),
        }
    }

    /// Create a model turn.
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Model,
            text: text.into(),
        }
    }
}

/// Trait for generation providers.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Generate text against `model` with the given system instruction and
    /// conversation turns.
    async fn generate(
        &self,
        model: &str,
        system_instruction: &str,
        turns: &[ChatTurn],
    ) -> Result<String, ProviderError>;
}
