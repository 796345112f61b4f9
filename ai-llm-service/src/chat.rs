//! Role-tagged chat turns shared by every provider client.

use serde::{Deserialize, Serialize};

/// Author of a chat turn as seen by the model.
///
/// Providers map `Model` to their own name for it (`assistant` for
/// Ollama/OpenAI, `model` for Gemini).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

/// One message of a multi-turn conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            content: content.into(),
        }
    }
}

/// Intended use of an embedding.
///
/// Only Gemini distinguishes the two; other providers embed both the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmbedTask {
    Query,
    #[default]
    Document,
}
