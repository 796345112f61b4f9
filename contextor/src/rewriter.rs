//! Collapses a follow-up question and its history into one standalone question.

use std::sync::Arc;

use ai_llm_service::{ChatTurn, LlmProfile};
use tracing::{debug, instrument};

use crate::error::ContextorError;
use crate::llm::ChatGenerator;
use crate::prompt::REWRITE_SYSTEM;

#[derive(Clone)]
pub struct QueryRewriter {
    chat: Arc<dyn ChatGenerator>,
}

impl QueryRewriter {
    pub fn new(chat: Arc<dyn ChatGenerator>) -> Self {
        Self { chat }
    }

    /// Rewrites `latest` against `history` using the fast profile.
    ///
    /// # Errors
    /// Generation failures propagate as-is. A blank result is
    /// [`ContextorError::EmptyRewrite`]; the raw message is never used instead.
    #[instrument(skip_all, fields(history = history.len()))]
    pub async fn rewrite(&self, history: &[ChatTurn], latest: &str) -> Result<String, ContextorError> {
        let mut turns = history.to_vec();
        turns.push(ChatTurn::user(latest));

        let raw = self
            .chat
            .generate(LlmProfile::Fast, &turns, REWRITE_SYSTEM)
            .await?;
        let query = clean(&raw);
        if query.is_empty() {
            return Err(ContextorError::EmptyRewrite);
        }
        debug!(standalone = %query, "query rewritten");
        Ok(query.to_string())
    }
}

/// Trims the output and strips one pair of wrapping quotes.
fn clean(raw: &str) -> &str {
    let s = raw.trim();
    for (open, close) in [('"', '"'), ('\'', '\''), ('“', '”'), ('`', '`')] {
        if let Some(inner) = s.strip_prefix(open).and_then(|r| r.strip_suffix(close)) {
            return inner.trim();
        }
    }
    s
}
