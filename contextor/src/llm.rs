//! Generation seam used by the rewriter and the orchestrator.

use std::sync::Arc;

use ai_llm_service::{ChatTurn, LlmProfile, LlmServiceProfiles};
use futures::future::BoxFuture;

use crate::error::ContextorError;

/// Multi-turn generation with a system instruction.
///
/// Implementations are attempted exactly once per call; no retries.
pub trait ChatGenerator: Send + Sync {
    fn generate<'a>(
        &'a self,
        profile: LlmProfile,
        turns: &'a [ChatTurn],
        system: &'a str,
    ) -> BoxFuture<'a, Result<String, ContextorError>>;
}

/// [`ChatGenerator`] backed by the shared LLM profiles.
#[derive(Clone)]
pub struct ProfileChat {
    svc: Arc<LlmServiceProfiles>,
}

impl ProfileChat {
    pub fn new(svc: Arc<LlmServiceProfiles>) -> Self {
        Self { svc }
    }
}

impl ChatGenerator for ProfileChat {
    fn generate<'a>(
        &'a self,
        profile: LlmProfile,
        turns: &'a [ChatTurn],
        system: &'a str,
    ) -> BoxFuture<'a, Result<String, ContextorError>> {
        Box::pin(async move { Ok(self.svc.chat(profile, turns, system).await?) })
    }
}
