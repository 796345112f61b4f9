use std::sync::Arc;

use ai_llm_service::{
    LlmServiceProfiles, config::default_config::profiles_from_env,
};
use contextor::{ContextorConfig, ProfileChat, RagPipeline};
use rag_store::{LlmEmbedder, RagConfig, RagStore};
use tracing::info;

use crate::error_handler::AppError;

/// Shared state for all HTTP handlers. Built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: RagPipeline,
    /// Used by `/health` to probe the configured providers.
    pub llm: Arc<LlmServiceProfiles>,
}

impl AppState {
    /// Build every collaborator from environment variables.
    ///
    /// No network call is made here; clients connect on first use.
    ///
    /// # Errors
    /// [`AppError::Config`] when a provider, index or pipeline setting is invalid.
    pub fn from_env() -> Result<Self, AppError> {
        let profiles = profiles_from_env()?;
        let llm = Arc::new(LlmServiceProfiles::new(
            profiles.fast,
            profiles.slow,
            profiles.embedding,
            Some(10),
        )?);

        let rag_cfg = RagConfig::from_env()?;
        let embedder = Arc::new(LlmEmbedder::new(
            llm.clone(),
            rag_cfg.embedding_dim,
            rag_cfg.retry.clone(),
        ));
        let store = RagStore::new(rag_cfg)?;

        let cfg = ContextorConfig::from_env();
        info!(
            collection = %store.config().collection,
            top_k = cfg.top_k,
            max_ctx_chars = cfg.max_ctx_chars,
            timeout_secs = cfg.request_timeout.as_secs(),
            "pipeline configured"
        );

        let pipeline = RagPipeline::new(cfg, Arc::new(ProfileChat::new(llm.clone())), store, embedder);
        Ok(Self { pipeline, llm })
    }
}
