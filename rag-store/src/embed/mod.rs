//! Embedding abstraction.

use futures::future::BoxFuture;

use crate::errors::RagError;

pub mod llm;

/// Asynchronous embedding provider.
///
/// Documents and queries may be embedded differently by some providers, so
/// the two entry points are kept apart. Implement this trait to plug in any
/// embedding backend.
pub trait EmbeddingsProvider: Send + Sync {
    /// Embeds a document chunk.
    fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>, RagError>>;

    /// Embeds a search query. Defaults to [`EmbeddingsProvider::embed`].
    fn embed_query<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>, RagError>> {
        self.embed(text)
    }
}
