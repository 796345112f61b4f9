//! Conversational RAG over one ingested document.
//!
//! Public API: [`RagPipeline::answer`]. It collapses the conversation into a
//! standalone question, retrieves top-K chunks from `rag-store`, assembles a
//! bounded context block and asks the model for an answer grounded in it.
//! When the document has nothing to offer, the model is instructed to reply
//! with [`prompt::REFUSAL`].

pub mod assembler;
mod cfg;
pub mod conversation;
mod error;
pub mod llm;
mod pipeline;
pub mod prompt;
pub mod retriever;
pub mod rewriter;

pub use cfg::ContextorConfig;
pub use conversation::{Conversation, Speaker, Turn};
pub use error::ContextorError;
pub use llm::{ChatGenerator, ProfileChat};
pub use pipeline::{QaAnswer, RagPipeline};
