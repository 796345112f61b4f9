//! Provider gateways for chat generation and embeddings.
//!
//! [`service_profiles::LlmServiceProfiles`] is the entry point: it owns the
//! fast/slow/embedding profiles and routes each call to the Ollama, OpenAI or
//! Gemini client.

pub mod chat;
pub mod config;
pub mod error_handler;
pub mod health_service;
pub mod retry;
pub mod service_profiles;
pub mod services;
pub mod telemetry;

pub use chat::{ChatRole, ChatTurn, EmbedTask};
pub use error_handler::AiLlmError;
pub use service_profiles::{LlmProfile, LlmServiceProfiles};
