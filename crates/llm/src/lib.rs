//! Language-model service integration.
//!
//! [`client::LlmClient`] talks to an OpenAI-compatible chat-completions
//! endpoint. [`prompts::PromptManager`] serves named, versioned prompt
//! templates from the prompt provider, cached in memory.
//! [`trace::TraceSink`] records generations with the observability
//! collaborator on a strictly best-effort basis.

pub mod client;
pub mod prompts;
pub mod trace;

pub use client::{LlmClient, LlmError};
pub use prompts::{PromptManager, PromptTemplate};
pub use trace::{GenerationRecord, TraceSink};
