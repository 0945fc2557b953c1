//! OpenAI-compatible completions backend.
//!
//! Talks to any server implementing the legacy streaming `/v1/completions`
//! endpoint. Raw prompt text is required for splicing, which is why the chat
//! endpoint is not used.
mod adapter;
mod config;
pub(crate) mod transport;

pub use adapter::OpenAiCompatProvider;
pub use config::OpenAiClientConfig;
