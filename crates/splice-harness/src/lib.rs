//! Streaming prompt controller for reasoning models.
//!
//! A `StreamingController` streams generated text from a `ProviderAdapter`,
//! and when the model closes its reasoning block (`</think>`) it cuts the
//! output there, appends a fixed continuation to the prompt and generates
//! once more.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use splice_harness::prelude::*;
//! use splice_harness::vendors::openai::{OpenAiClientConfig, OpenAiCompatProvider};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), HarnessError> {
//! let provider = Arc::new(OpenAiCompatProvider::new(
//!     OpenAiClientConfig::new("http://127.0.0.1:8080").template(TemplateSource::ChatMl),
//! )?);
//! let mut controller =
//!     StreamingController::load(provider, ModelRef::new("openai-compat", "qwen")).await?;
//!
//! let mut sink = TextSink::new(std::io::stdout());
//! let report = controller.run("hello", &mut sink).await?;
//! println!("\npasses: {}", report.passes().count());
//! # Ok(())
//! # }
//! ```

/// Chat messages, generation events and finish reasons.
pub mod content;
/// Two-pass streaming controller.
pub mod controller;
/// Public error types.
pub mod errors;
/// Model and provider identifiers plus generation options.
pub mod model;
/// Common imports for typical usage.
pub mod prelude;
/// Initial prompt strategies and prompt splicing.
pub mod prompt;
/// Provider adapter contract.
pub mod provider;
/// Incremental output sink.
pub mod sink;
/// Jinja chat templates.
pub mod template;
/// Concrete backends.
pub mod vendors;

pub use content::{ChatMessage, FinishReason, GenerationEvent, Role};
pub use controller::{
    ControllerState, INJECTED_CONTINUATION, PassOutcome, SpliceReport, StreamingController,
    THINK_END_SENTINEL,
};
pub use errors::{HarnessError, ProviderError, TemplateError};
pub use model::{DEFAULT_MAX_TOKENS, GenerateOptions, ModelRef, ProviderId};
pub use prompt::{PromptStrategy, splice_prompt};
pub use provider::{
    GenerateRequest, GenerationStream, LoadedModel, ProviderAdapter, ProviderResponseMeta,
    ProviderStreamHandle, TokenizerHandle,
};
pub use sink::TextSink;
pub use template::{ChatTemplate, JinjaChatTemplate, SpecialTokens, TemplateSource};
