use std::pin::Pin;
use std::sync::Arc;

use crate::content::{ChatMessage, GenerationEvent};
use crate::errors::{ProviderError, TemplateError};
use crate::model::{GenerateOptions, ModelRef, ProviderId};
use crate::prompt::PromptStrategy;
use crate::template::ChatTemplate;

/// Lazy, non-restartable sequence of generation events.
pub type GenerationStream =
    Pin<Box<dyn futures::Stream<Item = Result<GenerationEvent, ProviderError>> + Send + 'static>>;

/// Request for a single generation pass.
#[derive(Clone, Debug)]
pub struct GenerateRequest {
    pub run_id: uuid::Uuid,
    pub model: ModelRef,
    /// Fully rendered prompt text; no further templating is applied.
    pub prompt: String,
    pub options: GenerateOptions,
}

/// Response metadata reported when the stream is established.
#[derive(Clone, Debug, Default)]
pub struct ProviderResponseMeta {
    /// Server-assigned request id, when the backend sends one.
    pub request_id: Option<String>,
}

/// Stream returned by `ProviderAdapter::start_stream`.
///
/// Dropping the handle abandons the underlying request.
pub struct ProviderStreamHandle {
    pub stream: GenerationStream,
    pub metadata: ProviderResponseMeta,
}

/// Tokenizer side of a loaded model.
///
/// The only capability exposed is optional chat-template rendering.
#[derive(Clone, Default)]
pub struct TokenizerHandle {
    chat_template: Option<Arc<dyn ChatTemplate>>,
}

impl std::fmt::Debug for TokenizerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenizerHandle")
            .field("has_chat_template", &self.has_chat_template())
            .finish()
    }
}

impl TokenizerHandle {
    /// Tokenizer without a chat template.
    pub fn raw() -> Self {
        Self::default()
    }

    /// Tokenizer that renders prompts through `template`.
    pub fn with_chat_template(template: Arc<dyn ChatTemplate>) -> Self {
        Self {
            chat_template: Some(template),
        }
    }

    pub fn has_chat_template(&self) -> bool {
        self.chat_template.is_some()
    }

    /// Renders `messages` through the chat template.
    pub fn apply_chat_template(
        &self,
        messages: &[ChatMessage],
        add_generation_prompt: bool,
    ) -> Result<String, TemplateError> {
        match &self.chat_template {
            Some(template) => template.apply(messages, add_generation_prompt),
            None => Err(TemplateError::Missing),
        }
    }

    /// How prompts for this tokenizer should be built.
    pub fn prompt_strategy(&self) -> PromptStrategy {
        match &self.chat_template {
            Some(template) => PromptStrategy::Templated(template.clone()),
            None => PromptStrategy::Raw,
        }
    }
}

/// Result of `ProviderAdapter::load`.
#[derive(Clone, Debug)]
pub struct LoadedModel {
    pub model: ModelRef,
    pub tokenizer: TokenizerHandle,
}

/// Contract implemented by inference backends.
///
/// Tokenization, sampling and stopping criteria all live behind this trait.
#[async_trait::async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Stable id used in logs and errors.
    fn id(&self) -> ProviderId;

    /// Resolves the model and its tokenizer. Fails if the backend cannot serve it.
    async fn load(&self, model: &ModelRef) -> Result<LoadedModel, ProviderError>;

    /// Starts streaming generation for an already rendered prompt.
    async fn start_stream(
        &self,
        req: GenerateRequest,
    ) -> Result<ProviderStreamHandle, ProviderError>;
}
