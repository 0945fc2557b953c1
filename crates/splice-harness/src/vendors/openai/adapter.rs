use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;

use futures::StreamExt as _;
use futures::stream;
use tracing::debug;

use crate::content::GenerationEvent;
use crate::errors::{HarnessError, ProviderError, TemplateError};
use crate::model::{ModelRef, ProviderId};
use crate::provider::{
    GenerateRequest, LoadedModel, ProviderAdapter, ProviderResponseMeta, ProviderStreamHandle,
    TokenizerHandle,
};
use crate::template::{JinjaChatTemplate, TemplateSource};

use super::config::OpenAiClientConfig;
use super::transport::{FrameEvent, SseDecoder, SseFrame, map_completion_frame};

pub(crate) const OPENAI_COMPAT_PROVIDER: &str = "openai-compat";

type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send + 'static>>;

/// Provider adapter for servers exposing the streaming `/v1/completions` API.
///
/// Prompts are sent verbatim; chat templating happens client-side according
/// to `OpenAiClientConfig::template`.
pub struct OpenAiCompatProvider {
    client: reqwest::Client,
    config: OpenAiClientConfig,
}

impl OpenAiCompatProvider {
    /// Creates a provider from explicit client configuration.
    pub fn new(config: OpenAiClientConfig) -> Result<Self, HarnessError> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| HarnessError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    fn provider_id() -> ProviderId {
        ProviderId::new(OPENAI_COMPAT_PROVIDER)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => req.bearer_auth(key),
            None => req,
        }
    }

    async fn resolve_tokenizer(&self) -> Result<TokenizerHandle, ProviderError> {
        let template = match &self.config.template {
            TemplateSource::Disabled => None,
            TemplateSource::ChatMl => Some(JinjaChatTemplate::chatml().map_err(template_error)?),
            TemplateSource::File(path) => {
                Some(JinjaChatTemplate::from_path(path).map_err(template_error)?)
            }
            TemplateSource::Auto => self.fetch_server_template().await?,
        };
        Ok(match template {
            Some(template) => TokenizerHandle::with_chat_template(Arc::new(template)),
            None => TokenizerHandle::raw(),
        })
    }

    async fn fetch_server_template(&self) -> Result<Option<JinjaChatTemplate>, ProviderError> {
        let provider_id = Self::provider_id();
        let url = self.config.props_url();
        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|e| {
                ProviderError::transport(provider_id.clone(), format!("GET {url} failed: {e}"))
            })?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            debug!(url = %url, "server exposes no props endpoint; using raw prompts");
            return Ok(None);
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ProviderError::provider(
                provider_id,
                format!("GET {url} failed with status {status}: {body}"),
                Some(status.as_u16()),
            ));
        }
        let props: serde_json::Value = response.json().await.map_err(|e| {
            ProviderError::protocol(provider_id.clone(), format!("invalid props document: {e}"))
        })?;
        let template = JinjaChatTemplate::from_server_props(&props).map_err(template_error)?;
        debug!(url = %url, has_chat_template = template.is_some(), "fetched server props");
        Ok(template)
    }
}

fn template_error(err: TemplateError) -> ProviderError {
    ProviderError::protocol(OPENAI_COMPAT_PROVIDER, err.to_string())
}

#[async_trait::async_trait]
impl ProviderAdapter for OpenAiCompatProvider {
    fn id(&self) -> ProviderId {
        Self::provider_id()
    }

    async fn load(&self, model: &ModelRef) -> Result<LoadedModel, ProviderError> {
        if model.model.trim().is_empty() {
            return Err(ProviderError::provider(
                Self::provider_id(),
                "model identifier must not be empty",
                None,
            ));
        }
        let tokenizer = self.resolve_tokenizer().await?;
        Ok(LoadedModel {
            model: model.clone(),
            tokenizer,
        })
    }

    async fn start_stream(
        &self,
        req: GenerateRequest,
    ) -> Result<ProviderStreamHandle, ProviderError> {
        let provider_id = Self::provider_id();
        let body = build_request_body(&req);
        debug!(run_id = %req.run_id, model = %req.model.model, max_tokens = req.options.max_tokens, "starting completions stream");

        let response = self
            .authorize(self.client.post(self.config.completions_url()))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                ProviderError::transport(provider_id.clone(), format!("completion request failed: {e}"))
            })?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ProviderError::provider(
                provider_id,
                format!("completion request failed with status {status}: {body}"),
                Some(status.as_u16()),
            ));
        }

        let request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(ToOwned::to_owned);
        let bytes_stream: ByteStream = Box::pin(response.bytes_stream());
        let stream = completion_event_stream(provider_id, bytes_stream);

        Ok(ProviderStreamHandle {
            stream: Box::pin(stream),
            metadata: ProviderResponseMeta { request_id },
        })
    }
}

pub(crate) fn build_request_body(req: &GenerateRequest) -> serde_json::Value {
    serde_json::json!({
        "model": req.model.model,
        "prompt": req.prompt,
        "max_tokens": req.options.max_tokens,
        "stream": true,
    })
}

fn completion_event_stream(
    provider_id: ProviderId,
    bytes_stream: ByteStream,
) -> impl futures::Stream<Item = Result<GenerationEvent, ProviderError>> + Send {
    struct State {
        provider_id: ProviderId,
        bytes_stream: ByteStream,
        decoder: SseDecoder,
        pending: VecDeque<GenerationEvent>,
        done: bool,
    }

    impl State {
        // Queues events from `frames`; returns true once `[DONE]` is seen.
        fn absorb(&mut self, frames: Vec<SseFrame>) -> Result<bool, ProviderError> {
            for frame in frames {
                match map_completion_frame(&self.provider_id, &frame)? {
                    Some(FrameEvent::Generation(event)) => self.pending.push_back(event),
                    Some(FrameEvent::Done) => return Ok(true),
                    None => {}
                }
            }
            Ok(false)
        }
    }

    stream::try_unfold(
        State {
            provider_id,
            bytes_stream,
            decoder: SseDecoder::default(),
            pending: VecDeque::new(),
            done: false,
        },
        |mut state| async move {
            loop {
                if let Some(event) = state.pending.pop_front() {
                    return Ok(Some((event, state)));
                }
                if state.done {
                    return Ok(None);
                }

                match state.bytes_stream.next().await {
                    Some(Ok(chunk)) => {
                        let frames = state.decoder.push_chunk(&chunk);
                        state.done = state.absorb(frames)?;
                    }
                    Some(Err(e)) => {
                        return Err(ProviderError::transport(
                            state.provider_id,
                            format!("completion stream read failed: {e}"),
                        ));
                    }
                    None => {
                        let trailing = state.decoder.finish().into_iter().collect();
                        state.absorb(trailing)?;
                        state.done = true;
                    }
                }
            }
        },
    )
}
