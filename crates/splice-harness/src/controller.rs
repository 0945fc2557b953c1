use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt as _;
use tracing::{debug, info};

use crate::content::FinishReason;
use crate::errors::HarnessError;
use crate::model::{GenerateOptions, ModelRef};
use crate::prompt::splice_prompt;
use crate::provider::{GenerateRequest, LoadedModel, ProviderAdapter};
use crate::sink::TextSink;

/// End-of-reasoning marker that cuts the first pass short.
pub const THINK_END_SENTINEL: &str = "</think>";

/// Text appended after the truncated reasoning before generation resumes.
pub const INJECTED_CONTINUATION: &str =
    "\n\nWait, that reasoning is wrong. I was told the opposite, so let me start over.\n";

/// Lifecycle of a controller run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Pass1Streaming,
    SentinelDetected,
    StreamExhausted,
    Pass2Streaming,
    Done,
}

/// What one generation pass produced.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PassOutcome {
    /// Every fragment consumed in this pass, in order. Includes the fragment
    /// that carried the sentinel, in full.
    pub text: String,
    pub sentinel_hit: bool,
    /// Last finish reason reported before the stream ended.
    pub finish_reason: Option<FinishReason>,
    /// Number of events consumed.
    pub fragments: usize,
    pub elapsed: Duration,
}

impl PassOutcome {
    /// Accumulated text up to (excluding) the first occurrence of `sentinel`.
    pub fn text_before<'a>(&'a self, sentinel: &str) -> Option<&'a str> {
        self.text.find(sentinel).map(|idx| &self.text[..idx])
    }

    pub fn fragments_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.fragments as f64 / secs
        } else {
            0.0
        }
    }
}

/// Summary of a full `StreamingController::run`.
#[derive(Clone, Debug)]
pub struct SpliceReport {
    pub initial_prompt: String,
    pub first: PassOutcome,
    /// Prompt used for the resumed pass, when the sentinel was seen.
    pub spliced_prompt: Option<String>,
    pub second: Option<PassOutcome>,
    /// States entered, in order, starting after `Idle`.
    pub transitions: Vec<ControllerState>,
}

impl SpliceReport {
    pub fn passes(&self) -> impl Iterator<Item = &PassOutcome> {
        std::iter::once(&self.first).chain(self.second.as_ref())
    }
}

/// Drives generation passes against a provider and splices the injected
/// continuation in once the first pass emits the sentinel.
///
/// Passes are strictly sequential; the controller never runs more than two.
pub struct StreamingController {
    provider: Arc<dyn ProviderAdapter>,
    loaded: LoadedModel,
    options: GenerateOptions,
    state: ControllerState,
    transitions: Vec<ControllerState>,
}

impl StreamingController {
    pub fn new(provider: Arc<dyn ProviderAdapter>, loaded: LoadedModel) -> Self {
        Self {
            provider,
            loaded,
            options: GenerateOptions::default(),
            state: ControllerState::Idle,
            transitions: Vec::new(),
        }
    }

    /// Loads `model` through the provider and builds a controller for it.
    pub async fn load(
        provider: Arc<dyn ProviderAdapter>,
        model: ModelRef,
    ) -> Result<Self, HarnessError> {
        debug!(provider = %provider.id(), model = %model.model, "loading model");
        let loaded = provider.load(&model).await?;
        debug!(
            model = %loaded.model,
            has_chat_template = loaded.tokenizer.has_chat_template(),
            "model loaded"
        );
        Ok(Self::new(provider, loaded))
    }

    /// Overrides the per-pass token cap.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.options.max_tokens = max_tokens;
        self
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn loaded(&self) -> &LoadedModel {
        &self.loaded
    }

    /// Renders the first-pass prompt through the tokenizer's prompt strategy.
    pub fn initial_prompt(&self, raw_prompt: &str) -> Result<String, HarnessError> {
        if raw_prompt.is_empty() {
            return Err(HarnessError::Validation("prompt must not be empty".into()));
        }
        Ok(self.loaded.tokenizer.prompt_strategy().build(raw_prompt)?)
    }

    /// Consumes one generation stream, echoing each fragment to `sink`.
    ///
    /// With a sentinel, the pass stops at the first fragment containing it;
    /// the search never spans fragment boundaries. Finish reasons are
    /// reported but do not end the pass; the stream running dry does.
    pub async fn run_pass<W: Write>(
        &self,
        prompt: &str,
        sentinel: Option<&str>,
        sink: &mut TextSink<W>,
    ) -> Result<PassOutcome, HarnessError> {
        if prompt.is_empty() {
            return Err(HarnessError::Validation("prompt must not be empty".into()));
        }
        if sentinel.is_some_and(str::is_empty) {
            return Err(HarnessError::Validation("sentinel must not be empty".into()));
        }
        if self.options.max_tokens == 0 {
            return Err(HarnessError::Validation(
                "max_tokens must be greater than 0".into(),
            ));
        }

        let request = GenerateRequest {
            run_id: uuid::Uuid::new_v4(),
            model: self.loaded.model.clone(),
            prompt: prompt.to_string(),
            options: self.options.clone(),
        };
        let run_id = request.run_id;
        debug!(run_id = %run_id, model = %request.model, prompt_len = prompt.len(), detect_sentinel = sentinel.is_some(), "starting generation pass");

        let started = Instant::now();
        let mut handle = self.provider.start_stream(request).await?;
        if let Some(request_id) = &handle.metadata.request_id {
            debug!(run_id = %run_id, request_id = %request_id, "stream established");
        }

        let mut outcome = PassOutcome::default();
        while let Some(next) = handle.stream.next().await {
            let event = next?;
            outcome.fragments += 1;
            sink.fragment(&event.text)?;
            outcome.text.push_str(&event.text);

            if let Some(sentinel) = sentinel
                && event.text.contains(sentinel)
            {
                outcome.sentinel_hit = true;
                sink.notice(&format!("===== {sentinel} end spotted"))?;
                info!(run_id = %run_id, fragments = outcome.fragments, "sentinel detected, abandoning stream");
                break;
            }
            if let Some(reason) = event.finish_reason {
                sink.notice(&format!("====== finish reason: {reason}"))?;
                debug!(run_id = %run_id, finish_reason = %reason, "finish reason reported");
                outcome.finish_reason = Some(reason);
            }
        }
        drop(handle);

        outcome.elapsed = started.elapsed();
        info!(
            run_id = %run_id,
            fragments = outcome.fragments,
            chars = outcome.text.len(),
            sentinel_hit = outcome.sentinel_hit,
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "generation pass finished"
        );
        Ok(outcome)
    }

    /// Single pass with sentinel detection disabled.
    pub async fn stream<W: Write>(
        &mut self,
        raw_prompt: &str,
        sink: &mut TextSink<W>,
    ) -> Result<PassOutcome, HarnessError> {
        self.reset();
        let prompt = self.initial_prompt(raw_prompt)?;
        self.transition(ControllerState::Pass1Streaming);
        let outcome = self.run_pass(&prompt, None, sink).await?;
        self.transition(ControllerState::StreamExhausted);
        self.transition(ControllerState::Done);
        Ok(outcome)
    }

    /// Runs the first pass and, if it emitted the sentinel, one resumed pass
    /// whose prompt is the first prompt, the pre-sentinel text and
    /// `INJECTED_CONTINUATION`. The resumed pass never checks for the sentinel.
    pub async fn run<W: Write>(
        &mut self,
        raw_prompt: &str,
        sink: &mut TextSink<W>,
    ) -> Result<SpliceReport, HarnessError> {
        self.reset();
        let initial_prompt = self.initial_prompt(raw_prompt)?;

        self.transition(ControllerState::Pass1Streaming);
        let first = self
            .run_pass(&initial_prompt, Some(THINK_END_SENTINEL), sink)
            .await?;

        if !first.sentinel_hit {
            self.transition(ControllerState::StreamExhausted);
            self.transition(ControllerState::Done);
            return Ok(SpliceReport {
                initial_prompt,
                first,
                spliced_prompt: None,
                second: None,
                transitions: self.transitions.clone(),
            });
        }

        self.transition(ControllerState::SentinelDetected);
        let pre_sentinel = first.text_before(THINK_END_SENTINEL).ok_or_else(|| {
            HarnessError::protocol_msg("sentinel reported but absent from accumulated text")
        })?;
        let spliced_prompt = splice_prompt(&initial_prompt, pre_sentinel, INJECTED_CONTINUATION);

        self.transition(ControllerState::Pass2Streaming);
        let second = self.run_pass(&spliced_prompt, None, sink).await?;
        self.transition(ControllerState::Done);

        Ok(SpliceReport {
            initial_prompt,
            first,
            spliced_prompt: Some(spliced_prompt),
            second: Some(second),
            transitions: self.transitions.clone(),
        })
    }

    fn reset(&mut self) {
        self.state = ControllerState::Idle;
        self.transitions.clear();
    }

    fn transition(&mut self, next: ControllerState) {
        debug!(from = ?self.state, to = ?next, "controller state");
        self.state = next;
        self.transitions.push(next);
    }
}
