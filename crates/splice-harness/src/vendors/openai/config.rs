use std::time::Duration;

use crate::errors::HarnessError;
use crate::template::TemplateSource;

/// Configuration for an OpenAI-compatible completions server.
#[derive(Clone, Debug)]
pub struct OpenAiClientConfig {
    /// Server root, without the `/v1` suffix.
    pub base_url: String,
    /// Bearer token. Local servers usually need none.
    pub api_key: Option<String>,
    /// Connection timeout. No overall request timeout is applied, since a
    /// single stream may run for as long as the model keeps generating.
    pub connect_timeout: Duration,
    /// Where the model's chat template comes from.
    pub template: TemplateSource,
}

impl OpenAiClientConfig {
    /// Creates a config with defaults for the given server.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            connect_timeout: Duration::from_secs(10),
            template: TemplateSource::default(),
        }
    }

    /// Sets the bearer token. Blank keys are ignored.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        self.api_key = (!api_key.trim().is_empty()).then_some(api_key);
        self
    }

    /// Overrides the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Selects the chat template source.
    pub fn template(mut self, template: TemplateSource) -> Self {
        self.template = template;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), HarnessError> {
        let base = self.base_url.trim();
        if base.is_empty() {
            return Err(HarnessError::Config("base_url must not be empty".into()));
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(HarnessError::Config(format!(
                "base_url must start with http:// or https:// (got {base})"
            )));
        }
        Ok(())
    }

    pub(crate) fn completions_url(&self) -> String {
        format!("{}/v1/completions", self.root())
    }

    pub(crate) fn props_url(&self) -> String {
        format!("{}/props", self.root())
    }

    fn root(&self) -> &str {
        self.base_url.trim().trim_end_matches('/')
    }
}
