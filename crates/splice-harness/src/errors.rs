use crate::model::ProviderId;

/// Errors returned by a provider adapter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// Provider returned an application-level failure (HTTP status, auth, etc.).
    #[error("provider error ({provider}): {message}")]
    Provider {
        provider: ProviderId,
        message: String,
        status_code: Option<u16>,
    },
    /// Transport or stream I/O failed.
    #[error("transport error ({provider}): {message}")]
    Transport {
        provider: ProviderId,
        message: String,
    },
    /// Provider response shape was invalid.
    #[error("protocol error ({provider}): {message}")]
    Protocol {
        provider: ProviderId,
        message: String,
    },
}

impl ProviderError {
    /// Creates a provider-level error.
    pub fn provider(
        provider: impl Into<ProviderId>,
        message: impl Into<String>,
        status_code: Option<u16>,
    ) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
            status_code,
        }
    }

    /// Creates a transport-level error.
    pub fn transport(provider: impl Into<ProviderId>, message: impl Into<String>) -> Self {
        Self::Transport {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Creates a protocol-level error.
    pub fn protocol(provider: impl Into<ProviderId>, message: impl Into<String>) -> Self {
        Self::Protocol {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Returns the provider associated with this error.
    pub fn provider_id(&self) -> &ProviderId {
        match self {
            Self::Provider { provider, .. }
            | Self::Transport { provider, .. }
            | Self::Protocol { provider, .. } => provider,
        }
    }

    /// Returns the human-readable message for this error.
    pub fn message(&self) -> &str {
        match self {
            Self::Provider { message, .. }
            | Self::Transport { message, .. }
            | Self::Protocol { message, .. } => message,
        }
    }
}

/// Chat template loading or rendering failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    /// The tokenizer has no chat template to apply.
    #[error("tokenizer has no chat template")]
    Missing,
    /// Template source could not be compiled.
    #[error("invalid chat template: {0}")]
    Syntax(String),
    /// Template compiled but rendering failed (including `raise_exception`).
    #[error("chat template render failed: {0}")]
    Render(String),
    /// Template file or tokenizer config could not be read.
    #[error("chat template source error: {0}")]
    Source(String),
}

/// Top-level error type for the public API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HarnessError {
    /// Invalid provider or client configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Invalid caller input.
    #[error("validation error: {0}")]
    Validation(String),
    /// Provider failed while loading or generating.
    #[error(transparent)]
    Provider(#[from] ProviderError),
    /// Prompt formatting failed.
    #[error(transparent)]
    Template(#[from] TemplateError),
    /// Writing to the output sink failed.
    #[error("output error: {0}")]
    Output(String),
    /// Internal invariant violation.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl HarnessError {
    pub(crate) fn output(err: std::io::Error) -> Self {
        Self::Output(err.to_string())
    }

    pub(crate) fn protocol_msg(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_accessors() {
        let err = ProviderError::provider("openai-compat", "boom", Some(500));
        assert_eq!(err.provider_id().as_str(), "openai-compat");
        assert_eq!(err.message(), "boom");
    }

    #[test]
    fn provider_error_converts_transparently() {
        let err: HarnessError = ProviderError::transport("fake", "reset").into();
        assert_eq!(err.to_string(), "transport error (fake): reset");
    }
}
