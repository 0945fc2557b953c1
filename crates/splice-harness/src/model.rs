use std::fmt;

/// Token cap used when the caller does not set one.
///
/// Large enough that generation only stops on the server's own stop criteria.
pub const DEFAULT_MAX_TOKENS: u32 = 1_000_000;

/// Stable identifier for a provider implementation (for example `openai-compat`).
#[derive(Clone, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ProviderId(pub String);

impl ProviderId {
    /// Creates a provider id from any string-like value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the provider id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ProviderId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Model selection for a generation pass.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ModelRef {
    /// Provider that serves the model.
    pub provider: ProviderId,
    /// Provider-specific model name (for example
    /// `mlx-community/Nemotron-Research-Reasoning-Qwen-1.5B-4bit`).
    pub model: String,
}

impl ModelRef {
    /// Creates a model reference.
    pub fn new(provider: impl Into<ProviderId>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
        }
    }
}

impl fmt::Display for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider, self.model)
    }
}

/// Per-pass generation options.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GenerateOptions {
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_options_default_is_effectively_unbounded() {
        assert_eq!(GenerateOptions::default().max_tokens, DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn model_ref_display_joins_provider_and_model() {
        let model = ModelRef::new("openai-compat", "qwen");
        assert_eq!(model.to_string(), "openai-compat/qwen");
    }
}
