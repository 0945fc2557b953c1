use std::path::Path;

use splice_harness::vendors::openai::OpenAiClientConfig;
use splice_harness::{DEFAULT_MAX_TOKENS, HarnessError, ModelRef, TemplateSource};

use crate::cli::{Cli, Command};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_MODEL: &str = "mlx-community/Nemotron-Research-Reasoning-Qwen-1.5B-4bit";
pub const DEFAULT_PROMPT: &str = "hello";
const PROVIDER: &str = "openai-compat";

/// Load `.env` from the crate directory, then from the working directory.
pub fn init() {
    let _ = dotenvy::from_path(Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/.env")));
    dotenvy::dotenv().ok();
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Stream,
    Splice,
}

/// Fully resolved run settings: flag, then env, then default.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub template: TemplateSource,
    pub max_tokens: u32,
    pub prompt: String,
    pub mode: Mode,
    pub verbose: bool,
}

impl Settings {
    pub fn from_env(cli: Cli) -> Result<Self, HarnessError> {
        Self::resolve(cli, |key| std::env::var(key).ok())
    }

    pub fn resolve(cli: Cli, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, HarnessError> {
        let env = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let (mode, prompt) = match cli.command {
            Some(Command::Stream { prompt }) => (Mode::Stream, prompt),
            Some(Command::Splice { prompt }) => (Mode::Splice, prompt),
            None => (Mode::Splice, None),
        };

        let max_tokens = match cli.max_tokens {
            Some(max_tokens) => max_tokens,
            None => match env("SPLICE_MAX_TOKENS") {
                Some(raw) => raw.trim().parse().map_err(|e| {
                    HarnessError::Config(format!("invalid SPLICE_MAX_TOKENS={raw}: {e}"))
                })?,
                None => DEFAULT_MAX_TOKENS,
            },
        };

        let template = cli
            .chat_template
            .or_else(|| env("SPLICE_CHAT_TEMPLATE"))
            .map(|raw| TemplateSource::parse(&raw))
            .unwrap_or_default();

        let settings = Self {
            base_url: cli
                .base_url
                .or_else(|| env("SPLICE_BASE_URL"))
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key: env("SPLICE_API_KEY"),
            model: cli
                .model
                .or_else(|| env("SPLICE_MODEL"))
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            template,
            max_tokens,
            prompt: prompt
                .or_else(|| env("SPLICE_PROMPT"))
                .unwrap_or_else(|| DEFAULT_PROMPT.to_string()),
            mode,
            verbose: cli.verbose,
        };
        if settings.prompt.is_empty() {
            return Err(HarnessError::Config("prompt must not be empty".into()));
        }
        Ok(settings)
    }

    pub fn client_config(&self) -> OpenAiClientConfig {
        let config = OpenAiClientConfig::new(self.base_url.clone()).template(self.template.clone());
        match &self.api_key {
            Some(key) => config.api_key(key.clone()),
            None => config,
        }
    }

    pub fn model_ref(&self) -> ModelRef {
        ModelRef::new(PROVIDER, self.model.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser as _;
    use std::collections::HashMap;

    fn resolve(args: &[&str], env: &[(&str, &str)]) -> Result<Settings, HarnessError> {
        let cli = Cli::try_parse_from(args).expect("parse");
        let env: HashMap<String, String> = env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::resolve(cli, |key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_without_flags_or_env() {
        let settings = resolve(&["think-splice"], &[]).expect("settings");
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.model, DEFAULT_MODEL);
        assert_eq!(settings.prompt, DEFAULT_PROMPT);
        assert_eq!(settings.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(settings.template, TemplateSource::Auto);
        assert_eq!(settings.mode, Mode::Splice);
        assert_eq!(settings.api_key, None);
    }

    #[test]
    fn env_overrides_defaults_and_flags_override_env() {
        let env = [
            ("SPLICE_MODEL", "env-model"),
            ("SPLICE_BASE_URL", "http://env:1"),
            ("SPLICE_MAX_TOKENS", "77"),
            ("SPLICE_CHAT_TEMPLATE", "none"),
            ("SPLICE_PROMPT", "env prompt"),
            ("SPLICE_API_KEY", "secret"),
        ];
        let settings = resolve(&["think-splice"], &env).expect("settings");
        assert_eq!(settings.model, "env-model");
        assert_eq!(settings.base_url, "http://env:1");
        assert_eq!(settings.max_tokens, 77);
        assert_eq!(settings.template, TemplateSource::Disabled);
        assert_eq!(settings.prompt, "env prompt");
        assert_eq!(settings.api_key.as_deref(), Some("secret"));

        let settings = resolve(
            &["think-splice", "stream", "flag prompt", "--model", "flag-model", "--max-tokens", "3"],
            &env,
        )
        .expect("settings");
        assert_eq!(settings.model, "flag-model");
        assert_eq!(settings.max_tokens, 3);
        assert_eq!(settings.prompt, "flag prompt");
        assert_eq!(settings.mode, Mode::Stream);
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let settings = resolve(&["think-splice"], &[("SPLICE_MODEL", "  ")]).expect("settings");
        assert_eq!(settings.model, DEFAULT_MODEL);
    }

    #[test]
    fn invalid_max_tokens_env_is_config_error() {
        let err = resolve(&["think-splice"], &[("SPLICE_MAX_TOKENS", "many")]).expect_err("bad");
        assert!(matches!(err, HarnessError::Config(msg) if msg.contains("SPLICE_MAX_TOKENS")));
    }

    #[test]
    fn empty_prompt_argument_is_rejected() {
        let err = resolve(&["think-splice", "splice", ""], &[]).expect_err("empty prompt");
        assert!(matches!(err, HarnessError::Config(_)));
    }

    #[test]
    fn model_ref_uses_compat_provider() {
        let settings = resolve(&["think-splice", "--model", "m"], &[]).expect("settings");
        assert_eq!(settings.model_ref(), ModelRef::new("openai-compat", "m"));
        assert_eq!(settings.client_config().base_url, DEFAULT_BASE_URL);
    }
}
