//! Chat template rendering.
//!
//! Templates are HuggingFace-style Jinja sources rendered with `minijinja`.
//! The render context exposes `messages`, `add_generation_prompt`,
//! `bos_token`, `eos_token` and a `raise_exception` function.

use std::path::{Path, PathBuf};

use minijinja::{Environment, context};

use crate::content::ChatMessage;
use crate::errors::TemplateError;

const CHAT_TEMPLATE_NAME: &str = "chat";
const MAX_RECURSION_DEPTH: usize = 64;

/// ChatML layout used by Qwen-family models.
pub const CHATML_TEMPLATE: &str = "{% for message in messages %}<|im_start|>{{ message.role }}\n{{ message.content }}<|im_end|>\n{% endfor %}{% if add_generation_prompt %}<|im_start|>assistant\n{% endif %}";

/// Renders an ordered message list into prompt text.
pub trait ChatTemplate: Send + Sync {
    fn apply(
        &self,
        messages: &[ChatMessage],
        add_generation_prompt: bool,
    ) -> Result<String, TemplateError>;
}

/// Where a provider should get its chat template from.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum TemplateSource {
    /// Ask the serving backend for the model's template.
    #[default]
    Auto,
    /// Built-in ChatML template.
    ChatMl,
    /// A `tokenizer_config.json` or raw `.jinja` file.
    File(PathBuf),
    /// Never template; the raw prompt is sent as-is.
    Disabled,
}

impl TemplateSource {
    /// Parses `auto`, `chatml`, `none` (or `raw`/`off`), or treats the value as a path.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Self::Auto,
            "chatml" => Self::ChatMl,
            "none" | "raw" | "off" | "disabled" => Self::Disabled,
            _ => Self::File(PathBuf::from(raw.trim())),
        }
    }
}

/// Special tokens some templates reference.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SpecialTokens {
    pub bos_token: Option<String>,
    pub eos_token: Option<String>,
}

/// Jinja chat template compiled once and rendered per prompt.
pub struct JinjaChatTemplate {
    env: Environment<'static>,
    special_tokens: SpecialTokens,
}

impl std::fmt::Debug for JinjaChatTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JinjaChatTemplate")
            .field("special_tokens", &self.special_tokens)
            .finish_non_exhaustive()
    }
}

impl JinjaChatTemplate {
    /// Compiles a Jinja template source.
    pub fn new(
        source: impl Into<String>,
        special_tokens: SpecialTokens,
    ) -> Result<Self, TemplateError> {
        let mut env = Environment::new();
        env.set_recursion_limit(MAX_RECURSION_DEPTH);
        env.add_function("raise_exception", raise_exception);
        env.add_template_owned(CHAT_TEMPLATE_NAME, source.into())
            .map_err(|e| TemplateError::Syntax(e.to_string()))?;
        Ok(Self {
            env,
            special_tokens,
        })
    }

    /// Built-in ChatML template.
    pub fn chatml() -> Result<Self, TemplateError> {
        Self::new(CHATML_TEMPLATE, SpecialTokens::default())
    }

    /// Builds a template from `tokenizer_config.json` content.
    ///
    /// `chat_template` may be a string or a list of `{name, template}` entries,
    /// in which case the `default` entry (or the first one) is used.
    pub fn from_tokenizer_config(json: &str) -> Result<Self, TemplateError> {
        let config: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| TemplateError::Source(format!("invalid tokenizer config: {e}")))?;
        let source = template_from_value(config.get("chat_template")).ok_or_else(|| {
            TemplateError::Source("no 'chat_template' found in tokenizer config".into())
        })?;
        Self::new(source, special_tokens_from_value(&config))
    }

    /// Loads a template file. `.json` files are read as tokenizer configs,
    /// anything else as raw Jinja.
    pub fn from_path(path: &Path) -> Result<Self, TemplateError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TemplateError::Source(format!("{}: {e}", path.display())))?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_tokenizer_config(&content)
        } else {
            Self::new(content, SpecialTokens::default())
        }
    }

    /// Builds a template from a serving backend's properties document
    /// (`chat_template`, `bos_token`, `eos_token`). Returns `None` when the
    /// document carries no template.
    pub fn from_server_props(props: &serde_json::Value) -> Result<Option<Self>, TemplateError> {
        match template_from_value(props.get("chat_template")) {
            Some(source) => Self::new(source, special_tokens_from_value(props)).map(Some),
            None => Ok(None),
        }
    }
}

impl ChatTemplate for JinjaChatTemplate {
    fn apply(
        &self,
        messages: &[ChatMessage],
        add_generation_prompt: bool,
    ) -> Result<String, TemplateError> {
        let tmpl = self
            .env
            .get_template(CHAT_TEMPLATE_NAME)
            .map_err(|e| TemplateError::Render(e.to_string()))?;
        let bos = self.special_tokens.bos_token.as_deref().unwrap_or("");
        let eos = self.special_tokens.eos_token.as_deref().unwrap_or("");
        tmpl.render(context!(
            messages => messages,
            add_generation_prompt => add_generation_prompt,
            bos_token => bos,
            eos_token => eos
        ))
        .map_err(|e| TemplateError::Render(e.to_string()))
    }
}

fn raise_exception(message: String) -> Result<String, minijinja::Error> {
    Err(minijinja::Error::new(
        minijinja::ErrorKind::InvalidOperation,
        message,
    ))
}

fn template_from_value(value: Option<&serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::String(source) if !source.trim().is_empty() => Some(source.clone()),
        serde_json::Value::Array(entries) => {
            let named = |name: &str| {
                entries
                    .iter()
                    .find(|e| e.get("name").and_then(|v| v.as_str()) == Some(name))
            };
            named("default")
                .or_else(|| entries.first())
                .and_then(|e| e.get("template"))
                .and_then(|v| v.as_str())
                .map(ToOwned::to_owned)
        }
        _ => None,
    }
}

// Tokens appear either as plain strings or as `{"content": "..."}` objects.
fn token_from_value(value: Option<&serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::String(token) => Some(token.clone()),
        serde_json::Value::Object(obj) => obj
            .get("content")
            .and_then(|v| v.as_str())
            .map(ToOwned::to_owned),
        _ => None,
    }
}

fn special_tokens_from_value(value: &serde_json::Value) -> SpecialTokens {
    SpecialTokens {
        bos_token: token_from_value(value.get("bos_token")),
        eos_token: token_from_value(value.get("eos_token")),
    }
}
