use std::sync::Arc;

use crate::content::ChatMessage;
use crate::errors::TemplateError;
use crate::template::ChatTemplate;

/// How the initial prompt is built from the user's raw text.
#[derive(Clone)]
pub enum PromptStrategy {
    /// Wrap the text as one `user` message and render it with a generation prompt.
    Templated(Arc<dyn ChatTemplate>),
    /// Send the text unchanged.
    Raw,
}

impl std::fmt::Debug for PromptStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Templated(_) => f.write_str("Templated"),
            Self::Raw => f.write_str("Raw"),
        }
    }
}

impl PromptStrategy {
    pub fn build(&self, raw_prompt: &str) -> Result<String, TemplateError> {
        match self {
            Self::Templated(template) => template.apply(&[ChatMessage::user(raw_prompt)], true),
            Self::Raw => Ok(raw_prompt.to_string()),
        }
    }
}

/// Prompt for the resumed pass: `prompt + pre_sentinel + continuation`, with
/// no separators beyond what `continuation` contains.
pub fn splice_prompt(prompt: &str, pre_sentinel: &str, continuation: &str) -> String {
    let mut spliced = String::with_capacity(prompt.len() + pre_sentinel.len() + continuation.len());
    spliced.push_str(prompt);
    spliced.push_str(pre_sentinel);
    spliced.push_str(continuation);
    spliced
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Bracketed;

    impl ChatTemplate for Bracketed {
        fn apply(
            &self,
            messages: &[ChatMessage],
            add_generation_prompt: bool,
        ) -> Result<String, TemplateError> {
            let body: Vec<String> = messages
                .iter()
                .map(|m| format!("[{:?}:{}]", m.role, m.content))
                .collect();
            Ok(format!("{}|gen={add_generation_prompt}", body.join("")))
        }
    }

    #[test]
    fn raw_strategy_returns_prompt_unchanged() {
        assert_eq!(PromptStrategy::Raw.build("  hello ").expect("raw"), "  hello ");
    }

    #[test]
    fn templated_strategy_wraps_single_user_message() {
        let strategy = PromptStrategy::Templated(Arc::new(Bracketed));
        assert_eq!(
            strategy.build("hello").expect("templated"),
            "[User:hello]|gen=true"
        );
    }

    #[test]
    fn splice_prompt_concatenates_exactly() {
        assert_eq!(splice_prompt("P", "T", "X\n"), "PTX\n");
        assert_eq!(splice_prompt("P", "", ""), "P");
    }
}
