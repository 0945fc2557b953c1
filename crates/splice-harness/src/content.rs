use std::fmt;

/// Speaker of a chat message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One role/content pair handed to a chat template.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    /// Creates a message with an explicit role.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Creates a `user` message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }
}

/// Why the generation service stopped producing tokens.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum FinishReason {
    /// Natural stop (EOS or a stop sequence).
    Stop,
    /// Token cap reached.
    Length,
    /// Any other vendor-specific reason, kept verbatim.
    Other(String),
}

impl FinishReason {
    /// Maps a wire value to a finish reason. Unknown values are preserved.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "stop" => Self::Stop,
            "length" => Self::Length,
            other => Self::Other(other.to_string()),
        }
    }

    /// Returns the wire spelling of this reason.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Stop => "stop",
            Self::Length => "length",
            Self::Other(raw) => raw,
        }
    }
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of streamed output.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct GenerationEvent {
    /// Incremental text fragment. May be empty.
    pub text: String,
    /// Set once the service has decided to stop.
    pub finish_reason: Option<FinishReason>,
}

impl GenerationEvent {
    /// Creates a plain text fragment.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            finish_reason: None,
        }
    }

    /// Creates a fragment that also carries a finish reason.
    pub fn finished(text: impl Into<String>, reason: FinishReason) -> Self {
        Self {
            text: text.into(),
            finish_reason: Some(reason),
        }
    }
}
