use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed discriminator for transcript messages. The backend never sees
/// these; they only drive rendering and transcript logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MessageKind {
    User,
    Bot,
    Error,
}

impl MessageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::User => "user",
            MessageKind::Bot => "bot",
            MessageKind::Error => "error",
        }
    }

    pub fn is_user(self) -> bool {
        self == MessageKind::User
    }

    pub fn is_bot(self) -> bool {
        self == MessageKind::Bot
    }
}

impl TryFrom<&str> for MessageKind {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, String> {
        match value {
            "user" => Ok(MessageKind::User),
            "bot" => Ok(MessageKind::Bot),
            "error" => Ok(MessageKind::Error),
            _ => Err(format!("invalid message kind: {value}")),
        }
    }
}

impl TryFrom<String> for MessageKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, String> {
        Self::try_from(value.as_str())
    }
}

impl From<MessageKind> for String {
    fn from(value: MessageKind) -> Self {
        value.as_str().to_string()
    }
}

/// A single transcript entry. Immutable once finalized, except a bot message
/// under active streaming, whose content is replaced wholesale per chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub kind: MessageKind,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(kind: MessageKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageKind::User, content)
    }

    pub fn bot(content: impl Into<String>) -> Self {
        Self::new(MessageKind::Bot, content)
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self::new(MessageKind::Error, content)
    }

    pub fn is_user(&self) -> bool {
        self.kind.is_user()
    }

    pub fn is_bot(&self) -> bool {
        self.kind.is_bot()
    }
}
