use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque conversation owner key, e.g. `telegram-123456789`.
///
/// One identity owns exactly one conversation window; windows are never
/// shared across identities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity(pub String);

impl Identity {
    /// Identity of a Telegram user, keyed by numeric user ID.
    pub fn telegram(user_id: u64) -> Self {
        Self(format!("telegram-{user_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Identity {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Identity {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// One element of a multimodal message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: String },
}

/// Message body: plain text, or an ordered list of text/image parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntryContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl EntryContent {
    /// Concatenated text of the body. Image parts contribute nothing.
    pub fn text(&self) -> String {
        match self {
            Self::Text(t) => t.clone(),
            Self::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::ImageUrl { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    pub fn image_count(&self) -> usize {
        match self {
            Self::Text(_) => 0,
            Self::Parts(parts) => parts
                .iter()
                .filter(|p| matches!(p, ContentPart::ImageUrl { .. }))
                .count(),
        }
    }
}

impl From<String> for EntryContent {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for EntryContent {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// A single turn of a conversation. Never mutated after it is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub role: Role,
    pub content: EntryContent,
    pub timestamp: DateTime<Utc>,
    /// The turn was cut short (cancelled or upstream failure).
    #[serde(default)]
    pub partial: bool,
}

impl ConversationEntry {
    pub fn new(role: Role, content: impl Into<EntryContent>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
            partial: false,
        }
    }

    pub fn user(content: impl Into<EntryContent>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<EntryContent>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Mark this entry as an incomplete reply.
    pub fn into_partial(mut self) -> Self {
        self.partial = true;
        self
    }
}
