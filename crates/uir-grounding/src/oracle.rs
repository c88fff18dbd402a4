//! Completion oracle interface
//!
//! The model backend is opaque: it receives a [`Conversation`] of text and
//! screenshot parts and answers with text.

use crate::error::OracleError;
use uir_vision::Screenshot;

/// Speaker of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Standing instructions
    System,
    /// Caller turns (instructions, screenshots, corrections)
    User,
    /// Model turns
    Assistant,
}

/// One part of a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    /// Plain text
    Text(String),
    /// Encoded screen capture
    Image(Screenshot),
}

/// One conversation turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Speaker
    pub role: Role,
    /// Ordered parts
    pub content: Vec<ContentPart>,
}

impl Message {
    /// Concatenated text parts
    #[must_use]
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text(text) => Some(text.as_str()),
                ContentPart::Image(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Number of attached screenshots
    #[must_use]
    pub fn image_count(&self) -> usize {
        self.content
            .iter()
            .filter(|part| matches!(part, ContentPart::Image(_)))
            .count()
    }
}

/// Ordered message history sent to the oracle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Empty conversation
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a system message
    #[must_use]
    pub fn with_system(mut self, text: impl Into<String>) -> Self {
        self.messages.push(Message {
            role: Role::System,
            content: vec![ContentPart::Text(text.into())],
        });
        self
    }

    /// Append a user turn
    pub fn push_user(&mut self, content: Vec<ContentPart>) {
        self.messages.push(Message {
            role: Role::User,
            content,
        });
    }

    /// Append a user text turn
    pub fn push_user_text(&mut self, text: impl Into<String>) {
        self.push_user(vec![ContentPart::Text(text.into())]);
    }

    /// Append a user turn of text plus a screenshot
    pub fn push_user_with_screenshot(&mut self, text: impl Into<String>, screenshot: Screenshot) {
        self.push_user(vec![
            ContentPart::Text(text.into()),
            ContentPart::Image(screenshot),
        ]);
    }

    /// Append a model turn
    pub fn push_assistant(&mut self, text: impl Into<String>) {
        self.messages.push(Message {
            role: Role::Assistant,
            content: vec![ContentPart::Text(text.into())],
        });
    }

    /// All turns
    #[inline]
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of turns
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True when no turn has been added
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Last user turn, if any
    #[must_use]
    pub fn last_user(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::User)
    }

    /// Text of every model turn in order
    #[must_use]
    pub fn assistant_texts(&self) -> Vec<String> {
        self.messages
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .map(Message::text)
            .collect()
    }
}

/// Opaque request/response model backend
#[async_trait::async_trait]
pub trait CompletionOracle: Send + Sync {
    /// Produce the next model turn for `conversation`
    async fn complete(&self, conversation: &Conversation) -> Result<String, OracleError>;
}
