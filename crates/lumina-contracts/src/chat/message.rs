use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::attachment::Attachment;
use crate::settings::GenerationSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<GenerationSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
}

impl ChatMessage {
    pub fn user(
        content: impl Into<String>,
        settings: GenerationSettings,
        attachment: Option<Attachment>,
    ) -> Self {
        Self::new(Role::User, content.into(), None, Some(settings), attachment)
    }

    pub fn assistant(
        content: impl Into<String>,
        image_url: Option<String>,
        settings: Option<GenerationSettings>,
    ) -> Self {
        Self::new(Role::Assistant, content.into(), image_url, settings, None)
    }

    fn new(
        role: Role,
        content: String,
        image_url: Option<String>,
        settings: Option<GenerationSettings>,
        attachment: Option<Attachment>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            image_url,
            timestamp: Utc::now().timestamp_millis(),
            settings,
            attachment,
        }
    }
}

/// Ordered, append-only message history of one chat session.
#[derive(Debug, Clone, Default)]
pub struct ChatTranscript {
    messages: Vec<ChatMessage>,
}

impl ChatTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) -> &ChatMessage {
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.messages.as_slice()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
