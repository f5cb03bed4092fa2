use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::preview::PreviewCategory;

pub const GREETING_ID: &str = "initial-bot-message";
pub const GREETING_TEXT: &str = "Hello! I'm your AI assistant. You can upload various files (images, text, PDF, Excel, CSV) and I'll help analyze them. What would you like to do?";
pub const API_KEY_WARNING_ID: &str = "api_key_warning";
pub const API_KEY_WARNING_TEXT: &str = "Warning: GEMINI_API_KEY environment variable is not set. AI functionality will rely on mock services or may not work if real calls are implemented without it.";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

/// Attachment metadata recorded on a sent message. Never carries the payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttachmentRef {
    pub name: String,
    pub media_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatEntry {
    pub id: String,
    pub sender: Sender,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<AttachmentRef>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingAttachment {
    pub name: String,
    pub media_type: String,
    pub byte_size: u64,
    /// Raw text for `Text` files, a base64 data URL for everything else.
    pub payload: String,
    pub preview_category: PreviewCategory,
}

impl PendingAttachment {
    pub fn attachment_ref(&self) -> AttachmentRef {
        AttachmentRef { name: self.name.clone(), media_type: self.media_type.clone() }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    InFlight,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionState {
    transcript: Vec<ChatEntry>,
    pub pending: Option<PendingAttachment>,
    pub selected_model_id: String,
    pub phase: Phase,
    pub last_error: Option<String>,
}

impl SessionState {
    pub fn new(selected_model_id: String) -> Self {
        Self {
            transcript: Vec::new(),
            pending: None,
            selected_model_id,
            phase: Phase::Idle,
            last_error: None,
        }
    }

    pub fn transcript(&self) -> &[ChatEntry] {
        &self.transcript
    }

    pub fn is_request_in_flight(&self) -> bool {
        self.phase == Phase::InFlight
    }

    /// Appends an entry with a fresh id. Timestamps never go backwards even
    /// if the wall clock does.
    pub fn append(&mut self, sender: Sender, text: String, attachment: Option<AttachmentRef>) -> &ChatEntry {
        self.append_with_id(Uuid::new_v4().to_string(), sender, text, attachment)
    }

    pub fn append_with_id(
        &mut self,
        id: String,
        sender: Sender,
        text: String,
        attachment: Option<AttachmentRef>,
    ) -> &ChatEntry {
        let now = Utc::now();
        let created_at = match self.transcript.last() {
            Some(last) if last.created_at > now => last.created_at,
            _ => now,
        };
        self.transcript.push(ChatEntry { id, sender, text, attachment, created_at });
        &self.transcript[self.transcript.len() - 1]
    }
}
