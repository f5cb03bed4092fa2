use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ModelDescriptor {
    pub id: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    pub is_real_backend: bool,
}

pub const MODEL_CATALOG: &[ModelDescriptor] = &[
    ModelDescriptor {
        id: "gemini-2.5-flash-preview-04-17",
        display_name: "Gemini 2.5 Flash",
        description: "Fast and versatile model for text and vision.",
        is_real_backend: true,
    },
    ModelDescriptor {
        id: "gpt-3.5-turbo",
        display_name: "GPT-3.5-Turbo (Mock)",
        description: "Powerful language model with broad knowledge. (Mocked)",
        is_real_backend: false,
    },
    ModelDescriptor {
        id: "claude-3-opus",
        display_name: "Claude 3 Opus (Mock)",
        description: "High-reasoning model by Anthropic. (Mocked)",
        is_real_backend: false,
    },
    ModelDescriptor {
        id: "grok-1",
        display_name: "Grok-1 (Mock)",
        description: "Model by xAI with real-time information access. (Mocked)",
        is_real_backend: false,
    },
];

pub fn default_model() -> &'static ModelDescriptor {
    &MODEL_CATALOG[0]
}

pub fn find_model(id: &str) -> Option<&'static ModelDescriptor> {
    MODEL_CATALOG.iter().find(|m| m.id == id)
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ResponderRequest {
    pub text: String,
    pub model_id: String,
    /// Base64 body for images, raw content for text files.
    pub payload: Option<String>,
    pub media_type: Option<String>,
    pub file_name: Option<String>,
}

/// Turns a prompt and optional file payload into a reply.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(&self, req: ResponderRequest) -> anyhow::Result<String>;
}

/// Scaffold responder: waits, then echoes a templated reply.
#[derive(Debug, Clone)]
pub struct MockResponder {
    pub delay: Duration,
}

#[async_trait]
impl Responder for MockResponder {
    async fn respond(&self, req: ResponderRequest) -> anyhow::Result<String> {
        match (&req.payload, &req.media_type) {
            (Some(payload), Some(media_type)) => {
                let head: String = payload.chars().take(100).collect();
                tracing::debug!(
                    text = %req.text,
                    model = %req.model_id,
                    file_name = req.file_name.as_deref().unwrap_or("N/A"),
                    media_type = %media_type,
                    payload_head = %head,
                    "mock responder received request with file"
                );
            }
            _ => tracing::debug!(text = %req.text, model = %req.model_id, "mock responder received request"),
        }

        tokio::time::sleep(self.delay).await;

        let mut reply = format!("Mock AI Response to: \"{}\". Model: {}.", req.text, req.model_id);
        if let Some(name) = &req.file_name {
            reply.push_str(&format!(" Regarding your file: \"{}\".", name));
        }
        reply.push_str(" (This is a scaffolded service, no actual AI processing occurred.)");
        Ok(reply)
    }
}
