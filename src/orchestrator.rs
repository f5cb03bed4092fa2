use crate::data_url;
use crate::error::{IngestError, SelectError, SendError};
use crate::ingest::{self, FileSelection};
use crate::models::{self, Responder, ResponderRequest};
use crate::preview::PreviewCategory;
use crate::session::{self, ChatEntry, PendingAttachment, Phase, Sender, SessionState};
use crate::settings::EffectiveSettings;

/// A size-checked file whose content has not been read yet.
#[derive(Debug, Clone)]
pub struct IngestTicket {
    seq: u64,
    category: PreviewCategory,
    file: FileSelection,
}

impl IngestTicket {
    pub async fn read_content(&self) -> std::io::Result<String> {
        ingest::read_content(&self.file, self.category).await
    }
}

/// Owns the session and sequences attachment ingestion and message sends.
///
/// Both operations are split in two phases so that a shared owner can
/// release its lock while the file read or the responder call is pending.
#[derive(Debug)]
pub struct ChatOrchestrator {
    state: SessionState,
    max_attachment_bytes: u64,
    ingest_seq: u64,
}

impl ChatOrchestrator {
    pub fn new(settings: &EffectiveSettings) -> Self {
        let mut state = SessionState::new(settings.model.clone());
        state.append_with_id(session::GREETING_ID.into(), Sender::Ai, session::GREETING_TEXT.into(), None);
        if settings.api_key.is_none() {
            tracing::warn!("GEMINI_API_KEY is not set");
            state.append_with_id(
                session::API_KEY_WARNING_ID.into(),
                Sender::Ai,
                session::API_KEY_WARNING_TEXT.into(),
                None,
            );
        }
        Self { state, max_attachment_bytes: settings.max_attachment_bytes, ingest_seq: 0 }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn begin_ingest(&mut self, file: FileSelection) -> Result<IngestTicket, IngestError> {
        if file.byte_size > self.max_attachment_bytes {
            let err = IngestError::TooLarge {
                name: file.name.clone(),
                size: file.byte_size,
                limit: self.max_attachment_bytes,
            };
            tracing::info!(file = %file.name, size = file.byte_size, "rejected attachment over size limit");
            self.state.last_error = Some(err.to_string());
            return Err(err);
        }
        self.ingest_seq += 1;
        let category = file.category();
        tracing::debug!(file = %file.name, ?category, seq = self.ingest_seq, "ingesting attachment");
        Ok(IngestTicket { seq: self.ingest_seq, category, file })
    }

    /// Applies a finished read. Returns `Ok(None)` when a later selection or
    /// an explicit removal superseded this ticket; the session is left alone.
    pub fn finish_ingest(
        &mut self,
        ticket: IngestTicket,
        read: std::io::Result<String>,
    ) -> Result<Option<PendingAttachment>, IngestError> {
        if ticket.seq != self.ingest_seq {
            tracing::debug!(file = %ticket.file.name, seq = ticket.seq, "discarding superseded ingestion");
            return Ok(None);
        }
        self.apply_read(ticket, read).map(Some)
    }

    fn apply_read(
        &mut self,
        ticket: IngestTicket,
        read: std::io::Result<String>,
    ) -> Result<PendingAttachment, IngestError> {
        match read {
            Ok(payload) => {
                let attachment = PendingAttachment {
                    name: ticket.file.name,
                    media_type: ticket.file.media_type,
                    byte_size: ticket.file.byte_size,
                    payload,
                    preview_category: ticket.category,
                };
                tracing::info!(file = %attachment.name, category = ?attachment.preview_category, "attachment staged");
                self.state.pending = Some(attachment.clone());
                self.state.last_error = None;
                Ok(attachment)
            }
            Err(e) => {
                tracing::warn!(file = %ticket.file.name, error = %e, "failed to read attachment");
                let err = IngestError::ReadFailed { file_name: ticket.file.name };
                self.state.pending = None;
                self.state.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    pub async fn ingest(&mut self, file: FileSelection) -> Result<PendingAttachment, IngestError> {
        // the exclusive borrow rules out a newer ticket, so no sequence check
        let ticket = self.begin_ingest(file)?;
        let read = ticket.read_content().await;
        self.apply_read(ticket, read)
    }

    pub fn remove_attachment(&mut self) -> Option<PendingAttachment> {
        self.ingest_seq += 1;
        self.state.pending.take()
    }

    pub fn select_model(&mut self, id: &str) -> Result<(), SelectError> {
        let model = models::find_model(id).ok_or_else(|| SelectError::UnknownModel(id.to_string()))?;
        self.state.selected_model_id = model.id.to_string();
        Ok(())
    }

    pub fn dismiss_error(&mut self) {
        self.state.last_error = None;
    }

    /// Appends the user entry and moves the session in flight. The pending
    /// attachment stays staged for follow-up questions.
    pub fn begin_send(&mut self, message: &str) -> Result<ResponderRequest, SendError> {
        if self.state.is_request_in_flight() {
            return Err(SendError::Busy);
        }
        let text = message.trim();
        if text.is_empty() && self.state.pending.is_none() {
            return Err(SendError::Empty);
        }

        let attachment_ref = self.state.pending.as_ref().map(PendingAttachment::attachment_ref);
        self.state.append(Sender::User, text.to_string(), attachment_ref);
        self.state.phase = Phase::InFlight;
        self.state.last_error = None;

        let mut request = ResponderRequest {
            text: text.to_string(),
            model_id: self.state.selected_model_id.clone(),
            ..Default::default()
        };
        if let Some(file) = &self.state.pending {
            request.file_name = Some(file.name.clone());
            match file.preview_category {
                PreviewCategory::Image => {
                    request.media_type = Some(file.media_type.clone());
                    match data_url::decode_base64_payload(&file.payload) {
                        Ok(body) => request.payload = Some(body.to_string()),
                        Err(e) => {
                            self.state.last_error = Some(format!("{}: {}; sending its name only", file.name, e));
                        }
                    }
                }
                PreviewCategory::Text => {
                    request.payload = Some(file.payload.clone());
                    request.media_type = Some(file.media_type.clone());
                }
                PreviewCategory::Pdf | PreviewCategory::Unsupported => {}
            }
        }
        tracing::info!(model = %request.model_id, file = ?request.file_name, "sending message");
        Ok(request)
    }

    /// Settles the in-flight request with exactly one AI entry.
    pub fn settle(&mut self, outcome: anyhow::Result<String>) -> &ChatEntry {
        if !self.state.is_request_in_flight() {
            tracing::warn!("settling a request that was not in flight");
        }
        self.state.phase = Phase::Idle;
        let text = match outcome {
            Ok(reply) => reply,
            Err(e) => {
                let description = e.to_string();
                tracing::warn!(error = %description, "responder failed");
                let text = format!("Sorry, I encountered an error: {}", description);
                self.state.last_error = Some(description);
                text
            }
        };
        self.state.append(Sender::Ai, text, None)
    }

    pub async fn send(&mut self, message: &str, responder: &dyn Responder) -> Result<&ChatEntry, SendError> {
        let request = self.begin_send(message)?;
        let outcome = responder.respond(request).await;
        Ok(self.settle(outcome))
    }
}
