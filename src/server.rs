use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc};
use tokio::sync::Mutex;

use crate::error::{IngestError, SendError};
use crate::ingest::FileSelection;
use crate::models::{self, ModelDescriptor, Responder};
use crate::orchestrator::ChatOrchestrator;
use crate::preview::{self, PreviewView};
use crate::session::{ChatEntry, PendingAttachment, SessionState};

/// One chat session shared by every request. The lock is never held across
/// a file read or a responder call.
#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<Mutex<ChatOrchestrator>>,
    pub responder: Arc<dyn Responder>,
}

impl AppState {
    pub fn new(chat: ChatOrchestrator, responder: Arc<dyn Responder>) -> Self {
        Self { chat: Arc::new(Mutex::new(chat)), responder }
    }
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

impl From<IngestError> for ApiError {
    fn from(e: IngestError) -> Self {
        let status = match e {
            IngestError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            IngestError::ReadFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        };
        Self::new(status, e.to_string())
    }
}

impl From<SendError> for ApiError {
    fn from(e: SendError) -> Self {
        let status = match e {
            SendError::Empty => StatusCode::BAD_REQUEST,
            SendError::Busy => StatusCode::CONFLICT,
        };
        Self::new(status, e.to_string())
    }
}

async fn get_session(State(state): State<AppState>) -> Json<SessionState> {
    Json(state.chat.lock().await.state().clone())
}

async fn list_models() -> Json<&'static [ModelDescriptor]> {
    Json(models::MODEL_CATALOG)
}

#[derive(Debug, Deserialize)]
pub struct SelectModelBody {
    pub id: String,
}

async fn select_model(
    State(state): State<AppState>,
    Json(body): Json<SelectModelBody>,
) -> Result<StatusCode, ApiError> {
    state
        .chat
        .lock()
        .await
        .select_model(&body.id)
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.to_string()))?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct AttachBody {
    pub name: String,
    #[serde(default)]
    pub media_type: String,
    pub content_base64: String,
}

async fn attach_file(
    State(state): State<AppState>,
    Json(body): Json<AttachBody>,
) -> Result<Json<PendingAttachment>, ApiError> {
    if !preview::accepts(&body.name, &body.media_type) {
        return Err(ApiError::new(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            format!("file type not accepted: {}", body.name),
        ));
    }
    let bytes = STANDARD
        .decode(body.content_base64.as_bytes())
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, format!("invalid base64 content: {}", e)))?;
    let file = FileSelection::from_bytes(body.name, body.media_type, bytes);

    let ticket = state.chat.lock().await.begin_ingest(file)?;
    let read = ticket.read_content().await;
    let staged = state.chat.lock().await.finish_ingest(ticket, read)?;
    staged
        .map(Json)
        .ok_or_else(|| ApiError::new(StatusCode::CONFLICT, "superseded by a newer attachment"))
}

async fn remove_file(State(state): State<AppState>) -> StatusCode {
    match state.chat.lock().await.remove_attachment() {
        Some(_) => StatusCode::NO_CONTENT,
        None => StatusCode::NOT_FOUND,
    }
}

async fn preview_file(State(state): State<AppState>) -> Result<Json<PreviewView>, ApiError> {
    let chat = state.chat.lock().await;
    chat.state()
        .pending
        .as_ref()
        .map(|f| Json(PreviewView::of(f)))
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, preview::EMPTY_PREVIEW))
}

#[derive(Debug, Deserialize)]
pub struct MessageBody {
    #[serde(default)]
    pub text: String,
}

async fn post_message(
    State(state): State<AppState>,
    Json(body): Json<MessageBody>,
) -> Result<Json<ChatEntry>, ApiError> {
    let request = state.chat.lock().await.begin_send(&body.text)?;
    // settles even if the client goes away and this handler is dropped
    let settle = tokio::spawn(async move {
        let outcome = state.responder.respond(request).await;
        state.chat.lock().await.settle(outcome).clone()
    });
    let entry = settle.await.map_err(|e| {
        tracing::error!(error = %e, "send task failed");
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "send task failed")
    })?;
    Ok(Json(entry))
}

async fn dismiss_error(State(state): State<AppState>) -> StatusCode {
    state.chat.lock().await.dismiss_error();
    StatusCode::NO_CONTENT
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/session", get(get_session))
        .route("/v1/models", get(list_models))
        .route("/v1/model", put(select_model))
        .route("/v1/attachment", post(attach_file).delete(remove_file))
        .route("/v1/attachment/preview", get(preview_file))
        .route("/v1/messages", post(post_message))
        .route("/v1/error", delete(dismiss_error))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MockResponder;
    use crate::preview::PreviewCategory;
    use crate::session::Sender;
    use crate::settings::EffectiveSettings;
    use std::time::Duration;

    fn app_state() -> AppState {
        let settings = EffectiveSettings {
            api_key: None,
            model: "gpt-3.5-turbo".into(),
            max_attachment_bytes: 16,
            responder_delay_ms: 0,
        };
        AppState::new(
            ChatOrchestrator::new(&settings),
            Arc::new(MockResponder { delay: Duration::ZERO }),
        )
    }

    #[tokio::test]
    async fn message_round_trip_through_handlers() {
        let state = app_state();
        let Json(entry) = post_message(State(state.clone()), Json(MessageBody { text: "hi".into() }))
            .await
            .unwrap();
        assert_eq!(entry.sender, Sender::Ai);
        assert!(entry.text.contains("Model: gpt-3.5-turbo."));

        let Json(session) = get_session(State(state.clone())).await;
        // greeting, key warning, user, ai
        assert_eq!(session.transcript().len(), 4);

        let err = post_message(State(state), Json(MessageBody { text: " ".into() })).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn dropped_send_still_settles() {
        let settings = EffectiveSettings {
            api_key: Some("k".into()),
            model: "grok-1".into(),
            max_attachment_bytes: 16,
            responder_delay_ms: 300,
        };
        let state = AppState::new(
            ChatOrchestrator::new(&settings),
            Arc::new(MockResponder { delay: Duration::from_millis(300) }),
        );

        let send = post_message(State(state.clone()), Json(MessageBody { text: "hi".into() }));
        assert!(tokio::time::timeout(Duration::from_millis(20), send).await.is_err());

        tokio::time::sleep(Duration::from_millis(500)).await;
        {
            let chat = state.chat.lock().await;
            assert!(!chat.state().is_request_in_flight());
            // greeting, user, ai
            assert_eq!(chat.state().transcript().len(), 3);
        }

        let follow_up = post_message(State(state), Json(MessageBody { text: "again".into() })).await;
        assert!(follow_up.is_ok());
    }

    #[tokio::test]
    async fn attachment_lifecycle() {
        let state = app_state();
        let body = AttachBody {
            name: "a.csv".into(),
            media_type: "text/csv".into(),
            content_base64: STANDARD.encode("x,y"),
        };
        let Json(staged) = attach_file(State(state.clone()), Json(body)).await.unwrap();
        assert_eq!(staged.preview_category, PreviewCategory::Text);
        assert_eq!(staged.payload, "x,y");

        let Json(view) = preview_file(State(state.clone())).await.unwrap();
        assert_eq!(view.name, "a.csv");

        assert_eq!(remove_file(State(state.clone())).await, StatusCode::NO_CONTENT);
        assert_eq!(remove_file(State(state.clone())).await, StatusCode::NOT_FOUND);
        assert_eq!(preview_file(State(state)).await.unwrap_err().status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn rejected_uploads_map_to_status_codes() {
        let state = app_state();
        let too_big = AttachBody {
            name: "a.txt".into(),
            media_type: "text/plain".into(),
            content_base64: STANDARD.encode([b'a'; 17]),
        };
        let err = attach_file(State(state.clone()), Json(too_big)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::PAYLOAD_TOO_LARGE);

        let zip = AttachBody {
            name: "a.zip".into(),
            media_type: "application/zip".into(),
            content_base64: String::new(),
        };
        let err = attach_file(State(state.clone()), Json(zip)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let Json(session) = get_session(State(state.clone())).await;
        assert!(session.last_error.is_some());
        assert_eq!(dismiss_error(State(state.clone())).await, StatusCode::NO_CONTENT);
        let Json(session) = get_session(State(state)).await;
        assert!(session.last_error.is_none());
    }

    #[tokio::test]
    async fn unknown_model_is_rejected() {
        let state = app_state();
        let err = select_model(State(state.clone()), Json(SelectModelBody { id: "gpt-5".into() }))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        let ok = select_model(State(state), Json(SelectModelBody { id: "grok-1".into() })).await.unwrap();
        assert_eq!(ok, StatusCode::NO_CONTENT);
        assert_eq!(list_models().await.0.len(), 4);
    }
}
