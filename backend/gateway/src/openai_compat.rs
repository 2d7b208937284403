//! OpenAI-compatible endpoints (`/v1/chat/completions`, `/v1/models`).
//!
//! Requests are parsed here, run through router → session → engine → shaper,
//! and the core's typed errors are mapped onto HTTP status codes. The
//! envelope shape (complete object vs chunk stream) is fixed by the
//! request's `stream` flag before the engine is ever touched.

use std::convert::Infallible;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::{wrappers::ReceiverStream, StreamExt};
use tracing::{error, info};

use cligate_core::{prompt::render_prompt, ChatMessage, GateError, Role, Turn};
use cligate_router::{known_aliases, select_mode};
use cligate_shaper::{
    complete, error_body, estimate_tokens, stream_chunks, ErrorBody, ShapeContext,
};

use crate::server::GatewayState;

/// Capacity of the frame channel between the shaper task and the response
/// body.
const FRAME_BUFFER: usize = 32;

// ---------------------------------------------------------------------------
// Request shape
// ---------------------------------------------------------------------------

/// Chat completion request. Tuning knobs the CLI cannot honor are accepted
/// and ignored rather than rejected, so off-the-shelf OpenAI clients work
/// unmodified.
#[derive(Debug, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub stream: bool,
    /// Conversation identifier; falls back to `user` when absent.
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub top_p: Option<f32>,
}

impl ChatCompletionRequest {
    fn session_key(&self) -> Option<&str> {
        self.session_id.as_deref().or(self.user.as_deref())
    }
}

// ---------------------------------------------------------------------------
// Chat completions
// ---------------------------------------------------------------------------

/// Handler for `POST /v1/chat/completions` (streaming and non-streaming).
pub async fn chat_completions(
    State(state): State<GatewayState>,
    Json(request): Json<ChatCompletionRequest>,
) -> Response {
    if request.messages.is_empty() {
        return bad_request("messages must not be empty");
    }

    let mode = match select_mode(&request.model, &request.messages) {
        Ok(mode) => mode,
        Err(e) => return error_response(&e),
    };

    info!(
        model = %request.model,
        %mode,
        messages = request.messages.len(),
        stream = request.stream,
        "chat completion request"
    );

    let session_key = request.session_key().map(str::to_string);
    let history = match &session_key {
        Some(key) => state.sessions.load(key).await,
        None => Vec::new(),
    };

    let prompt = render_prompt(&history, &request.messages);
    let ctx = ShapeContext::new(&request.model, estimate_tokens(&prompt));
    let user_text = request
        .messages
        .last()
        .map(|m| m.flattened())
        .unwrap_or_default();

    let fragments = match state.engine.invoke(mode, &prompt).await {
        Ok(fragments) => fragments,
        Err(e) => return error_response(&e),
    };

    if request.stream {
        stream_response(state, ctx, fragments, session_key, user_text)
    } else {
        match complete(&ctx, fragments).await {
            Ok(envelope) => {
                if let Some(key) = &session_key {
                    let content = envelope
                        .choices
                        .first()
                        .map(|c| c.message.content.clone())
                        .unwrap_or_default();
                    state
                        .sessions
                        .append_exchange(
                            key,
                            Turn::new(Role::User, user_text),
                            Turn::new(Role::Assistant, content),
                        )
                        .await;
                }
                Json(envelope).into_response()
            }
            Err(e) => error_response(&e),
        }
    }
}

/// Spawn the shaper task and hand its SSE frames to the client as they are
/// produced. Dropping the response body drops the frame receiver, which the
/// shaper observes and which ultimately kills the CLI process.
fn stream_response(
    state: GatewayState,
    ctx: ShapeContext,
    fragments: cligate_core::FragmentStream,
    session_key: Option<String>,
    user_text: String,
) -> Response {
    let (tx, rx) = mpsc::channel::<String>(FRAME_BUFFER);

    tokio::spawn(async move {
        let outcome = stream_chunks(&ctx, fragments, &tx).await;
        drop(tx);

        if let Some(key) = session_key {
            // Content already on the wire stands, even after a mid-stream
            // failure; a request that produced nothing records nothing.
            if outcome.error.is_none() || !outcome.content.is_empty() {
                state
                    .sessions
                    .append_exchange(
                        &key,
                        Turn::new(Role::User, user_text),
                        Turn::new(Role::Assistant, outcome.content),
                    )
                    .await;
            }
        }
    });

    let body = Body::from_stream(ReceiverStream::new(rx).map(Ok::<_, Infallible>));
    match Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(body)
    {
        Ok(response) => response,
        Err(e) => {
            error!(error = %e, "building streaming response");
            error_response(&GateError::Other(anyhow::anyhow!(e)))
        }
    }
}

// ---------------------------------------------------------------------------
// Models
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ModelInfo {
    pub id: String,
    pub object: String,
    pub created: u64,
    pub owned_by: String,
}

impl ModelInfo {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            object: "model".to_string(),
            created: Utc::now().timestamp().max(0) as u64,
            owned_by: "cligate".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub object: String,
    pub data: Vec<ModelInfo>,
}

/// Handler for `GET /v1/models`.
pub async fn list_models() -> Json<ModelsResponse> {
    Json(ModelsResponse {
        object: "list".to_string(),
        data: known_aliases().iter().map(|a| ModelInfo::new(a)).collect(),
    })
}

/// Handler for `GET /v1/models/:model_id`.
pub async fn get_model(Path(model_id): Path<String>) -> Response {
    if known_aliases().contains(&model_id.as_str()) {
        Json(ModelInfo::new(&model_id)).into_response()
    } else {
        let err = GateError::UnsupportedModel(model_id);
        (StatusCode::NOT_FOUND, Json(error_body(&err))).into_response()
    }
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Map a typed core error onto the HTTP surface.
pub fn error_response(err: &GateError) -> Response {
    let status = match err {
        GateError::UnsupportedModel(_) => StatusCode::BAD_REQUEST,
        GateError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        GateError::Execution { .. } => StatusCode::BAD_GATEWAY,
        GateError::Cancelled | GateError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(error_body(err))).into_response()
}

fn bad_request(message: &str) -> Response {
    let body = ErrorBody {
        error: cligate_shaper::envelope::ErrorDetail {
            message: message.to_string(),
            kind: "invalid_request_error".to_string(),
            code: "invalid_request".to_string(),
        },
    };
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}
