//! OpenAI wire envelopes and the per-request identity they share.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cligate_core::{GateError, Role};

/// Identity shared by every envelope emitted for one request. The envelope
/// shape itself is fixed by the request's `stream` flag and never changes
/// mid-flight.
#[derive(Debug, Clone)]
pub struct ShapeContext {
    pub id: String,
    pub model: String,
    pub created: u64,
    pub prompt_tokens: u32,
}

impl ShapeContext {
    pub fn new(model: impl Into<String>, prompt_tokens: u32) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self {
            id: format!("chatcmpl-{}", &suffix[..8]),
            model: model.into(),
            created: Utc::now().timestamp().max(0) as u64,
            prompt_tokens,
        }
    }
}

/// Rough token estimate (≈ words × 4⁄3). The CLI exposes no real accounting,
/// so the usage block is best-effort by design.
pub fn estimate_tokens(text: &str) -> u32 {
    let words = text.split_whitespace().count() as u32;
    (words * 4 / 3).max(1)
}

// ---------------------------------------------------------------------------
// Complete envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletion {
    pub id: String,
    pub object: String,
    pub created: u64,
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: Usage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    pub index: u32,
    pub message: ResponseMessage,
    pub finish_reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl ChatCompletion {
    pub fn new(ctx: &ShapeContext, content: String) -> Self {
        let completion_tokens = estimate_tokens(&content);
        let usage = Usage {
            prompt_tokens: ctx.prompt_tokens,
            completion_tokens,
            total_tokens: ctx.prompt_tokens + completion_tokens,
        };
        Self {
            id: ctx.id.clone(),
            object: "chat.completion".to_string(),
            created: ctx.created,
            model: ctx.model.clone(),
            choices: vec![Choice {
                index: 0,
                message: ResponseMessage {
                    role: Role::Assistant,
                    content,
                },
                finish_reason: "stop".to_string(),
            }],
            usage,
        }
    }
}

// ---------------------------------------------------------------------------
// Chunk envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    pub id: String,
    pub object: String,
    pub created: u64,
    pub model: String,
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkChoice {
    pub index: u32,
    pub delta: Delta,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Delta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl ChatCompletionChunk {
    /// A chunk carrying one fragment as an incremental delta. The first
    /// content chunk of a stream also announces the assistant role.
    pub fn content(ctx: &ShapeContext, fragment: &str, first: bool) -> Self {
        Self::with_choice(
            ctx,
            ChunkChoice {
                index: 0,
                delta: Delta {
                    role: first.then_some(Role::Assistant),
                    content: Some(fragment.to_string()),
                },
                finish_reason: None,
            },
        )
    }

    /// The terminal chunk: empty delta, completion marker, nothing after it
    /// but the sentinel.
    pub fn terminal(ctx: &ShapeContext) -> Self {
        Self::with_choice(
            ctx,
            ChunkChoice {
                index: 0,
                delta: Delta::default(),
                finish_reason: Some("stop".to_string()),
            },
        )
    }

    fn with_choice(ctx: &ShapeContext, choice: ChunkChoice) -> Self {
        Self {
            id: ctx.id.clone(),
            object: "chat.completion.chunk".to_string(),
            created: ctx.created,
            model: ctx.model.clone(),
            choices: vec![choice],
        }
    }
}

// ---------------------------------------------------------------------------
// Error envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub code: String,
}

/// Render a typed error as the OpenAI error object. Used verbatim for
/// non-streaming failures; streaming failures close the chunk sequence
/// instead (the wire has no mid-stream error signal).
pub fn error_body(err: &GateError) -> ErrorBody {
    let kind = match err {
        GateError::UnsupportedModel(_) => "invalid_request_error",
        _ => "server_error",
    };
    ErrorBody {
        error: ErrorDetail {
            message: err.to_string(),
            kind: kind.to_string(),
            code: err.code().to_string(),
        },
    }
}
