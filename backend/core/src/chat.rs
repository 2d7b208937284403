use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a chat participant. Closed set per the wire contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One message in a chat completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChatMessage {
    pub fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: MessageContent::Text(content.into()),
            name: None,
        }
    }

    /// Flattened text rendering of the content.
    pub fn flattened(&self) -> String {
        self.content.flattened()
    }

    /// Whether this message carries an image or file part.
    pub fn has_attachment(&self) -> bool {
        self.content.has_attachment()
    }
}

/// Message content: either a plain string or an array of typed parts.
/// Clients sending attachments use the parts form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Collapse the content into plain text for the CLI transcript.
    /// Attachment parts are kept as bracketed markers so the prompt
    /// records that something non-textual was present.
    pub fn flattened(&self) -> String {
        match self {
            MessageContent::Text(s) => s.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .map(|p| match p {
                    ContentPart::Text { text } => text.clone(),
                    ContentPart::ImageUrl { image_url } => {
                        format!("[image: {}]", image_url.url)
                    }
                    ContentPart::File { file } => {
                        format!("[file: {}]", file.filename.as_deref().unwrap_or("attachment"))
                    }
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    pub fn has_attachment(&self) -> bool {
        match self {
            MessageContent::Text(_) => false,
            MessageContent::Parts(parts) => parts
                .iter()
                .any(|p| !matches!(p, ContentPart::Text { .. })),
        }
    }
}

/// A single typed content part.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
    File { file: FileRef },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// One stored conversation turn. Owned by the session store; content is
/// already flattened to text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}
