use serde::{Deserialize, Serialize};

// ─── Message types ────────────────────────────────────────────────────────────

/// A single message in the conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self { role: Role::System, content: text.into() }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, content: text.into() }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: text.into() }
    }

    pub fn as_text(&self) -> &str {
        &self.content
    }
}

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

/// Request sent to a model provider.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    /// The full conversation so far, system message first.
    pub messages: Vec<Message>,
    pub stream: bool,
}

impl CompletionRequest {
    pub fn streaming(messages: Vec<Message>) -> Self {
        Self { messages, stream: true }
    }

    pub fn blocking(messages: Vec<Message>) -> Self {
        Self { messages, stream: false }
    }
}

/// A single streamed event from the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseEvent {
    /// A text fragment of the reply.
    TextDelta(String),
    /// Final token accounting, sent just before `Done` when the backend reports it.
    Usage {
        prompt_tokens: u32,
        completion_tokens: u32,
    },
    /// The backend signalled the end of the generation.
    Done,
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
