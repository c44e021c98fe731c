// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Ollama driver for the native `/api/chat` endpoint.
//!
//! Streaming replies are newline-delimited JSON, one object per line:
//!
//! ```text
//! {"message":{"role":"assistant","content":"Hel"},"done":false}
//! {"message":{"role":"assistant","content":"lo"},"done":false}
//! {"message":{"role":"assistant","content":""},"done":true,"prompt_eval_count":26,"eval_count":2}
//! ```
//!
//! A line carrying an `error` field reports a backend failure mid-stream.

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::{provider::ResponseStream, CompletionRequest, ModelError, ResponseEvent};

pub struct OllamaProvider {
    client: reqwest::Client,
    host: String,
    model: String,
}

impl OllamaProvider {
    /// `host` is the server root, e.g. `http://localhost:11434`.
    pub fn new(host: impl Into<String>, model: impl Into<String>) -> Self {
        let host: String = host.into();
        Self {
            client: reqwest::Client::new(),
            host: host.trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.host)
    }

    fn tags_url(&self) -> String {
        format!("{}/api/tags", self.host)
    }

    fn request_body(&self, req: &CompletionRequest) -> serde_json::Value {
        json!({
            "model": self.model,
            "messages": req.messages,
            "stream": req.stream,
        })
    }

    async fn post_chat(&self, req: &CompletionRequest) -> Result<reqwest::Response, ModelError> {
        let url = self.chat_url();
        debug!(model = %self.model, messages = req.messages.len(), stream = req.stream, "ollama request");
        let resp = self
            .client
            .post(&url)
            .json(&self.request_body(req))
            .send()
            .await
            .map_err(|source| ModelError::Connect { url, source })?;
        check_status(resp).await
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, ModelError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    Err(ModelError::Status { status, body })
}

#[async_trait]
impl crate::ModelProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, req: CompletionRequest) -> Result<ResponseStream, ModelError> {
        let req = CompletionRequest { stream: true, ..req };
        let resp = self.post_chat(&req).await?;

        // A JSON line may be split across TCP chunks (and so may a multi-byte
        // character).  Keep raw bytes across chunks and decode whole lines only.
        let state = (Box::pin(resp.bytes_stream()), Vec::<u8>::new(), false);
        let event_stream = futures::stream::unfold(state, |(mut bytes, mut buf, finished)| async move {
            if finished {
                return None;
            }
            match bytes.next().await {
                Some(Ok(chunk)) => {
                    buf.extend_from_slice(&chunk);
                    let events = drain_complete_lines(&mut buf);
                    Some((events, (bytes, buf, false)))
                }
                Some(Err(e)) => Some((vec![Err(ModelError::Stream(e))], (bytes, buf, true))),
                None => {
                    // Unterminated trailing line.
                    buf.push(b'\n');
                    let events = drain_complete_lines(&mut buf);
                    Some((events, (bytes, buf, true)))
                }
            }
        })
        .flat_map(futures::stream::iter);

        Ok(Box::pin(event_stream))
    }

    async fn chat(&self, req: CompletionRequest) -> Result<String, ModelError> {
        let req = CompletionRequest { stream: false, ..req };
        let resp = self.post_chat(&req).await?;
        let text = resp.text().await.map_err(ModelError::Stream)?;
        let reply: ChatLine = serde_json::from_str(&text)
            .map_err(|_| ModelError::Malformed { line: text.clone() })?;
        if let Some(err) = reply.error {
            return Err(ModelError::Backend(err));
        }
        Ok(reply.message.map(|m| m.content).unwrap_or_default())
    }

    /// `GET /api/tags`: the models pulled into the local server.
    async fn list_models(&self) -> Result<Vec<String>, ModelError> {
        let url = self.tags_url();
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| ModelError::Connect { url, source })?;
        let resp = check_status(resp).await?;
        let text = resp.text().await.map_err(ModelError::Stream)?;
        let tags: TagsResponse = serde_json::from_str(&text)
            .map_err(|_| ModelError::Malformed { line: text.clone() })?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

// ─── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChatLine {
    #[serde(default)]
    message: Option<ChatLineMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatLineMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

/// Parse one complete NDJSON line into zero or more events.
fn parse_chat_line(line: &str) -> Vec<Result<ResponseEvent, ModelError>> {
    let parsed: ChatLine = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(_) => return vec![Err(ModelError::Malformed { line: line.to_string() })],
    };
    if let Some(err) = parsed.error {
        return vec![Err(ModelError::Backend(err))];
    }

    let mut events = Vec::new();
    if let Some(msg) = parsed.message.filter(|m| !m.content.is_empty()) {
        events.push(Ok(ResponseEvent::TextDelta(msg.content)));
    }
    if parsed.done {
        if let (Some(prompt_tokens), Some(completion_tokens)) =
            (parsed.prompt_eval_count, parsed.eval_count)
        {
            events.push(Ok(ResponseEvent::Usage { prompt_tokens, completion_tokens }));
        }
        events.push(Ok(ResponseEvent::Done));
    }
    events
}

/// Drain every complete `\n`-terminated line from `buf`.
///
/// Bytes after the last newline stay in `buf` for the next chunk.
pub(crate) fn drain_complete_lines(buf: &mut Vec<u8>) -> Vec<Result<ResponseEvent, ModelError>> {
    let mut events = Vec::new();
    while let Some(nl_pos) = buf.iter().position(|&b| b == b'\n') {
        let raw: Vec<u8> = buf.drain(..=nl_pos).collect();
        let line = String::from_utf8_lossy(&raw);
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        events.extend(parse_chat_line(line));
    }
    events
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
