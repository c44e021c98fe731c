// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream;

use crate::{provider::ResponseStream, CompletionRequest, ModelError, ResponseEvent, Role};

/// Deterministic mock provider.  Echoes the last user message back as the
/// assistant response.
#[derive(Default)]
pub struct MockProvider;

#[async_trait]
impl crate::ModelProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }
    fn model_name(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, req: CompletionRequest) -> Result<ResponseStream, ModelError> {
        let reply = req
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.as_text())
            .unwrap_or("[no input]")
            .to_string();

        let events: Vec<Result<ResponseEvent, ModelError>> = vec![
            Ok(ResponseEvent::TextDelta(format!("MOCK: {reply}"))),
            Ok(ResponseEvent::Usage { prompt_tokens: 10, completion_tokens: 10 }),
            Ok(ResponseEvent::Done),
        ];
        Ok(Box::pin(stream::iter(events)))
    }
}

/// One scripted answer of a [`ScriptedMockProvider`].
#[derive(Debug, Clone)]
pub enum Script {
    /// Stream these events.
    Events(Vec<ResponseEvent>),
    /// Stream these events, then fail with a backend error.
    FailAfter(Vec<ResponseEvent>, String),
    /// Refuse the request before any fragment is produced.
    Refuse(String),
}

/// A pre-scripted mock provider.  Each call to `complete` pops the next
/// script from the front of the queue, so tests can specify exact fragment
/// sequences and failures without network access.
pub struct ScriptedMockProvider {
    scripts: Arc<Mutex<VecDeque<Script>>>,
    name: String,
    /// The last `CompletionRequest` seen by this provider.
    pub last_request: Arc<Mutex<Option<CompletionRequest>>>,
    /// Every request seen, in call order.
    pub requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl ScriptedMockProvider {
    /// Build a provider from a list of event scripts.
    /// The outer `Vec` is the ordered list of calls; the inner `Vec` is the
    /// sequence of [`ResponseEvent`]s emitted for that call.
    pub fn new(scripts: Vec<Vec<ResponseEvent>>) -> Self {
        Self::with_scripts(scripts.into_iter().map(Script::Events).collect())
    }

    pub fn with_scripts(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Arc::new(Mutex::new(scripts.into())),
            name: "scripted-mock".into(),
            last_request: Arc::new(Mutex::new(None)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Convenience: provider that always returns a single text reply.
    pub fn always_text(reply: impl Into<String>) -> Self {
        Self::new(vec![text_script(&[&reply.into()])])
    }

    /// Convenience: one call per reply, each reply streamed as a single fragment.
    pub fn replies<S: AsRef<str>>(replies: &[S]) -> Self {
        Self::new(replies.iter().map(|r| text_script(&[r.as_ref()])).collect())
    }

    /// Number of `complete` calls seen so far.
    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }
}

/// Events for a reply made of `fragments`, terminated by usage and `Done`.
pub fn text_script(fragments: &[&str]) -> Vec<ResponseEvent> {
    let mut events: Vec<ResponseEvent> =
        fragments.iter().map(|f| ResponseEvent::TextDelta((*f).to_string())).collect();
    events.push(ResponseEvent::Usage { prompt_tokens: 5, completion_tokens: 5 });
    events.push(ResponseEvent::Done);
    events
}

#[async_trait]
impl crate::ModelProvider for ScriptedMockProvider {
    fn name(&self) -> &str {
        &self.name
    }
    fn model_name(&self) -> &str {
        "scripted-mock-model"
    }

    async fn complete(&self, req: CompletionRequest) -> Result<ResponseStream, ModelError> {
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(req.clone());
        }
        if let Ok(mut all) = self.requests.lock() {
            all.push(req);
        }
        let script = self
            .scripts
            .lock()
            .ok()
            .and_then(|mut s| s.pop_front())
            // Default fallback when all scripts are consumed
            .unwrap_or_else(|| {
                Script::Events(vec![
                    ResponseEvent::TextDelta("[no more scripts]".into()),
                    ResponseEvent::Done,
                ])
            });

        let wrapped: Vec<Result<ResponseEvent, ModelError>> = match script {
            Script::Events(events) => events.into_iter().map(Ok).collect(),
            Script::FailAfter(events, msg) => events
                .into_iter()
                .map(Ok)
                .chain(std::iter::once(Err(ModelError::Backend(msg))))
                .collect(),
            Script::Refuse(msg) => return Err(ModelError::Backend(msg)),
        };
        Ok(Box::pin(stream::iter(wrapped)))
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;
    use crate::{CompletionRequest, Message, ModelProvider, ResponseEvent};

    fn hi_req() -> CompletionRequest {
        CompletionRequest::streaming(vec![Message::system("sys"), Message::user("hi")])
    }

    async fn collect(p: &dyn ModelProvider) -> Vec<Result<ResponseEvent, ModelError>> {
        let stream = p.complete(hi_req()).await.unwrap();
        stream.collect().await
    }

    #[tokio::test]
    async fn mock_echoes_last_user_message() {
        let p = MockProvider;
        let mut stream = p.complete(hi_req()).await.unwrap();
        let first = stream.next().await.unwrap().unwrap();
        match first {
            ResponseEvent::TextDelta(t) => assert_eq!(t, "MOCK: hi"),
            other => panic!("unexpected first event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn mock_ends_with_done() {
        let events = collect(&MockProvider).await;
        assert!(matches!(events.last(), Some(Ok(ResponseEvent::Done))));
    }

    #[tokio::test]
    async fn default_chat_concatenates_fragments() {
        let p = ScriptedMockProvider::new(vec![text_script(&["Hel", "lo", "!"])]);
        assert_eq!(p.chat(hi_req()).await.unwrap(), "Hello!");
    }

    #[tokio::test]
    async fn default_list_models_is_configured_model() {
        assert_eq!(MockProvider.list_models().await.unwrap(), vec!["mock-model"]);
    }

    #[tokio::test]
    async fn scripted_replies_are_consumed_in_order() {
        let p = ScriptedMockProvider::replies(&["first", "second"]);
        assert_eq!(p.chat(hi_req()).await.unwrap(), "first");
        assert_eq!(p.chat(hi_req()).await.unwrap(), "second");
        assert_eq!(p.call_count(), 2);
    }

    #[tokio::test]
    async fn scripted_records_every_request() {
        let p = ScriptedMockProvider::always_text("ok");
        let _ = p.chat(hi_req()).await.unwrap();
        let last = p.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(last.messages.len(), 2);
        assert_eq!(last.messages[1].as_text(), "hi");
        assert_eq!(p.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn scripted_fail_after_streams_then_errors() {
        let p = ScriptedMockProvider::with_scripts(vec![Script::FailAfter(
            vec![ResponseEvent::TextDelta("partial".into())],
            "connection reset".into(),
        )]);
        let events = collect(&p).await;
        assert!(matches!(&events[0], Ok(ResponseEvent::TextDelta(t)) if t == "partial"));
        assert!(matches!(&events[1], Err(ModelError::Backend(m)) if m == "connection reset"));
    }

    #[tokio::test]
    async fn scripted_refuse_fails_before_streaming() {
        let p = ScriptedMockProvider::with_scripts(vec![Script::Refuse("model not found".into())]);
        let err = p.chat(hi_req()).await.unwrap_err();
        assert!(err.to_string().contains("model not found"));
    }

    #[tokio::test]
    async fn scripted_fallback_when_scripts_exhausted() {
        let p = ScriptedMockProvider::new(vec![]);
        let mut stream = p.complete(hi_req()).await.unwrap();
        let ev = stream.next().await.unwrap().unwrap();
        assert!(matches!(ev, ResponseEvent::TextDelta(t) if t.contains("no more scripts")));
    }
}
