// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::sync::Arc;

use futures::StreamExt;
use orgmate_config::Config;
use orgmate_model::{
    CompletionRequest, Message, ModelError, ModelProvider, ResponseEvent, ResponseStream,
};
use orgmate_search::{SearchEngine, SearchOptions, SearchReport};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{augment, Conversation, Submission, TurnError, TurnEvent, TurnScheduler};

/// Knowledge-base lookup run before each turn.
#[derive(Debug, Clone)]
pub struct Retriever {
    engine: SearchEngine,
    options: SearchOptions,
}

impl Retriever {
    pub fn new(engine: SearchEngine, options: SearchOptions) -> Self {
        Self { engine, options }
    }

    /// `None` unless automatic knowledge-base search is enabled.
    pub fn from_config(cfg: &Config) -> Option<Self> {
        cfg.knowledge_base
            .enable_auto_search
            .then(|| Self::new(SearchEngine::from_config(cfg), SearchOptions::from_config(cfg)))
    }

    pub async fn retrieve(&self, query: &str) -> SearchReport {
        self.engine.search_report(query, &self.options).await
    }
}

#[derive(Debug, Error)]
enum StartError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Turn(#[from] TurnError),
}

/// The generation currently streaming.
struct ActiveTurn {
    stream: ResponseStream,
    text: String,
}

/// Drives one interactive conversation.
///
/// Inputs are accepted while a reply streams; they wait in the scheduler's
/// queue and start one at a time as earlier turns finish.
pub struct ChatSession {
    scheduler: TurnScheduler,
    model: Arc<dyn ModelProvider>,
    retriever: Option<Retriever>,
}

impl ChatSession {
    pub fn new(
        scheduler: TurnScheduler,
        model: Arc<dyn ModelProvider>,
        retriever: Option<Retriever>,
    ) -> Self {
        Self { scheduler, model, retriever }
    }

    /// Run until `inputs` is closed and every accepted input has been
    /// answered, then hand back the conversation.
    pub async fn run(
        mut self,
        mut inputs: mpsc::Receiver<String>,
        events: mpsc::Sender<TurnEvent>,
    ) -> Conversation {
        info!(
            session = %self.scheduler.conversation().id(),
            model = %self.model.model_name(),
            auto_search = self.retriever.is_some(),
            "chat session started"
        );
        let mut inputs_open = true;
        let mut active: Option<ActiveTurn> = None;

        // `active` is `None` exactly when the scheduler is idle.
        while inputs_open || active.is_some() {
            tokio::select! {
                biased;
                input = inputs.recv(), if inputs_open => match input {
                    Some(text) => {
                        if let Some(turn) = self.on_input(&text, &events).await {
                            active = Some(turn);
                        }
                    }
                    None => {
                        debug!(pending = self.scheduler.pending().len(), "input closed; draining");
                        inputs_open = false;
                    }
                },
                event = next_event(&mut active), if active.is_some() => {
                    self.on_stream_event(event, &mut active, &events).await;
                }
            }
        }

        info!(session = %self.scheduler.conversation().id(), "chat session finished");
        self.scheduler.into_conversation()
    }

    async fn on_input(&mut self, text: &str, events: &mpsc::Sender<TurnEvent>) -> Option<ActiveTurn> {
        match self.scheduler.submit(text) {
            Submission::Ignored => None,
            Submission::Dispatch(text) => self.start(text, events).await,
            Submission::Queued { position } => {
                debug!(position, "input queued");
                emit(events, TurnEvent::Queued { position, input: text.trim().to_string() }).await;
                None
            }
            Submission::Rejected => {
                warn!("pending queue full; input dropped");
                emit(events, TurnEvent::QueueFull { input: text.trim().to_string() }).await;
                None
            }
        }
    }

    async fn on_stream_event(
        &mut self,
        event: Option<Result<ResponseEvent, ModelError>>,
        active: &mut Option<ActiveTurn>,
        events: &mpsc::Sender<TurnEvent>,
    ) {
        let outcome = match event {
            Some(Ok(ResponseEvent::TextDelta(delta))) => {
                if delta.is_empty() {
                    return;
                }
                if let Some(turn) = active.as_mut() {
                    turn.text.push_str(&delta);
                    emit(events, TurnEvent::TextDelta(delta)).await;
                }
                return;
            }
            Some(Ok(ResponseEvent::Usage { prompt_tokens, completion_tokens })) => {
                debug!(prompt_tokens, completion_tokens, "token usage");
                emit(events, TurnEvent::TokenUsage { prompt: prompt_tokens, completion: completion_tokens })
                    .await;
                return;
            }
            // A stream that ends without a done marker still completes the turn.
            Some(Ok(ResponseEvent::Done)) | None => {
                Ok(active.take().map(|turn| turn.text).unwrap_or_default())
            }
            Some(Err(e)) => {
                active.take();
                Err(e.to_string())
            }
        };

        *active = match self.conclude(outcome, events).await {
            Some(next) => self.start(next, events).await,
            None => None,
        };
    }

    /// Start a generation for `text`.  When it cannot even be started, the
    /// failure concludes the turn and the next queued input is tried.
    async fn start(&mut self, mut text: String, events: &mpsc::Sender<TurnEvent>) -> Option<ActiveTurn> {
        loop {
            emit(events, TurnEvent::TurnStarted { input: text.clone() }).await;
            match self.open(&text, events).await {
                Ok(stream) => return Some(ActiveTurn { stream, text: String::new() }),
                Err(e) => match self.conclude(Err(e.to_string()), events).await {
                    Some(next) => text = next,
                    None => return None,
                },
            }
        }
    }

    async fn open(
        &mut self,
        text: &str,
        events: &mpsc::Sender<TurnEvent>,
    ) -> Result<ResponseStream, StartError> {
        let results = match &self.retriever {
            Some(retriever) => {
                let report = retriever.retrieve(text).await;
                for failure in report.failures {
                    emit(
                        events,
                        TurnEvent::SearchWarning { directory: failure.directory, error: failure.error },
                    )
                    .await;
                }
                if !report.results.is_empty() {
                    debug!(results = report.results.len(), "attaching knowledge-base context");
                    emit(events, TurnEvent::ContextAttached { results: report.results.clone() }).await;
                }
                report.results
            }
            None => Vec::new(),
        };

        let messages = self.scheduler.commit_user(augment(text, &results))?;
        debug!(messages = messages.len(), "requesting completion");
        Ok(self.model.complete(CompletionRequest::streaming(messages)).await?)
    }

    /// Report the end of the active turn and record it.  Returns the queued
    /// input that starts next, if any.
    async fn conclude(
        &mut self,
        outcome: Result<String, String>,
        events: &mpsc::Sender<TurnEvent>,
    ) -> Option<String> {
        match &outcome {
            Ok(text) => emit(events, TurnEvent::TextComplete(text.clone())).await,
            Err(e) => {
                warn!(error = %e, "turn failed");
                emit(events, TurnEvent::Error(e.clone())).await;
            }
        }
        emit(events, TurnEvent::TurnComplete).await;
        self.scheduler.complete(outcome).next
    }
}

async fn next_event(active: &mut Option<ActiveTurn>) -> Option<Result<ResponseEvent, ModelError>> {
    match active {
        Some(turn) => turn.stream.next().await,
        None => std::future::pending().await,
    }
}

/// Front-ends may stop listening at any time; the session carries on.
async fn emit(events: &mpsc::Sender<TurnEvent>, event: TurnEvent) {
    let _ = events.send(event).await;
}

/// One-shot question without streaming, as used by `orgmate ask`.
pub async fn ask(
    model: &dyn ModelProvider,
    retriever: Option<&Retriever>,
    system_prompt: &str,
    question: &str,
) -> Result<String, ModelError> {
    let results = match retriever {
        Some(r) => r.retrieve(question).await.results,
        None => Vec::new(),
    };
    let mut conversation = Conversation::new(system_prompt);
    conversation.append(Message::user(augment(question.trim(), &results)));
    model.chat(CompletionRequest::blocking(conversation.into_messages())).await
}
