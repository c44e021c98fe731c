// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::path::PathBuf;

use orgmate_search::SearchResult;

/// Events emitted by a chat session.
/// Front-ends subscribe to these to drive their output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEvent {
    /// Generation for this input is starting
    TurnStarted { input: String },
    /// The input is waiting behind the active turn
    Queued { position: usize, input: String },
    /// The input was dropped because the pending queue is full
    QueueFull { input: String },
    /// Knowledge-base matches attached to the current input
    ContextAttached { results: Vec<SearchResult> },
    /// A knowledge-base directory could not be searched
    SearchWarning { directory: PathBuf, error: String },
    /// A text chunk streamed from the model
    TextDelta(String),
    /// The complete reply (after streaming finishes)
    TextComplete(String),
    /// Token accounting reported by the backend
    TokenUsage { prompt: u32, completion: u32 },
    /// The turn failed; the partial reply is not kept in history
    Error(String),
    /// The current turn is over, successfully or not
    TurnComplete,
}
