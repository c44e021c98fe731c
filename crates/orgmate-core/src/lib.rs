// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod conversation;
mod scheduler;
mod inject;
mod events;
mod session;

pub use conversation::Conversation;
pub use scheduler::{Completion, Submission, TurnError, TurnScheduler, TurnState};
pub use inject::{augment, display_text, strip_context, CONTEXT_DELIMITER};
pub use events::TurnEvent;
pub use session::{ask, ChatSession, Retriever};
