// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Turn bookkeeping for a chat session.
//!
//! [`TurnScheduler`] decides what happens to each submission and owns the
//! history and the pending queue.  It does no I/O: the session driver asks it
//! what to do, performs the search and the generation, and reports back.

use std::collections::VecDeque;

use orgmate_model::Message;
use thiserror::Error;
use tracing::debug;

use crate::Conversation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    Generating,
}

/// What became of a submitted input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Blank input; nothing happens.
    Ignored,
    /// Start a generation for this (trimmed) text now.
    Dispatch(String),
    /// Waiting behind the active turn at this 1-based queue position.
    Queued { position: usize },
    /// The pending queue is at its configured limit.
    Rejected,
}

/// Result of finishing a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Queued input that is now being generated, if any.
    pub next: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TurnError {
    #[error("no turn is being generated")]
    NotGenerating,
}

#[derive(Debug)]
pub struct TurnScheduler {
    conversation: Conversation,
    pending: VecDeque<String>,
    state: TurnState,
    max_pending: Option<usize>,
}

impl TurnScheduler {
    pub fn new(conversation: Conversation) -> Self {
        Self { conversation, pending: VecDeque::new(), state: TurnState::Idle, max_pending: None }
    }

    /// Limit the number of inputs waiting behind the active turn.
    pub fn with_max_pending(mut self, limit: Option<usize>) -> Self {
        self.max_pending = limit;
        self
    }

    pub fn submit(&mut self, text: &str) -> Submission {
        let text = text.trim();
        if text.is_empty() {
            return Submission::Ignored;
        }
        match self.state {
            TurnState::Idle => {
                self.state = TurnState::Generating;
                Submission::Dispatch(text.to_string())
            }
            TurnState::Generating => {
                if self.max_pending.is_some_and(|max| self.pending.len() >= max) {
                    debug!(pending = self.pending.len(), "pending queue full");
                    return Submission::Rejected;
                }
                self.pending.push_back(text.to_string());
                Submission::Queued { position: self.pending.len() }
            }
        }
    }

    /// Record the (possibly augmented) user message of the active turn and
    /// return the history to send to the model.
    pub fn commit_user(&mut self, augmented: String) -> Result<Vec<Message>, TurnError> {
        if self.state != TurnState::Generating {
            return Err(TurnError::NotGenerating);
        }
        self.conversation.append(Message::user(augmented));
        Ok(self.conversation.messages().to_vec())
    }

    /// Finish the active turn.  A successful reply is appended to the
    /// history; a failure appends nothing.  The head of the queue, if any,
    /// becomes the next active turn.
    pub fn complete(&mut self, outcome: Result<String, String>) -> Completion {
        match outcome {
            Ok(reply) => self.conversation.append(Message::assistant(reply)),
            Err(e) => debug!(error = %e, "turn failed; reply not recorded"),
        }
        self.state = TurnState::Idle;

        let next = self.pending.pop_front();
        if next.is_some() {
            self.state = TurnState::Generating;
        }
        Completion { next }
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn pending(&self) -> &VecDeque<String> {
        &self.pending
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn into_conversation(self) -> Conversation {
        self.conversation
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use orgmate_model::Role;

    use super::*;

    fn sched() -> TurnScheduler {
        TurnScheduler::new(Conversation::new("sys"))
    }

    #[test]
    fn blank_input_is_ignored_in_any_state() {
        let mut s = sched();
        assert_eq!(s.submit("   \n"), Submission::Ignored);
        assert_eq!(s.state(), TurnState::Idle);

        s.submit("go");
        assert_eq!(s.submit(""), Submission::Ignored);
        assert!(s.pending().is_empty());
    }

    #[test]
    fn idle_submission_dispatches_trimmed_text() {
        let mut s = sched();
        assert_eq!(s.submit("  plan my week \n"), Submission::Dispatch("plan my week".into()));
        assert_eq!(s.state(), TurnState::Generating);
    }

    #[test]
    fn busy_submissions_queue_fifo_with_positions() {
        let mut s = sched();
        s.submit("A");
        assert_eq!(s.submit("B"), Submission::Queued { position: 1 });
        assert_eq!(s.submit("C"), Submission::Queued { position: 2 });
        assert_eq!(s.pending().iter().collect::<Vec<_>>(), vec!["B", "C"]);
    }

    #[test]
    fn completion_starts_exactly_one_queued_turn() {
        let mut s = sched();
        s.submit("A");
        s.submit("B");
        s.submit("C");
        s.commit_user("A".into()).unwrap();

        let done = s.complete(Ok("rA".into()));
        assert_eq!(done.next.as_deref(), Some("B"));
        assert_eq!(s.state(), TurnState::Generating);
        assert_eq!(s.pending().len(), 1);

        s.commit_user("B".into()).unwrap();
        assert_eq!(s.complete(Ok("rB".into())).next.as_deref(), Some("C"));
        s.commit_user("C".into()).unwrap();
        assert_eq!(s.complete(Ok("rC".into())).next, None);
        assert_eq!(s.state(), TurnState::Idle);
    }

    #[test]
    fn history_alternates_in_submission_order() {
        let mut s = sched();
        s.submit("A");
        s.submit("B");
        s.commit_user("A".into()).unwrap();
        let next = s.complete(Ok("rA".into())).next.unwrap();
        s.commit_user(next).unwrap();
        s.complete(Ok("rB".into()));

        let texts: Vec<(Role, &str)> =
            s.conversation().messages().iter().map(|m| (m.role, m.as_text())).collect();
        assert_eq!(
            texts,
            vec![
                (Role::System, "sys"),
                (Role::User, "A"),
                (Role::Assistant, "rA"),
                (Role::User, "B"),
                (Role::Assistant, "rB"),
            ]
        );
    }

    #[test]
    fn failure_records_no_reply_and_still_drains_queue() {
        let mut s = sched();
        s.submit("A");
        s.submit("B");
        s.commit_user("A".into()).unwrap();
        let done = s.complete(Err("connection refused".into()));
        assert_eq!(done.next.as_deref(), Some("B"));

        let roles: Vec<Role> = s.conversation().messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User]);
    }

    #[test]
    fn failure_with_empty_queue_returns_to_idle() {
        let mut s = sched();
        s.submit("A");
        s.commit_user("A".into()).unwrap();
        assert_eq!(s.complete(Err("boom".into())).next, None);
        assert_eq!(s.state(), TurnState::Idle);
        assert!(matches!(s.submit("again"), Submission::Dispatch(_)));
    }

    #[test]
    fn commit_requires_active_turn() {
        let mut s = sched();
        assert_eq!(s.commit_user("x".into()), Err(TurnError::NotGenerating));
        assert_eq!(s.conversation().len(), 1);
    }

    #[test]
    fn commit_returns_full_history_snapshot() {
        let mut s = sched();
        s.submit("hello");
        let msgs = s.commit_user("hello + context".into()).unwrap();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].role, Role::System);
        assert_eq!(msgs[1].as_text(), "hello + context");
    }

    #[test]
    fn pending_limit_rejects_overflow() {
        let mut s = sched().with_max_pending(Some(1));
        s.submit("A");
        assert_eq!(s.submit("B"), Submission::Queued { position: 1 });
        assert_eq!(s.submit("C"), Submission::Rejected);
        assert_eq!(s.pending().len(), 1);

        s.commit_user("A".into()).unwrap();
        s.complete(Ok("rA".into()));
        assert_eq!(s.submit("C"), Submission::Queued { position: 1 });
    }
}
