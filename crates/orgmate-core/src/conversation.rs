// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use orgmate_model::{Message, Role};
use uuid::Uuid;

/// Ordered chat history.  Element 0 is always the system message; only this
/// crate appends to it, and only user and assistant messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    id: String,
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            messages: vec![Message::system(system_prompt)],
        }
    }

    /// Session id used to correlate log lines.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Append a user or assistant message.
    pub(crate) fn append(&mut self, msg: Message) {
        debug_assert_ne!(msg.role, Role::System);
        self.messages.push(msg);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages, system message included.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn system_prompt(&self) -> &str {
        self.messages[0].as_text()
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_system_message() {
        let c = Conversation::new("be tidy");
        assert_eq!(c.len(), 1);
        assert_eq!(c.messages()[0].role, Role::System);
        assert_eq!(c.system_prompt(), "be tidy");
    }

    #[test]
    fn append_keeps_order_and_system_prompt() {
        let mut c = Conversation::new("sys");
        c.append(Message::user("q"));
        c.append(Message::assistant("a"));
        let roles: Vec<Role> = c.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
        assert_eq!(c.system_prompt(), "sys");
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(Conversation::new("a").id(), Conversation::new("a").id());
    }
}
