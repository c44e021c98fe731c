// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Attaching knowledge-base matches to a user message.
//!
//! The model sees the augmented text; transcripts show the text before
//! [`CONTEXT_DELIMITER`].

use orgmate_model::{Message, Role};
use orgmate_search::SearchResult;

/// Introduces the context block appended to a user message.
pub const CONTEXT_DELIMITER: &str = "\n\n--- Knowledge base context ---\n";

const CONTEXT_HEADER: &str =
    "The following excerpts from the user's notes may be relevant. Each starts with [file:line]; the matching line is marked with >.";

/// Append `results` to `user_text` as a context block.
///
/// Blank context lines are left out, so the only blank lines in the block
/// sit directly before a `[file:line]` marker and the block can never
/// contain the delimiter itself.
pub fn augment(user_text: &str, results: &[SearchResult]) -> String {
    if results.is_empty() {
        return user_text.to_string();
    }

    let mut out = String::with_capacity(user_text.len() + 256 * results.len());
    out.push_str(user_text);
    out.push_str(CONTEXT_DELIMITER);
    out.push_str(CONTEXT_HEADER);
    out.push('\n');

    for (i, r) in results.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&format!("\n[{}:{}]\n", r.file.display(), r.line));
        for line in r.context.before.iter().filter(|l| !l.trim().is_empty()) {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str("> ");
        out.push_str(&r.content);
        out.push('\n');
        for line in r.context.after.iter().filter(|l| !l.trim().is_empty()) {
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

/// The user-visible part of a possibly augmented message.
pub fn strip_context(text: &str) -> &str {
    match text.rfind(CONTEXT_DELIMITER) {
        Some(pos) => &text[..pos],
        None => text,
    }
}

/// Text to show for `msg` in a transcript.
pub fn display_text(msg: &Message) -> &str {
    match msg.role {
        Role::User => strip_context(msg.as_text()),
        _ => msg.as_text(),
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use orgmate_search::MatchContext;

    use super::*;

    fn hit(file: &str, line: u64, content: &str, before: &[&str], after: &[&str]) -> SearchResult {
        SearchResult {
            file: PathBuf::from(file),
            line,
            content: content.into(),
            context: MatchContext {
                before: before.iter().map(|s| s.to_string()).collect(),
                after: after.iter().map(|s| s.to_string()).collect(),
            },
        }
    }

    #[test]
    fn no_results_leaves_text_unchanged() {
        assert_eq!(augment("what's due?", &[]), "what's due?");
    }

    #[test]
    fn block_layout() {
        let text = augment(
            "what's due?",
            &[
                hit("/kb/todo.org", 3, "** TODO taxes", &["* Admin"], &["DEADLINE: <2026-04-30>"]),
                hit("/kb/inbox.md", 1, "- call dentist", &[], &[]),
            ],
        );
        let expected = format!(
            "what's due?{CONTEXT_DELIMITER}{CONTEXT_HEADER}\n\
             \n[/kb/todo.org:3]\n* Admin\n> ** TODO taxes\nDEADLINE: <2026-04-30>\n\
             \n\n[/kb/inbox.md:1]\n> - call dentist\n"
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn strip_recovers_original_text() {
        let original = "Summarize my week\n\nthanks";
        let text = augment(original, &[hit("/kb/a.org", 9, "x", &["", "b"], &[""])]);
        assert_ne!(text, original);
        assert_eq!(strip_context(&text), original);
    }

    #[test]
    fn strip_survives_delimiter_lookalikes_in_notes() {
        let original = "find the separator";
        let text = augment(
            original,
            &[hit("/kb/a.md", 2, "--- Knowledge base context ---", &[""], &["", "--- Knowledge base context ---"])],
        );
        assert_eq!(strip_context(&text), original);
    }

    #[test]
    fn strip_without_delimiter_is_identity() {
        assert_eq!(strip_context("plain"), "plain");
    }

    #[test]
    fn display_text_only_strips_user_messages() {
        let augmented = augment("q", &[hit("/kb/a.org", 1, "c", &[], &[])]);
        assert_eq!(display_text(&Message::user(augmented.clone())), "q");
        assert_eq!(display_text(&Message::assistant(augmented.clone())), augmented);
    }
}
