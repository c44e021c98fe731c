// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Incremental parser for `rg --json` output.
//!
//! ripgrep prints one JSON object per line.  A `match` line opens a new
//! result and every `context` line of the same file seen while it is open is
//! filed under `before` or `after` by line number.  An `end` line closes the
//! file, so the open match never collects context from the next one.
//! `begin` and `summary` lines carry nothing we need.

use std::path::PathBuf;

use serde::Deserialize;
use tracing::trace;

use crate::{MatchContext, SearchResult};

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum RgEvent {
    Match { data: LineData },
    Context { data: LineData },
    End {},
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct LineData {
    path: Text,
    lines: Text,
    line_number: Option<u64>,
}

/// ripgrep encodes non-UTF-8 data as `{"bytes": ...}` instead of `{"text": ...}`.
#[derive(Debug, Deserialize)]
struct Text {
    text: Option<String>,
}

#[derive(Debug, Default)]
pub struct RgEventParser {
    open: Option<SearchResult>,
}

impl RgEventParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line of output.  Returns the result completed by this line,
    /// i.e. the previous match when `line` opens a new one.
    pub fn feed(&mut self, line: &str) -> Option<SearchResult> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let event: RgEvent = match serde_json::from_str(line) {
            Ok(ev) => ev,
            Err(e) => {
                trace!(error = %e, "skipping unparseable rg line");
                return None;
            }
        };

        match event {
            RgEvent::Match { data } => {
                let (Some(path), Some(text), Some(line_number)) =
                    (data.path.text, data.lines.text, data.line_number)
                else {
                    trace!("skipping rg match without text path/line");
                    return None;
                };
                self.open.replace(SearchResult {
                    file: PathBuf::from(path),
                    line: line_number,
                    content: text.trim().to_string(),
                    context: MatchContext::default(),
                })
            }
            RgEvent::Context { data } => {
                let open = self.open.as_mut()?;
                let (Some(path), Some(text), Some(line_number)) =
                    (data.path.text, data.lines.text, data.line_number)
                else {
                    return None;
                };
                if open.file.as_os_str() != path.as_str() {
                    trace!(%path, "skipping context from another file");
                    return None;
                }
                let text = text.trim().to_string();
                if line_number < open.line {
                    open.context.before.push(text);
                } else {
                    open.context.after.push(text);
                }
                None
            }
            RgEvent::End {} => self.open.take(),
            RgEvent::Other => None,
        }
    }

    /// End of output: hand back the match that is still open, if any.
    pub fn finish(&mut self) -> Option<SearchResult> {
        self.open.take()
    }
}

/// Parse a complete `rg --json` transcript.
pub fn parse_rg_json(output: &str) -> Vec<SearchResult> {
    let mut parser = RgEventParser::new();
    let mut results: Vec<SearchResult> = output.lines().filter_map(|l| parser.feed(l)).collect();
    results.extend(parser.finish());
    results
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
