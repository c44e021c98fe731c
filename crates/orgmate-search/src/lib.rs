// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Knowledge-base search over plain-text notes.
//!
//! [`SearchEngine`] walks the configured directories in order, delegating each
//! one to a [`DirectorySearcher`] (ripgrep by default), and merges the matches
//! under a single result cap.  [`files`] enumerates the notes themselves.
mod error;
mod types;
mod parser;
mod ripgrep;
mod engine;
pub mod files;

pub use error::SearchError;
pub use types::{MatchContext, SearchOptions, SearchResult};
pub use parser::{parse_rg_json, RgEventParser};
pub use ripgrep::{DirectorySearcher, RipgrepSearcher};
pub use engine::{DirectoryFailure, SearchEngine, SearchReport};
pub use files::{FileInfo, FileLister};
