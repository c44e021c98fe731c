// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const DEFAULT_HOST: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama3.2";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful personal organization assistant. \
     Help the user manage tasks, schedule, and stay organized.";

/// Serde default helper for the knowledge-base file globs.
fn default_file_patterns() -> Vec<String> {
    vec!["*.org".into(), "*.md".into(), "*.txt".into()]
}

fn default_exclude_patterns() -> Vec<String> {
    vec![".git".into(), "node_modules".into(), ".obsidian".into()]
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub knowledge_base: KnowledgeBaseConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Where the model is served from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Provider identifier: "ollama" (default) or "mock".
    pub provider: String,
    /// Base URL of the model server, without a trailing `/api`.
    pub host: String,
    /// Model used when `--model` is not given on the command line.
    pub default_model: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".into(),
            host: DEFAULT_HOST.into(),
            default_model: DEFAULT_MODEL.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// First message of every conversation.
    pub system_prompt: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self { system_prompt: DEFAULT_SYSTEM_PROMPT.into() }
    }
}

/// The personal notes tree that is searched for context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeBaseConfig {
    /// Root directories, searched in this order.  `~` and `$VARS` are expanded.
    pub directories: Vec<String>,
    /// Glob filters passed to the search and listing tools.
    pub file_patterns: Vec<String>,
    /// Names excluded from file listings.
    pub exclude_patterns: Vec<String>,
    /// Search the knowledge base on every turn and attach the matches.
    pub enable_auto_search: bool,
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            directories: Vec::new(),
            file_patterns: default_file_patterns(),
            exclude_patterns: default_exclude_patterns(),
            enable_auto_search: false,
        }
    }
}

impl KnowledgeBaseConfig {
    /// Directories with `~` / environment variables expanded.
    ///
    /// Entries that fail to expand (e.g. an unset variable) are kept verbatim
    /// so the search layer reports them as failing directories.
    pub fn expanded_directories(&self) -> Vec<PathBuf> {
        self.directories
            .iter()
            .map(|d| match shellexpand::full(d) {
                Ok(expanded) => PathBuf::from(expanded.as_ref()),
                Err(_) => PathBuf::from(d),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub case_sensitive: bool,
    /// Lines of context shown before and after each match.
    pub context_lines: usize,
    /// Cap on results across all knowledge-base directories combined.
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { case_sensitive: false, context_lines: 2, max_results: 50 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Maximum number of submissions waiting behind the active turn.
    /// `0` means unbounded.
    pub max_pending: usize,
}

impl SessionConfig {
    pub fn pending_limit(&self) -> Option<usize> {
        (self.max_pending > 0).then_some(self.max_pending)
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
