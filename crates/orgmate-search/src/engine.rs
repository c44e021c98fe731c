// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::path::PathBuf;
use std::sync::Arc;

use orgmate_config::Config;
use tracing::{debug, warn};

use crate::{DirectorySearcher, RipgrepSearcher, SearchOptions, SearchResult};

/// A directory that could not be searched, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryFailure {
    pub directory: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchReport {
    pub results: Vec<SearchResult>,
    pub failures: Vec<DirectoryFailure>,
}

/// Searches every knowledge-base directory in order and merges the results
/// under a single cap.
#[derive(Clone)]
pub struct SearchEngine {
    directories: Vec<PathBuf>,
    searcher: Arc<dyn DirectorySearcher>,
}

impl std::fmt::Debug for SearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchEngine").field("directories", &self.directories).finish()
    }
}

impl SearchEngine {
    pub fn new(directories: Vec<PathBuf>) -> Self {
        Self::with_searcher(directories, Arc::new(RipgrepSearcher::new()))
    }

    pub fn with_searcher(directories: Vec<PathBuf>, searcher: Arc<dyn DirectorySearcher>) -> Self {
        Self { directories, searcher }
    }

    /// Engine over the configured knowledge-base directories.
    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.knowledge_base.expanded_directories())
    }

    pub fn directories(&self) -> &[PathBuf] {
        &self.directories
    }

    pub fn set_directories(&mut self, directories: Vec<PathBuf>) {
        self.directories = directories;
    }

    pub async fn search(&self, query: &str, opts: &SearchOptions) -> Vec<SearchResult> {
        self.search_report(query, opts).await.results
    }

    /// Like [`SearchEngine::search`], but also reports which directories failed.
    ///
    /// A failing directory is logged and skipped; it never aborts the search.
    pub async fn search_report(&self, query: &str, opts: &SearchOptions) -> SearchReport {
        let mut report = SearchReport::default();
        if query.trim().is_empty() || self.directories.is_empty() {
            return report;
        }

        for dir in &self.directories {
            let remaining = opts.max_results.saturating_sub(report.results.len());
            if remaining == 0 {
                break;
            }
            match self.searcher.search_directory(dir, query, opts, remaining).await {
                Ok(found) => {
                    debug!(dir = %dir.display(), found = found.len(), "directory searched");
                    report.results.extend(found);
                }
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "failed to search directory");
                    report.failures.push(DirectoryFailure {
                        directory: dir.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        report.results.truncate(opts.max_results);
        report
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
