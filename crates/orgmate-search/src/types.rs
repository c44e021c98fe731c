use std::path::PathBuf;

use orgmate_config::Config;
use serde::{Deserialize, Serialize};

/// One matching line in the knowledge base plus the lines around it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub file: PathBuf,
    /// 1-based line number of the match.
    pub line: u64,
    /// The matching line, trimmed.
    pub content: String,
    pub context: MatchContext,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchContext {
    pub before: Vec<String>,
    pub after: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    pub case_sensitive: bool,
    pub context_lines: usize,
    /// Cap on results across all directories combined.
    pub max_results: usize,
    /// Globs handed to ripgrep as `-g` filters.
    pub file_patterns: Vec<String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            context_lines: 2,
            max_results: 50,
            file_patterns: vec!["*.org".into(), "*.md".into(), "*.txt".into()],
        }
    }
}

impl SearchOptions {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            case_sensitive: cfg.search.case_sensitive,
            context_lines: cfg.search.context_lines,
            max_results: cfg.search.max_results,
            file_patterns: cfg.knowledge_base.file_patterns.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_agree_with_config_defaults() {
        assert_eq!(SearchOptions::from_config(&Config::default()), SearchOptions::default());
    }

    #[test]
    fn from_config_copies_search_section() {
        let mut cfg = Config::default();
        cfg.search.case_sensitive = true;
        cfg.search.context_lines = 0;
        cfg.search.max_results = 5;
        cfg.knowledge_base.file_patterns = vec!["*.org".into()];
        let opts = SearchOptions::from_config(&cfg);
        assert!(opts.case_sensitive);
        assert_eq!(opts.context_lines, 0);
        assert_eq!(opts.max_results, 5);
        assert_eq!(opts.file_patterns, vec!["*.org"]);
    }
}
