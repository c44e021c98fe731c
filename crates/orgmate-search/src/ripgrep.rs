// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio_stream::{wrappers::LinesStream, StreamExt};
use tracing::debug;

use crate::{RgEventParser, SearchError, SearchOptions, SearchResult};

/// Searches a single directory tree.
#[async_trait]
pub trait DirectorySearcher: Send + Sync {
    /// Return at most `limit` results from `dir`, in the order the tool
    /// reports them.
    async fn search_directory(
        &self,
        dir: &Path,
        query: &str,
        opts: &SearchOptions,
        limit: usize,
    ) -> Result<Vec<SearchResult>, SearchError>;
}

/// [`DirectorySearcher`] backed by `rg --json`.
#[derive(Debug, Clone)]
pub struct RipgrepSearcher {
    program: OsString,
}

impl Default for RipgrepSearcher {
    fn default() -> Self {
        Self { program: "rg".into() }
    }
}

impl RipgrepSearcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different executable, e.g. an absolute path to ripgrep.
    pub fn with_program(program: impl Into<OsString>) -> Self {
        Self { program: program.into() }
    }

    fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    /// Arguments are passed straight to the process; no shell is involved, so
    /// queries and paths need no quoting.
    pub(crate) fn args(dir: &Path, query: &str, opts: &SearchOptions) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--json".into(),
            "-n".into(),
            "-C".into(),
            opts.context_lines.to_string().into(),
        ];
        if !opts.case_sensitive {
            args.push("-i".into());
        }
        for glob in &opts.file_patterns {
            args.push("-g".into());
            args.push(glob.into());
        }
        args.push("--".into());
        args.push(query.into());
        args.push(dir.as_os_str().to_owned());
        args
    }
}

#[async_trait]
impl DirectorySearcher for RipgrepSearcher {
    async fn search_directory(
        &self,
        dir: &Path,
        query: &str,
        opts: &SearchOptions,
        limit: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        debug!(dir = %dir.display(), query, limit, "rg search");

        let mut child = Command::new(&self.program)
            .args(Self::args(dir, query, opts))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SearchError::Spawn { program: self.program_name(), source })?;

        // Drain stderr concurrently so a chatty rg cannot block on a full pipe.
        let stderr_task = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut text = String::new();
                let _ = stderr.read_to_string(&mut text).await;
                text
            })
        });

        let mut results = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            let mut lines = LinesStream::new(BufReader::new(stdout).lines());
            let mut parser = RgEventParser::new();
            while let Some(line) = lines.next().await {
                let line = line.map_err(|e| SearchError::io(dir, e))?;
                if let Some(result) = parser.feed(&line) {
                    results.push(result);
                    if results.len() >= limit {
                        break;
                    }
                }
            }
            if results.len() >= limit {
                debug!(dir = %dir.display(), limit, "result limit reached; stopping rg");
                let _ = child.kill().await;
                results.truncate(limit);
                return Ok(results);
            }
            results.extend(parser.finish());
        }

        let status = child.wait().await.map_err(|e| SearchError::io(dir, e))?;
        let stderr = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };

        match status.code() {
            // 1 = no matches
            Some(0) | Some(1) => {
                results.truncate(limit);
                Ok(results)
            }
            code => Err(SearchError::Tool {
                program: self.program_name(),
                status: code,
                stderr: stderr.trim().to_string(),
            }),
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn default_args_are_case_insensitive_with_globs() {
        let args = strings(RipgrepSearcher::args(
            Path::new("/kb"),
            "milk",
            &SearchOptions::default(),
        ));
        assert_eq!(
            args,
            vec![
                "--json", "-n", "-C", "2", "-i", "-g", "*.org", "-g", "*.md", "-g", "*.txt", "--",
                "milk", "/kb"
            ]
        );
    }

    #[test]
    fn case_sensitive_omits_ignore_case_flag() {
        let opts = SearchOptions {
            case_sensitive: true,
            context_lines: 0,
            file_patterns: vec![],
            ..SearchOptions::default()
        };
        let args = strings(RipgrepSearcher::args(Path::new("/kb"), "x", &opts));
        assert!(!args.contains(&"-i".to_string()));
        assert_eq!(args, vec!["--json", "-n", "-C", "0", "--", "x", "/kb"]);
    }

    #[test]
    fn query_with_quotes_and_dashes_is_passed_verbatim() {
        let q = "--don't 'panic'";
        let args = strings(RipgrepSearcher::args(Path::new("/kb"), q, &SearchOptions::default()));
        let sep = args.iter().position(|a| a == "--").unwrap();
        assert_eq!(args[sep + 1], q);
    }

    #[tokio::test]
    async fn missing_program_is_spawn_error() {
        let searcher = RipgrepSearcher::with_program("/nonexistent/orgmate-rg-binary");
        let err = searcher
            .search_directory(Path::new("/tmp"), "x", &SearchOptions::default(), 10)
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::Spawn { .. }), "{err:?}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn exit_status_one_without_output_is_no_matches() {
        // `false` ignores its arguments and exits 1 with empty stdout.
        let searcher = RipgrepSearcher::with_program("false");
        let results = searcher
            .search_directory(Path::new("/tmp"), "x", &SearchOptions::default(), 10)
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn zero_limit_does_not_spawn() {
        let searcher = RipgrepSearcher::with_program("/nonexistent/orgmate-rg-binary");
        let results = searcher
            .search_directory(Path::new("/tmp"), "x", &SearchOptions::default(), 0)
            .await
            .unwrap();
        assert!(results.is_empty());
    }
}
