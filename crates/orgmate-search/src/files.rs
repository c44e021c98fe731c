// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Knowledge-base file enumeration.
//!
//! Listing goes through `fd` when it is installed and falls back to an
//! in-process `walkdir` traversal with the same extension and exclude filters.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use orgmate_config::Config;
use serde::Serialize;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::SearchError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileInfo {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct FileLister {
    directories: Vec<PathBuf>,
    file_patterns: Vec<String>,
    exclude_patterns: Vec<String>,
    program: OsString,
}

impl FileLister {
    pub fn new(
        directories: Vec<PathBuf>,
        file_patterns: Vec<String>,
        exclude_patterns: Vec<String>,
    ) -> Self {
        Self { directories, file_patterns, exclude_patterns, program: "fd".into() }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(
            cfg.knowledge_base.expanded_directories(),
            cfg.knowledge_base.file_patterns.clone(),
            cfg.knowledge_base.exclude_patterns.clone(),
        )
    }

    /// Use a different `fd` executable (e.g. `fdfind` on Debian).
    pub fn with_program(mut self, program: impl Into<OsString>) -> Self {
        self.program = program.into();
        self
    }

    /// Extensions taken from `*.ext` patterns; other patterns are ignored.
    fn extensions(&self) -> Vec<&str> {
        self.file_patterns
            .iter()
            .filter_map(|p| p.strip_prefix("*."))
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_alphanumeric() || c == '_'))
            .collect()
    }

    /// Exclude patterns as globs, matched like `fd -E`: against the entry
    /// name and against its path relative to the listed directory.
    fn exclude_set(&self) -> GlobSet {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.exclude_patterns {
            match Glob::new(pattern) {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(e) => warn!(%pattern, error = %e, "ignoring invalid exclude pattern"),
            }
        }
        builder.build().unwrap_or_else(|e| {
            warn!(error = %e, "exclude patterns unusable; excluding nothing");
            GlobSet::empty()
        })
    }

    fn fd_args(&self, dir: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        for ext in self.extensions() {
            args.push("-e".into());
            args.push(ext.into());
        }
        for excl in &self.exclude_patterns {
            args.push("-E".into());
            args.push(excl.into());
        }
        args.extend(["--type".into(), "f".into(), "--absolute-path".into(), ".".into()]);
        args.push(dir.as_os_str().to_owned());
        args
    }

    /// All matching files under the configured directories, directory by
    /// directory.  Missing directories are skipped with a warning.
    pub async fn list_files(&self) -> Result<Vec<FileInfo>, SearchError> {
        let mut files = Vec::new();
        for dir in &self.directories {
            if !dir.is_dir() {
                warn!(dir = %dir.display(), "directory not found");
                continue;
            }
            let mut paths = match self.run_fd(dir).await {
                Err(SearchError::Spawn { program, source }) => {
                    debug!(%program, error = %source, "fd unavailable; walking directory");
                    self.walk(dir)
                }
                other => other?,
            };
            paths.sort();
            for path in paths {
                // Files that vanish or cannot be stat'ed are skipped.
                if let Some(info) = stat(&path).await {
                    files.push(info);
                }
            }
        }
        Ok(files)
    }

    async fn run_fd(&self, dir: &Path) -> Result<Vec<PathBuf>, SearchError> {
        let output = Command::new(&self.program)
            .args(self.fd_args(dir))
            .output()
            .await
            .map_err(|source| SearchError::Spawn {
                program: self.program.to_string_lossy().into_owned(),
                source,
            })?;

        match output.status.code() {
            Some(0) => Ok(String::from_utf8_lossy(&output.stdout)
                .lines()
                .filter(|l| !l.is_empty())
                .map(PathBuf::from)
                .collect()),
            // 1 = nothing found
            Some(1) => Ok(Vec::new()),
            code => Err(SearchError::Tool {
                program: self.program.to_string_lossy().into_owned(),
                status: code,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
        }
    }

    fn walk(&self, dir: &Path) -> Vec<PathBuf> {
        let exts = self.extensions();
        let excluded = self.exclude_set();
        walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_entry(|e| {
                if e.depth() == 0 {
                    return true;
                }
                let hidden = e.file_name().to_string_lossy().starts_with('.');
                let relative = e.path().strip_prefix(dir).unwrap_or(e.path());
                !(hidden || excluded.is_match(e.file_name()) || excluded.is_match(relative))
            })
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                exts.is_empty()
                    || e.path()
                        .extension()
                        .and_then(|x| x.to_str())
                        .is_some_and(|x| exts.contains(&x))
            })
            .map(|e| std::path::absolute(e.path()).unwrap_or_else(|_| e.path().to_path_buf()))
            .collect()
    }
}

async fn stat(path: &Path) -> Option<FileInfo> {
    let meta = tokio::fs::metadata(path).await.ok()?;
    let modified = meta.modified().ok()?;
    Some(FileInfo {
        path: path.to_path_buf(),
        name: path.file_name()?.to_string_lossy().into_owned(),
        size: meta.len(),
        modified: DateTime::<Utc>::from(modified),
    })
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
