// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    /// The request never reached the backend.
    #[error("cannot reach model backend at {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("model backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body was cut off or could not be read.
    #[error("reading model response: {0}")]
    Stream(#[source] reqwest::Error),

    #[error("malformed response line from model backend: {line}")]
    Malformed { line: String },

    /// The backend reported an error in-band (e.g. unknown model).
    #[error("model backend error: {0}")]
    Backend(String),

    #[error("unknown model provider: {0}")]
    UnknownProvider(String),
}
