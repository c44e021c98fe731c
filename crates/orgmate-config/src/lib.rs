// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod schema;
mod loader;

pub use schema::*;
pub use loader::{default_config_path, ConfigStore};
