// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use std::path::PathBuf;

/// Serialization used by `orgmate config --show`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ConfigFormat {
    /// Same format as the config file.
    #[default]
    Toml,
    Yaml,
    Json,
}

#[derive(Parser, Debug)]
#[command(
    name = "orgmate",
    about = "A terminal assistant for your personal notes",
    version,
    long_about = None,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to config file (default: $XDG_CONFIG_HOME/orgmate/config.toml)
    #[arg(long, short = 'c', global = true, env = "ORGMATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v = debug, -vv = trace)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive chat.  Lines read from stdin are sent in order; lines
    /// typed while a reply is streaming wait their turn.
    Chat {
        /// Model to use instead of `backend.default_model`
        #[arg(long, short = 'm')]
        model: Option<String>,
        /// Print the conversation transcript once input ends
        #[arg(long)]
        transcript: bool,
    },
    /// Ask a single question and print the whole reply
    Ask {
        #[arg(value_name = "QUESTION", required = true, num_args = 1..)]
        question: Vec<String>,
        /// Model to use instead of `backend.default_model`
        #[arg(long, short = 'm')]
        model: Option<String>,
        /// Do not search the knowledge base, even when auto-search is on
        #[arg(long)]
        no_context: bool,
    },
    /// Show the configuration or where it lives
    Config {
        /// Print the effective configuration
        #[arg(long)]
        show: bool,
        /// Print the config file path
        #[arg(long)]
        path: bool,
        /// Output format for --show
        #[arg(long, value_enum, default_value = "toml")]
        format: ConfigFormat,
    },
    /// Search the knowledge base
    Search {
        query: String,
        /// Maximum number of results (default: search.max_results)
        #[arg(long, short = 'n')]
        limit: Option<usize>,
        /// Match case exactly
        #[arg(long)]
        case_sensitive: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List knowledge-base files
    Files {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List models available on the backend
    Models,
    /// Generate shell completion script
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn print_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "orgmate", &mut std::io::stdout());
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn ask_joins_words_and_takes_flags() {
        let cli = Cli::parse_from(["orgmate", "ask", "-m", "mistral", "what", "is", "due?", "--no-context"]);
        match cli.command {
            Commands::Ask { question, model, no_context } => {
                assert_eq!(question.join(" "), "what is due?");
                assert_eq!(model.as_deref(), Some("mistral"));
                assert!(no_context);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_flags_work_after_subcommand() {
        let cli = Cli::parse_from(["orgmate", "search", "milk", "-vv", "-c", "/tmp/o.toml", "-n", "3"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/o.toml")));
        assert!(matches!(cli.command, Commands::Search { limit: Some(3), .. }));
    }

    #[test]
    fn config_format_defaults_to_toml() {
        let cli = Cli::parse_from(["orgmate", "config", "--show"]);
        assert!(matches!(cli.command, Commands::Config { show: true, format: ConfigFormat::Toml, .. }));
    }
}
