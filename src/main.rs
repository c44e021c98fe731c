mod cli;

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::debug;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use cli::{Cli, Commands, ConfigFormat};
use clap::Parser;
use orgmate_config::{Config, ConfigStore};
use orgmate_core::{display_text, ChatSession, Conversation, Retriever, TurnEvent, TurnScheduler};
use orgmate_model::ModelProvider;
use orgmate_search::{FileLister, SearchEngine, SearchOptions, SearchResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    if let Commands::Completions { shell } = &cli.command {
        cli::print_completions(*shell);
        return Ok(());
    }

    let store = ConfigStore::at(cli.config.as_deref());
    let config = store.load_or_init()?;

    match cli.command {
        Commands::Chat { model, transcript } => chat_cmd(&config, model.as_deref(), transcript).await,
        Commands::Ask { question, model, no_context } => {
            ask_cmd(&config, &question.join(" "), model.as_deref(), no_context).await;
            Ok(())
        }
        Commands::Config { show, path, format } => {
            if path {
                println!("{}", store.path().display());
            }
            if show || !path {
                print!("{}", render_config(&config, format)?);
            }
            Ok(())
        }
        Commands::Search { query, limit, case_sensitive, json } => {
            search_cmd(&config, &query, limit, case_sensitive, json).await
        }
        Commands::Files { json } => files_cmd(&config, json).await,
        Commands::Models => {
            let model = build_model(&config, None)?;
            for name in model.list_models().await? {
                println!("{name}");
            }
            Ok(())
        }
        Commands::Completions { .. } => Ok(()),
    }
}

fn build_model(config: &Config, model: Option<&str>) -> anyhow::Result<Arc<dyn ModelProvider>> {
    let provider = orgmate_model::from_config(&config.backend, model)
        .context("constructing model provider")?;
    Ok(Arc::from(provider))
}

async fn chat_cmd(config: &Config, model: Option<&str>, transcript: bool) -> anyhow::Result<()> {
    let model = build_model(config, model)?;
    let scheduler = TurnScheduler::new(Conversation::new(config.assistant.system_prompt.clone()))
        .with_max_pending(config.session.pending_limit());
    let session = ChatSession::new(scheduler, model, Retriever::from_config(config));

    let (input_tx, input_rx) = mpsc::channel::<String>(64);
    let (event_tx, event_rx) = mpsc::channel::<TurnEvent>(256);
    let session = tokio::spawn(session.run(input_rx, event_tx));
    let printer = tokio::spawn(print_events(event_rx));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        if matches!(line.trim(), "/quit" | "/exit") {
            debug!("quit requested");
            session.abort();
            printer.abort();
            return Ok(());
        }
        if input_tx.send(line).await.is_err() {
            break;
        }
    }

    // End of input: let every accepted line be answered.
    drop(input_tx);
    let conversation = session.await.context("chat session panicked")?;
    debug!(messages = conversation.len(), "conversation finished");
    printer.await.context("event printer panicked")?;
    if transcript {
        print_transcript(&conversation);
    }
    Ok(())
}

/// Knowledge-base context is stripped from user messages.
fn print_transcript(conversation: &Conversation) {
    println!("--- transcript {} ---", conversation.id());
    println!("[system] {}", conversation.system_prompt());
    for msg in conversation.messages().iter().skip(1) {
        println!("[{}] {}", msg.role.as_str(), display_text(msg));
    }
}

async fn print_events(mut events: mpsc::Receiver<TurnEvent>) {
    let mut stdout = io::stdout();
    while let Some(event) = events.recv().await {
        match event {
            TurnEvent::TextDelta(delta) => {
                let _ = write!(stdout, "{delta}");
                let _ = stdout.flush();
            }
            TurnEvent::TurnComplete => {
                let _ = writeln!(stdout);
            }
            TurnEvent::Queued { position, input } => eprintln!("[queued #{position}] {input}"),
            TurnEvent::QueueFull { input } => eprintln!("[queue full, dropped] {input}"),
            TurnEvent::ContextAttached { results } => {
                eprintln!("[{} knowledge-base match(es) attached]", results.len());
            }
            TurnEvent::SearchWarning { directory, error } => {
                eprintln!("warning: could not search {}: {error}", directory.display());
            }
            TurnEvent::Error(e) => eprintln!("Error: {e}"),
            TurnEvent::TokenUsage { prompt, completion } => {
                debug!(prompt, completion, "tokens");
            }
            TurnEvent::TurnStarted { .. } | TurnEvent::TextComplete(_) => {}
        }
    }
}

async fn ask_cmd(config: &Config, question: &str, model: Option<&str>, no_context: bool) {
    let result = async {
        let model = build_model(config, model)?;
        let retriever = if no_context { None } else { Retriever::from_config(config) };
        let reply = orgmate_core::ask(
            model.as_ref(),
            retriever.as_ref(),
            &config.assistant.system_prompt,
            question,
        )
        .await?;
        anyhow::Ok(reply)
    }
    .await;

    match result {
        Ok(reply) => println!("{reply}"),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}

fn render_config(config: &Config, format: ConfigFormat) -> anyhow::Result<String> {
    Ok(match format {
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
        ConfigFormat::Json => serde_json::to_string_pretty(config)? + "\n",
    })
}

async fn search_cmd(
    config: &Config,
    query: &str,
    limit: Option<usize>,
    case_sensitive: bool,
    json: bool,
) -> anyhow::Result<()> {
    let mut opts = SearchOptions::from_config(config);
    opts.case_sensitive |= case_sensitive;
    if let Some(limit) = limit {
        opts.max_results = limit;
    }

    let report = SearchEngine::from_config(config).search_report(query, &opts).await;
    for failure in &report.failures {
        eprintln!("warning: could not search {}: {}", failure.directory.display(), failure.error);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report.results)?);
    } else {
        for result in &report.results {
            print_result(result);
        }
    }
    Ok(())
}

fn print_result(result: &SearchResult) {
    println!("{}:{}", result.file.display(), result.line);
    for line in &result.context.before {
        println!("  {line}");
    }
    println!("> {}", result.content);
    for line in &result.context.after {
        println!("  {line}");
    }
    println!();
}

async fn files_cmd(config: &Config, json: bool) -> anyhow::Result<()> {
    let files = FileLister::from_config(config).list_files().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&files)?);
    } else {
        for file in &files {
            println!(
                "{:>10}  {}  {}",
                file.size,
                file.modified.format("%Y-%m-%d %H:%M"),
                file.path.display()
            );
        }
    }
    Ok(())
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
