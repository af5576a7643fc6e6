// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hearth - a private, local-first AI chat backend.
//!
//! This is the binary entry point. Every subcommand unlocks the encrypted
//! store; commands that talk to a model bring the engine up first.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod app;
mod commands;
mod output;
mod shell;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use hearth_config::HearthConfig;
use hearth_core::HearthError;

use crate::app::{App, EngineExit};
use crate::output::{ConsoleSink, Format};

/// Hearth - a private, local-first AI chat backend.
#[derive(Parser, Debug)]
#[command(name = "hearth", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print results, events, and errors as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show or change user settings.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Manage conversations.
    #[command(subcommand)]
    Conversations(ConversationCommand),
    /// Read or append messages.
    #[command(subcommand)]
    Messages(MessageCommand),
    /// Send one message and stream the reply.
    Send {
        /// Continue this conversation instead of starting a new one.
        #[arg(long)]
        conversation: Option<String>,
        /// Model to use (defaults to the configured default model).
        #[arg(long)]
        model: Option<String>,
        text: String,
    },
    /// Control the local AI engine.
    #[command(subcommand)]
    Engine(EngineCommand),
    /// Manage installed models.
    #[command(subcommand)]
    Models(ModelCommand),
    /// Manage remembered facts.
    #[command(subcommand)]
    Facts(FactCommand),
    /// Interactive chat session.
    Chat {
        #[arg(long)]
        conversation: Option<String>,
        #[arg(long)]
        model: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    Get,
    Set { key: String, value: String },
}

#[derive(Subcommand, Debug)]
enum ConversationCommand {
    List,
    Create {
        title: String,
        #[arg(long)]
        model: Option<String>,
    },
    Delete { id: String },
    Rename { id: String, title: String },
}

#[derive(Subcommand, Debug)]
enum MessageCommand {
    List { conversation: String },
    Add {
        conversation: String,
        /// user, assistant, or system
        role: String,
        content: String,
    },
}

#[derive(Subcommand, Debug)]
enum EngineCommand {
    /// Install and start the engine if needed, then wait until it answers.
    Ensure,
    /// Report whether the engine answers right now.
    Check,
    /// Stop the engine hearth started.
    Stop,
}

#[derive(Subcommand, Debug)]
enum ModelCommand {
    List,
    /// Download a model. Ctrl+C cancels and removes the partial download.
    Pull { name: String },
    Delete { name: String },
}

#[derive(Subcommand, Debug)]
enum FactCommand {
    List,
    Add { text: String },
    Delete { id: String },
    /// Show the fact block that would accompany a message.
    Context { query: Option<String> },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let format = if cli.json { Format::Json } else { Format::Human };

    let loaded = match &cli.config {
        Some(path) => hearth_config::load_and_validate_path(path),
        None => hearth_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            hearth_config::render_errors(&errors);
            std::process::exit(2);
        }
    };

    init_tracing(&config.logging.level);

    if let Err(e) = run(cli.command, config, format).await {
        output::print_error(format, &e);
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: HearthConfig, format: Format) -> Result<(), HearthError> {
    let sink = Arc::new(ConsoleSink::new(format));
    let exit = engine_exit(&command);
    let app = App::open(config, sink).await?;
    let result = dispatch(&app, command, format).await;
    let closed = app.close(exit).await;
    result.and(closed)
}

/// One-shot commands leave a ready engine running for the next one; an
/// interactive session owns its engine and stops it on the way out.
fn engine_exit(command: &Commands) -> EngineExit {
    match command {
        Commands::Chat { .. } | Commands::Engine(EngineCommand::Stop) => EngineExit::Stop,
        _ => EngineExit::Detach,
    }
}

async fn dispatch(app: &App, command: Commands, format: Format) -> Result<(), HearthError> {
    match command {
        Commands::Config(ConfigCommand::Get) => commands::config_get(app, format).await,
        Commands::Config(ConfigCommand::Set { key, value }) => {
            commands::config_set(app, &key, &value).await
        }
        Commands::Conversations(cmd) => match cmd {
            ConversationCommand::List => commands::conversations_list(app, format).await,
            ConversationCommand::Create { title, model } => {
                commands::conversations_create(app, format, &title, model).await
            }
            ConversationCommand::Delete { id } => commands::conversations_delete(app, &id).await,
            ConversationCommand::Rename { id, title } => {
                commands::conversations_rename(app, &id, &title).await
            }
        },
        Commands::Messages(cmd) => match cmd {
            MessageCommand::List { conversation } => {
                commands::messages_list(app, format, &conversation).await
            }
            MessageCommand::Add {
                conversation,
                role,
                content,
            } => commands::messages_add(app, format, &conversation, &role, &content).await,
        },
        Commands::Send {
            conversation,
            model,
            text,
        } => {
            let cancel = hearth_chat::install_signal_handler();
            let id = commands::send(app, conversation, model, text, cancel.clone()).await;
            cancel.cancel();
            if format == Format::Human
                && let Ok(id) = &id
            {
                eprintln!("conversation {id}");
            }
            id.map(|_| ())
        }
        Commands::Engine(EngineCommand::Ensure) => commands::engine_ensure(app).await,
        Commands::Engine(EngineCommand::Check) => commands::engine_check(app, format).await,
        Commands::Engine(EngineCommand::Stop) => commands::engine_stop(app).await,
        Commands::Models(cmd) => match cmd {
            ModelCommand::List => commands::models_list(app, format).await,
            ModelCommand::Pull { name } => {
                let cancel = hearth_chat::install_signal_handler();
                let result = commands::models_pull(app, &name, cancel.clone()).await;
                cancel.cancel();
                result
            }
            ModelCommand::Delete { name } => commands::models_delete(app, &name).await,
        },
        Commands::Facts(cmd) => match cmd {
            FactCommand::List => commands::facts_list(app, format).await,
            FactCommand::Add { text } => commands::facts_add(app, format, &text).await,
            FactCommand::Delete { id } => commands::facts_delete(app, &id).await,
            FactCommand::Context { query } => commands::facts_context(app, query.as_deref()).await,
        },
        Commands::Chat {
            conversation,
            model,
        } => shell::run_shell(app, conversation, model).await,
    }
}

/// Initialize the tracing subscriber. Logs go to stderr; stdout carries output.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("hearth={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}
