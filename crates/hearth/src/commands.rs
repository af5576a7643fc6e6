// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Handlers for the non-interactive subcommands.

use std::str::FromStr;

use colored::Colorize;
use hearth_chat::SendRequest;
use hearth_config::diagnostic::suggest_key;
use hearth_core::{AppConfig, Conversation, Fact, HearthError, Message, ModelInfo, Role};
use hearth_memory::memory_context;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::app::App;
use crate::output::{Format, preview, print_value};

const APP_CONFIG_KEYS: &[&str] = &[
    "theme",
    "default_model",
    "setup_complete",
    "system_prompt",
    "engine_host",
];

// --- config ---

pub async fn config_get(app: &App, format: Format) -> Result<(), HearthError> {
    let config = app.store.get_config().await?;
    print_value(format, &config, |c| {
        println!("theme          = {}", c.theme);
        println!("default_model  = {}", c.default_model);
        println!("setup_complete = {}", c.setup_complete);
        println!("system_prompt  = {:?}", c.system_prompt);
        println!("engine_host    = {}", c.engine_host);
    });
    Ok(())
}

pub async fn config_set(app: &App, key: &str, value: &str) -> Result<(), HearthError> {
    let mut config = app.store.get_config().await?;
    apply_setting(&mut config, key, value)?;
    app.store.save_config(&config).await?;
    println!("{} {key}", "updated".green());
    Ok(())
}

/// Set one user setting by name.
pub fn apply_setting(config: &mut AppConfig, key: &str, value: &str) -> Result<(), HearthError> {
    match key {
        "theme" => config.theme = value.to_string(),
        "default_model" => config.default_model = value.to_string(),
        "system_prompt" => config.system_prompt = value.to_string(),
        "engine_host" => {
            let host = value.trim_end_matches('/');
            hearth_engine::client::loopback_bind_address(host)?;
            config.engine_host = host.to_string();
        }
        "setup_complete" => {
            config.setup_complete = bool::from_str(value).map_err(|_| {
                HearthError::Validation(format!("setup_complete must be true or false, got {value:?}"))
            })?;
        }
        other => {
            let hint = suggest_key(other, APP_CONFIG_KEYS)
                .map(|s| format!(" (did you mean `{s}`?)"))
                .unwrap_or_default();
            return Err(HearthError::Validation(format!(
                "unknown setting `{other}`{hint}"
            )));
        }
    }
    Ok(())
}

// --- conversations & messages ---

pub async fn conversations_list(app: &App, format: Format) -> Result<(), HearthError> {
    let rows = app.store.list_conversations().await?;
    let readable = readable(rows, "conversation");
    print_value(format, &readable, |list: &Vec<Conversation>| {
        if list.is_empty() {
            println!("{}", "no conversations".dimmed());
        }
        for c in list {
            println!("{}  {}  {}", c.id.yellow(), c.updated_at.dimmed(), c.title);
        }
    });
    Ok(())
}

pub async fn conversations_create(
    app: &App,
    format: Format,
    title: &str,
    model: Option<String>,
) -> Result<(), HearthError> {
    let model = resolve_model(app, model).await?;
    let conversation = app.store.create_conversation(title, &model).await?;
    print_value(format, &conversation, |c| println!("{}", c.id));
    Ok(())
}

pub async fn conversations_delete(app: &App, id: &str) -> Result<(), HearthError> {
    app.store.delete_conversation(id).await?;
    println!("{} {id}", "deleted".green());
    Ok(())
}

pub async fn conversations_rename(app: &App, id: &str, title: &str) -> Result<(), HearthError> {
    app.store.rename_conversation(id, title).await?;
    println!("{} {id}", "renamed".green());
    Ok(())
}

pub async fn messages_list(app: &App, format: Format, id: &str) -> Result<(), HearthError> {
    let rows = app.store.get_messages(id).await?;
    let readable = readable(rows, "message");
    print_value(format, &readable, |list: &Vec<Message>| {
        for m in list {
            let role = match m.role {
                Role::User => "user".cyan(),
                Role::Assistant => "assistant".green(),
                Role::System => "system".magenta(),
            };
            println!("{} {}", format!("{role:>9}:").bold(), m.content);
        }
    });
    Ok(())
}

pub async fn messages_add(
    app: &App,
    format: Format,
    id: &str,
    role: &str,
    content: &str,
) -> Result<(), HearthError> {
    let role = Role::from_str(role)
        .map_err(|_| HearthError::Validation(format!("unknown role `{role}`")))?;
    let message = app.store.add_message(id, role, content).await?;
    print_value(format, &message, |m| println!("{}", m.id));
    Ok(())
}

// --- chat ---

pub async fn send(
    app: &App,
    conversation_id: Option<String>,
    model: Option<String>,
    text: String,
    cancel: CancellationToken,
) -> Result<String, HearthError> {
    let model = resolve_model(app, model).await?;
    app.supervisor.ensure().await?;
    let turn = app
        .chat
        .send_message(SendRequest {
            conversation_id,
            text,
            model,
            cancel,
        })
        .await?;
    debug!(conversation_id = %turn.conversation_id, "send finished");
    Ok(turn.conversation_id)
}

// --- engine ---

pub async fn engine_ensure(app: &App) -> Result<(), HearthError> {
    app.supervisor.ensure().await?;
    if let Ok(version) = app.supervisor.version().await {
        println!("engine {} at {}", version, app.supervisor.client().base_url());
    }
    Ok(())
}

#[derive(Serialize)]
struct EngineCheck {
    running: bool,
    url: String,
}

pub async fn engine_check(app: &App, format: Format) -> Result<(), HearthError> {
    let check = EngineCheck {
        running: app.supervisor.check().await,
        url: app.supervisor.client().base_url().to_string(),
    };
    print_value(format, &check, |c| {
        if c.running {
            println!("{} {}", "running".green(), c.url);
        } else {
            println!("{} {}", "not running".red(), c.url);
        }
    });
    Ok(())
}

pub async fn engine_stop(app: &App) -> Result<(), HearthError> {
    let url = app.supervisor.client().base_url().to_string();
    if app.supervisor.stop().await {
        println!("{} {url}", "stopped".green());
    } else {
        println!("no engine started by hearth is running at {url}");
    }
    Ok(())
}

// --- models ---

pub async fn models_list(app: &App, format: Format) -> Result<(), HearthError> {
    app.supervisor.ensure().await?;
    let models = app.registry.list().await?;
    print_value(format, &models, |list: &Vec<ModelInfo>| {
        if list.is_empty() {
            println!("{}", "no models installed".dimmed());
        }
        for m in list {
            let params = m
                .details
                .as_ref()
                .and_then(|d| d.parameter_size.clone())
                .unwrap_or_default();
            println!("{:30} {:>10} {}", m.name, human_size(m.size), params.dimmed());
        }
    });
    Ok(())
}

pub async fn models_pull(app: &App, name: &str, cancel: CancellationToken) -> Result<(), HearthError> {
    app.supervisor.ensure().await?;
    let result = app.registry.pull(name, cancel).await;
    app.sink.finish();
    result
}

pub async fn models_delete(app: &App, name: &str) -> Result<(), HearthError> {
    app.supervisor.ensure().await?;
    app.registry.delete(name).await?;
    println!("{} {name}", "deleted".green());
    Ok(())
}

// --- facts ---

pub async fn facts_list(app: &App, format: Format) -> Result<(), HearthError> {
    let rows = app.store.list_facts().await?;
    let readable = readable(rows, "fact");
    print_value(format, &readable, |list: &Vec<Fact>| {
        if list.is_empty() {
            println!("{}", "no facts stored".dimmed());
        }
        for f in list {
            println!("{}  {}", f.id.yellow(), preview(&f.subject, 80));
        }
    });
    Ok(())
}

pub async fn facts_add(app: &App, format: Format, text: &str) -> Result<(), HearthError> {
    let fact = app.store.add_fact(text, None).await?;
    print_value(format, &fact, |f| println!("{}", f.id));
    Ok(())
}

pub async fn facts_delete(app: &App, id: &str) -> Result<(), HearthError> {
    app.store.delete_fact(id).await?;
    println!("{} {id}", "deleted".green());
    Ok(())
}

pub async fn facts_context(app: &App, query: Option<&str>) -> Result<(), HearthError> {
    match memory_context(&app.store, query, app.config.memory.max_context_facts).await? {
        Some(block) => println!("{block}"),
        None => println!("{}", "no facts stored".dimmed()),
    }
    Ok(())
}

// --- helpers ---

/// The explicit model, else the user's default.
pub async fn resolve_model(app: &App, model: Option<String>) -> Result<String, HearthError> {
    match model {
        Some(m) if !m.trim().is_empty() => Ok(m),
        _ => Ok(app.store.get_config().await?.default_model),
    }
}

/// Keep readable records, reporting the rest on stderr.
fn readable<T>(rows: Vec<Result<T, HearthError>>, what: &str) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match row {
            Ok(item) => Some(item),
            Err(e) => {
                eprintln!("{}: skipping unreadable {what}: {e}", "warning".yellow());
                None
            }
        })
        .collect()
}

fn human_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
