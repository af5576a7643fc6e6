// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `hearth chat` command implementation.
//!
//! Interactive REPL with a colored prompt, streamed replies, and readline
//! history. The first line starts a conversation unless one is passed in;
//! Ctrl+C during a reply cancels just that reply.

use colored::Colorize;
use hearth_chat::SendRequest;
use hearth_core::HearthError;
use hearth_memory::memory_context;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::app::App;
use crate::commands::resolve_model;

/// What a line typed at the prompt asks for.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Quit,
    NewConversation,
    ShowFacts,
    Help,
    Message(&'a str),
    Empty,
}

fn parse_input(line: &str) -> Input<'_> {
    match line.trim() {
        "" => Input::Empty,
        "/quit" | "/exit" => Input::Quit,
        "/new" => Input::NewConversation,
        "/facts" => Input::ShowFacts,
        "/help" => Input::Help,
        text => Input::Message(text),
    }
}

pub async fn run_shell(
    app: &App,
    mut conversation_id: Option<String>,
    model: Option<String>,
) -> Result<(), HearthError> {
    let model = resolve_model(app, model).await?;
    app.supervisor.ensure().await?;

    let mut rl = DefaultEditor::new()
        .map_err(|e| HearthError::Internal(format!("failed to initialize readline: {e}")))?;

    println!("{} {}", "hearth chat".bold().green(), model.dimmed());
    println!("Type {} for commands, {} to exit.\n", "/help".yellow(), "/quit".yellow());

    let prompt = format!("{}> ", "you".cyan());
    loop {
        match rl.readline(&prompt) {
            Ok(line) => match parse_input(&line) {
                Input::Empty => continue,
                Input::Quit => break,
                Input::Help => {
                    println!("  /new    start a new conversation");
                    println!("  /facts  show what is remembered about you");
                    println!("  /quit   leave");
                }
                Input::NewConversation => {
                    conversation_id = None;
                    println!("{}", "new conversation".dimmed());
                }
                Input::ShowFacts => {
                    match memory_context(&app.store, None, app.config.memory.max_context_facts)
                        .await
                    {
                        Ok(Some(block)) => println!("{}", block.dimmed()),
                        Ok(None) => println!("{}", "nothing remembered yet".dimmed()),
                        Err(e) => eprintln!("{}: {e}", "error".red()),
                    }
                }
                Input::Message(text) => {
                    let _ = rl.add_history_entry(text);
                    match turn(app, conversation_id.clone(), &model, text).await {
                        Ok(id) => conversation_id = Some(id),
                        Err(HearthError::Cancelled) => println!("{}", "(cancelled)".dimmed()),
                        Err(e) => eprintln!("{}: {e}", "error".red()),
                    }
                }
            },
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        }
    }

    println!("{}", "goodbye".dimmed());
    Ok(())
}

/// One streamed reply. Ctrl+C while it runs cancels only this reply.
async fn turn(
    app: &App,
    conversation_id: Option<String>,
    model: &str,
    text: &str,
) -> Result<String, HearthError> {
    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    print!("{} ", "hearth>".green());
    let result = app
        .chat
        .send_message(SendRequest {
            conversation_id,
            text: text.to_string(),
            model: model.to_string(),
            cancel,
        })
        .await;
    watcher.abort();

    let turn = result?;
    debug!(conversation_id = %turn.conversation_id, "shell turn complete");
    Ok(turn.conversation_id)
}
