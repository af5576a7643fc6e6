// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Terminal rendering of push events and command results.
//!
//! Streamed tokens go to stdout as they arrive; setup status and pull
//! progress go to stderr. In JSON mode every event is one line on stdout.

use std::io::Write;
use std::sync::{Mutex, MutexGuard};

use colored::Colorize;
use hearth_core::{CommandError, Event, EventSink, HearthError, PullProgress, SetupStage};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

/// Output format chosen on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Human,
    Json,
}

pub struct ConsoleSink {
    format: Format,
    pull_bar: Mutex<Option<ProgressBar>>,
}

impl ConsoleSink {
    pub fn new(format: Format) -> Self {
        Self {
            format,
            pull_bar: Mutex::new(None),
        }
    }

    /// Finish any progress bar still on screen.
    pub fn finish(&self) {
        if let Some(bar) = self.bar().take() {
            bar.finish_and_clear();
        }
    }

    fn bar(&self) -> MutexGuard<'_, Option<ProgressBar>> {
        self.pull_bar.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn pull_progress(&self, progress: &PullProgress) {
        let mut slot = self.bar();
        let bar = slot.get_or_insert_with(|| {
            let bar = ProgressBar::new(0);
            bar.set_style(
                ProgressStyle::with_template(
                    "{msg:30} [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({eta})",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
            );
            bar
        });

        bar.set_message(progress.status.clone());
        if let (Some(total), Some(done)) = (progress.overall_total, progress.overall_completed) {
            bar.set_length(total);
            bar.set_position(done);
        }
        if progress.status == "success" {
            bar.finish_with_message(format!("{} {}", "pulled".green(), progress.model));
            *slot = None;
        }
    }
}

impl EventSink for ConsoleSink {
    fn emit(&self, event: Event) {
        if self.format == Format::Json {
            if let Ok(line) = serde_json::to_string(&event) {
                println!("{line}");
            }
            return;
        }

        match event {
            Event::ChatStreamToken(token) => {
                let mut out = std::io::stdout().lock();
                if token.done {
                    let _ = writeln!(out);
                } else {
                    let _ = write!(out, "{}", token.content);
                }
                let _ = out.flush();
            }
            Event::EngineSetupStatus(status) => {
                let stage = match status.stage {
                    SetupStage::Ready => status.stage.to_string().green(),
                    SetupStage::Error => status.stage.to_string().red(),
                    _ => status.stage.to_string().cyan(),
                };
                eprintln!("{} {}", format!("[{stage}]").bold(), status.message);
            }
            Event::ModelPullProgress(progress) => self.pull_progress(&progress),
        }
    }
}

/// Print a command result.
pub fn print_value<T: Serialize>(format: Format, value: &T, human: impl FnOnce(&T)) {
    match format {
        Format::Json => match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("{}: {e}", "error".red()),
        },
        Format::Human => human(value),
    }
}

/// Print a command failure as `CommandError`.
pub fn print_error(format: Format, err: &HearthError) {
    let cmd = CommandError::from(err);
    match format {
        Format::Json => match serde_json::to_string(&cmd) {
            Ok(json) => eprintln!("{json}"),
            Err(_) => eprintln!("{cmd}"),
        },
        Format::Human => eprintln!("{}[{}]: {}", "error".red().bold(), cmd.kind, cmd.detail),
    }
}

/// Short one-line preview of possibly long text.
pub fn preview(text: &str, max_chars: usize) -> String {
    let line = text.lines().next().unwrap_or_default();
    let mut out: String = line.chars().take(max_chars).collect();
    if line.chars().count() > max_chars || text.lines().nth(1).is_some() {
        out.push('\u{2026}');
    }
    out
}
