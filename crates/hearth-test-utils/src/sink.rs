// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event sink that keeps everything it is given.

use std::sync::{Mutex, MutexGuard};

use hearth_core::{Event, EventSink, StreamToken};

#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Event>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.lock().clone()
    }

    /// Stream tokens emitted for `conversation_id`, in order.
    pub fn tokens(&self, conversation_id: &str) -> Vec<StreamToken> {
        self.lock()
            .iter()
            .filter_map(|event| match event {
                Event::ChatStreamToken(token) if token.conversation_id == conversation_id => {
                    Some(token.clone())
                }
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Event>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: Event) {
        self.lock().push(event);
    }
}
