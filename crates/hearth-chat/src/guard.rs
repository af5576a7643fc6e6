// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One generation per conversation.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use hearth_core::HearthError;
use tracing::debug;

/// Conversations that currently have a generation in flight.
#[derive(Debug, Default)]
pub struct ActiveGenerations {
    ids: Mutex<HashSet<String>>,
}

impl ActiveGenerations {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Claim `conversation_id`. Fails with [`HearthError::Busy`] if already claimed.
    pub fn try_acquire(
        self: &Arc<Self>,
        conversation_id: &str,
    ) -> Result<GenerationSlot, HearthError> {
        if !self.lock().insert(conversation_id.to_string()) {
            debug!(conversation_id, "rejecting concurrent generation");
            return Err(HearthError::Busy {
                conversation_id: conversation_id.to_string(),
            });
        }
        Ok(GenerationSlot {
            owner: Arc::clone(self),
            conversation_id: conversation_id.to_string(),
        })
    }

    pub fn is_active(&self, conversation_id: &str) -> bool {
        self.lock().contains(conversation_id)
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.ids.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Held for the duration of a generation; released on drop.
#[derive(Debug)]
pub struct GenerationSlot {
    owner: Arc<ActiveGenerations>,
    conversation_id: String,
}

impl Drop for GenerationSlot {
    fn drop(&mut self) {
        self.owner.lock().remove(&self.conversation_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_claim_is_busy_until_release() {
        let active = ActiveGenerations::new();
        let slot = active.try_acquire("c1").unwrap();
        assert!(active.is_active("c1"));

        let err = active.try_acquire("c1").unwrap_err();
        assert!(matches!(err, HearthError::Busy { ref conversation_id } if conversation_id == "c1"));

        // Other conversations are independent.
        let other = active.try_acquire("c2").unwrap();

        drop(slot);
        assert!(!active.is_active("c1"));
        assert!(active.try_acquire("c1").is_ok());
        drop(other);
    }
}
