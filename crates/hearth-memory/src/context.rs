// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Choosing which facts accompany a prompt.
//!
//! Facts are ranked by how many keywords they share with the user's text,
//! ties broken by recency, and capped. Without a query the newest facts win.

use std::collections::HashSet;

use hearth_core::{Fact, HearthError};
use hearth_storage::Store;
use tracing::{debug, warn};

use crate::dedup::normalize;

const HEADER: &str = "Known facts about the user:";

/// Words too common to say anything about relevance.
const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "your", "with", "this", "that", "have",
    "has", "was", "were", "what", "when", "where", "who", "how", "why", "can", "could", "would",
    "should", "about", "from", "they", "them", "their", "user", "users", "is", "am", "my", "me",
];

fn keywords(text: &str) -> HashSet<String> {
    normalize(text)
        .split(' ')
        .filter(|w| w.chars().count() >= 3 && !STOPWORDS.contains(&w))
        .map(str::to_string)
        .collect()
}

/// Pick at most `limit` facts for `query`.
pub fn select_facts(facts: &[Fact], query: Option<&str>, limit: usize) -> Vec<Fact> {
    let query_words = query.map(keywords).unwrap_or_default();

    let mut scored: Vec<(usize, &Fact)> = facts
        .iter()
        .map(|fact| {
            let overlap = if query_words.is_empty() {
                0
            } else {
                keywords(&fact.subject).intersection(&query_words).count()
            };
            (overlap, fact)
        })
        .collect();

    scored.sort_by(|(sa, a), (sb, b)| sb.cmp(sa).then_with(|| b.created_at.cmp(&a.created_at)));
    scored
        .into_iter()
        .take(limit)
        .map(|(_, fact)| fact.clone())
        .collect()
}

/// Render facts as a system-prompt block. `None` when there is nothing to say.
pub fn format_fact_context(facts: &[Fact]) -> Option<String> {
    if facts.is_empty() {
        return None;
    }
    let mut block = String::from(HEADER);
    for fact in facts {
        block.push_str("\n- ");
        block.push_str(&fact.subject);
    }
    Some(block)
}

/// Load stored facts and build the context block for `query`.
///
/// Facts that fail to decrypt are skipped.
pub async fn memory_context(
    store: &Store,
    query: Option<&str>,
    limit: usize,
) -> Result<Option<String>, HearthError> {
    let facts: Vec<Fact> = store
        .list_facts()
        .await?
        .into_iter()
        .filter_map(|fact| match fact {
            Ok(fact) => Some(fact),
            Err(e) => {
                warn!(error = %e, "skipping unreadable fact");
                None
            }
        })
        .collect();

    let selected = select_facts(&facts, query, limit);
    debug!(available = facts.len(), selected = selected.len(), "fact context selected");
    Ok(format_fact_context(&selected))
}
