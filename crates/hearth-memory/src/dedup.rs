// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Near-duplicate detection for fact text.

/// Lowercase, keep alphanumerics, collapse everything else to single spaces.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether two normalized strings name the same fact.
pub fn is_duplicate(a: &str, b: &str, threshold: f64) -> bool {
    a == b || strsim::normalized_levenshtein(a, b) >= threshold
}

/// Tracks accepted fact text so later candidates can be rejected.
#[derive(Debug)]
pub struct Deduplicator {
    threshold: f64,
    seen: Vec<String>,
}

impl Deduplicator {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            seen: Vec::new(),
        }
    }

    /// Record text that already exists.
    pub fn remember(&mut self, text: &str) {
        let norm = normalize(text);
        if !norm.is_empty() {
            self.seen.push(norm);
        }
    }

    /// Accept `text` if it is not a duplicate of anything seen so far.
    pub fn admit(&mut self, text: &str) -> bool {
        let norm = normalize(text);
        if norm.is_empty()
            || self
                .seen
                .iter()
                .any(|s| is_duplicate(s, &norm, self.threshold))
        {
            return false;
        }
        self.seen.push(norm);
        true
    }
}
