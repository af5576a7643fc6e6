// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Model-driven fact extraction from a completed turn.
//!
//! The extraction model's reply is untrusted: [`parse_extraction_response`]
//! accepts a few reasonable shapes and returns an empty set for anything else.

use std::sync::Arc;

use hearth_core::{ChatMessage, Fact, GenerationBackend, GenerationRequest, HearthError, Role};
use hearth_storage::Store;
use serde_json::Value;
use tracing::{debug, warn};

use crate::dedup::Deduplicator;

/// Prompt sent to the extraction model.
const EXTRACTION_PROMPT: &str = r#"Extract durable facts about the user from this exchange that would help in future conversations. Output a JSON array of short strings.

Each fact must be:
1. Stated by the user, not the assistant
2. About the user themselves (name, location, work, preferences, ongoing projects)
3. Written as a standalone statement (e.g. "The user's dog is named Max")

Greetings, questions, and small talk contain no facts. If there is nothing worth remembering, return an empty array: []

Exchange:
{exchange}

Output JSON array only, no explanation:"#;

/// A fact proposed by the extraction model, before deduplication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFact {
    pub text: String,
}

/// One completed turn queued for extraction.
#[derive(Debug, Clone)]
pub struct ExtractionJob {
    pub conversation_id: String,
    pub user_text: String,
    pub assistant_text: String,
    pub assistant_message_id: String,
    /// Model that produced the turn.
    pub model: String,
}

/// Turns completed exchanges into stored facts.
pub struct FactExtractor {
    backend: Arc<dyn GenerationBackend>,
    store: Arc<Store>,
    extraction_model: Option<String>,
    dedup_threshold: f64,
}

impl FactExtractor {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        store: Arc<Store>,
        extraction_model: Option<String>,
        dedup_threshold: f64,
    ) -> Self {
        Self {
            backend,
            store,
            extraction_model,
            dedup_threshold,
        }
    }

    /// Extract facts from `job`, store the new ones, and return them.
    pub async fn extract(&self, job: &ExtractionJob) -> Result<Vec<Fact>, HearthError> {
        let model = self
            .extraction_model
            .clone()
            .unwrap_or_else(|| job.model.clone());
        let request = GenerationRequest {
            model,
            messages: vec![ChatMessage::new(
                Role::User,
                build_extraction_prompt(&job.user_text, &job.assistant_text),
            )],
        };

        let response = self.backend.complete(request).await?;
        let candidates = parse_extraction_response(&response.content);
        if candidates.is_empty() {
            debug!(conversation_id = %job.conversation_id, "no facts in turn");
            return Ok(Vec::new());
        }

        let mut dedup = Deduplicator::new(self.dedup_threshold);
        for existing in self.store.list_facts().await? {
            match existing {
                Ok(fact) => dedup.remember(&fact.subject),
                Err(e) => warn!(error = %e, "skipping unreadable fact during dedup"),
            }
        }

        let mut stored = Vec::new();
        let total = candidates.len();
        for candidate in candidates {
            if !dedup.admit(&candidate.text) {
                continue;
            }
            let fact = self
                .store
                .add_fact(&candidate.text, Some(&job.assistant_message_id))
                .await?;
            stored.push(fact);
        }

        debug!(
            conversation_id = %job.conversation_id,
            candidates = total,
            stored = stored.len(),
            "extraction finished"
        );
        Ok(stored)
    }
}

/// Format the latest exchange into the extraction prompt.
pub fn build_extraction_prompt(user_text: &str, assistant_text: &str) -> String {
    let exchange = format!("User: {user_text}\nAssistant: {assistant_text}\n");
    EXTRACTION_PROMPT.replace("{exchange}", &exchange)
}

/// Parse the extraction model's reply.
///
/// Accepts a JSON array of strings or of objects carrying a `fact` or
/// `content` string, optionally wrapped in a code fence or prose. Elements of
/// any other shape are skipped. Unparseable replies yield an empty set.
pub fn parse_extraction_response(response: &str) -> Vec<CandidateFact> {
    let trimmed = response.trim();
    let (Some(start), Some(end)) = (trimmed.find('['), trimmed.rfind(']')) else {
        return Vec::new();
    };
    if end < start {
        return Vec::new();
    }

    let items = match serde_json::from_str::<Value>(&trimmed[start..=end]) {
        Ok(Value::Array(items)) => items,
        Ok(_) => return Vec::new(),
        Err(e) => {
            warn!(error = %e, "failed to parse extraction response");
            return Vec::new();
        }
    };

    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.as_str()),
            Value::Object(map) => map
                .get("fact")
                .or_else(|| map.get("content"))
                .and_then(Value::as_str),
            _ => None,
        })
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| CandidateFact {
            text: s.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use hearth_core::{ChunkStream, GenerationResponse};
    use hearth_vault::Cipher;
    use std::sync::Mutex;

    struct CannedBackend {
        reply: String,
        models: Mutex<Vec<String>>,
    }

    impl CannedBackend {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                models: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl GenerationBackend for CannedBackend {
        async fn complete(
            &self,
            request: GenerationRequest,
        ) -> Result<GenerationResponse, HearthError> {
            self.models.lock().unwrap().push(request.model.clone());
            Ok(GenerationResponse {
                model: request.model,
                content: self.reply.clone(),
            })
        }

        async fn stream(&self, _request: GenerationRequest) -> Result<ChunkStream, HearthError> {
            Err(HearthError::Internal("not streamed".into()))
        }
    }

    async fn store() -> Arc<Store> {
        let cipher = Arc::new(Cipher::random().unwrap());
        Arc::new(Store::open_in_memory(cipher).await.unwrap())
    }

    fn job(user: &str) -> ExtractionJob {
        ExtractionJob {
            conversation_id: "c1".into(),
            user_text: user.into(),
            assistant_text: "Nice to meet you!".into(),
            assistant_message_id: "m2".into(),
            model: "llama3:8b".into(),
        }
    }

    #[test]
    fn parses_array_of_strings() {
        let facts = parse_extraction_response(r#"["The user lives in Lyon", "The user codes in Rust"]"#);
        assert_eq!(facts.len(), 2);
        assert_eq!(facts[0].text, "The user lives in Lyon");
    }

    #[test]
    fn parses_objects_with_fact_or_content() {
        let facts = parse_extraction_response(
            r#"[{"fact": "Has a cat"}, {"content": "Works nights"}, {"other": 1}, 7]"#,
        );
        let texts: Vec<_> = facts.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(texts, vec!["Has a cat", "Works nights"]);
    }

    #[test]
    fn parses_fenced_and_prose_wrapped_replies() {
        let fenced = "```json\n[\"The user is vegetarian\"]\n```";
        assert_eq!(parse_extraction_response(fenced).len(), 1);

        let prose = "Sure! Here you go:\n[\"The user plays cello\"]\nLet me know.";
        assert_eq!(parse_extraction_response(prose)[0].text, "The user plays cello");
    }

    #[test]
    fn junk_yields_nothing() {
        assert!(parse_extraction_response("").is_empty());
        assert!(parse_extraction_response("No facts here.").is_empty());
        assert!(parse_extraction_response("] backwards [").is_empty());
        assert!(parse_extraction_response("[not json").is_empty());
        assert!(parse_extraction_response(r#"["  ", ""]"#).is_empty());
    }

    #[test]
    fn prompt_contains_both_sides() {
        let prompt = build_extraction_prompt("My name is Ada.", "Hello Ada!");
        assert!(prompt.contains("User: My name is Ada."));
        assert!(prompt.contains("Assistant: Hello Ada!"));
        assert!(prompt.contains("Output JSON array only"));
    }

    #[tokio::test]
    async fn non_identifying_turn_yields_zero_facts() {
        let store = store().await;
        let extractor = FactExtractor::new(CannedBackend::new("[]"), store.clone(), None, 0.9);

        let facts = extractor.extract(&job("What's 2 + 2?")).await.unwrap();
        assert!(facts.is_empty());
        assert!(store.list_facts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stores_new_facts_and_skips_duplicates() {
        let store = store().await;
        store.add_fact("The user lives in Lyon", None).await.unwrap();

        let backend = CannedBackend::new(
            r#"["The user lives in Lyon.", "The user has two kids", "the user has two kids!"]"#,
        );
        let extractor = FactExtractor::new(backend, store.clone(), None, 0.9);
        let facts = extractor.extract(&job("I live in Lyon with my two kids")).await.unwrap();

        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].subject, "The user has two kids");
        assert_eq!(facts[0].source_message_id.as_deref(), Some("m2"));
        assert_eq!(store.list_facts().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn configured_model_overrides_turn_model() {
        let store = store().await;
        let backend = CannedBackend::new("[]");
        let extractor =
            FactExtractor::new(backend.clone(), store, Some("qwen2:0.5b".into()), 0.9);
        extractor.extract(&job("hi")).await.unwrap();

        let fallback = FactExtractor::new(backend.clone(), self::store().await, None, 0.9);
        fallback.extract(&job("hi")).await.unwrap();

        assert_eq!(*backend.models.lock().unwrap(), vec!["qwen2:0.5b", "llama3:8b"]);
    }
}
