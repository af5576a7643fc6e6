// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The encrypted store.
//!
//! Sealing happens before a statement is handed to the database thread and
//! opening happens after rows come back, so neither the key nor plaintext
//! ever crosses into the connection closure.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use hearth_core::{AppConfig, Conversation, Fact, HearthError, Message, Role, now_timestamp};
use hearth_vault::Cipher;
use tracing::{debug, warn};

use crate::database::Database;
use crate::models::{ConversationRow, FactRow, MessageRow};
use crate::queries::{conversations, facts, messages, settings};

/// Encrypted persistence for conversations, messages, facts, and settings.
pub struct Store {
    db: Database,
    cipher: Arc<Cipher>,
}

impl Store {
    /// Wrap an already-open database. Call [`Store::ensure_config`] before use.
    pub fn new(db: Database, cipher: Arc<Cipher>) -> Self {
        Self { db, cipher }
    }

    /// Open the database file and seed the settings row.
    pub async fn open(path: &Path, wal_mode: bool, cipher: Arc<Cipher>) -> Result<Self, HearthError> {
        let store = Self::new(Database::open(path, wal_mode).await?, cipher);
        store.ensure_config().await?;
        Ok(store)
    }

    pub async fn open_in_memory(cipher: Arc<Cipher>) -> Result<Self, HearthError> {
        let store = Self::new(Database::open_in_memory().await?, cipher);
        store.ensure_config().await?;
        Ok(store)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub async fn close(self) -> Result<(), HearthError> {
        self.db.close().await
    }

    // --- settings ---

    /// Insert the default settings if the singleton row is missing.
    pub async fn ensure_config(&self) -> Result<(), HearthError> {
        let payload = self.seal_config(&AppConfig::default())?;
        if settings::insert_default(&self.db, payload, &now_timestamp()).await? {
            debug!("seeded default settings");
        }
        Ok(())
    }

    pub async fn get_config(&self) -> Result<AppConfig, HearthError> {
        let Some(blob) = settings::read_payload(&self.db).await? else {
            return Ok(AppConfig::default());
        };
        let json = self.open_field(&blob, "app_config")?;
        serde_json::from_str(&json).map_err(HearthError::storage)
    }

    pub async fn save_config(&self, config: &AppConfig) -> Result<(), HearthError> {
        let payload = self.seal_config(config)?;
        settings::write_payload(&self.db, payload, &now_timestamp()).await
    }

    fn seal_config(&self, config: &AppConfig) -> Result<Vec<u8>, HearthError> {
        let json = serde_json::to_string(config).map_err(HearthError::storage)?;
        self.cipher.encrypt_str(&json)
    }

    // --- conversations ---

    pub async fn create_conversation(
        &self,
        title: &str,
        model: &str,
    ) -> Result<Conversation, HearthError> {
        let now = now_timestamp();
        let conv = Conversation {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            model: model.to_string(),
            created_at: now.clone(),
            updated_at: now,
        };
        let row = ConversationRow {
            id: conv.id.clone(),
            title: self.cipher.encrypt_str(&conv.title)?,
            model: conv.model.clone(),
            created_at: conv.created_at.clone(),
            updated_at: conv.updated_at.clone(),
        };
        conversations::insert_conversation(&self.db, row).await?;
        debug!(conversation_id = %conv.id, "conversation created");
        Ok(conv)
    }

    pub async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, HearthError> {
        conversations::get_conversation(&self.db, id)
            .await?
            .map(|row| self.open_conversation(row))
            .transpose()
    }

    /// All conversations, most recently active first. A record that cannot
    /// be opened is reported in place without failing its siblings.
    pub async fn list_conversations(
        &self,
    ) -> Result<Vec<Result<Conversation, HearthError>>, HearthError> {
        let rows = conversations::list_conversations(&self.db).await?;
        Ok(rows
            .into_iter()
            .map(|row| self.open_conversation(row))
            .collect())
    }

    pub async fn rename_conversation(&self, id: &str, title: &str) -> Result<(), HearthError> {
        let sealed = self.cipher.encrypt_str(title)?;
        if !conversations::update_title(&self.db, id, sealed, &now_timestamp()).await? {
            return Err(unknown("conversation", id));
        }
        Ok(())
    }

    /// Remove a conversation and its messages. Facts are kept.
    pub async fn delete_conversation(&self, id: &str) -> Result<(), HearthError> {
        if !conversations::delete_conversation(&self.db, id).await? {
            return Err(unknown("conversation", id));
        }
        debug!(conversation_id = %id, "conversation deleted");
        Ok(())
    }

    fn open_conversation(&self, row: ConversationRow) -> Result<Conversation, HearthError> {
        let title = self.open_field(&row.title, &row.id)?;
        Ok(Conversation {
            id: row.id,
            title,
            model: row.model,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    // --- messages ---

    pub async fn add_message(
        &self,
        conversation_id: &str,
        role: Role,
        content: &str,
    ) -> Result<Message, HearthError> {
        let msg = Message {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation_id.to_string(),
            role,
            content: content.to_string(),
            timestamp: now_timestamp(),
        };
        let row = MessageRow {
            id: msg.id.clone(),
            conversation_id: msg.conversation_id.clone(),
            role: msg.role.to_string(),
            content: self.cipher.encrypt_str(&msg.content)?,
            timestamp: msg.timestamp.clone(),
        };
        if !messages::insert_message(&self.db, row).await? {
            return Err(unknown("conversation", conversation_id));
        }
        Ok(msg)
    }

    /// Messages in chronological order. An unknown conversation has none.
    pub async fn get_messages(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<Result<Message, HearthError>>, HearthError> {
        let rows = messages::messages_for_conversation(&self.db, conversation_id).await?;
        Ok(rows.into_iter().map(|row| self.open_message(row)).collect())
    }

    pub async fn count_messages(&self, conversation_id: &str) -> Result<i64, HearthError> {
        messages::count_messages(&self.db, conversation_id).await
    }

    fn open_message(&self, row: MessageRow) -> Result<Message, HearthError> {
        let role = Role::from_str(&row.role).map_err(|_| {
            warn!(message_id = %row.id, role = %row.role, "unrecognized role");
            HearthError::Decryption {
                record: Some(row.id.clone()),
            }
        })?;
        let content = self.open_field(&row.content, &row.id)?;
        Ok(Message {
            id: row.id,
            conversation_id: row.conversation_id,
            role,
            content,
            timestamp: row.timestamp,
        })
    }

    // --- facts ---

    pub async fn add_fact(
        &self,
        subject: &str,
        source_message_id: Option<&str>,
    ) -> Result<Fact, HearthError> {
        let subject = subject.trim();
        if subject.is_empty() {
            return Err(HearthError::Validation("fact must not be empty".to_string()));
        }
        let fact = Fact {
            id: uuid::Uuid::new_v4().to_string(),
            subject: subject.to_string(),
            created_at: now_timestamp(),
            source_message_id: source_message_id.map(str::to_string),
        };
        let row = FactRow {
            id: fact.id.clone(),
            subject: self.cipher.encrypt_str(&fact.subject)?,
            created_at: fact.created_at.clone(),
            source_message_id: fact.source_message_id.clone(),
        };
        facts::insert_fact(&self.db, row).await?;
        Ok(fact)
    }

    /// Newest first.
    pub async fn list_facts(&self) -> Result<Vec<Result<Fact, HearthError>>, HearthError> {
        let rows = facts::list_facts(&self.db).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let subject = self.open_field(&row.subject, &row.id)?;
                Ok(Fact {
                    id: row.id,
                    subject,
                    created_at: row.created_at,
                    source_message_id: row.source_message_id,
                })
            })
            .collect())
    }

    pub async fn delete_fact(&self, id: &str) -> Result<(), HearthError> {
        if !facts::delete_fact(&self.db, id).await? {
            return Err(unknown("fact", id));
        }
        Ok(())
    }

    fn open_field(&self, blob: &[u8], record: &str) -> Result<String, HearthError> {
        self.cipher.decrypt_str(blob).map_err(|_| {
            warn!(record, "failed to decrypt record");
            HearthError::Decryption {
                record: Some(record.to_string()),
            }
        })
    }
}

fn unknown(what: &str, id: &str) -> HearthError {
    HearthError::Validation(format!("unknown {what} id: {id}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup() -> (Store, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let cipher = Arc::new(Cipher::random().unwrap());
        let store = Store::open(&dir.path().join("hearth.db"), true, cipher)
            .await
            .unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn config_is_seeded_once_and_saved() {
        let (store, _dir) = setup().await;
        assert_eq!(store.get_config().await.unwrap(), AppConfig::default());

        let mut config = store.get_config().await.unwrap();
        config.default_model = "mistral:7b".to_string();
        config.setup_complete = true;
        store.save_config(&config).await.unwrap();
        store.ensure_config().await.unwrap();

        assert_eq!(store.get_config().await.unwrap(), config);
        let rows: i64 = store
            .database()
            .connection()
            .call(|conn| conn.query_row("SELECT COUNT(*) FROM app_config", [], |r| r.get(0)))
            .await
            .unwrap();
        assert_eq!(rows, 1);
        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn sensitive_columns_are_not_plaintext() {
        let (store, _dir) = setup().await;
        let conv = store.create_conversation("secret title", "llama3:8b").await.unwrap();
        store
            .add_message(&conv.id, Role::User, "my secret message")
            .await
            .unwrap();

        let (title, content): (Vec<u8>, Vec<u8>) = store
            .database()
            .connection()
            .call(|conn| {
                conn.query_row(
                    "SELECT c.title, m.content FROM conversations c
                     JOIN messages m ON m.conversation_id = c.id",
                    [],
                    |r| Ok((r.get(0)?, r.get(1)?)),
                )
            })
            .await
            .unwrap();
        assert!(!String::from_utf8_lossy(&title).contains("secret title"));
        assert!(!String::from_utf8_lossy(&content).contains("my secret message"));
        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn messages_come_back_in_insertion_order() {
        let (store, _dir) = setup().await;
        let conv = store.create_conversation("order", "llama3:8b").await.unwrap();
        for i in 0..10 {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            store.add_message(&conv.id, role, &format!("m{i}")).await.unwrap();
        }

        let contents: Vec<String> = store
            .get_messages(&conv.id)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.unwrap().content)
            .collect();
        let expected: Vec<String> = (0..10).map(|i| format!("m{i}")).collect();
        assert_eq!(contents, expected);
        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn adding_a_message_bumps_the_conversation() {
        let (store, _dir) = setup().await;
        let older = store.create_conversation("older", "m").await.unwrap();
        let newer = store.create_conversation("newer", "m").await.unwrap();
        store.add_message(&older.id, Role::User, "hi").await.unwrap();

        let listed: Vec<String> = store
            .list_conversations()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.unwrap().id)
            .collect();
        assert_eq!(listed, vec![older.id.clone(), newer.id]);
        let refreshed = store.get_conversation(&older.id).await.unwrap().unwrap();
        assert!(refreshed.updated_at > older.updated_at);
        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn unknown_conversation_is_a_validation_error() {
        let (store, _dir) = setup().await;
        let err = store.add_message("nope", Role::User, "hi").await.unwrap_err();
        assert!(matches!(err, HearthError::Validation(_)));
        assert!(matches!(
            store.delete_conversation("nope").await,
            Err(HearthError::Validation(_))
        ));
        assert!(matches!(
            store.rename_conversation("nope", "x").await,
            Err(HearthError::Validation(_))
        ));
        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn delete_cascades_messages_but_keeps_facts() {
        let (store, _dir) = setup().await;
        let conv = store.create_conversation("doomed", "m").await.unwrap();
        let msg = store.add_message(&conv.id, Role::User, "I live in Lisbon").await.unwrap();
        store.add_fact("User lives in Lisbon", Some(&msg.id)).await.unwrap();

        store.delete_conversation(&conv.id).await.unwrap();

        assert!(store.get_conversation(&conv.id).await.unwrap().is_none());
        assert!(store.get_messages(&conv.id).await.unwrap().is_empty());
        assert_eq!(store.count_messages(&conv.id).await.unwrap(), 0);
        let facts = store.list_facts().await.unwrap();
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].as_ref().unwrap().source_message_id.as_deref(), Some(msg.id.as_str()));
        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn corrupted_message_fails_alone() {
        let (store, _dir) = setup().await;
        let conv = store.create_conversation("mixed", "m").await.unwrap();
        store.add_message(&conv.id, Role::User, "first").await.unwrap();
        let bad = store.add_message(&conv.id, Role::Assistant, "second").await.unwrap();
        store.add_message(&conv.id, Role::User, "third").await.unwrap();

        let bad_id = bad.id.clone();
        store
            .database()
            .connection()
            .call(move |conn| {
                conn.execute(
                    "UPDATE messages SET content = ?1 WHERE id = ?2",
                    rusqlite::params![vec![0u8; 40], bad_id],
                )
            })
            .await
            .unwrap();

        let messages = store.get_messages(&conv.id).await.unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].as_ref().unwrap().content, "first");
        match &messages[1] {
            Err(HearthError::Decryption { record }) => assert_eq!(record.as_deref(), Some(bad.id.as_str())),
            other => panic!("expected decryption error, got {other:?}"),
        }
        assert_eq!(messages[2].as_ref().unwrap().content, "third");
        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn wrong_key_cannot_read_existing_data() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hearth.db");
        let store = Store::open(&path, true, Arc::new(Cipher::random().unwrap()))
            .await
            .unwrap();
        store.create_conversation("private", "m").await.unwrap();
        store.close().await.unwrap();

        let reopened = Store::open(&path, true, Arc::new(Cipher::random().unwrap()))
            .await
            .unwrap();
        let listed = reopened.list_conversations().await.unwrap();
        assert!(matches!(listed[0], Err(HearthError::Decryption { .. })));
        assert!(matches!(
            reopened.get_config().await,
            Err(HearthError::Decryption { .. })
        ));
        reopened.close().await.unwrap();
    }

    #[tokio::test]
    async fn rename_and_fact_lifecycle() {
        let store = Store::open_in_memory(Arc::new(Cipher::random().unwrap()))
            .await
            .unwrap();
        let conv = store.create_conversation("draft", "m").await.unwrap();
        store.rename_conversation(&conv.id, "final").await.unwrap();
        assert_eq!(
            store.get_conversation(&conv.id).await.unwrap().unwrap().title,
            "final"
        );

        assert!(matches!(
            store.add_fact("   ", None).await,
            Err(HearthError::Validation(_))
        ));
        let fact = store.add_fact("User prefers tea", None).await.unwrap();
        store.delete_fact(&fact.id).await.unwrap();
        assert!(store.list_facts().await.unwrap().is_empty());
        assert!(matches!(
            store.delete_fact(&fact.id).await,
            Err(HearthError::Validation(_))
        ));
    }
}
