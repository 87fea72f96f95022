//! Message persistence behind a storage trait.
//!
//! The pipeline talks to [`MessageStore`]; the SQLite adapter is the real
//! backend and [`MemoryStore`] backs tests. Parts and attachments are
//! stored as JSON columns so the full reconciled structure survives a
//! reload.

mod sqlite;

pub use sqlite::SqliteStore;

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::message::{Attachment, Part, Role};

/// Errors from the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A persisted message row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: i64,
    pub chat_id: String,
    pub role: Role,
    pub content: String,
    pub parts: Vec<Part>,
    pub attachments: Vec<Attachment>,
    pub created_at: DateTime<Utc>,
}

/// Storage operations the pipeline needs.
pub trait MessageStore: Send + Sync {
    /// Append one message to a chat, returning its row id.
    fn create_message(
        &self,
        chat_id: &str,
        role: Role,
        content: &str,
        parts: &[Part],
        attachments: &[Attachment],
    ) -> Result<i64, StoreError>;

    /// All messages of a chat in insertion order.
    fn messages(&self, chat_id: &str) -> Result<Vec<StoredMessage>, StoreError>;
}

/// In-memory store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<StoredMessage>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MessageStore for MemoryStore {
    fn create_message(
        &self,
        chat_id: &str,
        role: Role,
        content: &str,
        parts: &[Part],
        attachments: &[Attachment],
    ) -> Result<i64, StoreError> {
        let mut rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        let id = rows.len() as i64 + 1;
        rows.push(StoredMessage {
            id,
            chat_id: chat_id.to_string(),
            role,
            content: content.to_string(),
            parts: parts.to_vec(),
            attachments: attachments.to_vec(),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    fn messages(&self, chat_id: &str) -> Result<Vec<StoredMessage>, StoreError> {
        let rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        Ok(rows
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_keeps_insertion_order_per_chat() {
        let store = MemoryStore::new();
        store
            .create_message("a", Role::User, "first", &[], &[])
            .unwrap();
        store
            .create_message("b", Role::User, "other chat", &[], &[])
            .unwrap();
        store
            .create_message("a", Role::Assistant, "second", &[], &[])
            .unwrap();

        let messages = store.messages("a").unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "first");
        assert_eq!(messages[1].role, Role::Assistant);
    }
}
