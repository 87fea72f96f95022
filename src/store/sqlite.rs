//! SQLite-backed message persistence.

use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::debug;

use crate::message::{Attachment, Part, Role};

use super::{MessageStore, StoreError, StoredMessage};

/// SQLite store. The connection lives behind a mutex; writes are short
/// and the pipeline persists messages one at a time.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl SqliteStore {
    /// Open the store at the default location.
    pub fn open() -> Result<Self, StoreError> {
        Self::open_at(Self::default_path())
    }

    /// Open the store at a specific path, creating parent directories and
    /// the schema as needed.
    pub fn open_at(path: PathBuf) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS messages (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                chat_id     TEXT NOT NULL,
                role        TEXT NOT NULL,
                content     TEXT NOT NULL,
                parts       TEXT NOT NULL,
                attachments TEXT NOT NULL,
                created_at  INTEGER NOT NULL DEFAULT (unixepoch())
            );
            CREATE INDEX IF NOT EXISTS idx_messages_chat ON messages(chat_id, id);",
        )?;

        debug!(path = %path.display(), "opened message store");
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".local/share")))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ladle")
            .join("ladle.db")
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl MessageStore for SqliteStore {
    fn create_message(
        &self,
        chat_id: &str,
        role: Role,
        content: &str,
        parts: &[Part],
        attachments: &[Attachment],
    ) -> Result<i64, StoreError> {
        let parts_json = serde_json::to_string(parts)?;
        let attachments_json = serde_json::to_string(attachments)?;
        let role_json = serde_json::to_value(role)?;
        let role_str = role_json.as_str().unwrap_or("user").to_string();

        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        conn.execute(
            "INSERT INTO messages (chat_id, role, content, parts, attachments, created_at)
             VALUES (?, ?, ?, ?, ?, unixepoch())",
            rusqlite::params![chat_id, role_str, content, parts_json, attachments_json],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn messages(&self, chat_id: &str) -> Result<Vec<StoredMessage>, StoreError> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let mut stmt = conn.prepare(
            "SELECT id, chat_id, role, content, parts, attachments, created_at
             FROM messages
             WHERE chat_id = ?
             ORDER BY id",
        )?;

        let rows = stmt.query_map([chat_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, i64>(6)?,
            ))
        })?;

        let mut messages = Vec::new();
        for row in rows {
            let (id, chat_id, role, content, parts, attachments, created_at) = row?;
            messages.push(StoredMessage {
                id,
                chat_id,
                role: serde_json::from_value(serde_json::Value::String(role))?,
                content,
                parts: serde_json::from_str(&parts)?,
                attachments: serde_json::from_str(&attachments)?,
                created_at: DateTime::<Utc>::from_timestamp(created_at, 0)
                    .unwrap_or_else(Utc::now),
            });
        }
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ToolInvocation;
    use serde_json::json;

    fn temp_store() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open_at(dir.path().join("test.db")).unwrap();
        (dir, store)
    }

    #[test]
    fn round_trips_message_with_parts() {
        let (_dir, store) = temp_store();

        let mut invocation = ToolInvocation::call(
            "call_1",
            "displayWeather",
            json!({"location": "Bangalore"}),
        );
        invocation.resolve(json!({"current": {"temp_c": 28.0}}));
        let parts = vec![
            Part::text("Here is the weather."),
            Part::tool_invocation(invocation),
        ];

        let id = store
            .create_message("chat-1", Role::Assistant, "Here is the weather.", &parts, &[])
            .unwrap();
        assert!(id > 0);

        let messages = store.messages("chat-1").unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::Assistant);
        assert_eq!(messages[0].parts.len(), 2);
        let invocation = messages[0].parts[1].as_tool_invocation().unwrap();
        assert_eq!(invocation.tool_name, "displayWeather");
        assert_eq!(invocation.result.as_ref().unwrap()["current"]["temp_c"], 28.0);
    }

    #[test]
    fn round_trips_attachments() {
        let (_dir, store) = temp_store();
        let attachments = vec![Attachment {
            name: "notes.txt".into(),
            content_type: "text/plain".into(),
            size: 5,
            url: "data:text/plain;base64,aGVsbG8=".into(),
            text_content: Some("hello".into()),
        }];

        store
            .create_message("chat-1", Role::User, "see attached", &[], &attachments)
            .unwrap();

        let messages = store.messages("chat-1").unwrap();
        assert_eq!(messages[0].attachments.len(), 1);
        assert_eq!(messages[0].attachments[0].name, "notes.txt");
        assert_eq!(
            messages[0].attachments[0].text_content.as_deref(),
            Some("hello")
        );
    }

    #[test]
    fn chats_are_isolated() {
        let (_dir, store) = temp_store();
        store
            .create_message("a", Role::User, "in a", &[], &[])
            .unwrap();
        store
            .create_message("b", Role::User, "in b", &[], &[])
            .unwrap();

        assert_eq!(store.messages("a").unwrap().len(), 1);
        assert_eq!(store.messages("b").unwrap().len(), 1);
        assert!(store.messages("c").unwrap().is_empty());
    }

    #[test]
    fn reopening_preserves_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("persist.db");

        {
            let store = SqliteStore::open_at(path.clone()).unwrap();
            store
                .create_message("chat-1", Role::User, "survives", &[], &[])
                .unwrap();
        }

        let store = SqliteStore::open_at(path).unwrap();
        let messages = store.messages("chat-1").unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "survives");
    }
}
