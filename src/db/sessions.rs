//! Session and message persistence
//!
//! Sessions own their messages: deleting a session cascades to every message
//! via the schema foreign key. Messages are append-only and totally ordered
//! within a session by `(created_at, id)`; timestamps are unix seconds, so
//! the rowid tiebreak matters for turns landing in the same second.
//!
//! The per-identity capacity cap is enforced with a conditional
//! `INSERT ... SELECT` so the count check and the insert are one atomic
//! statement rather than a check-then-act pair.

use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::error::{Result, ServiceError};

/// Maximum concurrent sessions per identity label
pub const MAX_SESSIONS_PER_USER: i64 = 3;

/// Role of a stored message; the schema CHECK constraint enforces this set
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "assistant" => MessageRole::Assistant,
            _ => MessageRole::User,
        }
    }
}

/// Session record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub user_name: String,
    pub created_at: i64,
}

/// Session annotated with its current message count (list views)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    pub user_name: String,
    pub created_at: i64,
    pub message_count: i64,
}

/// Message record; immutable once written
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageRecord {
    pub id: i64,
    pub role: MessageRole,
    pub content: String,
    pub created_at: i64,
}

/// Repository for session lifecycle and message history
#[derive(Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
}

impl SessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a session for the given identity label.
    ///
    /// Fails with `CapacityExceeded` when the label already has
    /// `MAX_SESSIONS_PER_USER` sessions; no row is inserted in that case.
    pub async fn create(&self, user_name: &str) -> Result<SessionRecord> {
        let id = Uuid::new_v4().to_string();
        let now = unix_now();

        let result = sqlx::query(
            "INSERT INTO sessions (id, user_name, created_at) \
             SELECT ?, ?, ? \
             WHERE (SELECT COUNT(*) FROM sessions WHERE user_name = ?) < ?",
        )
        .bind(&id)
        .bind(user_name)
        .bind(now)
        .bind(user_name)
        .bind(MAX_SESSIONS_PER_USER)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::CapacityExceeded);
        }

        Ok(SessionRecord {
            id,
            user_name: user_name.to_string(),
            created_at: now,
        })
    }

    /// Fetch a session by id
    pub async fn get(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        let row = sqlx::query("SELECT id, user_name, created_at FROM sessions WHERE id = ?")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| SessionRecord {
            id: r.get("id"),
            user_name: r.get("user_name"),
            created_at: r.get("created_at"),
        }))
    }

    /// Count sessions for the exact identity label
    pub async fn count_active(&self, user_name: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions WHERE user_name = ?")
            .bind(user_name)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Sessions for the exact identity label, newest first, with message counts
    pub async fn list_for_user(&self, user_name: &str) -> Result<Vec<SessionSummary>> {
        let rows = sqlx::query(
            "SELECT id, user_name, created_at, \
               (SELECT COUNT(*) FROM messages WHERE session_id = sessions.id) AS message_count \
             FROM sessions WHERE user_name = ? ORDER BY created_at DESC",
        )
        .bind(user_name)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(summary_from_row).collect())
    }

    /// All sessions, newest first, with message counts (admin view)
    pub async fn list_all(&self) -> Result<Vec<SessionSummary>> {
        let rows = sqlx::query(
            "SELECT s.id, s.user_name, s.created_at, COUNT(m.id) AS message_count \
             FROM sessions s LEFT JOIN messages m ON m.session_id = s.id \
             GROUP BY s.id ORDER BY s.created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(summary_from_row).collect())
    }

    /// Delete a session; the cascade removes its messages in the same
    /// statement. Returns false (not an error) when the id does not exist.
    pub async fn delete(&self, session_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Append a message to a session's history
    pub async fn append_message(
        &self,
        session_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<MessageRecord> {
        let now = unix_now();

        let result = sqlx::query(
            "INSERT INTO messages (session_id, role, content, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(session_id)
        .bind(role.as_str())
        .bind(content)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(MessageRecord {
            id: result.last_insert_rowid(),
            role,
            content: content.to_string(),
            created_at: now,
        })
    }

    /// Full ordered history for a session
    pub async fn history(&self, session_id: &str) -> Result<Vec<MessageRecord>> {
        let rows = sqlx::query(
            "SELECT id, role, content, created_at FROM messages \
             WHERE session_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| MessageRecord {
                id: r.get("id"),
                role: MessageRole::parse(&r.get::<String, _>("role")),
                content: r.get("content"),
                created_at: r.get("created_at"),
            })
            .collect())
    }
}

fn summary_from_row(r: &sqlx::sqlite::SqliteRow) -> SessionSummary {
    SessionSummary {
        id: r.get("id"),
        user_name: r.get("user_name"),
        created_at: r.get("created_at"),
        message_count: r.get("message_count"),
    }
}

pub(crate) fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use tempfile::TempDir;

    async fn setup() -> (TempDir, Database) {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::new(&temp_dir.path().join("test.db")).await.unwrap();
        (temp_dir, db)
    }

    #[tokio::test]
    async fn test_create_and_get_session() {
        let (_guard, db) = setup().await;
        let repo = db.sessions();

        let session = repo.create("Mali").await.unwrap();
        assert_eq!(session.user_name, "Mali");

        let fetched = repo.get(&session.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, session.id);
        assert_eq!(fetched.created_at, session.created_at);
    }

    #[tokio::test]
    async fn test_capacity_cap_per_identity() {
        let (_guard, db) = setup().await;
        let repo = db.sessions();

        for _ in 0..3 {
            repo.create("Mali").await.unwrap();
        }

        let err = repo.create("Mali").await.unwrap_err();
        assert!(matches!(err, ServiceError::CapacityExceeded));

        // The failed attempt must not have inserted anything
        assert_eq!(repo.count_active("Mali").await.unwrap(), 3);

        // The cap is per exact label; other identities are unaffected
        repo.create("Somchai").await.unwrap();
        assert_eq!(repo.count_active("Somchai").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_for_user_counts_and_order() {
        let (_guard, db) = setup().await;
        let repo = db.sessions();

        let first = repo.create("Ann").await.unwrap();
        let second = repo.create("Ann").await.unwrap();
        repo.create("Other").await.unwrap();

        repo.append_message(&first.id, MessageRole::User, "hello")
            .await
            .unwrap();
        repo.append_message(&first.id, MessageRole::Assistant, "hi")
            .await
            .unwrap();

        let sessions = repo.list_for_user("Ann").await.unwrap();
        assert_eq!(sessions.len(), 2);

        let first_row = sessions.iter().find(|s| s.id == first.id).unwrap();
        assert_eq!(first_row.message_count, 2);
        let second_row = sessions.iter().find(|s| s.id == second.id).unwrap();
        assert_eq!(second_row.message_count, 0);
    }

    #[tokio::test]
    async fn test_history_preserves_insertion_order() {
        let (_guard, db) = setup().await;
        let repo = db.sessions();
        let session = repo.create("Mali").await.unwrap();

        // Same-second inserts; the rowid tiebreak must keep insertion order
        for i in 0..5 {
            sqlx::query(
                "INSERT INTO messages (session_id, role, content, created_at) VALUES (?, 'user', ?, 100)",
            )
            .bind(&session.id)
            .bind(format!("msg-{i}"))
            .execute(db.pool())
            .await
            .unwrap();
        }

        let history = repo.history(&session.id).await.unwrap();
        let contents: Vec<&str> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["msg-0", "msg-1", "msg-2", "msg-3", "msg-4"]);
    }

    #[tokio::test]
    async fn test_delete_cascades_to_messages() {
        let (_guard, db) = setup().await;
        let repo = db.sessions();
        let session = repo.create("Mali").await.unwrap();

        repo.append_message(&session.id, MessageRole::User, "what is phishing?")
            .await
            .unwrap();
        repo.append_message(&session.id, MessageRole::Assistant, "a scam technique")
            .await
            .unwrap();

        assert!(repo.delete(&session.id).await.unwrap());

        assert!(repo.get(&session.id).await.unwrap().is_none());
        assert!(repo.history(&session.id).await.unwrap().is_empty());

        let orphans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[tokio::test]
    async fn test_delete_missing_session_reports_not_found() {
        let (_guard, db) = setup().await;
        let repo = db.sessions();

        assert!(!repo.delete("no-such-id").await.unwrap());
    }

    #[tokio::test]
    async fn test_append_message_roundtrip() {
        let (_guard, db) = setup().await;
        let repo = db.sessions();
        let session = repo.create("Mali").await.unwrap();

        let user = repo
            .append_message(&session.id, MessageRole::User, "what is phishing?")
            .await
            .unwrap();
        let reply = repo
            .append_message(&session.id, MessageRole::Assistant, "ฟิชชิงคือ...")
            .await
            .unwrap();
        assert!(reply.id > user.id);

        let history = repo.history(&session.id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, MessageRole::User);
        assert_eq!(history[0].content, "what is phishing?");
        assert_eq!(history[1].role, MessageRole::Assistant);
        assert_eq!(history[1].content, "ฟิชชิงคือ...");
    }
}
