//! Admin log search
//!
//! Composes the optional filters (identity substring, inclusive date range,
//! message content substring) into a single AND query over sessions. When a
//! content filter is present the candidate set is first narrowed to sessions
//! containing at least one matching message. Results carry each session's
//! full ordered message list and are capped at 50 rows, newest session first.

use serde::Serialize;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use crate::db::sessions::{MessageRecord, MessageRole};
use crate::error::Result;

/// Hard cap on search result rows regardless of filter
const MAX_RESULTS: i64 = 50;

/// Optional, independently combinable search filters
#[derive(Debug, Default, Clone)]
pub struct SearchFilter {
    /// Case-insensitive substring match on the identity label
    pub user_name: Option<String>,
    /// Inclusive lower bound on session creation time (unix seconds)
    pub date_from: Option<i64>,
    /// Inclusive upper bound on session creation time (unix seconds)
    pub date_to: Option<i64>,
    /// Case-insensitive substring match on any message's content
    pub content: Option<String>,
}

/// One search result: a session plus its complete ordered history
#[derive(Debug, Clone, Serialize)]
pub struct SearchRow {
    pub id: String,
    pub user_name: String,
    pub created_at: i64,
    pub message_count: i64,
    pub messages: Vec<MessageRecord>,
}

/// Search handle over the conversation store
#[derive(Clone)]
pub struct LogSearch {
    pool: SqlitePool,
}

impl LogSearch {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Run a filtered search; present filters combine with logical AND.
    pub async fn search(&self, filter: &SearchFilter) -> Result<Vec<SearchRow>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT s.id, s.user_name, s.created_at, COUNT(m.id) AS message_count \
             FROM sessions s LEFT JOIN messages m ON m.session_id = s.id",
        );

        let mut first = true;
        let mut sep = |qb: &mut QueryBuilder<Sqlite>| {
            qb.push(if std::mem::take(&mut first) {
                " WHERE "
            } else {
                " AND "
            });
        };

        if let Some(content) = &filter.content {
            sep(&mut qb);
            qb.push("s.id IN (SELECT DISTINCT session_id FROM messages WHERE LOWER(content) LIKE ");
            qb.push_bind(like_pattern(content));
            qb.push(")");
        }

        if let Some(user_name) = &filter.user_name {
            sep(&mut qb);
            qb.push("LOWER(s.user_name) LIKE ");
            qb.push_bind(like_pattern(user_name));
        }

        if let Some(from) = filter.date_from {
            sep(&mut qb);
            qb.push("s.created_at >= ");
            qb.push_bind(from);
        }

        if let Some(to) = filter.date_to {
            sep(&mut qb);
            qb.push("s.created_at <= ");
            qb.push_bind(to);
        }

        qb.push(" GROUP BY s.id ORDER BY s.created_at DESC LIMIT ");
        qb.push_bind(MAX_RESULTS);

        let rows = qb.build().fetch_all(&self.pool).await?;

        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.get("id");
            let messages = self.messages_for(&id).await?;
            results.push(SearchRow {
                id,
                user_name: row.get("user_name"),
                created_at: row.get("created_at"),
                message_count: row.get("message_count"),
                messages,
            });
        }

        Ok(results)
    }

    async fn messages_for(&self, session_id: &str) -> Result<Vec<MessageRecord>> {
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
                role: match r.get::<String, _>("role").as_str() {
                    "assistant" => MessageRole::Assistant,
                    _ => MessageRole::User,
                },
                content: r.get("content"),
                created_at: r.get("created_at"),
            })
            .collect())
    }
}

fn like_pattern(needle: &str) -> String {
    format!("%{}%", needle.trim().to_lowercase())
}
