//! Context window assembly
//!
//! Providers never see the full history; they get the most recent
//! `max_turns` messages in original order. Dropped earlier turns stay in the
//! store but are excluded from future provider context — there is no
//! summarization of what falls off the window.

use crate::db::sessions::MessageRecord;

/// Default number of history entries sent to a provider
pub const DEFAULT_MAX_TURNS: usize = 20;

/// Take the most recent `max_turns` entries of an ascending-ordered history,
/// preserving order, roles, and content verbatim.
pub fn context_window(history: &[MessageRecord], max_turns: usize) -> &[MessageRecord] {
    let start = history.len().saturating_sub(max_turns);
    &history[start..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sessions::MessageRole;

    fn message(id: i64, content: &str) -> MessageRecord {
        MessageRecord {
            id,
            role: if id % 2 == 0 {
                MessageRole::Assistant
            } else {
                MessageRole::User
            },
            content: content.to_string(),
            created_at: id,
        }
    }

    #[test]
    fn test_short_history_returned_whole() {
        let history: Vec<_> = (1..=5).map(|i| message(i, &format!("m{i}"))).collect();
        let window = context_window(&history, DEFAULT_MAX_TURNS);
        assert_eq!(window.len(), 5);
        assert_eq!(window[0].content, "m1");
        assert_eq!(window[4].content, "m5");
    }

    #[test]
    fn test_long_history_keeps_most_recent_in_order() {
        let history: Vec<_> = (1..=30).map(|i| message(i, &format!("m{i}"))).collect();
        let window = context_window(&history, DEFAULT_MAX_TURNS);
        assert_eq!(window.len(), 20);
        assert_eq!(window[0].content, "m11");
        assert_eq!(window[19].content, "m30");
    }

    #[test]
    fn test_exact_boundary() {
        let history: Vec<_> = (1..=20).map(|i| message(i, &format!("m{i}"))).collect();
        let window = context_window(&history, 20);
        assert_eq!(window.len(), 20);
        assert_eq!(window[0].content, "m1");
    }

    #[test]
    fn test_empty_history() {
        let window = context_window(&[], 20);
        assert!(window.is_empty());
    }
}
