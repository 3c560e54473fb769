//! Server-pushed event types.
//!
//! One variant per domain event kind; the variant name is the event name on
//! the wire (`{"event": "ReceiveComment", ...}`). Events are transient —
//! created at the moment of a committed mutation, dead after the delivery
//! attempt. Nothing here is queued, retried, or persisted.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DashboardEventType {
    Create,
    Update,
    Delete,
    Publish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DashboardEntityType {
    Article,
    Account,
    Category,
    Comment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    ReceiveNewAccountNotification {
        message: String,
    },
    AccountDeactivated {
        account_id: String,
    },
    ForceLogout {
        reason: String,
    },
    ReceiveCreateCategoryNotification {
        message: String,
    },
    ReloadCategoryList,
    NewArticlePublished {
        author: String,
        title: String,
    },
    /// Sent to viewers of the updated article's page.
    ArticleUpdated {
        article_id: String,
        title: String,
        content: String,
    },
    /// List-reload signal for Admin/Staff article views.
    UpdateNewsArticle {
        article_id: String,
    },
    ArticleDeleted {
        article_id: String,
        title: String,
    },
    TagCreated {
        tag_id: i64,
        name: String,
        note: String,
    },
    TagUpdated {
        tag_id: i64,
        name: String,
        note: String,
    },
    TagDeleted {
        tag_id: i64,
        name: String,
        note: String,
    },
    ReceiveComment {
        comment_id: i64,
        user: String,
        message: String,
        timestamp: String,
    },
    /// Moderation notice targeted at the comment's author.
    CommentDeleted {
        comment_id: i64,
        article_id: String,
        reason: String,
        deleted_by: String,
        timestamp: String,
    },
    /// Removal signal for everyone else on the article page.
    CommentRemovedFromArticle {
        comment_id: i64,
        message: String,
    },
    DashboardUpdate {
        event_type: DashboardEventType,
        entity_type: DashboardEntityType,
        message: String,
        timestamp: String,
    },
    /// Signal only — the client re-fetches the aggregate.
    UpdateDashboardCounts,
    ReceiveToast {
        message: String,
    },
}

/// Timestamp format used in user-facing event payloads.
pub fn event_timestamp() -> String {
    chrono::Local::now().format("%H:%M:%S %d/%m/%Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_tagged_by_wire_name() {
        let event = ServerEvent::ReceiveComment {
            comment_id: 5,
            user: "alice".to_string(),
            message: "hi".to_string(),
            timestamp: "10:00:00 01/02/2026".to_string(),
        };
        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&event).unwrap()).unwrap();
        assert_eq!(json["event"], "ReceiveComment");
        assert_eq!(json["commentId"], 5);
        assert_eq!(json["user"], "alice");
    }

    #[test]
    fn signal_only_events_carry_no_payload() {
        let json = serde_json::to_string(&ServerEvent::UpdateDashboardCounts).unwrap();
        assert_eq!(json, r#"{"event":"UpdateDashboardCounts"}"#);
    }

    #[test]
    fn dashboard_update_uses_lowercase_kind_tags() {
        let event = ServerEvent::DashboardUpdate {
            event_type: DashboardEventType::Delete,
            entity_type: DashboardEntityType::Category,
            message: "Category removed".to_string(),
            timestamp: event_timestamp(),
        };
        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&event).unwrap()).unwrap();
        assert_eq!(json["eventType"], "delete");
        assert_eq!(json["entityType"], "category");
    }

    #[test]
    fn events_round_trip_through_json() {
        let event = ServerEvent::ArticleUpdated {
            article_id: "42".to_string(),
            title: "Title".to_string(),
            content: "Body".to_string(),
        };
        let back: ServerEvent =
            serde_json::from_str(&serde_json::to_string(&event).unwrap()).unwrap();
        assert_eq!(back, event);
    }
}
