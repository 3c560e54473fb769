//! Central event dispatch point.
//!
//! Owns the connection registry and the group membership map, and exposes one
//! notify operation per domain event kind. Delivery is best-effort and
//! fire-and-forget: an empty destination group is a silent no-op, a dead
//! connection is skipped, and nothing is retried or persisted. A client that
//! is offline at send time simply never sees the event.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::extract::ws::Message;
use dashmap::DashMap;

use crate::hub::events::{
    event_timestamp, DashboardEntityType, DashboardEventType, ServerEvent,
};
use crate::hub::groups::{self, GroupRegistry};
use crate::hub::{ConnectionId, ConnectionSender};

pub struct NotificationHub {
    connections: DashMap<ConnectionId, ConnectionSender>,
    groups: GroupRegistry,
    next_id: AtomicU64,
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationHub {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            groups: GroupRegistry::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a newly accepted transport and allocate its connection id.
    pub fn register(&self, sender: ConnectionSender) -> ConnectionId {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.connections.insert(id, sender);
        tracing::debug!(connection = %id, total = self.connections.len(), "Hub connection registered");
        id
    }

    /// Drop a closed transport: leaves every group, then forgets the sender.
    pub fn unregister(&self, conn: ConnectionId) {
        self.groups.leave_all(conn);
        self.connections.remove(&conn);
        tracing::debug!(connection = %conn, total = self.connections.len(), "Hub connection unregistered");
    }

    pub fn groups(&self) -> &GroupRegistry {
        &self.groups
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    fn encode(event: &ServerEvent) -> Option<Message> {
        match serde_json::to_string(event) {
            Ok(payload) => Some(Message::Text(payload.into())),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode server event");
                None
            }
        }
    }

    fn push(&self, conn: ConnectionId, msg: &Message) {
        if let Some(sender) = self.connections.get(&conn) {
            // A closed channel means the actor is already tearing down.
            let _ = sender.send(msg.clone());
        }
    }

    /// Send an event to every current member of one group.
    pub fn send_to_group(&self, group: &str, event: &ServerEvent) {
        let Some(msg) = Self::encode(event) else { return };
        for conn in self.groups.members(group) {
            self.push(conn, &msg);
        }
    }

    /// Send an event to the union of several groups, once per connection
    /// even when it belongs to more than one of them.
    pub fn send_to_groups(&self, destinations: &[&str], event: &ServerEvent) {
        let Some(msg) = Self::encode(event) else { return };
        let mut seen: HashSet<ConnectionId> = HashSet::new();
        for group in destinations {
            for conn in self.groups.members(group) {
                if seen.insert(conn) {
                    self.push(conn, &msg);
                }
            }
        }
    }

    /// Send an event to every live connection, grouped or not.
    pub fn broadcast_all(&self, event: &ServerEvent) {
        let Some(msg) = Self::encode(event) else { return };
        for entry in self.connections.iter() {
            let _ = entry.value().send(msg.clone());
        }
    }

    // --- One operation per domain event kind ---

    pub fn notify_new_account(&self, account_name: &str) {
        self.send_to_group(
            groups::GROUP_STAFF,
            &ServerEvent::ReceiveNewAccountNotification {
                message: format!("Admin has added a new account: {}", account_name),
            },
        );
    }

    pub fn notify_account_deactivated(&self, account_id: i64) {
        self.broadcast_all(&ServerEvent::AccountDeactivated {
            account_id: account_id.to_string(),
        });
    }

    pub fn force_logout_account(&self, account_id: i64, reason: Option<&str>) {
        self.send_to_group(
            &groups::account_group(&account_id.to_string()),
            &ServerEvent::ForceLogout {
                reason: reason.unwrap_or("account_deleted").to_string(),
            },
        );
    }

    /// Category create/update/delete all signal the same way: a toast for
    /// Staff plus a list-reload signal for every connection.
    pub fn notify_category_changed(&self, message: &str) {
        self.send_to_group(
            groups::GROUP_STAFF,
            &ServerEvent::ReceiveCreateCategoryNotification {
                message: message.to_string(),
            },
        );
        self.broadcast_all(&ServerEvent::ReloadCategoryList);
    }

    pub fn notify_new_article(&self, author: &str, title: &str) {
        self.broadcast_all(&ServerEvent::NewArticlePublished {
            author: author.to_string(),
            title: title.to_string(),
        });
    }

    pub fn notify_article_update(&self, article_id: &str, title: &str, content: &str) {
        self.send_to_group(
            &groups::article_group(article_id),
            &ServerEvent::ArticleUpdated {
                article_id: article_id.to_string(),
                title: title.to_string(),
                content: content.to_string(),
            },
        );
        self.send_to_groups(
            &[groups::GROUP_ADMIN, groups::GROUP_STAFF],
            &ServerEvent::UpdateNewsArticle {
                article_id: article_id.to_string(),
            },
        );
    }

    pub fn notify_article_deleted(&self, article_id: &str, title: &str) {
        self.broadcast_all(&ServerEvent::ArticleDeleted {
            article_id: article_id.to_string(),
            title: title.to_string(),
        });
    }

    pub fn notify_tag_created(&self, tag_id: i64, name: &str, note: &str) {
        self.send_to_roles(ServerEvent::TagCreated {
            tag_id,
            name: name.to_string(),
            note: note.to_string(),
        });
    }

    pub fn notify_tag_updated(&self, tag_id: i64, name: &str, note: &str) {
        self.send_to_roles(ServerEvent::TagUpdated {
            tag_id,
            name: name.to_string(),
            note: note.to_string(),
        });
    }

    pub fn notify_tag_deleted(&self, tag_id: i64, name: &str, note: &str) {
        self.send_to_roles(ServerEvent::TagDeleted {
            tag_id,
            name: name.to_string(),
            note: note.to_string(),
        });
    }

    fn send_to_roles(&self, event: ServerEvent) {
        self.send_to_groups(
            &[groups::GROUP_ADMIN, groups::GROUP_STAFF, groups::GROUP_LECTURER],
            &event,
        );
    }

    pub fn notify_comment(&self, article_id: &str, comment_id: i64, user: &str, message: &str) {
        self.send_to_group(
            &groups::article_group(article_id),
            &ServerEvent::ReceiveComment {
                comment_id,
                user: user.to_string(),
                message: message.to_string(),
                timestamp: event_timestamp(),
            },
        );
    }

    /// Exactly two dispatches: a moderation notice to the author's account
    /// group and a removal signal to the article's viewers.
    pub fn notify_comment_deleted(
        &self,
        author_account_id: i64,
        article_id: &str,
        comment_id: i64,
        deleted_by: &str,
    ) {
        self.send_to_group(
            &groups::account_group(&author_account_id.to_string()),
            &ServerEvent::CommentDeleted {
                comment_id,
                article_id: article_id.to_string(),
                reason: format!(
                    "Your comment was removed by {} for violating community guidelines",
                    deleted_by
                ),
                deleted_by: deleted_by.to_string(),
                timestamp: event_timestamp(),
            },
        );
        self.send_to_group(
            &groups::article_group(article_id),
            &ServerEvent::CommentRemovedFromArticle {
                comment_id,
                message: "A comment was removed by moderator".to_string(),
            },
        );
    }

    pub fn notify_dashboard_update(
        &self,
        event_type: DashboardEventType,
        entity_type: DashboardEntityType,
        message: &str,
    ) {
        self.send_to_group(
            groups::GROUP_DASHBOARD,
            &ServerEvent::DashboardUpdate {
                event_type,
                entity_type,
                message: message.to_string(),
                timestamp: event_timestamp(),
            },
        );
    }

    pub fn notify_dashboard_counts_changed(&self) {
        self.send_to_group(groups::GROUP_ADMIN, &ServerEvent::UpdateDashboardCounts);
    }

    pub fn notify_toast(&self, message: &str) {
        self.broadcast_all(&ServerEvent::ReceiveToast {
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn connect(hub: &NotificationHub) -> (ConnectionId, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (hub.register(tx), rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Message>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            if let Message::Text(text) = msg {
                events.push(serde_json::from_str(&text).unwrap());
            }
        }
        events
    }

    #[test]
    fn broadcast_to_empty_group_is_silent_noop() {
        let hub = NotificationHub::new();
        hub.send_to_group("article_999", &ServerEvent::ReloadCategoryList);
    }

    #[test]
    fn article_update_reaches_viewers_and_staff_only() {
        let hub = NotificationHub::new();
        let (viewer, mut viewer_rx) = connect(&hub);
        let (bystander, mut bystander_rx) = connect(&hub);
        hub.groups().join_article(viewer, "42");
        let _ = bystander;

        hub.notify_article_update("42", "Title", "Body");

        let got = drain(&mut viewer_rx);
        assert_eq!(got.len(), 1);
        assert!(matches!(&got[0], ServerEvent::ArticleUpdated { article_id, .. } if article_id == "42"));
        assert!(drain(&mut bystander_rx).is_empty());
    }

    #[test]
    fn connection_in_two_role_groups_gets_tag_event_once() {
        let hub = NotificationHub::new();
        let (conn, mut rx) = connect(&hub);
        hub.groups().join_role(conn, 1);
        hub.groups().join_role(conn, 2);

        hub.notify_tag_created(3, "rust", "systems");

        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[test]
    fn comment_deletion_is_exactly_two_dispatches() {
        let hub = NotificationHub::new();
        let (author, mut author_rx) = connect(&hub);
        let (viewer, mut viewer_rx) = connect(&hub);
        let (admin, mut admin_rx) = connect(&hub);
        hub.groups().join_account(author, "7");
        hub.groups().join_article(viewer, "42");
        hub.groups().join_role(admin, 0);
        hub.groups().join_dashboard(admin);

        hub.notify_comment_deleted(7, "42", 5, "Root");

        let to_author = drain(&mut author_rx);
        assert_eq!(to_author.len(), 1);
        assert!(matches!(&to_author[0], ServerEvent::CommentDeleted { comment_id: 5, .. }));

        let to_viewer = drain(&mut viewer_rx);
        assert_eq!(to_viewer.len(), 1);
        assert!(matches!(&to_viewer[0], ServerEvent::CommentRemovedFromArticle { comment_id: 5, .. }));

        // Admin role and dashboard groups are not destinations for this event.
        assert!(drain(&mut admin_rx).is_empty());
    }

    #[test]
    fn dashboard_update_skips_admins_outside_the_dashboard_group() {
        let hub = NotificationHub::new();
        let (watching, mut watching_rx) = connect(&hub);
        let (admin_elsewhere, mut elsewhere_rx) = connect(&hub);
        hub.groups().join_dashboard(watching);
        hub.groups().join_role(admin_elsewhere, 0);

        hub.notify_dashboard_update(
            DashboardEventType::Delete,
            DashboardEntityType::Category,
            "Category removed",
        );

        assert_eq!(drain(&mut watching_rx).len(), 1);
        assert!(drain(&mut elsewhere_rx).is_empty());
    }

    #[test]
    fn unregistered_connection_receives_nothing_afterwards() {
        let hub = NotificationHub::new();
        let (conn, mut rx) = connect(&hub);
        hub.groups().join_account(conn, "7");
        hub.unregister(conn);

        hub.force_logout_account(7, None);
        hub.notify_toast("hello");

        assert!(drain(&mut rx).is_empty());
        assert_eq!(hub.connection_count(), 0);
    }

    #[test]
    fn stale_connection_is_skipped_mid_broadcast() {
        let hub = NotificationHub::new();
        let (alive, mut alive_rx) = connect(&hub);
        let (stale, stale_rx) = connect(&hub);
        hub.groups().join_article(alive, "1");
        hub.groups().join_article(stale, "1");
        // Receiver dropped without unregistering: the send fails and is ignored.
        drop(stale_rx);

        hub.notify_article_update("1", "T", "C");

        assert_eq!(drain(&mut alive_rx).len(), 1);
    }
}
