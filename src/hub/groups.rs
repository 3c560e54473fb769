//! Group membership registry: maps broadcast group names to member connections.
//!
//! Membership is many-to-many and purely in-memory — it is rebuilt from
//! scratch by clients after every reconnect. All operations are idempotent:
//! joining twice or leaving a group never joined is a no-op, not an error.

use std::collections::HashSet;

use dashmap::DashMap;

use crate::hub::ConnectionId;

pub const GROUP_ADMIN: &str = "Admin";
pub const GROUP_STAFF: &str = "Staff";
pub const GROUP_LECTURER: &str = "Lecturer";
pub const GROUP_DASHBOARD: &str = "admin_dashboard";

/// Map a numeric role code to its role group name.
/// Unmapped codes resolve to no group rather than failing.
pub fn role_group(role: i32) -> Option<&'static str> {
    match role {
        0 => Some(GROUP_ADMIN),
        1 => Some(GROUP_STAFF),
        2 => Some(GROUP_LECTURER),
        _ => None,
    }
}

/// Group name targeting every connection of a single account.
pub fn account_group(account_id: &str) -> String {
    format!("account_{}", account_id)
}

/// Group name scoped to viewers of one article page.
pub fn article_group(article_id: &str) -> String {
    format!("article_{}", article_id)
}

/// Concurrency-safe group membership map.
///
/// Two indexes are kept: group name -> members for broadcast resolution, and
/// connection -> joined groups so disconnect cleanup only touches the groups
/// the connection was actually in. No authorization is enforced here —
/// callers are trusted to gate who may join which group.
#[derive(Default)]
pub struct GroupRegistry {
    groups: DashMap<String, HashSet<ConnectionId>>,
    memberships: DashMap<ConnectionId, HashSet<String>>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&self, conn: ConnectionId, group: &str) {
        self.groups
            .entry(group.to_string())
            .or_default()
            .insert(conn);
        self.memberships
            .entry(conn)
            .or_default()
            .insert(group.to_string());
    }

    pub fn leave(&self, conn: ConnectionId, group: &str) {
        let now_empty = match self.groups.get_mut(group) {
            Some(mut members) => {
                members.remove(&conn);
                members.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.groups.remove_if(group, |_, members| members.is_empty());
        }
        if let Some(mut joined) = self.memberships.get_mut(&conn) {
            joined.remove(group);
        }
    }

    /// Remove a connection from every group it was a member of.
    /// Called from the disconnect path; silent if the connection joined nothing.
    pub fn leave_all(&self, conn: ConnectionId) {
        let Some((_, joined)) = self.memberships.remove(&conn) else {
            return;
        };
        for group in joined {
            let now_empty = match self.groups.get_mut(&group) {
                Some(mut members) => {
                    members.remove(&conn);
                    members.is_empty()
                }
                None => false,
            };
            if now_empty {
                self.groups
                    .remove_if(&group, |_, members| members.is_empty());
            }
        }
    }

    /// Join the role group for a role code. Returns the resolved group name,
    /// or None for unmapped codes (the call is then a no-op).
    pub fn join_role(&self, conn: ConnectionId, role: i32) -> Option<&'static str> {
        let group = role_group(role)?;
        self.join(conn, group);
        Some(group)
    }

    pub fn leave_role(&self, conn: ConnectionId, role: i32) {
        if let Some(group) = role_group(role) {
            self.leave(conn, group);
        }
    }

    pub fn join_account(&self, conn: ConnectionId, account_id: &str) -> String {
        let group = account_group(account_id);
        self.join(conn, &group);
        group
    }

    pub fn join_article(&self, conn: ConnectionId, article_id: &str) {
        self.join(conn, &article_group(article_id));
    }

    pub fn leave_article(&self, conn: ConnectionId, article_id: &str) {
        self.leave(conn, &article_group(article_id));
    }

    pub fn join_dashboard(&self, conn: ConnectionId) {
        self.join(conn, GROUP_DASHBOARD);
    }

    pub fn leave_dashboard(&self, conn: ConnectionId) {
        self.leave(conn, GROUP_DASHBOARD);
    }

    /// Snapshot of a group's current members. Cloned out so callers never
    /// hold a shard lock while pushing to connection channels.
    pub fn members(&self, group: &str) -> Vec<ConnectionId> {
        self.groups
            .get(group)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Groups a connection currently belongs to.
    pub fn groups_of(&self, conn: ConnectionId) -> Vec<String> {
        self.memberships
            .get(&conn)
            .map(|joined| joined.iter().cloned().collect())
            .unwrap_or_default()
    }
}
