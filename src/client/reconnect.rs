//! Reconnection state machine pieces, kept pure so they are testable
//! without a transport.

use std::time::Duration;

use crate::hub::protocol::ClientRequest;

/// Connection lifecycle of a hub client.
///
/// `Disconnected → Connecting → Connected ⇄ Reconnecting`, with `GaveUp` as
/// the terminal state once the retry schedule is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HubClientState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    GaveUp,
}

/// Bounded retry schedule: one delay per attempt, then give up.
/// Mirrors the transport's default automatic-reconnect curve.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    delays: Vec<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delays: [0, 2, 10, 30]
                .into_iter()
                .map(Duration::from_secs)
                .collect(),
        }
    }
}

impl RetryPolicy {
    pub fn new(delays: Vec<Duration>) -> Self {
        Self { delays }
    }

    /// Delay before the given (0-based) attempt, or None once exhausted.
    pub fn delay_for(&self, attempt: usize) -> Option<Duration> {
        self.delays.get(attempt).copied()
    }
}

/// The group memberships this client should hold while connected.
/// Re-registered in full after every (re)connect — server-side membership is
/// never assumed to survive a transport drop.
#[derive(Debug, Clone, Default)]
pub struct Memberships {
    /// Role code for the role group (from the locally known login).
    pub role: Option<i32>,
    /// Account id for the per-account group.
    pub account_id: Option<String>,
    /// Article id when the current page is an article view.
    pub article_id: Option<String>,
    /// Whether the current page is the admin dashboard.
    pub dashboard: bool,
}

impl Memberships {
    /// Registration sequence to run after a successful handshake.
    pub fn registration_requests(&self) -> Vec<ClientRequest> {
        let mut requests = Vec::new();
        if let Some(role) = self.role {
            requests.push(ClientRequest::RegisterUserRole { role });
        }
        if let Some(account_id) = &self.account_id {
            requests.push(ClientRequest::RegisterConnection {
                account_id: account_id.clone(),
            });
        }
        if let Some(article_id) = &self.article_id {
            requests.push(ClientRequest::JoinArticleGroup {
                article_id: article_id.clone(),
            });
        }
        if self.dashboard {
            requests.push(ClientRequest::JoinDashboardGroup);
        }
        requests
    }

    /// Best-effort leave calls for page-scoped groups on page exit.
    /// Advisory only — the server's disconnect cleanup is authoritative.
    pub fn leave_requests(&self) -> Vec<ClientRequest> {
        let mut requests = Vec::new();
        if let Some(article_id) = &self.article_id {
            requests.push(ClientRequest::LeaveArticleGroup {
                article_id: article_id.clone(),
            });
        }
        if self.dashboard {
            requests.push(ClientRequest::LeaveDashboardGroup);
        }
        requests
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_schedule_is_bounded() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Some(Duration::from_secs(0)));
        assert_eq!(policy.delay_for(3), Some(Duration::from_secs(30)));
        assert_eq!(policy.delay_for(4), None);
    }

    #[test]
    fn full_membership_set_registers_in_order() {
        let memberships = Memberships {
            role: Some(1),
            account_id: Some("7".to_string()),
            article_id: Some("42".to_string()),
            dashboard: true,
        };
        let requests = memberships.registration_requests();
        assert_eq!(requests.len(), 4);
        assert!(matches!(requests[0], ClientRequest::RegisterUserRole { role: 1 }));
        assert!(matches!(&requests[1], ClientRequest::RegisterConnection { account_id } if account_id == "7"));
        assert!(matches!(&requests[2], ClientRequest::JoinArticleGroup { article_id } if article_id == "42"));
        assert!(matches!(requests[3], ClientRequest::JoinDashboardGroup));
    }

    #[test]
    fn anonymous_client_registers_nothing() {
        assert!(Memberships::default().registration_requests().is_empty());
        assert!(Memberships::default().leave_requests().is_empty());
    }

    #[test]
    fn only_page_scoped_groups_are_left_on_exit() {
        let memberships = Memberships {
            role: Some(0),
            account_id: Some("1".to_string()),
            article_id: Some("42".to_string()),
            dashboard: true,
        };
        let requests = memberships.leave_requests();
        assert_eq!(requests.len(), 2);
        assert!(matches!(&requests[0], ClientRequest::LeaveArticleGroup { article_id } if article_id == "42"));
        assert!(matches!(requests[1], ClientRequest::LeaveDashboardGroup));
    }
}
