pub mod actor;
pub mod events;
pub mod groups;
pub mod handler;
pub mod protocol;
pub mod router;

use std::fmt;

use tokio::sync::mpsc;

/// Opaque identifier for one live hub connection.
/// Allocated on transport accept, dead once the transport closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Type alias for the sender half of a connection's outbound channel.
/// Other parts of the system can clone this to push messages to a specific client.
pub type ConnectionSender = mpsc::UnboundedSender<axum::extract::ws::Message>;
