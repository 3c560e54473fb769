use std::sync::Arc;

use crate::auth::session::SessionStore;
use crate::db::DbPool;
use crate::hub::router::NotificationHub;

/// Shared application state passed to all handlers via axum State extractor.
#[derive(Clone)]
pub struct AppState {
    /// SQLite connection wrapped in Arc<Mutex>
    pub db: DbPool,
    /// In-memory session store (opaque token -> claims)
    pub sessions: Arc<SessionStore>,
    /// Notification hub: connection registry, group map, event router
    pub hub: Arc<NotificationHub>,
}

impl AppState {
    pub fn new(db: DbPool) -> Self {
        Self {
            db,
            sessions: Arc::new(SessionStore::new()),
            hub: Arc::new(NotificationHub::new()),
        }
    }
}
