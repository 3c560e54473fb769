pub mod login;
pub mod middleware;
pub mod session;

/// Role codes as stored on accounts and carried in session claims.
pub const ROLE_ADMIN: i32 = 0;
pub const ROLE_STAFF: i32 = 1;
pub const ROLE_LECTURER: i32 = 2;
