mod auth;

pub use auth::{require_auth, role_gate, AllowedRoles};
