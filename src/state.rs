use axum::extract::FromRef;
use std::sync::Arc;

use crate::services::{PasswordHasher, TaskService, TokenService, UserStore};

// Application state shared between handlers
#[derive(Clone, FromRef)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub tasks: TaskService,
    pub tokens: Arc<TokenService>,
    pub passwords: PasswordHasher,
}

impl AppState {
    pub fn new(
        users: Arc<dyn UserStore>,
        tasks: TaskService,
        tokens: Arc<TokenService>,
        passwords: PasswordHasher,
    ) -> Self {
        Self {
            users,
            tasks,
            tokens,
            passwords,
        }
    }
}
