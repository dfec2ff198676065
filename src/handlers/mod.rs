mod admin;
mod tasks;
mod users;

use uuid::Uuid;

use crate::errors::{AppError, AppResult};

pub use admin::{change_role, delete_any_task, list_all_tasks, list_all_users};
pub use tasks::{create_task, delete_task, list_tasks, update_task};
pub use users::{current_user, login, register, update_profile};

// Ids that do not parse are reported the same way as ids that do not exist.
fn parse_id(raw: &str, not_found: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(not_found.to_string()))
}
