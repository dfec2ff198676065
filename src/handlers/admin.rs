use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::{IntoResponse, Json},
};
use serde_json::json;
use std::sync::Arc;

use super::parse_id;
use crate::errors::{AppError, AppResult};
use crate::models::{ChangeRoleForm, Role, TaskWithOwner, UserProfile};
use crate::services::{Identity, TaskService, UserStore};

pub async fn list_all_users(
    State(users): State<Arc<dyn UserStore>>,
) -> AppResult<Json<Vec<UserProfile>>> {
    let users = users.list_users().await?;
    Ok(Json(users.iter().map(UserProfile::from).collect()))
}

pub async fn change_role(
    State(users): State<Arc<dyn UserStore>>,
    identity: Identity,
    Path(id): Path<String>,
    payload: Result<Json<ChangeRoleForm>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(form) = payload?;
    let role: Role = form.role.parse().map_err(AppError::InvalidRole)?;
    let user_id = parse_id(&id, "User not found")?;

    let user = users
        .set_role(user_id, role)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    tracing::info!(
        "Admin {} changed role of user {} to {}",
        identity.user_id,
        user.id,
        role
    );
    Ok(Json(json!({
        "message": "User role updated",
        "user": {
            "id": user.id,
            "username": user.username,
            "email": user.email,
            "role": user.role,
        },
    })))
}

pub async fn list_all_tasks(
    State(users): State<Arc<dyn UserStore>>,
    State(tasks): State<TaskService>,
) -> AppResult<Json<Vec<TaskWithOwner>>> {
    let users = users.list_users().await?;
    Ok(Json(tasks.list_all_tasks(&users).await?))
}

pub async fn delete_any_task(
    State(tasks): State<TaskService>,
    identity: Identity,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let task_id = parse_id(&id, "Task not found")?;
    let task = tasks.delete_any_task(task_id).await?;
    tracing::info!("Admin {} deleted task {}", identity.user_id, task.id);
    Ok(Json(json!({ "message": "Task deleted successfully", "task": task })))
}
