use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

use super::parse_id;
use crate::errors::AppResult;
use crate::models::{NewTask, Task, TaskPatch};
use crate::services::{Identity, TaskService};

pub async fn create_task(
    State(tasks): State<TaskService>,
    identity: Identity,
    payload: Result<Json<NewTask>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(fields) = payload?;
    let task = tasks.create_task(identity.user_id, fields).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn list_tasks(
    State(tasks): State<TaskService>,
    identity: Identity,
) -> AppResult<Json<Vec<Task>>> {
    Ok(Json(tasks.list_tasks(identity.user_id).await?))
}

pub async fn update_task(
    State(tasks): State<TaskService>,
    identity: Identity,
    Path(id): Path<String>,
    payload: Result<Json<TaskPatch>, JsonRejection>,
) -> AppResult<Json<Task>> {
    let Json(patch) = payload?;
    let task_id = parse_id(&id, "Task not found")?;
    let task = tasks.update_task(identity.user_id, task_id, patch).await?;
    Ok(Json(task))
}

pub async fn delete_task(
    State(tasks): State<TaskService>,
    identity: Identity,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let task_id = parse_id(&id, "Task not found")?;
    let task = tasks.delete_task(identity.user_id, task_id).await?;
    Ok(Json(json!({ "message": "Task deleted successfully", "task": task })))
}
