use async_trait::async_trait;
use redis::{aio::Connection, AsyncCommands, Client};
use serde::de::DeserializeOwned;
use std::{fmt, sync::Arc};
use uuid::Uuid;

use crate::errors::AppResult;
use crate::models::{Role, Task, TaskPatch, User};
use crate::services::store::{duplicate_email, TaskStore, UserStore};

// Key layout, each optionally prefixed with `{namespace}:`:
//   user:{id}           JSON user record
//   user_email:{email}  id of the user owning that email (claimed with SETNX)
//   users               sorted set of user ids scored by creation time
//   task:{id}           JSON task record
//   user_tasks:{owner}  sorted set of the owner's task ids scored by creation time
//   all_tasks           sorted set of every task id
const USERS_KEY: &str = "users";
const ALL_TASKS_KEY: &str = "all_tasks";

/// Sorted-set score: creation time in microseconds, exact in an `f64`.
fn score(created_at: chrono::DateTime<chrono::Utc>) -> i64 {
    created_at.timestamp_micros()
}

/// Redis-backed system of record for users and tasks.
#[derive(Clone)]
pub struct RedisService {
    client: Arc<Client>,
    namespace: Option<String>,
}

impl RedisService {
    pub fn new(client: Arc<Client>) -> Self {
        Self {
            client,
            namespace: None,
        }
    }

    /// Prefixes every key with `{namespace}:`, so several deployments can
    /// share one database.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        self.namespace = (!namespace.is_empty()).then_some(namespace);
        self
    }

    fn key(&self, key: impl fmt::Display) -> String {
        match &self.namespace {
            Some(namespace) => format!("{}:{}", namespace, key),
            None => key.to_string(),
        }
    }

    fn user_key(&self, id: impl fmt::Display) -> String {
        self.key(format_args!("user:{}", id))
    }

    fn email_key(&self, email: &str) -> String {
        self.key(format_args!("user_email:{}", email))
    }

    fn task_key(&self, id: impl fmt::Display) -> String {
        self.key(format_args!("task:{}", id))
    }

    fn owner_tasks_key(&self, owner: Uuid) -> String {
        self.key(format_args!("user_tasks:{}", owner))
    }

    async fn connection(&self) -> AppResult<Connection> {
        Ok(self.client.get_async_connection().await?)
    }

    async fn get_json<T: DeserializeOwned>(conn: &mut Connection, key: &str) -> AppResult<Option<T>> {
        let data: Option<String> = conn.get(key).await?;
        Ok(match data {
            Some(data) => Some(serde_json::from_str(&data)?),
            None => None,
        })
    }

    async fn load_many<T: DeserializeOwned>(conn: &mut Connection, keys: Vec<String>) -> AppResult<Vec<T>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let raw: Vec<Option<String>> = redis::cmd("MGET").arg(keys).query_async(conn).await?;
        raw.into_iter()
            .flatten()
            .map(|data| serde_json::from_str(&data).map_err(Into::into))
            .collect()
    }

    async fn modify_user<F>(&self, id: Uuid, change: F) -> AppResult<Option<User>>
    where
        F: FnOnce(&mut User) + Send,
    {
        let mut conn = self.connection().await?;
        let key = self.user_key(id);
        let Some(mut user) = Self::get_json::<User>(&mut conn, &key).await? else {
            return Ok(None);
        };
        change(&mut user);
        conn.set::<_, _, ()>(key, serde_json::to_string(&user)?).await?;
        Ok(Some(user))
    }

    async fn load_tasks(&self, conn: &mut Connection, index: &str) -> AppResult<Vec<Task>> {
        let ids: Vec<String> = conn.zrange(index, 0, -1).await?;
        let keys = ids.iter().map(|id| self.task_key(id)).collect();
        Self::load_many(conn, keys).await
    }

    async fn remove_task(&self, conn: &mut Connection, task: &Task) -> AppResult<()> {
        let id = task.id.to_string();
        redis::pipe()
            .atomic()
            .del(self.task_key(&id))
            .ignore()
            .zrem(self.owner_tasks_key(task.owner_id), &id)
            .ignore()
            .zrem(self.key(ALL_TASKS_KEY), &id)
            .ignore()
            .query_async::<_, ()>(conn)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for RedisService {
    async fn create_user(&self, user: User) -> AppResult<User> {
        let record = serde_json::to_string(&user)?;
        let email_key = self.email_key(&user.email);
        let mut conn = self.connection().await?;

        let claimed: bool = conn.set_nx(&email_key, user.id.to_string()).await?;
        if !claimed {
            return Err(duplicate_email());
        }

        let written = redis::pipe()
            .atomic()
            .set(self.user_key(user.id), record)
            .ignore()
            .zadd(self.key(USERS_KEY), user.id.to_string(), score(user.created_at))
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await;
        if let Err(e) = written {
            // Release the email claim so the address can register again.
            let released = conn
                .del::<_, ()>(vec![email_key, self.user_key(user.id)])
                .await;
            if let Err(cleanup) = released {
                tracing::error!("Failed to release email claim for {}: {}", user.email, cleanup);
            }
            return Err(e.into());
        }

        tracing::info!("Created user {} ({})", user.id, user.email);
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let mut conn = self.connection().await?;
        let id: Option<String> = conn.get(self.email_key(email)).await?;
        match id {
            Some(id) => Self::get_json(&mut conn, &self.user_key(id)).await,
            None => Ok(None),
        }
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let mut conn = self.connection().await?;
        Self::get_json(&mut conn, &self.user_key(id)).await
    }

    async fn update_username(&self, id: Uuid, username: &str) -> AppResult<Option<User>> {
        let username = username.to_string();
        self.modify_user(id, move |user| user.username = username).await
    }

    async fn set_role(&self, id: Uuid, role: Role) -> AppResult<Option<User>> {
        self.modify_user(id, move |user| user.role = role).await
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        let mut conn = self.connection().await?;
        let ids: Vec<String> = conn.zrange(self.key(USERS_KEY), 0, -1).await?;
        let keys = ids.iter().map(|id| self.user_key(id)).collect();
        Self::load_many(&mut conn, keys).await
    }
}

#[async_trait]
impl TaskStore for RedisService {
    async fn insert_task(&self, task: Task) -> AppResult<Task> {
        let mut conn = self.connection().await?;
        let id = task.id.to_string();
        let rank = score(task.created_at);

        redis::pipe()
            .atomic()
            .set(self.task_key(&id), serde_json::to_string(&task)?)
            .ignore()
            .zadd(self.owner_tasks_key(task.owner_id), &id, rank)
            .ignore()
            .zadd(self.key(ALL_TASKS_KEY), &id, rank)
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await?;

        Ok(task)
    }

    async fn tasks_for_owner(&self, owner: Uuid) -> AppResult<Vec<Task>> {
        let mut conn = self.connection().await?;
        self.load_tasks(&mut conn, &self.owner_tasks_key(owner)).await
    }

    async fn update_owned(&self, owner: Uuid, id: Uuid, patch: &TaskPatch) -> AppResult<Option<Task>> {
        let mut conn = self.connection().await?;
        let key = self.task_key(id);
        let task = Self::get_json::<Task>(&mut conn, &key).await?;
        let Some(mut task) = task.filter(|t| t.owner_id == owner) else {
            return Ok(None);
        };
        task.apply(patch);
        conn.set::<_, _, ()>(key, serde_json::to_string(&task)?).await?;
        Ok(Some(task))
    }

    async fn delete_owned(&self, owner: Uuid, id: Uuid) -> AppResult<Option<Task>> {
        let mut conn = self.connection().await?;
        let task = Self::get_json::<Task>(&mut conn, &self.task_key(id)).await?;
        let Some(task) = task.filter(|t| t.owner_id == owner) else {
            return Ok(None);
        };
        self.remove_task(&mut conn, &task).await?;
        Ok(Some(task))
    }

    async fn all_tasks(&self) -> AppResult<Vec<Task>> {
        let mut conn = self.connection().await?;
        self.load_tasks(&mut conn, &self.key(ALL_TASKS_KEY)).await
    }

    async fn delete_task(&self, id: Uuid) -> AppResult<Option<Task>> {
        let mut conn = self.connection().await?;
        let Some(task) = Self::get_json::<Task>(&mut conn, &self.task_key(id)).await? else {
            return Ok(None);
        };
        self.remove_task(&mut conn, &task).await?;
        Ok(Some(task))
    }
}
