pub mod cache;
pub mod password;
pub mod redis_service;
pub mod store;
pub mod tasks;
pub mod token;

pub use cache::{select_cache, MemoryCache, NoopCache, RedisCache, TaskCache};
pub use password::PasswordHasher;
pub use redis_service::RedisService;
pub use store::{MemoryStore, TaskStore, UserStore};
pub use tasks::TaskService;
pub use token::{Identity, TokenService};
