use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use task_tracker::{
    config::{Config, StoreBackend},
    routes,
    services::{
        select_cache, MemoryStore, PasswordHasher, RedisService, TaskService, TaskStore,
        TokenService, UserStore,
    },
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("task_tracker=info,tower_http=info")),
        )
        .init();

    // Load configuration
    let config = Config::load().context("Failed to load configuration")?;
    let tokens = TokenService::new(&config.auth.jwt_secret, config.auth.token_ttl_secs)
        .context("Invalid auth.token_ttl_secs")?;

    // System of record
    let (users, tasks): (Arc<dyn UserStore>, Arc<dyn TaskStore>) = match config.store.backend {
        StoreBackend::Redis => {
            let url = config
                .store
                .url
                .as_deref()
                .context("store.url is required for the redis store")?;
            let client = redis::Client::open(url).context("Invalid store URL")?;
            let mut store = RedisService::new(Arc::new(client));
            if let Some(namespace) = &config.store.namespace {
                tracing::info!("Redis store keys prefixed with {}:", namespace);
                store = store.with_namespace(namespace.as_str());
            }
            let store = Arc::new(store);
            (store.clone() as Arc<dyn UserStore>, store as Arc<dyn TaskStore>)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            let store = Arc::new(MemoryStore::new());
            (store.clone() as Arc<dyn UserStore>, store as Arc<dyn TaskStore>)
        }
    };

    // Optional cache; falls back to pass-through when unreachable
    let cache = select_cache(&config.cache).await;
    let task_service = TaskService::new(tasks, cache, config.cache.ttl());
    tracing::info!("Task cache mode: {}", task_service.cache_name());

    let state = AppState::new(
        users,
        task_service,
        Arc::new(tokens),
        PasswordHasher::new(config.auth.bcrypt_cost),
    );

    let app = routes::app(state, &config.server);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server running on http://{}{}", addr, config.server.api_prefix);

    axum::serve(listener, app.into_make_service())
        .await
        .context("Server error")?;
    Ok(())
}
