use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{delete, get, patch, post, put},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::{
    config::ServerConfig,
    handlers,
    middleware::{require_auth, role_gate, AllowedRoles},
    state::AppState,
};

/// Builds the HTTP surface under `server.api_prefix`.
///
/// Layer order matters: the admin router's role gate is a `route_layer`
/// nested inside the auth layer, so authentication always runs first.
pub fn app(state: AppState, server: &ServerConfig) -> Router {
    let public = Router::new()
        .route("/users/register", post(handlers::register))
        .route("/users/login", post(handlers::login));

    let admin = Router::new()
        .route("/users/admin/all", get(handlers::list_all_users))
        .route("/users/admin/:id/role", patch(handlers::change_role))
        .route("/tasks/admin/all", get(handlers::list_all_tasks))
        .route("/tasks/admin/:id", delete(handlers::delete_any_task))
        .route_layer(from_fn_with_state(AllowedRoles::admin_only(), role_gate));

    let authenticated = Router::new()
        .route(
            "/users/me",
            get(handlers::current_user).put(handlers::update_profile),
        )
        .route(
            "/tasks",
            get(handlers::list_tasks).post(handlers::create_task),
        )
        .route(
            "/tasks/:id",
            put(handlers::update_task).delete(handlers::delete_task),
        )
        .merge(admin)
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .nest(&server.api_prefix, public.merge(authenticated))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&server.cors_origins))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(server.max_body_bytes))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter(|origin| {
            let wildcard = origin.trim() == "*";
            if wildcard {
                tracing::warn!("Ignoring wildcard CORS origin; credentials need explicit origins");
            }
            !wildcard
        })
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-requested-with"),
        ])
        .expose_headers([
            header::CONTENT_RANGE,
            HeaderName::from_static("x-content-range"),
        ])
}
