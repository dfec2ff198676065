use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use std::sync::Arc;

use crate::errors::{AppError, AppResult};
use crate::models::Role;
use crate::services::{Identity, TokenService};

/// Verifies the bearer token and attaches the caller's [`Identity`] to the
/// request. Missing or unverifiable tokens short-circuit with 401.
pub async fn require_auth(
    State(tokens): State<Arc<TokenService>>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> AppResult<Response> {
    let TypedHeader(Authorization(bearer)) = bearer
        .ok_or_else(|| AppError::Unauthorized("Missing authorization token".into()))?;

    let identity = tokens.verify(bearer.token()).map_err(|e| {
        tracing::debug!("Rejected token on {}: {}", req.uri().path(), e);
        AppError::from(e)
    })?;

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

/// Roles permitted past a [`role_gate`].
#[derive(Debug, Clone)]
pub struct AllowedRoles(Arc<[Role]>);

impl AllowedRoles {
    pub fn new(roles: impl IntoIterator<Item = Role>) -> Self {
        Self(roles.into_iter().collect())
    }

    pub fn admin_only() -> Self {
        Self::new([Role::Admin])
    }

    pub fn permits(&self, role: Role) -> bool {
        self.0.contains(&role)
    }
}

/// Rejects callers whose role is not in the allowed set with 403.
///
/// Reads the identity left by [`require_auth`], so it must be layered inside
/// it: add it with `route_layer` on a router that is itself wrapped by the
/// auth layer. If the order is reversed there is no identity yet and every
/// request gets a 401.
pub async fn role_gate(
    State(allowed): State<AllowedRoles>,
    identity: Identity,
    req: Request,
    next: Next,
) -> AppResult<Response> {
    if !allowed.permits(identity.role) {
        tracing::debug!(
            "User {} with role {} denied on {}",
            identity.user_id,
            identity.role,
            req.uri().path()
        );
        return Err(AppError::Forbidden("Access denied".into()));
    }
    Ok(next.run(req).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Identity>().copied().ok_or_else(|| {
            tracing::error!("No identity on {}; is require_auth layered?", parts.uri.path());
            AppError::Unauthorized("Not authenticated".into())
        })
    }
}
