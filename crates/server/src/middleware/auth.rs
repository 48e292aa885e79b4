use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};

use crate::{error::AppError, routes::auth::Claims, AppState};

/// The authenticated actor, resolved from a bearer token.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: String,
    pub username: String,
    pub email: String,
}

/// Attaches an `AuthUser` to the request when it carries a valid bearer
/// token. Anonymous requests pass through untouched; endpoints that need an
/// actor reject them through the extractor.
pub async fn identify(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let user = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .and_then(|token| authenticate(token, &state.config.jwt_secret));

    if let Some(user) = user {
        request.extensions_mut().insert(user);
    }

    next.run(request).await
}

fn authenticate(token: &str, secret: &str) -> Option<AuthUser> {
    match decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    ) {
        Ok(data) => Some(AuthUser {
            id: data.claims.sub,
            username: data.claims.username,
            email: data.claims.email,
        }),
        Err(e) => {
            tracing::debug!("rejected bearer token: {e}");
            None
        }
    }
}

// Extractor for getting the authenticated user from request extensions
#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}
