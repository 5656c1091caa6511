use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::{auth::error::AuthError, state::AppState};

/// Extracts and verifies the bearer token, yielding the subject email.
#[derive(Debug)]
pub struct AuthUser(pub String);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(AuthError::MalformedToken)?;

        // Expect "Bearer <token>"
        let token = header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .ok_or(AuthError::MalformedToken)?;

        let claims = state.tokens.verify(token)?;
        Ok(AuthUser(claims.sub))
    }
}
