use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::{
    auth::{password::PasswordError, token::TokenError},
    store::StoreError,
};

/// Client-facing failure kinds for the register/login/token flows. Each
/// variant maps to exactly one HTTP status and a stable machine-checkable
/// `error` string; translation to a response happens only here.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("email already in use")]
    DuplicateEmail,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("token expired")]
    ExpiredToken,

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("malformed token")]
    MalformedToken,

    #[error("user store unavailable")]
    StoreUnavailable(#[source] sqlx::Error),

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MissingField(_) => "missing_field",
            AuthError::DuplicateEmail => "duplicate_email",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::ExpiredToken => "expired_token",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::MalformedToken => "malformed_token",
            AuthError::StoreUnavailable(_) => "store_unavailable",
            AuthError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::MissingField(_) | AuthError::DuplicateEmail => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials
            | AuthError::ExpiredToken
            | AuthError::InvalidSignature
            | AuthError::MalformedToken => StatusCode::UNAUTHORIZED,
            AuthError::StoreUnavailable(_) | AuthError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateEmail => AuthError::DuplicateEmail,
            StoreError::Unavailable(e) => AuthError::StoreUnavailable(e),
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Expired => AuthError::ExpiredToken,
            TokenError::InvalidSignature => AuthError::InvalidSignature,
            TokenError::Malformed => AuthError::MalformedToken,
        }
    }
}

impl From<PasswordError> for AuthError {
    fn from(e: PasswordError) -> Self {
        AuthError::Internal(anyhow::Error::new(e))
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            // Details go to the log only, never to the caller.
            error!(error = ?self, "request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        let mut response = (
            status,
            Json(ErrorBody {
                error: self.kind(),
                message,
            }),
        )
            .into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}
