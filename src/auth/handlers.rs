use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Form, Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginForm, PublicUser, RegisterRequest, TokenResponse},
        error::AuthError,
        extractors::AuthUser,
        password::{hash_password, verify_password},
    },
    state::AppState,
    store::NewUser,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(me))
}

fn require_present(field: &'static str, value: &str) -> Result<(), AuthError> {
    if value.trim().is_empty() {
        return Err(AuthError::MissingField(field));
    }
    Ok(())
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>), AuthError> {
    require_present("email", &payload.email)?;
    require_present("username", &payload.username)?;
    require_present("password", &payload.password)?;

    // Friendly pre-check; the store's unique index settles races.
    if state.store.find_by_email(&payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(AuthError::DuplicateEmail);
    }

    let password_hash = hash_password(&payload.password)?;
    let user = state
        .store
        .insert(NewUser {
            email: payload.email,
            username: payload.username,
            password_hash,
        })
        .await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((StatusCode::CREATED, Json(PublicUser::from(user))))
}

#[instrument(skip(state, form))]
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>, AuthError> {
    // The login form's `username` field carries the email.
    let user = match state.store.find_by_email(&form.username).await? {
        Some(user) => user,
        None => {
            warn!("login with unknown email");
            return Err(AuthError::InvalidCredentials);
        }
    };

    // A hash that no longer parses means corrupted storage; the caller
    // still only sees invalid credentials.
    let password_ok = match verify_password(&form.password, &user.password_hash) {
        Ok(ok) => ok,
        Err(e) => {
            warn!(error = %e, user_id = %user.id, "stored password hash unreadable");
            false
        }
    };
    if !password_ok {
        warn!(user_id = %user.id, "login with wrong password");
        return Err(AuthError::InvalidCredentials);
    }

    let access_token = state
        .tokens
        .issue(&user.email, state.tokens.ttl())
        .map_err(AuthError::Internal)?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}

#[instrument(skip(state))]
pub async fn me(
    State(state): State<AppState>,
    AuthUser(email): AuthUser,
) -> Result<Json<PublicUser>, AuthError> {
    let user = state
        .store
        .find_by_email(&email)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;
    Ok(Json(PublicUser::from(user)))
}
