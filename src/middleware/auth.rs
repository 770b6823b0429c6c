// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firebase ID token authentication middleware.

use crate::error::AppError;
use crate::models::User;
use crate::services::identity::{extract_bearer_token, IdentityError, VerifiedIdentity};
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

/// Cookie holding the ID token for browser sessions.
pub const SESSION_COOKIE: &str = "__session";

/// Authenticated user resolved from the ID token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
}

/// Middleware that requires a valid Firebase ID token.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Try header first, then cookie
    let token = match extract_bearer_token(request.headers().get(header::AUTHORIZATION)) {
        Some(token) => token.to_string(),
        None => jar
            .get(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.is_empty())
            .ok_or(AppError::Unauthorized)?,
    };

    let identity = state
        .identity
        .verify_id_token(&token)
        .await
        .map_err(|e| match e {
            IdentityError::Rejected(reason) => {
                tracing::debug!(reason = %reason, "Rejected ID token");
                AppError::InvalidToken
            }
            IdentityError::Transient(reason) => {
                AppError::Internal(anyhow::anyhow!("ID token verification unavailable: {reason}"))
            }
        })?;

    let user = resolve_user(&state, &identity).await?;
    request.extensions_mut().insert(AuthUser { user });

    Ok(next.run(request).await)
}

/// Load the user record for `identity`, creating it on first sight.
async fn resolve_user(state: &AppState, identity: &VerifiedIdentity) -> Result<User, AppError> {
    let now = state.policy.now();

    let user = match state.db.get_user(&identity.uid).await? {
        Some(mut user) => {
            user.last_login_at = now;
            user
        }
        None => {
            tracing::info!(user_id = %identity.uid, "Creating user on first login");
            User::first_login(
                &identity.uid,
                identity.email.as_deref(),
                identity.name.as_deref(),
                identity.phone_number.as_deref(),
                now,
            )
        }
    };

    state.db.upsert_user(&user).await?;
    Ok(user)
}
