// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile routes for the authenticated user.

use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::User;
use crate::routes::{validate_body, ApiResponse};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::get,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::{Validate, ValidationError};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const MAX_RESTRICTION_LEN: usize = 50;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/auth/profile", get(get_profile).put(update_profile))
}

/// Profile returned to the owning user.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub uid: String,
    pub email: String,
    pub display_name: String,
    pub phone_number: Option<String>,
    pub dietary_restrictions: Vec<String>,
    pub is_admin: bool,
    pub created_at: String,
    pub updated_at: String,
    pub last_login_at: String,
}

impl From<&User> for ProfileResponse {
    fn from(user: &User) -> Self {
        Self {
            uid: user.uid.clone(),
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            phone_number: user.phone_number.clone(),
            dietary_restrictions: user.dietary_restrictions.clone(),
            is_admin: user.is_admin,
            created_at: format_utc_rfc3339(user.created_at),
            updated_at: format_utc_rfc3339(user.updated_at),
            last_login_at: format_utc_rfc3339(user.last_login_at),
        }
    }
}

#[derive(Serialize)]
struct ProfilePayload {
    user: ProfileResponse,
}

async fn get_profile(Extension(auth): Extension<AuthUser>) -> Json<ApiResponse<ProfilePayload>> {
    ApiResponse::ok(ProfilePayload {
        user: ProfileResponse::from(&auth.user),
    })
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100, message = "Display name must be 1-100 characters"))]
    display_name: String,
    #[validate(length(max = 30, message = "Phone number must be at most 30 characters"))]
    phone_number: Option<String>,
    #[validate(
        length(max = 20, message = "At most 20 dietary restrictions are allowed"),
        custom(function = "validate_restrictions")
    )]
    dietary_restrictions: Option<Vec<String>>,
}

fn validate_restrictions(tags: &[String]) -> std::result::Result<(), ValidationError> {
    if tags
        .iter()
        .any(|t| t.trim().is_empty() || t.chars().count() > MAX_RESTRICTION_LEN)
    {
        let mut err = ValidationError::new("dietary_restriction");
        err.message = Some("Each dietary restriction must be 1-50 characters".into());
        return Err(err);
    }
    Ok(())
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    body: std::result::Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<ProfilePayload>>> {
    let Json(body) = body?;
    let body = UpdateProfileRequest {
        display_name: body.display_name.trim().to_string(),
        phone_number: body
            .phone_number
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty()),
        dietary_restrictions: body.dietary_restrictions,
    };
    validate_body(&body)?;

    // Re-read: the admin flag may have changed since authentication.
    let mut user = state
        .db
        .get_user(&auth.user.uid)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", auth.user.uid)))?;

    user.display_name = body.display_name;
    user.phone_number = body.phone_number;
    user.dietary_restrictions = body
        .dietary_restrictions
        .unwrap_or_default()
        .into_iter()
        .map(|t| t.trim().to_string())
        .collect();
    user.updated_at = state.policy.now();

    state.db.upsert_user(&user).await?;
    tracing::info!(user_id = %user.uid, "Profile updated");

    Ok(ApiResponse::with_message(
        "Profile updated successfully",
        ProfilePayload {
            user: ProfileResponse::from(&user),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: serde_json::Value) -> UpdateProfileRequest {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_profile_validation() {
        assert!(request(serde_json::json!({ "displayName": "Ada" }))
            .validate()
            .is_ok());
        assert!(request(serde_json::json!({ "displayName": "" }))
            .validate()
            .is_err());
        assert!(request(serde_json::json!({ "displayName": "x".repeat(101) }))
            .validate()
            .is_err());
        assert!(request(serde_json::json!({
            "displayName": "Ada",
            "dietaryRestrictions": ["vegetarian", "nut-free"]
        }))
        .validate()
        .is_ok());
        assert!(request(serde_json::json!({
            "displayName": "Ada",
            "dietaryRestrictions": ["x".repeat(51)]
        }))
        .validate()
        .is_err());
        assert!(request(serde_json::json!({
            "displayName": "Ada",
            "dietaryRestrictions": vec!["tag"; 21]
        }))
        .validate()
        .is_err());
    }
}
