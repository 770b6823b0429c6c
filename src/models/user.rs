// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model for storage and API.

use crate::models::timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User profile stored in Firestore (document ID = Firebase UID).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Firebase Auth UID
    pub uid: String,
    pub email: String,
    pub display_name: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub dietary_restrictions: Vec<String>,
    /// Admin privileges (QR generation, order confirmation)
    #[serde(default)]
    pub is_admin: bool,
    #[serde(with = "timestamp::lenient")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp::lenient")]
    pub updated_at: DateTime<Utc>,
    #[serde(with = "timestamp::lenient")]
    pub last_login_at: DateTime<Utc>,
}

impl User {
    /// Build the record for a user seen for the first time.
    pub fn first_login(
        uid: &str,
        email: Option<&str>,
        name: Option<&str>,
        phone_number: Option<&str>,
        now: DateTime<Utc>,
    ) -> Self {
        let email = email.unwrap_or_default().to_string();
        let display_name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());

        Self {
            uid: uid.to_string(),
            email,
            display_name,
            phone_number: phone_number.map(str::to_string),
            dietary_restrictions: Vec::new(),
            is_admin: false,
            created_at: now,
            updated_at: now,
            last_login_at: now,
        }
    }
}

/// Minimal user info joined onto order and attendance listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub display_name: String,
    pub email: String,
}

impl UserSummary {
    pub fn from_user(user: Option<&User>, id: &str) -> Self {
        match user {
            Some(user) => Self {
                id: user.uid.clone(),
                display_name: user.display_name.clone(),
                email: user.email.clone(),
            },
            None => Self {
                id: id.to_string(),
                display_name: "Unknown User".to_string(),
                email: "Unknown Email".to_string(),
            },
        }
    }
}
