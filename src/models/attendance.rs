// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Attendance (check-in) model.

use crate::models::timestamp;
use crate::time_utils::DateKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored check-in record (`attendance`). Written once, never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendance {
    /// Document ID. Read from the document name, so records stored without
    /// an `id` field load too.
    #[serde(rename(deserialize = "_firestore_id"))]
    pub id: String,
    pub user_id: String,
    pub date: DateKey,
    #[serde(with = "timestamp::lenient")]
    pub check_in_time: DateTime<Utc>,
    /// QR code redeemed for this check-in
    pub qr_code_id: String,
}

impl Attendance {
    pub fn doc_id(user_id: &str, date: &DateKey) -> String {
        format!("{}_{}", urlencoding::encode(user_id), date)
    }

    pub fn new(user_id: &str, date: DateKey, qr_code_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: Self::doc_id(user_id, &date),
            user_id: user_id.to_string(),
            date,
            check_in_time: now,
            qr_code_id: qr_code_id.to_string(),
        }
    }
}
