// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Daily check-in QR code model.

use crate::models::timestamp;
use crate::time_utils::DateKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored QR code record (`qrCodes`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrCode {
    /// Document ID. Read from the document name, so records stored without
    /// an `id` field load too.
    #[serde(rename(deserialize = "_firestore_id"))]
    pub id: String,
    pub date: DateKey,
    /// Redeemable value: hex HMAC-SHA256 of the date and a random nonce
    pub code: String,
    #[serde(with = "timestamp::lenient")]
    pub created_at: DateTime<Utc>,
    /// UID of the admin who generated it
    pub created_by: String,
    pub is_active: bool,
    #[serde(with = "timestamp::lenient")]
    pub expires_at: DateTime<Utc>,
}

impl QrCode {
    pub fn doc_id(date: &DateKey) -> String {
        format!("qr_{date}")
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Active and not yet past expiry.
    pub fn is_redeemable_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_expired_at(now)
    }
}
