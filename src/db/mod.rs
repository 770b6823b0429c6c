// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer.
//!
//! [`Store`] is the persistence port used by the services. [`FirestoreDb`]
//! backs production; [`MemoryDb`] backs local development and tests.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::error::AppError;
use crate::models::{Attendance, Order, QrCode, User};
use crate::time_utils::DateKey;
use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use std::collections::HashMap;

const MAX_CONCURRENT_DB_OPS: usize = 50;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const DAILY_ORDERS: &str = "dailyOrders";
    pub const ATTENDANCE: &str = "attendance";
    pub const QR_CODES: &str = "qrCodes";
}

/// Document storage used by the business-rule services.
///
/// The `create_*` operations are conditional: they write only if no document
/// with the same ID exists and return `false` otherwise. Record IDs encode
/// the uniqueness key, so this is what enforces one order / one check-in per
/// user per day and one QR code per day.
#[async_trait]
pub trait Store: Send + Sync {
    // ─── Users ───────────────────────────────────────────────────

    async fn get_user(&self, uid: &str) -> Result<Option<User>, AppError>;

    async fn upsert_user(&self, user: &User) -> Result<(), AppError>;

    /// Fetch several users at once; missing users are simply absent from the map.
    async fn get_users(&self, uids: &[String]) -> Result<HashMap<String, User>, AppError> {
        let found = stream::iter(uids.iter().cloned())
            .map(|uid| async move { self.get_user(&uid).await })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<Option<User>, AppError>>>()
            .await;

        let mut users = HashMap::with_capacity(found.len());
        for user in found {
            if let Some(user) = user? {
                users.insert(user.uid.clone(), user);
            }
        }
        Ok(users)
    }

    // ─── Orders ──────────────────────────────────────────────────

    async fn create_order(&self, order: &Order) -> Result<bool, AppError>;

    async fn get_order(&self, id: &str) -> Result<Option<Order>, AppError>;

    /// Order placed by `user_id` for `date`, whatever its document ID.
    async fn find_order(&self, user_id: &str, date: &DateKey) -> Result<Option<Order>, AppError>;

    async fn update_order(&self, order: &Order) -> Result<(), AppError>;

    async fn list_orders_for_date(&self, date: &DateKey) -> Result<Vec<Order>, AppError>;

    // ─── Attendance ──────────────────────────────────────────────

    async fn create_attendance(&self, attendance: &Attendance) -> Result<bool, AppError>;

    async fn find_attendance(
        &self,
        user_id: &str,
        date: &DateKey,
    ) -> Result<Option<Attendance>, AppError>;

    async fn list_attendance_for_date(&self, date: &DateKey) -> Result<Vec<Attendance>, AppError>;

    // ─── QR Codes ────────────────────────────────────────────────

    async fn create_qr_code(&self, qr: &QrCode) -> Result<bool, AppError>;

    /// Every active code for `date`, expired or not.
    ///
    /// Newer writers keep one code per date, but older documents may hold several.
    async fn list_active_qr_codes(&self, date: &DateKey) -> Result<Vec<QrCode>, AppError>;

    /// Clear the active flag on codes for dates before `date`. Returns how many changed.
    async fn deactivate_qr_codes_before(&self, date: &DateKey) -> Result<usize, AppError>;
}
