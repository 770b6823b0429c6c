// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process store for local development and tests.

use crate::db::Store;
use crate::error::AppError;
use crate::models::{Attendance, Order, QrCode, User};
use crate::time_utils::DateKey;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};

/// [`Store`] backed by concurrent hash maps.
///
/// Conditional creates hold the shard lock for the key, so concurrent
/// creates of the same record resolve to exactly one winner.
#[derive(Default)]
pub struct MemoryDb {
    users: DashMap<String, User>,
    orders: DashMap<String, Order>,
    attendance: DashMap<String, Attendance>,
    qr_codes: DashMap<String, QrCode>,
    failing_order_updates: DashSet<String>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `update_order` for `order_id` fail.
    pub fn fail_order_updates_for(&self, order_id: &str) {
        self.failing_order_updates.insert(order_id.to_string());
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    pub fn attendance_count(&self) -> usize {
        self.attendance.len()
    }

    pub fn qr_code_count(&self) -> usize {
        self.qr_codes.len()
    }

    /// Store a QR record as-is, bypassing the one-per-day guard.
    pub fn put_qr_code(&self, qr: QrCode) {
        self.qr_codes.insert(qr.id.clone(), qr);
    }
}

fn insert_if_absent<T: Clone>(map: &DashMap<String, T>, id: &str, value: &T) -> bool {
    match map.entry(id.to_string()) {
        Entry::Occupied(_) => false,
        Entry::Vacant(slot) => {
            slot.insert(value.clone());
            true
        }
    }
}

#[async_trait]
impl Store for MemoryDb {
    async fn get_user(&self, uid: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.get(uid).map(|u| u.clone()))
    }

    async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        self.users.insert(user.uid.clone(), user.clone());
        Ok(())
    }

    async fn create_order(&self, order: &Order) -> Result<bool, AppError> {
        Ok(insert_if_absent(&self.orders, &order.id, order))
    }

    async fn get_order(&self, id: &str) -> Result<Option<Order>, AppError> {
        Ok(self.orders.get(id).map(|o| o.clone()))
    }

    async fn find_order(&self, user_id: &str, date: &DateKey) -> Result<Option<Order>, AppError> {
        Ok(self
            .orders
            .iter()
            .find(|o| o.user_id == user_id && o.date == *date)
            .map(|o| o.clone()))
    }

    async fn update_order(&self, order: &Order) -> Result<(), AppError> {
        if self.failing_order_updates.contains(&order.id) {
            return Err(AppError::Database(format!(
                "injected update failure for order {}",
                order.id
            )));
        }
        self.orders.insert(order.id.clone(), order.clone());
        Ok(())
    }

    async fn list_orders_for_date(&self, date: &DateKey) -> Result<Vec<Order>, AppError> {
        Ok(self
            .orders
            .iter()
            .filter(|o| o.date == *date)
            .map(|o| o.clone())
            .collect())
    }

    async fn create_attendance(&self, attendance: &Attendance) -> Result<bool, AppError> {
        Ok(insert_if_absent(&self.attendance, &attendance.id, attendance))
    }

    async fn find_attendance(
        &self,
        user_id: &str,
        date: &DateKey,
    ) -> Result<Option<Attendance>, AppError> {
        Ok(self
            .attendance
            .iter()
            .find(|a| a.user_id == user_id && a.date == *date)
            .map(|a| a.clone()))
    }

    async fn list_attendance_for_date(&self, date: &DateKey) -> Result<Vec<Attendance>, AppError> {
        Ok(self
            .attendance
            .iter()
            .filter(|a| a.date == *date)
            .map(|a| a.clone())
            .collect())
    }

    async fn create_qr_code(&self, qr: &QrCode) -> Result<bool, AppError> {
        Ok(insert_if_absent(&self.qr_codes, &qr.id, qr))
    }

    async fn list_active_qr_codes(&self, date: &DateKey) -> Result<Vec<QrCode>, AppError> {
        Ok(self
            .qr_codes
            .iter()
            .filter(|qr| qr.date == *date && qr.is_active)
            .map(|qr| qr.clone())
            .collect())
    }

    async fn deactivate_qr_codes_before(&self, date: &DateKey) -> Result<usize, AppError> {
        let mut deactivated = 0;
        for mut qr in self.qr_codes.iter_mut() {
            if qr.is_active && qr.date < *date {
                qr.is_active = false;
                deactivated += 1;
            }
        }
        Ok(deactivated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BagelType, OrderSelection};
    use chrono::Utc;
    use std::sync::Arc;

    fn date(s: &str) -> DateKey {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_conditional_create_under_contention() {
        let db = Arc::new(MemoryDb::new());
        let order = Order::new_pending(
            "u1",
            date("2024-06-02"),
            OrderSelection::new(BagelType::Plain),
            Utc::now(),
        );

        let mut handles = Vec::new();
        for _ in 0..16 {
            let db = db.clone();
            let order = order.clone();
            handles.push(tokio::spawn(async move { db.create_order(&order).await }));
        }

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() {
                created += 1;
            }
        }

        assert_eq!(created, 1);
        assert_eq!(db.order_count(), 1);
    }

    #[tokio::test]
    async fn test_injected_update_failure() {
        let db = MemoryDb::new();
        let order = Order::new_pending(
            "u1",
            date("2024-06-02"),
            OrderSelection::new(BagelType::Plain),
            Utc::now(),
        );
        assert!(db.create_order(&order).await.unwrap());

        db.fail_order_updates_for(&order.id);
        assert!(matches!(
            db.update_order(&order).await,
            Err(AppError::Database(_))
        ));
    }
}
