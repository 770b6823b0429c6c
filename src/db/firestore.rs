// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profiles, created on first login)
//! - Daily orders (one per user per day)
//! - Attendance (one check-in per user per day)
//! - QR codes (one per day)

use crate::db::{collections, Store};
use crate::error::AppError;
use crate::models::{Attendance, Order, QrCode, User};
use crate::time_utils::DateKey;
use async_trait::async_trait;
use firestore::errors::FirestoreError;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: firestore::FirestoreDb,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }

    /// Insert a document unless one with the same ID already exists.
    async fn insert_if_absent<T>(
        &self,
        collection: &str,
        id: &str,
        object: &T,
    ) -> Result<bool, AppError>
    where
        T: Serialize + DeserializeOwned + Sync + Send,
    {
        let result: Result<(), FirestoreError> = self
            .client
            .fluent()
            .insert()
            .into(collection)
            .document_id(id)
            .object(object)
            .execute()
            .await;

        match result {
            Ok(()) => Ok(true),
            Err(FirestoreError::DataConflictError(e)) => {
                tracing::debug!(collection, id, error = %e, "Document already exists");
                Ok(false)
            }
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }
}

#[async_trait]
impl Store for FirestoreDb {
    // ─── User Operations ─────────────────────────────────────────

    async fn get_user(&self, uid: &str) -> Result<Option<User>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(uid)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.uid)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Order Operations ────────────────────────────────────────

    async fn create_order(&self, order: &Order) -> Result<bool, AppError> {
        self.insert_if_absent(collections::DAILY_ORDERS, &order.id, order)
            .await
    }

    async fn get_order(&self, id: &str) -> Result<Option<Order>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::DAILY_ORDERS)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn find_order(&self, user_id: &str, date: &DateKey) -> Result<Option<Order>, AppError> {
        let user_id = user_id.to_string();
        let date = date.to_string();

        let orders: Vec<Order> = self
            .client
            .fluent()
            .select()
            .from(collections::DAILY_ORDERS)
            .filter(move |q| {
                q.for_all([
                    q.field("userId").eq(user_id.clone()),
                    q.field("date").eq(date.clone()),
                ])
            })
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(orders.into_iter().next())
    }

    async fn update_order(&self, order: &Order) -> Result<(), AppError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::DAILY_ORDERS)
            .document_id(&order.id)
            .object(order)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn list_orders_for_date(&self, date: &DateKey) -> Result<Vec<Order>, AppError> {
        let date = date.to_string();
        self.client
            .fluent()
            .select()
            .from(collections::DAILY_ORDERS)
            .filter(move |q| q.field("date").eq(date.clone()))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Attendance Operations ───────────────────────────────────

    async fn create_attendance(&self, attendance: &Attendance) -> Result<bool, AppError> {
        self.insert_if_absent(collections::ATTENDANCE, &attendance.id, attendance)
            .await
    }

    async fn find_attendance(
        &self,
        user_id: &str,
        date: &DateKey,
    ) -> Result<Option<Attendance>, AppError> {
        let user_id = user_id.to_string();
        let date = date.to_string();

        let records: Vec<Attendance> = self
            .client
            .fluent()
            .select()
            .from(collections::ATTENDANCE)
            .filter(move |q| {
                q.for_all([
                    q.field("userId").eq(user_id.clone()),
                    q.field("date").eq(date.clone()),
                ])
            })
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(records.into_iter().next())
    }

    async fn list_attendance_for_date(&self, date: &DateKey) -> Result<Vec<Attendance>, AppError> {
        let date = date.to_string();
        self.client
            .fluent()
            .select()
            .from(collections::ATTENDANCE)
            .filter(move |q| q.field("date").eq(date.clone()))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── QR Code Operations ──────────────────────────────────────

    async fn create_qr_code(&self, qr: &QrCode) -> Result<bool, AppError> {
        self.insert_if_absent(collections::QR_CODES, &qr.id, qr).await
    }

    async fn list_active_qr_codes(&self, date: &DateKey) -> Result<Vec<QrCode>, AppError> {
        let date = date.to_string();

        self
            .client
            .fluent()
            .select()
            .from(collections::QR_CODES)
            .filter(move |q| {
                q.for_all([
                    q.field("date").eq(date.clone()),
                    q.field("isActive").eq(true),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn deactivate_qr_codes_before(&self, date: &DateKey) -> Result<usize, AppError> {
        let active: Vec<QrCode> = self
            .client
            .fluent()
            .select()
            .from(collections::QR_CODES)
            .filter(|q| q.field("isActive").eq(true))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut deactivated = 0;
        for mut qr in active.into_iter().filter(|qr| qr.date < *date) {
            qr.is_active = false;
            let _: () = self
                .client
                .fluent()
                .update()
                .in_col(collections::QR_CODES)
                .document_id(&qr.id)
                .object(&qr)
                .execute()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            deactivated += 1;
        }

        if deactivated > 0 {
            tracing::info!(before = %date, deactivated, "Deactivated stale QR codes");
        }

        Ok(deactivated)
    }
}
