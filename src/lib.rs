// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shacharit Breakfast: daily breakfast orders and QR check-in
//!
//! This crate provides the backend API for placing one breakfast order per
//! day, checking in at the minyan with the daily QR code, and the admin
//! operations that go with them (QR issuance, order confirmation).

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Store;
use mockable::Clock;
use services::{AttendanceService, FirebaseVerifier, OrderService, QrService};
use std::sync::Arc;
use time_utils::DatePolicy;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Arc<dyn Store>,
    pub identity: Arc<FirebaseVerifier>,
    pub policy: DatePolicy,
    pub orders: OrderService,
    pub attendance: AttendanceService,
    pub qr: QrService,
}

impl AppState {
    /// Wire the services around a store, an identity verifier and a clock.
    pub fn new(
        config: Config,
        db: Arc<dyn Store>,
        identity: Arc<FirebaseVerifier>,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        let policy = DatePolicy::new(config.timezone, config.order_window, clock);

        Self {
            orders: OrderService::new(db.clone(), policy.clone()),
            attendance: AttendanceService::new(db.clone(), policy.clone()),
            qr: QrService::new(db.clone(), policy.clone(), config.qr_secret.clone()),
            config,
            db,
            identity,
            policy,
        }
    }
}
