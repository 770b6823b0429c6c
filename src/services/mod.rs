// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod attendance;
pub mod identity;
pub mod orders;
pub mod qr;

pub use attendance::{AttendanceEntry, AttendanceService};
pub use identity::{FirebaseVerifier, IdentityError, VerifiedIdentity};
pub use orders::{BatchConfirmResult, DailyOrders, OrderService, OrderSummary, OrderWithUser};
pub use qr::QrService;
