// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod attendance;
pub mod order;
pub mod qr_code;
pub mod timestamp;
pub mod user;

pub use attendance::Attendance;
pub use order::{BagelType, Order, OrderSelection, OrderStatus};
pub use qr_code::QrCode;
pub use timestamp::RawTimestamp;
pub use user::{User, UserSummary};
