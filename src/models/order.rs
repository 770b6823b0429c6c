// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Daily breakfast order model.

use crate::error::RuleViolation;
use crate::models::timestamp;
use crate::time_utils::DateKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// The closed set of bagel choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum BagelType {
    Plain,
    Sesame,
    Everything,
    Wrap,
    NoBagel,
}

impl BagelType {
    pub const ALL: [BagelType; 5] = [
        BagelType::Plain,
        BagelType::Sesame,
        BagelType::Everything,
        BagelType::Wrap,
        BagelType::NoBagel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BagelType::Plain => "plain",
            BagelType::Sesame => "sesame",
            BagelType::Everything => "everything",
            BagelType::Wrap => "wrap",
            BagelType::NoBagel => "no_bagel",
        }
    }
}

impl fmt::Display for BagelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BagelType {
    type Err = RuleViolation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| RuleViolation::InvalidSelection(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
}

/// What the user chose; validated before it becomes an [`Order`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSelection {
    pub bagel_type: BagelType,
    pub with_potatoes: bool,
    pub with_cheese: bool,
    pub dietary_notes: String,
    pub special_requests: String,
}

impl OrderSelection {
    pub fn new(bagel_type: BagelType) -> Self {
        Self {
            bagel_type,
            with_potatoes: false,
            with_cheese: false,
            dietary_notes: String::new(),
            special_requests: String::new(),
        }
    }
}

/// Stored order record in Firestore (`dailyOrders`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Document ID. Read from the document name, so records stored without
    /// an `id` field load too.
    #[serde(rename(deserialize = "_firestore_id"))]
    pub id: String,
    pub user_id: String,
    /// Business date the order is for
    pub date: DateKey,
    pub bagel_type: BagelType,
    #[serde(default)]
    pub with_potatoes: bool,
    #[serde(default)]
    pub with_cheese: bool,
    #[serde(default)]
    pub dietary_notes: String,
    #[serde(default)]
    pub special_requests: String,
    #[serde(with = "timestamp::lenient")]
    pub order_timestamp: DateTime<Utc>,
    pub status: OrderStatus,
}

impl Order {
    /// Document ID for the single order a user may hold on `date`.
    pub fn doc_id(user_id: &str, date: &DateKey) -> String {
        format!("{}_{}", urlencoding::encode(user_id), date)
    }

    pub fn new_pending(
        user_id: &str,
        date: DateKey,
        selection: OrderSelection,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Self::doc_id(user_id, &date),
            user_id: user_id.to_string(),
            date,
            bagel_type: selection.bagel_type,
            with_potatoes: selection.with_potatoes,
            with_cheese: selection.with_cheese,
            dietary_notes: selection.dietary_notes,
            special_requests: selection.special_requests,
            order_timestamp: now,
            status: OrderStatus::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == OrderStatus::Pending
    }
}
