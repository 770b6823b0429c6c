// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Business dates and the order submission policy.
//!
//! Orders, attendance and QR codes are all partitioned by a [`DateKey`]:
//! the calendar day in the configured civil timezone.

use chrono::{
    DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone, Timelike, Utc,
};
use chrono_tz::Tz;
use mockable::Clock;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// Format a UTC timestamp as RFC3339 with millisecond precision and a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Calendar-day key (`YYYY-MM-DD`) in the business timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateKey(NaiveDate);

impl DateKey {
    pub const fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub const fn date(&self) -> NaiveDate {
        self.0
    }

    /// The following calendar day.
    pub fn next_day(&self) -> Self {
        Self(self.0 + Duration::days(1))
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_KEY_FORMAT))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid date {0:?}: expected YYYY-MM-DD")]
pub struct DateKeyError(String);

impl FromStr for DateKey {
    type Err = DateKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // chrono accepts unpadded fields; keys must be exactly 10 chars to stay sortable.
        if s.len() != 10 {
            return Err(DateKeyError(s.to_string()));
        }
        NaiveDate::parse_from_str(s, DATE_KEY_FORMAT)
            .map(Self)
            .map_err(|_| DateKeyError(s.to_string()))
    }
}

impl Serialize for DateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DateKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Order submission policy.
///
/// The two variants are mutually exclusive: each one fixes both the date an
/// order applies to and whether submission is currently open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderWindow {
    /// Orders are always accepted and always apply to the next business day.
    NextDay,
    /// Orders apply to the current business day and are accepted only
    /// between `open_hour` (inclusive) and `close_hour` (exclusive), civil time.
    SameDay { open_hour: u32, close_hour: u32 },
}

/// Result of [`DatePolicy::orders_allowed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderGate {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl OrderGate {
    fn open() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    fn closed(reason: String) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
        }
    }
}

/// Single source of truth for "what day is it" and "can orders be placed".
#[derive(Clone)]
pub struct DatePolicy {
    timezone: Tz,
    window: OrderWindow,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl DatePolicy {
    pub fn new(timezone: Tz, window: OrderWindow, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self {
            timezone,
            window,
            clock,
        }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn window(&self) -> OrderWindow {
        self.window
    }

    /// Current instant.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.utc()
    }

    /// Today's date in the business timezone.
    pub fn business_date(&self) -> DateKey {
        DateKey(self.now().with_timezone(&self.timezone).date_naive())
    }

    /// The date an order submitted now applies to.
    pub fn order_target_date(&self) -> DateKey {
        match self.window {
            OrderWindow::NextDay => self.business_date().next_day(),
            OrderWindow::SameDay { .. } => self.business_date(),
        }
    }

    /// Whether order submission is open right now.
    pub fn orders_allowed(&self) -> OrderGate {
        match self.window {
            OrderWindow::NextDay => OrderGate::open(),
            OrderWindow::SameDay {
                open_hour,
                close_hour,
            } => {
                let hour = self.now().with_timezone(&self.timezone).hour();
                if hour >= open_hour && hour < close_hour {
                    OrderGate::open()
                } else {
                    OrderGate::closed(format!(
                        "Orders are accepted between {} and {} ({})",
                        format_hour(open_hour),
                        format_hour(close_hour),
                        self.timezone.name()
                    ))
                }
            }
        }
    }

    /// Last millisecond (23:59:59.999 civil time) of `date`.
    pub fn end_of_day(&self, date: &DateKey) -> DateTime<Utc> {
        let next_midnight = date.next_day().date().and_time(NaiveTime::default());
        self.resolve_local(&next_midnight) - Duration::milliseconds(1)
    }

    /// Format an instant in the business timezone.
    pub fn format_local(&self, instant: DateTime<Utc>, fmt: &str) -> String {
        instant.with_timezone(&self.timezone).format(fmt).to_string()
    }

    fn resolve_local(&self, naive: &NaiveDateTime) -> DateTime<Utc> {
        let local = self.timezone.from_local_datetime(naive);
        local
            .earliest()
            .or_else(|| local.latest())
            .map(|dt| dt.with_timezone(&Utc))
            // Midnight fell in a DST gap; treat the wall time as UTC-offset-free.
            .unwrap_or_else(|| Utc.from_utc_datetime(naive))
    }
}

fn format_hour(hour: u32) -> String {
    let suffix = if hour % 24 < 12 { "AM" } else { "PM" };
    let display = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{display}:00 {suffix}")
}
