// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Lenient timestamp normalization for stored documents.
//!
//! Documents written by earlier clients carry timestamps in several shapes.
//! [`RawTimestamp`] names each shape and [`RawTimestamp::normalize`] tries
//! them in a fixed priority order. When nothing matches, readers fall back
//! to the current instant and log a warning so old documents stay usable.
//!
//! The [`lenient`] serde adapter cannot see the application clock, so its
//! fallback is the system time. Code holding a clock should read the value
//! with [`RawTimestamp::from_value`] and call [`RawTimestamp::normalize_or`].

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// A timestamp as it may appear in storage, in normalization priority order.
#[derive(Debug, Clone)]
pub enum RawTimestamp {
    /// Already a native instant.
    Instant(DateTime<Utc>),
    /// A Firestore timestamp value, which converts to an instant.
    Firestore(firestore::FirestoreTimestamp),
    /// `{ seconds, nanoseconds }`
    Parts { seconds: i64, nanoseconds: i64 },
    /// `{ _seconds, _nanoseconds }`
    UnderscoreParts { seconds: i64, nanoseconds: i64 },
    /// ISO-8601 / RFC 3339, or "June 1, 2024 at 9:30:00 AM UTC-4".
    Text(String),
    /// Milliseconds since the Unix epoch.
    EpochMillis(i64),
    /// Anything else.
    Unrecognized(serde_json::Value),
}

/// Wire shapes, tried top to bottom by serde.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireTimestamp {
    Parts {
        seconds: i64,
        nanoseconds: i64,
    },
    UnderscoreParts {
        #[serde(rename = "_seconds")]
        seconds: i64,
        #[serde(rename = "_nanoseconds")]
        nanoseconds: i64,
    },
    Text(String),
    EpochMillis(i64),
    EpochMillisFloat(f64),
    Other(serde_json::Value),
}

impl From<WireTimestamp> for RawTimestamp {
    fn from(wire: WireTimestamp) -> Self {
        match wire {
            WireTimestamp::Parts {
                seconds,
                nanoseconds,
            } => Self::Parts {
                seconds,
                nanoseconds,
            },
            WireTimestamp::UnderscoreParts {
                seconds,
                nanoseconds,
            } => Self::UnderscoreParts {
                seconds,
                nanoseconds,
            },
            WireTimestamp::Text(text) => Self::Text(text),
            WireTimestamp::EpochMillis(ms) => Self::EpochMillis(ms),
            WireTimestamp::EpochMillisFloat(ms) if ms.is_finite() => {
                Self::EpochMillis(ms.trunc() as i64)
            }
            WireTimestamp::EpochMillisFloat(ms) => Self::Unrecognized(serde_json::json!(ms)),
            WireTimestamp::Other(value) => Self::Unrecognized(value),
        }
    }
}

impl RawTimestamp {
    /// Classify an arbitrary JSON value.
    pub fn from_value(value: serde_json::Value) -> Self {
        match serde_json::from_value::<WireTimestamp>(value.clone()) {
            Ok(wire) => wire.into(),
            Err(_) => Self::Unrecognized(value),
        }
    }

    /// Convert to an instant, or `None` if the value is not a recognizable timestamp.
    pub fn normalize(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Instant(instant) => Some(*instant),
            Self::Firestore(ts) => Some(ts.0),
            Self::Parts {
                seconds,
                nanoseconds,
            }
            | Self::UnderscoreParts {
                seconds,
                nanoseconds,
            } => from_parts(*seconds, *nanoseconds),
            Self::Text(text) => parse_iso(text).or_else(|| parse_console_format(text)),
            Self::EpochMillis(ms) => DateTime::from_timestamp_millis(*ms),
            Self::Unrecognized(_) => None,
        }
    }

    /// Like [`normalize`](Self::normalize), falling back to `now` (with a warning).
    pub fn normalize_or(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.normalize().unwrap_or_else(|| {
            tracing::warn!(raw = ?self, "Unrecognized timestamp, substituting current time");
            now
        })
    }
}

fn from_parts(seconds: i64, nanoseconds: i64) -> Option<DateTime<Utc>> {
    if !(0..NANOS_PER_SEC).contains(&nanoseconds) {
        return None;
    }
    DateTime::from_timestamp(seconds, nanoseconds as u32)
}

fn parse_iso(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    // Offset-less ISO forms are taken as UTC.
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Parse the Firebase console rendering: "June 1, 2024 at 9:30:00 AM UTC-4".
fn parse_console_format(text: &str) -> Option<DateTime<Utc>> {
    let text = text.replace(['\u{202f}', '\u{a0}'], " ");
    let (date_part, rest) = text.split_once(" at ")?;
    let (time_part, zone_part) = rest.trim().rsplit_once(' ')?;
    let offset = parse_utc_offset(zone_part)?;

    let naive = NaiveDateTime::parse_from_str(
        &format!("{} {}", date_part.trim(), time_part.trim()),
        "%B %d, %Y %I:%M:%S %p",
    )
    .ok()?;

    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// "UTC", "UTC-4", "UTC+5:30"
fn parse_utc_offset(zone: &str) -> Option<FixedOffset> {
    let rest = zone.strip_prefix("UTC")?;
    if rest.is_empty() {
        return FixedOffset::east_opt(0);
    }

    let (sign, digits) = match rest.split_at(1) {
        ("+", digits) => (1, digits),
        ("-", digits) => (-1, digits),
        _ => return None,
    };
    let (hours, minutes) = digits.split_once(':').unwrap_or((digits, "0"));
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 14 || minutes >= 60 {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Serde adapter for required timestamp fields: writes RFC 3339, reads any
/// recognized shape.
///
/// Unrecognized values read as `Utc::now()`, not the injected clock.
pub mod lenient {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&crate::time_utils::format_utc_rfc3339(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw: RawTimestamp = WireTimestamp::deserialize(deserializer)?.into();
        Ok(raw.normalize_or(Utc::now()))
    }
}
