// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Loaded once at startup and passed explicitly to the services that need
//! it (date policy, QR issuance, identity verification).

use crate::time_utils::OrderWindow;
use chrono_tz::Tz;
use std::env;

/// Default civil timezone for business dates.
pub const DEFAULT_TIMEZONE: &str = "America/New_York";

/// Which persistence backend the server runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    /// In-process store for local development; data is lost on restart.
    Memory,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// GCP / Firebase project ID (Firestore project and ID-token audience)
    pub gcp_project_id: String,
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// Civil timezone used to compute business dates
    pub timezone: Tz,
    /// Order submission policy
    pub order_window: OrderWindow,
    /// Persistence backend
    pub store_backend: StoreBackend,

    // --- Secrets ---
    /// HMAC key used to sign daily QR codes (raw bytes)
    pub qr_secret: Vec<u8>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let timezone = parse_timezone(
            &env::var("APP_TIMEZONE").unwrap_or_else(|_| DEFAULT_TIMEZONE.to_string()),
        )?;

        let qr_secret = env::var("QR_SECRET")
            .map(|v| v.trim().to_string())
            .map_err(|_| ConfigError::Missing("QR_SECRET"))?;
        if qr_secret.is_empty() {
            return Err(ConfigError::Invalid {
                name: "QR_SECRET",
                reason: "must not be empty".to_string(),
            });
        }

        Ok(Self {
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            timezone,
            order_window: parse_order_window(
                env::var("ORDER_WINDOW").ok().as_deref(),
                env::var("ORDER_OPEN_HOUR").ok().as_deref(),
                env::var("ORDER_CLOSE_HOUR").ok().as_deref(),
            )?,
            store_backend: parse_store_backend(env::var("STORE_BACKEND").ok().as_deref())?,
            qr_secret: qr_secret.into_bytes(),
        })
    }

    /// Deterministic config for tests.
    pub fn test_default() -> Self {
        Self {
            gcp_project_id: "test-project".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            port: 8080,
            timezone: chrono_tz::America::New_York,
            order_window: OrderWindow::NextDay,
            store_backend: StoreBackend::Memory,
            qr_secret: b"test_qr_secret_32_bytes_minimum!".to_vec(),
        }
    }
}

fn parse_timezone(raw: &str) -> Result<Tz, ConfigError> {
    raw.trim()
        .parse::<Tz>()
        .map_err(|e| ConfigError::Invalid {
            name: "APP_TIMEZONE",
            reason: e.to_string(),
        })
}

fn parse_hour(name: &'static str, raw: Option<&str>, default: u32) -> Result<u32, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.trim().parse::<u32>() {
        Ok(hour) if hour <= 24 => Ok(hour),
        _ => Err(ConfigError::Invalid {
            name,
            reason: format!("expected an hour between 0 and 24, got {raw:?}"),
        }),
    }
}

fn parse_order_window(
    mode: Option<&str>,
    open_hour: Option<&str>,
    close_hour: Option<&str>,
) -> Result<OrderWindow, ConfigError> {
    match mode.map(str::trim).unwrap_or("next-day") {
        "next-day" => Ok(OrderWindow::NextDay),
        "same-day" => {
            let open_hour = parse_hour("ORDER_OPEN_HOUR", open_hour, 9)?;
            let close_hour = parse_hour("ORDER_CLOSE_HOUR", close_hour, 21)?;
            if open_hour >= close_hour {
                return Err(ConfigError::Invalid {
                    name: "ORDER_CLOSE_HOUR",
                    reason: "must be later than ORDER_OPEN_HOUR".to_string(),
                });
            }
            Ok(OrderWindow::SameDay {
                open_hour,
                close_hour,
            })
        }
        other => Err(ConfigError::Invalid {
            name: "ORDER_WINDOW",
            reason: format!("expected 'next-day' or 'same-day', got {other:?}"),
        }),
    }
}

fn parse_store_backend(raw: Option<&str>) -> Result<StoreBackend, ConfigError> {
    match raw.map(str::trim).unwrap_or("firestore") {
        "firestore" => Ok(StoreBackend::Firestore),
        "memory" => Ok(StoreBackend::Memory),
        other => Err(ConfigError::Invalid {
            name: "STORE_BACKEND",
            reason: format!("expected 'firestore' or 'memory', got {other:?}"),
        }),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}
