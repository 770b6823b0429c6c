// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! QR code routes: check-in scanning and admin issuance.

use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::{Attendance, QrCode};
use crate::routes::ApiResponse;
use crate::time_utils::{format_utc_rfc3339, DateKey};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/qr/scan", post(scan))
        .route("/qr/generate", post(generate))
        .route("/qr/today", get(today))
}

// ─── Check-in ────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScanRequest {
    qr_code: Option<String>,
}

#[derive(Serialize)]
struct ScanResponse {
    attendance: Attendance,
}

async fn scan(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    body: std::result::Result<Json<ScanRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<ScanResponse>>)> {
    let Json(body) = body?;
    let code = body
        .qr_code
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("QR code is required".to_string()))?;

    let attendance = state.attendance.record_check_in(&auth.user, &code).await?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message("Check-in successful!", ScanResponse { attendance }),
    ))
}

// ─── Admin: Issuance ─────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QrCodePayload {
    qr_code: QrCode,
}

async fn generate(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<(StatusCode, Json<ApiResponse<QrCodePayload>>)> {
    let (qr_code, created) = state.qr.issue_for_today(&auth.user).await?;

    let (status, message) = if created {
        (StatusCode::CREATED, "QR code generated successfully")
    } else {
        (StatusCode::OK, "QR code already exists for today")
    };

    Ok((status, ApiResponse::with_message(message, QrCodePayload { qr_code })))
}

/// The public part of today's code shown on the admin display.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ActiveQrCode {
    id: String,
    code: String,
    date: DateKey,
    expires_at: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TodayResponse {
    qr_code: ActiveQrCode,
}

async fn today(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ApiResponse<TodayResponse>>> {
    let qr = state.qr.get_active_for_today(&auth.user).await?;

    Ok(ApiResponse::ok(TodayResponse {
        qr_code: ActiveQrCode {
            expires_at: format_utc_rfc3339(qr.expires_at),
            id: qr.id,
            code: qr.code,
            date: qr.date,
        },
    }))
}
