// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Attendance listing route.

use crate::error::{AppError, Result};
use crate::routes::ApiResponse;
use crate::services::AttendanceEntry;
use crate::time_utils::DateKey;
use crate::AppState;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/attendance", get(list_attendance))
}

#[derive(Deserialize)]
struct AttendanceQuery {
    /// Business date (YYYY-MM-DD); defaults to today
    date: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AttendanceResponse {
    date: DateKey,
    attendance: Vec<AttendanceEntry>,
    total_count: usize,
}

async fn list_attendance(
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Query<AttendanceQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<AttendanceResponse>>> {
    let Query(query) = query?;

    let date = match query.date.as_deref().map(str::trim) {
        None | Some("") => state.policy.business_date(),
        Some(raw) => raw.parse::<DateKey>().map_err(|_| {
            AppError::BadRequest("Invalid 'date' parameter: expected YYYY-MM-DD".to_string())
        })?,
    };

    let attendance = state.attendance.list_attendance(Some(date)).await?;

    Ok(ApiResponse::ok(AttendanceResponse {
        date,
        total_count: attendance.len(),
        attendance,
    }))
}
