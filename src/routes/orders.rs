// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Order routes.

use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::{BagelType, Order, OrderSelection};
use crate::routes::{validate_body, ApiResponse};
use crate::services::{BatchConfirmResult, DailyOrders};
use crate::time_utils::{DateKey, DateKeyError, OrderGate};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/orders",
            get(get_my_order)
                .post(create_order)
                .put(confirm_order)
                .patch(confirm_all_pending),
        )
        .route("/orders/today", get(list_today))
        .route("/orders/tomorrow", get(list_tomorrow))
}

// ─── Current User's Order ────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MyOrderResponse {
    date: DateKey,
    order: Option<Order>,
    ordering: OrderGate,
}

/// The caller's order for the current target date, or `null`.
async fn get_my_order(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ApiResponse<MyOrderResponse>>> {
    let date = state.policy.order_target_date();
    let order = state.orders.get_order(&auth.user, &date).await?;

    Ok(ApiResponse::ok(MyOrderResponse {
        date,
        order,
        ordering: state.policy.orders_allowed(),
    }))
}

// ─── Create ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct CreateOrderRequest {
    /// Absent or null is an invalid selection, not a malformed body
    #[serde(default)]
    bagel_type: Option<String>,
    #[serde(default)]
    with_potatoes: bool,
    #[serde(default)]
    with_cheese: bool,
    #[serde(default)]
    #[validate(length(max = 500, message = "Dietary notes must be at most 500 characters"))]
    dietary_notes: String,
    #[serde(default)]
    #[validate(length(max = 500, message = "Special requests must be at most 500 characters"))]
    special_requests: String,
}

impl CreateOrderRequest {
    fn into_selection(self) -> Result<OrderSelection> {
        let bagel_type: BagelType = self
            .bagel_type
            .as_deref()
            .unwrap_or_default()
            .trim()
            .parse()?;
        Ok(OrderSelection {
            bagel_type,
            with_potatoes: self.with_potatoes,
            with_cheese: self.with_cheese,
            dietary_notes: self.dietary_notes.trim().to_string(),
            special_requests: self.special_requests.trim().to_string(),
        })
    }
}

#[derive(Serialize)]
struct OrderPayload {
    order: Order,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    body: std::result::Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<OrderPayload>>)> {
    let Json(body) = body?;
    validate_body(&body)?;

    let selection = body.into_selection()?;
    let date = state.policy.order_target_date();
    let order = state.orders.create_order(&auth.user, date, selection).await?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message("Order created successfully", OrderPayload { order }),
    ))
}

// ─── Admin: Confirmation ─────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfirmOrderRequest {
    order_id: Option<String>,
}

async fn confirm_order(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    body: std::result::Result<Json<ConfirmOrderRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<OrderPayload>>> {
    let Json(body) = body?;
    let order_id = body
        .order_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("orderId is required".to_string()))?;

    let order = state.orders.confirm_order(&auth.user, &order_id).await?;

    Ok(ApiResponse::with_message(
        "Order confirmed",
        OrderPayload { order },
    ))
}

#[derive(Deserialize)]
struct ConfirmAllRequest {
    date: Option<String>,
}

async fn confirm_all_pending(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    body: std::result::Result<Json<ConfirmAllRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<BatchConfirmResult>>> {
    let Json(body) = body?;
    let raw = body
        .date
        .ok_or_else(|| AppError::BadRequest("date is required".to_string()))?;
    let date: DateKey = raw
        .parse()
        .map_err(|e: DateKeyError| AppError::BadRequest(e.to_string()))?;

    let result = state.orders.confirm_all_pending(&auth.user, &date).await?;
    let message = format!("Confirmed {} orders for {date}", result.confirmed_count);

    Ok(ApiResponse::with_message(message, result))
}

// ─── Daily Listings ──────────────────────────────────────────

#[derive(Serialize)]
struct DailyOrdersResponse {
    date: DateKey,
    #[serde(flatten)]
    listing: DailyOrders,
}

async fn list_for(
    state: &AppState,
    date: DateKey,
) -> Result<Json<ApiResponse<DailyOrdersResponse>>> {
    let listing = state.orders.list_orders_for_date(&date).await?;
    Ok(ApiResponse::ok(DailyOrdersResponse { date, listing }))
}

async fn list_today(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<DailyOrdersResponse>>> {
    let date = state.policy.business_date();
    list_for(&state, date).await
}

async fn list_tomorrow(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<DailyOrdersResponse>>> {
    let date = state.policy.business_date().next_day();
    list_for(&state, date).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuleViolation;

    fn request(json: serde_json::Value) -> CreateOrderRequest {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_optional_fields_default() {
        let body = request(serde_json::json!({ "bagelType": "sesame" }));
        assert!(body.validate().is_ok());
        let selection = body.into_selection().unwrap();
        assert_eq!(selection, OrderSelection::new(BagelType::Sesame));
    }

    #[test]
    fn test_unknown_bagel_type_is_rule_violation() {
        let body = request(serde_json::json!({ "bagelType": "croissant" }));
        let err = body.into_selection().unwrap_err();
        assert_eq!(
            err.rule(),
            Some(&RuleViolation::InvalidSelection("croissant".to_string()))
        );
    }

    #[test]
    fn test_missing_bagel_type_is_rule_violation() {
        for json in [
            serde_json::json!({}),
            serde_json::json!({ "bagelType": null, "withCheese": true }),
            serde_json::json!({ "bagelType": "  " }),
        ] {
            let err = request(json).into_selection().unwrap_err();
            assert_eq!(err.rule(), Some(&RuleViolation::InvalidSelection(String::new())));
        }
    }

    #[test]
    fn test_notes_length_limit() {
        let body = request(serde_json::json!({
            "bagelType": "plain",
            "dietaryNotes": "x".repeat(501),
        }));
        assert!(body.validate().is_err());

        let body = request(serde_json::json!({
            "bagelType": "plain",
            "specialRequests": "x".repeat(500),
        }));
        assert!(body.validate().is_ok());
    }
}
