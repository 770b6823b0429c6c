// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Order Manager: one order per user per day, admin confirmation.

use crate::db::Store;
use crate::error::{AppError, Result, RuleViolation};
use crate::models::{Order, OrderSelection, OrderStatus, User, UserSummary};
use crate::time_utils::{DateKey, DatePolicy};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Outcome of a best-effort batch confirmation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchConfirmResult {
    pub confirmed_count: usize,
    pub failed_ids: Vec<String>,
}

/// Read-time aggregation over one day's orders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub total_orders: usize,
    pub bagel_breakdown: BTreeMap<String, u32>,
    pub with_potatoes: u32,
    pub with_cheese: u32,
}

impl OrderSummary {
    pub fn from_orders<'a>(orders: impl IntoIterator<Item = &'a Order>) -> Self {
        let mut summary = Self::default();
        for order in orders {
            summary.total_orders += 1;
            *summary
                .bagel_breakdown
                .entry(order.bagel_type.to_string())
                .or_default() += 1;
            if order.with_potatoes {
                summary.with_potatoes += 1;
            }
            if order.with_cheese {
                summary.with_cheese += 1;
            }
        }
        summary
    }
}

/// An order joined with who placed it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderWithUser {
    #[serde(flatten)]
    pub order: Order,
    pub user: UserSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyOrders {
    pub orders: Vec<OrderWithUser>,
    pub summary: OrderSummary,
}

pub struct OrderService {
    store: Arc<dyn Store>,
    policy: DatePolicy,
}

impl OrderService {
    pub fn new(store: Arc<dyn Store>, policy: DatePolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &DatePolicy {
        &self.policy
    }

    /// Place `user`'s order for `date`.
    ///
    /// The existence check is a fast path; the conditional create is what
    /// actually guarantees a single order per (user, date).
    pub async fn create_order(
        &self,
        user: &User,
        date: DateKey,
        selection: OrderSelection,
    ) -> Result<Order> {
        let gate = self.policy.orders_allowed();
        if !gate.allowed {
            return Err(RuleViolation::WindowClosed(gate.reason.unwrap_or_default()).into());
        }

        if self.store.find_order(&user.uid, &date).await?.is_some() {
            return Err(RuleViolation::DuplicateOrder.into());
        }

        let order = Order::new_pending(&user.uid, date, selection, self.policy.now());
        if !self.store.create_order(&order).await? {
            return Err(RuleViolation::DuplicateOrder.into());
        }

        tracing::info!(
            user_id = %user.uid,
            date = %order.date,
            order_id = %order.id,
            bagel_type = %order.bagel_type,
            "Order created"
        );

        Ok(order)
    }

    pub async fn get_order(&self, user: &User, date: &DateKey) -> Result<Option<Order>> {
        self.store.find_order(&user.uid, date).await
    }

    /// Mark one order confirmed. Confirming an already-confirmed order is a no-op.
    pub async fn confirm_order(&self, admin: &User, order_id: &str) -> Result<Order> {
        if !admin.is_admin {
            return Err(AppError::admin_required("confirm orders"));
        }

        let mut order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {order_id} not found")))?;

        if order.is_pending() {
            order.status = OrderStatus::Confirmed;
            self.store.update_order(&order).await?;
            tracing::info!(order_id = %order.id, admin_id = %admin.uid, "Order confirmed");
        }

        Ok(order)
    }

    /// Confirm every pending order for `date`, one at a time.
    ///
    /// Per-order failures are collected in `failed_ids`; the batch never aborts.
    pub async fn confirm_all_pending(
        &self,
        admin: &User,
        date: &DateKey,
    ) -> Result<BatchConfirmResult> {
        if !admin.is_admin {
            return Err(AppError::admin_required("confirm orders"));
        }

        let pending: Vec<Order> = self
            .store
            .list_orders_for_date(date)
            .await?
            .into_iter()
            .filter(Order::is_pending)
            .collect();

        let mut result = BatchConfirmResult::default();
        for mut order in pending {
            order.status = OrderStatus::Confirmed;
            match self.store.update_order(&order).await {
                Ok(()) => result.confirmed_count += 1,
                Err(e) => {
                    tracing::warn!(order_id = %order.id, error = %e, "Failed to confirm order");
                    result.failed_ids.push(order.id);
                }
            }
        }

        tracing::info!(
            date = %date,
            admin_id = %admin.uid,
            confirmed = result.confirmed_count,
            failed = result.failed_ids.len(),
            "Batch order confirmation finished"
        );

        Ok(result)
    }

    /// All orders for `date`, oldest first, with the day's summary.
    pub async fn list_orders_for_date(&self, date: &DateKey) -> Result<DailyOrders> {
        let mut orders = self.store.list_orders_for_date(date).await?;
        orders.sort_by_key(|o| o.order_timestamp);

        let summary = OrderSummary::from_orders(&orders);

        let mut user_ids: Vec<String> = orders.iter().map(|o| o.user_id.clone()).collect();
        user_ids.sort();
        user_ids.dedup();
        let users = self.store.get_users(&user_ids).await?;

        let orders = orders
            .into_iter()
            .map(|order| OrderWithUser {
                user: UserSummary::from_user(users.get(&order.user_id), &order.user_id),
                order,
            })
            .collect();

        Ok(DailyOrders { orders, summary })
    }
}
