//! Order history endpoints for the signed-in account.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use chrono::{DateTime, Utc};
use common::OrderId;
use domain::{Money, Order, OrderStatus, PaymentStatus};
use serde::Serialize;
use settlement::PaymentGateway;
use store::Store;

use crate::AppState;
use crate::error::ApiError;
use crate::session::{Session, parse_id};

#[derive(Serialize)]
pub struct OrderSummary {
    pub id: OrderId,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub item_count: u64,
    pub subtotal: Money,
    pub total_discount: Money,
    pub total_amount: Money,
    pub offer_codes: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Order> for OrderSummary {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id(),
            status: order.status(),
            payment_status: order.payment_status(),
            item_count: order.total_quantity(),
            subtotal: order.subtotal(),
            total_discount: order.total_discount(),
            total_amount: order.total_amount(),
            offer_codes: order
                .applied_offers()
                .iter()
                .map(|applied| applied.code.clone())
                .collect(),
            created_at: order.created_at(),
        }
    }
}

/// GET /orders — the account's orders, most recent first.
pub async fn list<S: Store + Clone, G: PaymentGateway>(
    State(state): State<Arc<AppState<S, G>>>,
    session: Session,
) -> Result<Json<Vec<OrderSummary>>, ApiError> {
    let account_id = session.require_account("/orders")?;
    let orders = state.store.list_orders_for_account(account_id).await?;
    Ok(Json(orders.iter().map(OrderSummary::from).collect()))
}

/// GET /orders/{id} — full order with line items and applied offers.
///
/// Orders of other accounts are reported as missing.
pub async fn get<S: Store + Clone, G: PaymentGateway>(
    State(state): State<Arc<AppState<S, G>>>,
    session: Session,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let order_id: OrderId = parse_id(&id)?;
    let account_id = session.require_account(&format!("/orders/{order_id}"))?;

    let order = state
        .store
        .get_order(order_id)
        .await?
        .filter(|order| order.account_id() == account_id)
        .ok_or_else(|| ApiError::NotFound(format!("Order {order_id} not found")))?;

    Ok(Json(order))
}
