//! Payment-completion endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::OrderId;
use domain::{OrderStatus, PaymentStatus};
use serde::{Deserialize, Serialize};
use settlement::{PaymentCallback, PaymentGateway, PaymentPage};
use store::Store;

use crate::AppState;
use crate::error::ApiError;
use crate::session::parse_id;

const PAYMENT_SUCCESS_MESSAGE: &str = "Payment successful! Your order has been confirmed.";
const PAYMENT_FAILED_MESSAGE: &str = "Payment verification failed. Please contact support.";

/// Fields posted back by the gateway's checkout widget.
#[derive(Deserialize)]
pub struct CallbackBody {
    pub payment_id: String,
    pub remote_order_id: String,
    pub signature: String,
}

#[derive(Serialize)]
pub struct CallbackResponse {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub message: &'static str,
    pub redirect: String,
}

/// GET /payment/{order_id}
pub async fn show<S: Store + Clone, G: PaymentGateway>(
    State(state): State<Arc<AppState<S, G>>>,
    Path(order_id): Path<String>,
) -> Result<Json<PaymentPage>, ApiError> {
    let order_id: OrderId = parse_id(&order_id)?;
    let page = state.settlement.payment_page(order_id).await?;
    Ok(Json(page))
}

/// POST /payment/{order_id}/callback
///
/// A rejected verification is not an HTTP error: the order is marked failed
/// and the response says so.
#[tracing::instrument(skip(state, body))]
pub async fn callback<S: Store + Clone, G: PaymentGateway>(
    State(state): State<Arc<AppState<S, G>>>,
    Path(order_id): Path<String>,
    Json(body): Json<CallbackBody>,
) -> Result<Json<CallbackResponse>, ApiError> {
    let order_id: OrderId = parse_id(&order_id)?;
    let outcome = state
        .settlement
        .complete_payment(
            order_id,
            PaymentCallback {
                payment_id: body.payment_id,
                remote_order_id: body.remote_order_id,
                signature: body.signature,
            },
        )
        .await?;

    let message = if outcome.is_paid() {
        PAYMENT_SUCCESS_MESSAGE
    } else {
        PAYMENT_FAILED_MESSAGE
    };
    Ok(Json(CallbackResponse {
        order_id: outcome.order_id,
        status: outcome.status,
        payment_status: outcome.payment_status,
        message,
        redirect: format!("/orders/{}", outcome.order_id),
    }))
}
