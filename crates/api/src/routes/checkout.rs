//! Checkout endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use common::OrderId;
use domain::Money;
use serde::{Deserialize, Serialize};
use settlement::{CheckoutRequest, PaymentGateway};
use store::Store;

use crate::AppState;
use crate::error::ApiError;
use crate::session::Session;

const ORDER_CREATED_MESSAGE: &str = "Order created successfully! Please complete the payment.";

#[derive(Deserialize)]
pub struct CheckoutBody {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub offer_codes: Vec<String>,
}

#[derive(Serialize)]
pub struct CheckoutResponse {
    pub order_id: OrderId,
    pub remote_order_id: String,
    pub amount: Money,
    pub currency: String,
    pub message: &'static str,
    /// Where the client continues to complete payment.
    pub redirect: String,
}

/// POST /checkout — turns the session cart into a pending order.
#[tracing::instrument(skip(state, session, body), fields(session_id = %session.session_id))]
pub async fn create<S: Store + Clone, G: PaymentGateway>(
    State(state): State<Arc<AppState<S, G>>>,
    session: Session,
    Json(body): Json<CheckoutBody>,
) -> Result<(StatusCode, Json<CheckoutResponse>), ApiError> {
    let receipt = state
        .settlement
        .checkout(CheckoutRequest {
            session_id: session.session_id,
            account_id: session.account_id,
            email: body.email,
            offer_codes: body.offer_codes,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            redirect: format!("/payment/{}", receipt.order_id),
            order_id: receipt.order_id,
            remote_order_id: receipt.remote_order_id,
            amount: receipt.amount,
            currency: receipt.currency,
            message: ORDER_CREATED_MESSAGE,
        }),
    ))
}
