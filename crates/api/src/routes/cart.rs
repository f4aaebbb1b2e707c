//! Session cart endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::{PlanId, ProductId};
use domain::{Cart, DurationType, Money};
use serde::{Deserialize, Serialize};
use settlement::{AddToCart, CartUpdate, PaymentGateway};
use store::Store;

use crate::AppState;
use crate::error::ApiError;
use crate::session::{Session, parse_id};

// -- Request types --

#[derive(Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: i64,
}

// -- Response types --

#[derive(Serialize)]
pub struct CartResponse {
    pub lines: Vec<CartLineResponse>,
    pub cart_count: u64,
    pub cart_total: Money,
}

#[derive(Serialize)]
pub struct CartLineResponse {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub line_total: Money,
    pub plan: Option<CartPlanResponse>,
}

#[derive(Serialize)]
pub struct CartPlanResponse {
    pub plan_id: PlanId,
    pub duration_type: DurationType,
    pub duration_value: u32,
    pub trial: bool,
}

#[derive(Serialize)]
pub struct CartMutationResponse {
    pub success: bool,
    #[serde(flatten)]
    pub update: CartUpdate,
}

impl From<CartUpdate> for CartMutationResponse {
    fn from(update: CartUpdate) -> Self {
        Self {
            success: true,
            update,
        }
    }
}

impl From<Cart> for CartResponse {
    fn from(cart: Cart) -> Self {
        let lines = cart
            .lines()
            .iter()
            .map(|line| CartLineResponse {
                product_id: line.product_id,
                product_name: line.product_name.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price(),
                line_total: line.line_total(),
                plan: line.plan.map(|plan| CartPlanResponse {
                    plan_id: plan.plan_id,
                    duration_type: plan.duration_type,
                    duration_value: plan.duration_value,
                    trial: plan.is_trial(),
                }),
            })
            .collect();

        Self {
            lines,
            cart_count: cart.total_items(),
            cart_total: cart.total_amount(),
        }
    }
}

// -- Handlers --

/// GET /cart
pub async fn show<S: Store + Clone, G: PaymentGateway>(
    State(state): State<Arc<AppState<S, G>>>,
    session: Session,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = state.cart.view(&session.session_id).await?;
    Ok(Json(cart.into()))
}

/// POST /cart/items
#[tracing::instrument(skip(state, session, req), fields(session_id = %session.session_id))]
pub async fn add<S: Store + Clone, G: PaymentGateway>(
    State(state): State<Arc<AppState<S, G>>>,
    session: Session,
    Json(req): Json<AddToCart>,
) -> Result<Json<CartMutationResponse>, ApiError> {
    let update = state
        .cart
        .add_item(&session.session_id, session.account_id, req)
        .await?;
    Ok(Json(update.into()))
}

/// PATCH /cart/items/{product_id}
pub async fn update<S: Store + Clone, G: PaymentGateway>(
    State(state): State<Arc<AppState<S, G>>>,
    session: Session,
    Path(product_id): Path<String>,
    Json(req): Json<UpdateQuantityRequest>,
) -> Result<Json<CartMutationResponse>, ApiError> {
    let product_id: ProductId = parse_id(&product_id)?;
    let update = state
        .cart
        .update_quantity(&session.session_id, product_id, req.quantity)
        .await?;
    Ok(Json(update.into()))
}

/// DELETE /cart/items/{product_id}
pub async fn remove<S: Store + Clone, G: PaymentGateway>(
    State(state): State<Arc<AppState<S, G>>>,
    session: Session,
    Path(product_id): Path<String>,
) -> Result<Json<CartMutationResponse>, ApiError> {
    let product_id: ProductId = parse_id(&product_id)?;
    let update = state.cart.remove_item(&session.session_id, product_id).await?;
    Ok(Json(update.into()))
}

/// DELETE /cart
pub async fn clear<S: Store + Clone, G: PaymentGateway>(
    State(state): State<Arc<AppState<S, G>>>,
    session: Session,
) -> Result<Json<CartMutationResponse>, ApiError> {
    let update = state.cart.clear(&session.session_id).await?;
    Ok(Json(update.into()))
}
