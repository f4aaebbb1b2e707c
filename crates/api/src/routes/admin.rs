//! Back-office endpoints: order status, catalog, trials, offers and leads.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::Utc;
use common::{AccountId, ContactId, OrderId, PlanId, ProductId};
use domain::{
    CatalogError, ContactLead, ContactStatus, DurationType, Money, Offer, OfferDraft, OrderStatus,
    PaymentStatus, PricingPlan, Product,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use settlement::PaymentGateway;
use store::{ContactCounts, Store};

use crate::AppState;
use crate::error::ApiError;
use crate::session::parse_id;

/// Number of leads shown on the contact list.
const RECENT_CONTACTS: u32 = 20;

// -- Request types --

#[derive(Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

/// Refund of a paid order. No amount refunds it in full.
#[derive(Deserialize)]
pub struct RefundRequest {
    /// Major units.
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// New product. Prices are in major units.
#[derive(Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub plans: Vec<PlanRequest>,
}

#[derive(Deserialize)]
pub struct PlanRequest {
    pub duration_type: DurationType,
    pub duration_value: u32,
    pub price: Decimal,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Deserialize)]
pub struct TrialPriceRequest {
    /// Major units.
    pub trial_price: Decimal,
}

#[derive(Deserialize)]
pub struct UpdateContactRequest {
    pub status: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

#[derive(Serialize)]
pub struct OrderStatusResponse {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct RefundResponse {
    pub order_id: OrderId,
    pub refund_id: String,
    pub amount: Money,
    pub status: String,
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct ToggleResponse {
    pub active: bool,
    pub message: String,
}

#[derive(Serialize)]
pub struct TrialPriceResponse {
    pub trial_price: Money,
    pub updated: u64,
    pub message: String,
}

#[derive(Serialize)]
pub struct ContactListResponse {
    pub contacts: Vec<ContactLead>,
    #[serde(flatten)]
    pub counts: ContactCounts,
}

// -- Handlers --

/// PATCH /admin/orders/{id}/status
#[tracing::instrument(skip(state, req))]
pub async fn update_order_status<S: Store + Clone, G: PaymentGateway>(
    State(state): State<Arc<AppState<S, G>>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateOrderStatusRequest>,
) -> Result<Json<OrderStatusResponse>, ApiError> {
    let order_id: OrderId = parse_id(&id)?;
    let next: OrderStatus = req.status.trim().parse()?;

    let mut order = state
        .store
        .get_order(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {order_id} not found")))?;
    order.advance_status(next, Utc::now())?;
    state.store.update_order(&order).await?;

    tracing::info!(%order_id, status = %next, "order status changed");
    Ok(Json(OrderStatusResponse {
        order_id,
        status: order.status(),
        payment_status: order.payment_status(),
        message: "Order updated successfully.",
    }))
}

/// POST /admin/orders/{id}/reverify
///
/// Re-checks a failed payment with the processor.
#[tracing::instrument(skip(state))]
pub async fn reverify_payment<S: Store + Clone, G: PaymentGateway>(
    State(state): State<Arc<AppState<S, G>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderStatusResponse>, ApiError> {
    let order_id: OrderId = parse_id(&id)?;
    let outcome = state.settlement.reverify_payment(order_id).await?;

    let message = if outcome.is_paid() {
        "Payment verified. The order is now paid."
    } else {
        "Payment is still not captured."
    };
    Ok(Json(OrderStatusResponse {
        order_id,
        status: outcome.status,
        payment_status: outcome.payment_status,
        message,
    }))
}

/// POST /admin/orders/{id}/refund
#[tracing::instrument(skip(state, req))]
pub async fn refund_order<S: Store + Clone, G: PaymentGateway>(
    State(state): State<Arc<AppState<S, G>>>,
    Path(id): Path<String>,
    Json(req): Json<RefundRequest>,
) -> Result<Json<RefundResponse>, ApiError> {
    let order_id: OrderId = parse_id(&id)?;
    let amount = req
        .amount
        .map(|amount| {
            Money::from_decimal(amount)
                .ok_or_else(|| ApiError::BadRequest("Invalid refund amount".to_string()))
        })
        .transpose()?;
    let reason = req
        .reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());

    let refund = state
        .settlement
        .refund_payment(order_id, amount, reason)
        .await?;
    Ok(Json(RefundResponse {
        order_id,
        refund_id: refund.id,
        amount: refund.amount,
        status: refund.status,
        message: "Refund issued.",
    }))
}

/// POST /admin/products
///
/// Products created without plans get the default one-day trial plan.
#[tracing::instrument(skip(state, req), fields(name = %req.name))]
pub async fn create_product<S: Store + Clone, G: PaymentGateway>(
    State(state): State<Arc<AppState<S, G>>>,
    Json(req): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let product = build_product(req, state.trial_price)?;
    state.store.insert_product(&product).await?;

    tracing::info!(product_id = %product.id, plans = product.plans().len(), "product created");
    Ok((StatusCode::CREATED, Json(product)))
}

fn build_product(req: CreateProductRequest, trial_price: Money) -> Result<Product, ApiError> {
    let base_price = major_units(req.price)?;
    let mut product = Product::new(req.name, req.description, base_price, req.stock)?;
    if let Some(active) = req.active {
        product.active = active;
    }

    for (index, plan_req) in req.plans.into_iter().enumerate() {
        let label = plan_req
            .label
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| format!("{} {}", plan_req.duration_value, plan_req.duration_type));
        let mut plan = PricingPlan::new(
            product.id,
            plan_req.duration_type,
            plan_req.duration_value,
            major_units(plan_req.price)?,
            label,
        )?;
        plan.is_default = plan_req.is_default;
        plan.sort_order = i32::try_from(index).unwrap_or(i32::MAX);
        product.add_plan(plan)?;
    }

    let first_plan = product.ordered_plans().first().map(|p| p.id);
    if product.default_plan().is_none()
        && let Some(first) = first_plan
    {
        product.set_default_plan(first)?;
    }
    product.ensure_default_trial(trial_price)?;

    Ok(product)
}

fn major_units(amount: Decimal) -> Result<Money, ApiError> {
    Money::from_decimal(amount).ok_or_else(|| CatalogError::PriceOutOfRange(amount).into())
}

/// PATCH /admin/products/{id}/toggle
pub async fn toggle_product<S: Store + Clone, G: PaymentGateway>(
    State(state): State<Arc<AppState<S, G>>>,
    Path(id): Path<String>,
) -> Result<Json<ToggleResponse>, ApiError> {
    let product_id: ProductId = parse_id(&id)?;
    let active = state
        .store
        .toggle_product(product_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Product {product_id} not found")))?;

    Ok(Json(ToggleResponse {
        active,
        message: format!("Product has been {}.", toggled(active)),
    }))
}

/// PATCH /admin/plans/{id}/toggle
pub async fn toggle_plan<S: Store + Clone, G: PaymentGateway>(
    State(state): State<Arc<AppState<S, G>>>,
    Path(id): Path<String>,
) -> Result<Json<ToggleResponse>, ApiError> {
    let plan_id: PlanId = parse_id(&id)?;
    let active = state
        .store
        .toggle_plan(plan_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Plan {plan_id} not found")))?;

    Ok(Json(ToggleResponse {
        active,
        message: format!("Plan has been {}.", toggled(active)),
    }))
}

fn toggled(active: bool) -> &'static str {
    if active { "activated" } else { "deactivated" }
}

/// POST /admin/products/trial-price
#[tracing::instrument(skip(state, req), fields(trial_price = %req.trial_price))]
pub async fn update_trial_price<S: Store + Clone, G: PaymentGateway>(
    State(state): State<Arc<AppState<S, G>>>,
    Json(req): Json<TrialPriceRequest>,
) -> Result<Json<TrialPriceResponse>, ApiError> {
    let price = major_units(req.trial_price)?;
    if !price.is_positive() {
        return Err(CatalogError::InvalidPrice { price }.into());
    }
    let updated = state.store.update_trial_prices(price).await?;

    Ok(Json(TrialPriceResponse {
        trial_price: price,
        updated,
        message: format!("Updated trial price to {price} for {updated} plans."),
    }))
}

/// POST /admin/accounts/{account_id}/trials/{product_id}/reset
pub async fn reset_trial<S: Store + Clone, G: PaymentGateway>(
    State(state): State<Arc<AppState<S, G>>>,
    Path((account_id, product_id)): Path<(String, String)>,
) -> Result<Json<MessageResponse>, ApiError> {
    let account_id: AccountId = parse_id(&account_id)?;
    let product_id: ProductId = parse_id(&product_id)?;

    if !state.store.reset_trial(account_id, product_id).await? {
        return Err(ApiError::NotFound(
            "No trial usage recorded for this account and product".to_string(),
        ));
    }
    tracing::info!(%account_id, %product_id, "trial usage reset");
    Ok(MessageResponse::new("Trial has been reset."))
}

/// POST /admin/offers
#[tracing::instrument(skip(state, draft), fields(code = %draft.code))]
pub async fn create_offer<S: Store + Clone, G: PaymentGateway>(
    State(state): State<Arc<AppState<S, G>>>,
    Json(draft): Json<OfferDraft>,
) -> Result<(StatusCode, Json<Offer>), ApiError> {
    let offer = draft.into_offer()?;
    state.store.insert_offer(&offer).await?;
    Ok((StatusCode::CREATED, Json(offer)))
}

/// GET /admin/contacts
pub async fn list_contacts<S: Store + Clone, G: PaymentGateway>(
    State(state): State<Arc<AppState<S, G>>>,
) -> Result<Json<ContactListResponse>, ApiError> {
    let contacts = state.store.recent_contacts(RECENT_CONTACTS).await?;
    let counts = state.store.contact_counts().await?;
    Ok(Json(ContactListResponse { contacts, counts }))
}

/// PATCH /admin/contacts/{id}
pub async fn update_contact<S: Store + Clone, G: PaymentGateway>(
    State(state): State<Arc<AppState<S, G>>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateContactRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let contact_id: ContactId = parse_id(&id)?;
    let status: ContactStatus = req
        .status
        .trim()
        .parse()
        .map_err(|e: domain::ContactError| ApiError::BadRequest(e.to_string()))?;

    if !state.store.update_contact_status(contact_id, status).await? {
        return Err(ApiError::NotFound(format!("Contact {contact_id} not found")));
    }
    Ok(MessageResponse::new("Contact status updated successfully."))
}

/// DELETE /admin/contacts/{id}
pub async fn delete_contact<S: Store + Clone, G: PaymentGateway>(
    State(state): State<Arc<AppState<S, G>>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let contact_id: ContactId = parse_id(&id)?;
    if !state.store.delete_contact(contact_id).await? {
        return Err(ApiError::NotFound(format!("Contact {contact_id} not found")));
    }
    Ok(MessageResponse::new("Contact deleted successfully."))
}
