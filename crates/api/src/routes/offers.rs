//! Offer listing and preview endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use chrono::{DateTime, Utc};
use domain::{DiscountKind, Money, Offer, OfferPreview};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use settlement::PaymentGateway;
use store::Store;

use crate::AppState;
use crate::error::ApiError;
use crate::session::Session;

#[derive(Deserialize)]
pub struct PreviewRequest {
    pub code: String,
}

#[derive(Serialize)]
pub struct OfferResponse {
    pub code: String,
    pub name: String,
    pub description: String,
    pub discount_type: DiscountKind,
    /// Percent, or minor units for fixed discounts.
    pub discount_value: Decimal,
    pub display: String,
    pub minimum_amount: Money,
    pub valid_until: DateTime<Utc>,
}

impl From<&Offer> for OfferResponse {
    fn from(offer: &Offer) -> Self {
        Self {
            code: offer.code.clone(),
            name: offer.name.clone(),
            description: offer.description.clone(),
            discount_type: offer.discount.kind(),
            discount_value: offer.discount.value(),
            display: offer.display_discount(),
            minimum_amount: offer.minimum_amount,
            valid_until: offer.valid_until,
        }
    }
}

/// GET /offers — offers that are active and inside their validity window.
pub async fn list<S: Store + Clone, G: PaymentGateway>(
    State(state): State<Arc<AppState<S, G>>>,
) -> Result<Json<Vec<OfferResponse>>, ApiError> {
    let offers = state.store.list_available_offers(Utc::now()).await?;
    Ok(Json(offers.iter().map(OfferResponse::from).collect()))
}

/// POST /checkout/offers/preview
pub async fn preview<S: Store + Clone, G: PaymentGateway>(
    State(state): State<Arc<AppState<S, G>>>,
    session: Session,
    Json(req): Json<PreviewRequest>,
) -> Result<Json<OfferPreview>, ApiError> {
    let preview = state
        .settlement
        .preview_offer(&session.session_id, &req.code)
        .await?;
    Ok(Json(preview))
}
