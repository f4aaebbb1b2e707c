//! Storefront catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::{AccountId, PlanId, ProductId};
use domain::{DurationType, Money, Product};
use serde::Serialize;
use settlement::PaymentGateway;
use store::Store;

use crate::AppState;
use crate::error::ApiError;
use crate::session::{Session, parse_id};

#[derive(Serialize)]
pub struct ProductResponse {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub in_stock: bool,
    pub plans: Vec<PlanResponse>,
}

#[derive(Serialize)]
pub struct PlanResponse {
    pub id: PlanId,
    pub label: String,
    pub duration_type: DurationType,
    pub duration_value: u32,
    pub display_duration: String,
    pub price: Money,
    pub is_default: bool,
    pub trial: bool,
    /// Set when the signed-in account already consumed this trial.
    pub trial_used: bool,
}

impl ProductResponse {
    fn new(product: &Product, trial_used: bool) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.base_price,
            in_stock: product.in_stock(),
            plans: product
                .active_plans()
                .into_iter()
                .map(|plan| PlanResponse {
                    id: plan.id,
                    label: plan.label.clone(),
                    duration_type: plan.duration_type,
                    duration_value: plan.duration_value,
                    display_duration: plan.display_duration(),
                    price: plan.price,
                    is_default: plan.is_default,
                    trial: plan.is_trial(),
                    trial_used: trial_used && plan.is_trial(),
                })
                .collect(),
        }
    }
}

/// GET /products — active products with their active plans.
pub async fn list<S: Store + Clone, G: PaymentGateway>(
    State(state): State<Arc<AppState<S, G>>>,
    session: Option<Session>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let account_id = session.and_then(|s| s.account_id);
    let products = state.store.list_products(true).await?;

    let mut response = Vec::with_capacity(products.len());
    for product in &products {
        let used = trial_used(&state.store, account_id, product).await?;
        response.push(ProductResponse::new(product, used));
    }
    Ok(Json(response))
}

/// GET /products/{id}
pub async fn get<S: Store + Clone, G: PaymentGateway>(
    State(state): State<Arc<AppState<S, G>>>,
    session: Option<Session>,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product_id: ProductId = parse_id(&id)?;
    let product = state
        .store
        .get_product(product_id)
        .await?
        .filter(|p| p.active)
        .ok_or_else(|| ApiError::NotFound(format!("Product {product_id} not found")))?;

    let account_id = session.and_then(|s| s.account_id);
    let used = trial_used(&state.store, account_id, &product).await?;
    Ok(Json(ProductResponse::new(&product, used)))
}

async fn trial_used<S: Store>(
    store: &S,
    account_id: Option<AccountId>,
    product: &Product,
) -> Result<bool, ApiError> {
    match account_id {
        Some(account_id) if product.trial_plan().is_some() => {
            Ok(store.has_used_trial(account_id, product.id).await?)
        }
        _ => Ok(false),
    }
}
