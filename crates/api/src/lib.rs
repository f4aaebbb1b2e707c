//! HTTP API for the storefront.
//!
//! Serves the cart, offers, checkout, payment completion, order history,
//! contact form and back-office endpoints, with structured logging (tracing)
//! and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;
pub mod session;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch, post};
use domain::Money;
use metrics_exporter_prometheus::PrometheusHandle;
use settlement::{CartService, PaymentGateway, SettlementCoordinator, SettlementSettings};
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store, G: PaymentGateway> {
    pub store: S,
    pub cart: CartService<S>,
    pub settlement: SettlementCoordinator<S, G>,
    /// Price given to generated trial plans.
    pub trial_price: Money,
}

impl<S: Store + Clone, G: PaymentGateway> AppState<S, G> {
    pub fn new(store: S, gateway: G, settings: SettlementSettings, trial_price: Money) -> Self {
        Self {
            cart: CartService::new(store.clone()),
            settlement: SettlementCoordinator::new(store.clone(), gateway, settings),
            store,
            trial_price,
        }
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, G>(state: Arc<AppState<S, G>>, metrics_handle: PrometheusHandle) -> Router
where
    S: Store + Clone,
    G: PaymentGateway,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    let admin = Router::new()
        .route("/orders/{id}/status", patch(routes::admin::update_order_status::<S, G>))
        .route("/orders/{id}/reverify", post(routes::admin::reverify_payment::<S, G>))
        .route("/orders/{id}/refund", post(routes::admin::refund_order::<S, G>))
        .route("/products", post(routes::admin::create_product::<S, G>))
        .route("/products/trial-price", post(routes::admin::update_trial_price::<S, G>))
        .route("/products/{id}/toggle", patch(routes::admin::toggle_product::<S, G>))
        .route("/plans/{id}/toggle", patch(routes::admin::toggle_plan::<S, G>))
        .route(
            "/accounts/{account_id}/trials/{product_id}/reset",
            post(routes::admin::reset_trial::<S, G>),
        )
        .route("/offers", post(routes::admin::create_offer::<S, G>))
        .route("/contacts", get(routes::admin::list_contacts::<S, G>))
        .route(
            "/contacts/{id}",
            patch(routes::admin::update_contact::<S, G>).delete(routes::admin::delete_contact::<S, G>),
        );

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/products", get(routes::products::list::<S, G>))
        .route("/products/{id}", get(routes::products::get::<S, G>))
        .route(
            "/cart",
            get(routes::cart::show::<S, G>).delete(routes::cart::clear::<S, G>),
        )
        .route("/cart/items", post(routes::cart::add::<S, G>))
        .route(
            "/cart/items/{product_id}",
            patch(routes::cart::update::<S, G>).delete(routes::cart::remove::<S, G>),
        )
        .route("/offers", get(routes::offers::list::<S, G>))
        .route("/checkout", post(routes::checkout::create::<S, G>))
        .route("/checkout/offers/preview", post(routes::offers::preview::<S, G>))
        .route("/payment/{order_id}", get(routes::payment::show::<S, G>))
        .route("/payment/{order_id}/callback", post(routes::payment::callback::<S, G>))
        .route("/orders", get(routes::orders::list::<S, G>))
        .route("/orders/{id}", get(routes::orders::get::<S, G>))
        .route("/contact", post(routes::contact::create::<S, G>))
        .nest("/admin", admin)
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
