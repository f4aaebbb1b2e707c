//! Settlement error types.

use common::{OrderId, ProductId};
use domain::{CartError, FieldErrors, OfferRejection, OrderError};
use store::StoreError;
use thiserror::Error;

use crate::gateway::GatewayError;

/// User-facing message for any failure while talking to the payment processor.
pub const GATEWAY_ERROR_MESSAGE: &str =
    "Payment gateway error: Unable to create payment order. Please try again.";

/// Errors that can occur during cart and settlement operations.
#[derive(Debug, Error)]
pub enum SettlementError {
    /// The caller must sign in first; `return_to` is where to resume afterwards.
    #[error("Please login to complete your purchase")]
    AuthenticationRequired { return_to: String },

    #[error("Your cart is empty. Please add items before checkout.")]
    EmptyCart,

    /// One or more order fields are invalid.
    #[error("Please fix the following errors: {0}")]
    Validation(FieldErrors),

    #[error("Invalid offer code")]
    OfferNotFound { code: String },

    #[error("Offer {code} is not valid for this order: {reason}")]
    OfferRejected { code: String, reason: OfferRejection },

    /// The offer reached its usage limit while this checkout was settling.
    #[error("Offer {code} is no longer available")]
    OfferUnavailable { code: String },

    #[error("Offer {code} has already been applied to this order")]
    DuplicateOffer { code: String },

    #[error("You have already used the trial for this product")]
    TrialAlreadyUsed { product_id: ProductId },

    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    #[error("{0}")]
    Cart(#[from] CartError),

    /// Remote processor failure. The display text is the generic message;
    /// the cause stays in the error chain for logs.
    #[error("Payment gateway error: Unable to create payment order. Please try again.")]
    Gateway(#[source] GatewayError),

    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("{0}")]
    Order(#[from] OrderError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl From<FieldErrors> for SettlementError {
    fn from(errors: FieldErrors) -> Self {
        SettlementError::Validation(errors)
    }
}

impl From<GatewayError> for SettlementError {
    fn from(error: GatewayError) -> Self {
        SettlementError::Gateway(error)
    }
}

/// Convenience type alias for settlement results.
pub type Result<T> = std::result::Result<T, SettlementError>;
