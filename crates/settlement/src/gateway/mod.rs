//! Payment gateway trait and implementations.
//!
//! The adapter never retries; each call either returns the processor's answer
//! or a [`GatewayError`] the caller decides what to do with.

pub mod memory;
pub mod razorpay;
pub mod signature;

use std::time::Duration;

use async_trait::async_trait;
use domain::Money;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::InMemoryPaymentGateway;
pub use razorpay::{RazorpayConfig, RazorpayGateway};

/// Errors returned by a payment gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Amount was zero or negative; nothing was sent.
    #[error("Invalid amount: {0}")]
    InvalidAmount(Money),

    /// No answer within the configured bound.
    #[error("Payment gateway timed out after {0:?}")]
    Timeout(Duration),

    /// Transport failure talking to the processor.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The processor answered with an error.
    #[error("Gateway returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The processor's answer could not be understood.
    #[error("Malformed gateway response: {0}")]
    MalformedResponse(String),

    /// Callback signature was malformed or did not match.
    #[error("Invalid payment signature")]
    InvalidSignature,

    /// The key secret cannot be used as an HMAC key.
    #[error("Invalid signing key")]
    InvalidKey,
}

impl GatewayError {
    /// Label used for the `outcome` dimension of gateway metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            GatewayError::InvalidAmount(_) => "invalid_amount",
            GatewayError::Timeout(_) => "timeout",
            GatewayError::Http(_) => "http_error",
            GatewayError::Api { .. } => "api_error",
            GatewayError::MalformedResponse(_) => "malformed",
            GatewayError::InvalidSignature | GatewayError::InvalidKey => "invalid_signature",
        }
    }
}

/// An order created on the processor's side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteOrder {
    pub id: String,
    pub amount: Money,
    pub currency: String,
    pub receipt: Option<String>,
}

/// Authoritative payment details fetched from the processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotePayment {
    pub id: String,
    pub order_id: Option<String>,
    pub amount: Money,
    /// Processor status, e.g. `created`, `authorized`, `captured`, `failed`.
    pub status: String,
}

impl RemotePayment {
    pub fn is_captured(&self) -> bool {
        self.status == "captured"
    }
}

/// A refund issued against a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRefund {
    pub id: String,
    pub payment_id: String,
    pub amount: Money,
    pub status: String,
}

/// Trait for payment processor operations.
#[async_trait]
pub trait PaymentGateway: Send + Sync + 'static {
    /// Public key handed to the browser checkout widget.
    fn key_id(&self) -> &str;

    /// Creates a remote order for `amount` in minor units.
    async fn create_remote_order(
        &self,
        amount: Money,
        currency: &str,
        receipt: &str,
    ) -> Result<RemoteOrder, GatewayError>;

    /// Checks that a payment callback was signed with the shared secret.
    fn verify_signature(
        &self,
        payment_id: &str,
        remote_order_id: &str,
        signature: &str,
    ) -> Result<(), GatewayError>;

    /// Fetches the processor's view of a payment.
    async fn fetch_payment(&self, payment_id: &str) -> Result<RemotePayment, GatewayError>;

    /// Refunds a payment in full, or `amount` of it.
    async fn refund_payment(
        &self,
        payment_id: &str,
        amount: Option<Money>,
        reason: Option<&str>,
    ) -> Result<RemoteRefund, GatewayError>;
}

/// Records a gateway call in `gateway_requests_total`.
pub(crate) fn record_request<T>(operation: &'static str, result: &Result<T, GatewayError>) {
    let outcome = match result {
        Ok(_) => "success",
        Err(e) => e.outcome(),
    };
    metrics::counter!(
        "gateway_requests_total",
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
}
