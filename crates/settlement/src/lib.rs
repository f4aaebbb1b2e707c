//! Checkout settlement for the storefront.
//!
//! A checkout turns the session cart into a pending order in four steps,
//! all inside one unit of work:
//! 1. Persist the order
//! 2. Snapshot the cart lines onto it
//! 3. Record the applied offers under their usage locks
//! 4. Create the payment order on the processor
//!
//! If any step fails, nothing is committed. Payment completion is a separate
//! call that verifies the processor's callback and settles the order's
//! payment status.

pub mod cart;
pub mod coordinator;
pub mod error;
pub mod gateway;
pub mod steps;

pub use cart::{AddToCart, CartService, CartUpdate};
pub use coordinator::{
    CheckoutReceipt, CheckoutRequest, PaymentCallback, PaymentOutcome, PaymentPage,
    SettlementCoordinator, SettlementSettings, remote_receipt,
};
pub use error::{GATEWAY_ERROR_MESSAGE, Result, SettlementError};
pub use gateway::{
    GatewayError, InMemoryPaymentGateway, PaymentGateway, RazorpayConfig, RazorpayGateway,
    RemoteOrder, RemotePayment, RemoteRefund,
};
