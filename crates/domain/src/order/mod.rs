//! Order aggregate and related types.

mod aggregate;
mod state;
mod value_objects;

pub use aggregate::{Order, OrderDraft, OrderParts};
pub use state::{OrderStatus, PaymentStatus};
pub use value_objects::{AppliedOffer, OrderLineItem};

use thiserror::Error;

use crate::Money;
use crate::offer::OfferRejection;

/// Errors that can occur during order operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderError {
    /// The cart had nothing to snapshot.
    #[error("Order has no items")]
    NoItems,

    /// The offer failed evaluation against the order subtotal.
    #[error("Offer {code} is not applicable: {reason}")]
    OfferNotApplicable { code: String, reason: OfferRejection },

    /// The offer is already on this order.
    #[error("Offer {code} has already been applied to this order")]
    OfferAlreadyApplied { code: String },

    /// Status change not allowed by the order state machine.
    #[error("Invalid status transition: cannot move from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    /// `paid` can only be reached through a verified payment.
    #[error("Orders become paid only through a verified payment")]
    PaymentRequired,

    /// The payment was already settled.
    #[error("Payment already settled with status {payment_status}")]
    PaymentAlreadySettled { payment_status: PaymentStatus },

    /// Re-verification only applies to payments recorded as failed.
    #[error("Only failed payments can be re-verified (payment status is {payment_status})")]
    PaymentNotFailed { payment_status: PaymentStatus },

    /// Refunds only apply to verified payments.
    #[error("Only successful payments can be refunded (payment status is {payment_status})")]
    NotRefundable { payment_status: PaymentStatus },

    #[error("Order has no recorded payment")]
    MissingPaymentId,

    #[error("Refund amount must be greater than 0 and at most {max}")]
    InvalidRefundAmount { max: Money },

    /// Unrecognised status name.
    #[error("Unknown status: {0}")]
    UnknownStatus(String),
}
