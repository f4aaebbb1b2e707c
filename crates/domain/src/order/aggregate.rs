//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{AccountId, OfferId, OrderId};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{AppliedOffer, OrderError, OrderLineItem, OrderStatus, PaymentStatus};
use crate::Money;
use crate::cart::Cart;
use crate::offer::Offer;
use crate::validation::FieldErrors;

/// Order aggregate root.
///
/// `total_amount` always equals the line-item subtotal minus the applied
/// discounts; every mutating method recomputes it before returning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    account_id: AccountId,
    email: String,
    status: OrderStatus,
    payment_status: PaymentStatus,
    remote_order_id: Option<String>,
    remote_payment_id: Option<String>,
    line_items: Vec<OrderLineItem>,
    applied_offers: Vec<AppliedOffer>,
    total_amount: Money,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Persisted form of an order, used to rebuild it from storage.
#[derive(Debug, Clone)]
pub struct OrderParts {
    pub id: OrderId,
    pub account_id: AccountId,
    pub email: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub remote_order_id: Option<String>,
    pub remote_payment_id: Option<String>,
    pub line_items: Vec<OrderLineItem>,
    pub applied_offers: Vec<AppliedOffer>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Field checks run before an order is persisted.
#[derive(Debug, Validate)]
pub struct OrderDraft {
    #[validate(
        length(min = 1, message = "can't be blank"),
        email(message = "is invalid")
    )]
    pub email: String,
    #[validate(range(min = 1, message = "must be greater than 0"))]
    pub total_amount: i64,
}

// Query methods
impl Order {
    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn remote_order_id(&self) -> Option<&str> {
        self.remote_order_id.as_deref()
    }

    pub fn remote_payment_id(&self) -> Option<&str> {
        self.remote_payment_id.as_deref()
    }

    pub fn line_items(&self) -> &[OrderLineItem] {
        &self.line_items
    }

    pub fn applied_offers(&self) -> &[AppliedOffer] {
        &self.applied_offers
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Stored total: subtotal minus discounts.
    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    /// Sum of line-item totals.
    pub fn subtotal(&self) -> Money {
        self.line_items.iter().map(OrderLineItem::total).sum()
    }

    /// Sum of applied-offer discounts.
    pub fn total_discount(&self) -> Money {
        self.applied_offers.iter().map(|o| o.discount_amount).sum()
    }

    /// Subtotal minus discounts.
    pub fn final_total(&self) -> Money {
        self.subtotal() - self.total_discount()
    }

    /// Returns true if the offer is already applied.
    pub fn has_offer(&self, offer_id: OfferId) -> bool {
        self.applied_offers.iter().any(|o| o.offer_id == offer_id)
    }

    /// Total units across line items.
    pub fn total_quantity(&self) -> u64 {
        self.line_items.iter().map(|i| u64::from(i.quantity)).sum()
    }
}

// Command methods
impl Order {
    /// Starts a new pending order with no items.
    pub fn place(account_id: AccountId, email: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: OrderId::new(),
            account_id,
            email: email.into().trim().to_string(),
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            remote_order_id: None,
            remote_payment_id: None,
            line_items: Vec::new(),
            applied_offers: Vec::new(),
            total_amount: Money::zero(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuilds an order from storage. The total is derived from the parts.
    pub fn restore(parts: OrderParts) -> Self {
        let mut order = Self {
            id: parts.id,
            account_id: parts.account_id,
            email: parts.email,
            status: parts.status,
            payment_status: parts.payment_status,
            remote_order_id: parts.remote_order_id,
            remote_payment_id: parts.remote_payment_id,
            line_items: parts.line_items,
            applied_offers: parts.applied_offers,
            total_amount: Money::zero(),
            created_at: parts.created_at,
            updated_at: parts.updated_at,
        };
        order.recalculate_total();
        order
    }

    /// Copies every cart line onto the order. The cart itself is untouched.
    pub fn snapshot_from_cart(&mut self, cart: &Cart) -> Result<(), OrderError> {
        if cart.is_empty() {
            return Err(OrderError::NoItems);
        }
        self.line_items
            .extend(cart.lines().iter().map(OrderLineItem::from_cart_line));
        self.recalculate_total();
        Ok(())
    }

    /// Checks the order's fields, reporting every violation.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let draft = OrderDraft {
            email: self.email.clone(),
            total_amount: self.total_amount.minor(),
        };
        draft.validate().map_err(FieldErrors::from)
    }

    /// Applies an offer against the current subtotal and returns the discount.
    ///
    /// The discount never takes the total below zero when several offers stack.
    pub fn apply_offer(
        &mut self,
        offer: &Offer,
        usage_count: u64,
        now: DateTime<Utc>,
    ) -> Result<Money, OrderError> {
        if self.has_offer(offer.id) {
            return Err(OrderError::OfferAlreadyApplied {
                code: offer.code.clone(),
            });
        }

        let subtotal = self.subtotal();
        offer
            .validate(subtotal, now, usage_count)
            .map_err(|reason| OrderError::OfferNotApplicable {
                code: offer.code.clone(),
                reason,
            })?;

        let discount = offer.compute_discount(subtotal).min(self.final_total());
        self.applied_offers.push(AppliedOffer {
            offer_id: offer.id,
            code: offer.code.clone(),
            discount_amount: discount,
            applied_at: now,
        });
        self.recalculate_total();
        self.updated_at = now;
        Ok(discount)
    }

    /// Removes an applied offer. Returns false if it was not applied.
    pub fn remove_offer(&mut self, offer_id: OfferId, now: DateTime<Utc>) -> bool {
        let before = self.applied_offers.len();
        self.applied_offers.retain(|o| o.offer_id != offer_id);
        let removed = self.applied_offers.len() != before;
        if removed {
            self.recalculate_total();
            self.updated_at = now;
        }
        removed
    }

    /// Stores the payment processor's order identifier verbatim.
    pub fn set_remote_order_id(&mut self, remote_order_id: impl Into<String>, now: DateTime<Utc>) {
        self.remote_order_id = Some(remote_order_id.into());
        self.updated_at = now;
    }

    /// Records a verified, captured payment: `payment_status=success`, `status=paid`.
    pub fn mark_payment_successful(
        &mut self,
        payment_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), OrderError> {
        if !self.payment_status.is_pending() {
            return Err(OrderError::PaymentAlreadySettled {
                payment_status: self.payment_status,
            });
        }
        if !self.status.can_transition_to(OrderStatus::Paid) {
            return Err(OrderError::InvalidStatusTransition {
                from: self.status,
                to: OrderStatus::Paid,
            });
        }

        self.payment_status = PaymentStatus::Success;
        self.status = OrderStatus::Paid;
        self.remote_payment_id = Some(payment_id.into());
        self.updated_at = now;
        Ok(())
    }

    /// Records a failed verification. The status stays as it is.
    pub fn mark_payment_failed(
        &mut self,
        payment_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), OrderError> {
        if self.payment_status == PaymentStatus::Success {
            return Err(OrderError::PaymentAlreadySettled {
                payment_status: self.payment_status,
            });
        }

        self.payment_status = PaymentStatus::Failed;
        if payment_id.is_some() {
            self.remote_payment_id = payment_id;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Back-office reconciliation of a payment recorded as failed that the
    /// processor reports as captured.
    pub fn reconcile_payment(
        &mut self,
        payment_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), OrderError> {
        if self.payment_status != PaymentStatus::Failed {
            return Err(OrderError::PaymentNotFailed {
                payment_status: self.payment_status,
            });
        }
        if !self.status.can_transition_to(OrderStatus::Paid) {
            return Err(OrderError::InvalidStatusTransition {
                from: self.status,
                to: OrderStatus::Paid,
            });
        }

        self.payment_status = PaymentStatus::Success;
        self.status = OrderStatus::Paid;
        self.remote_payment_id = Some(payment_id.into());
        self.updated_at = now;
        Ok(())
    }

    /// Checks a refund request and returns the payment to refund.
    /// `None` refunds the whole payment.
    pub fn check_refund(&self, amount: Option<Money>) -> Result<&str, OrderError> {
        if self.payment_status != PaymentStatus::Success {
            return Err(OrderError::NotRefundable {
                payment_status: self.payment_status,
            });
        }
        let payment_id = self
            .remote_payment_id
            .as_deref()
            .ok_or(OrderError::MissingPaymentId)?;
        let max = self.final_total();
        if let Some(amount) = amount
            && (!amount.is_positive() || amount > max)
        {
            return Err(OrderError::InvalidRefundAmount { max });
        }
        Ok(payment_id)
    }

    /// Back-office status change. `paid` is reserved for verified payments.
    pub fn advance_status(&mut self, next: OrderStatus, now: DateTime<Utc>) -> Result<(), OrderError> {
        if next == OrderStatus::Paid {
            return Err(OrderError::PaymentRequired);
        }
        if !self.status.can_transition_to(next) {
            return Err(OrderError::InvalidStatusTransition {
                from: self.status,
                to: next,
            });
        }

        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    fn recalculate_total(&mut self) {
        self.total_amount = self.final_total();
    }
}
