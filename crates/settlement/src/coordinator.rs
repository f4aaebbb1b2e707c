//! Settlement coordinator: cart to persisted order plus remote payment order.

use std::future::Future;
use std::time::{Duration, Instant};

use chrono::Utc;
use common::{AccountId, OrderId, SessionId};
use domain::{Money, Offer, OfferPreview, Order, OrderError, OrderStatus, PaymentStatus, normalize_code};
use serde::Serialize;
use store::{Store, StoreError, UnitOfWork};

use crate::error::{Result, SettlementError};
use crate::gateway::{GatewayError, PaymentGateway, RemotePayment, RemoteRefund};
use crate::steps;

/// Where a guest is sent back to after signing in.
const CHECKOUT_RETURN_TO: &str = "/checkout";

/// Razorpay caps `receipt` at 40 characters.
pub const MAX_RECEIPT_LEN: usize = 40;

/// Receipt sent with the remote order: `order_` plus the unhyphenated order id.
pub fn remote_receipt(order_id: OrderId) -> String {
    format!("order_{}", order_id.as_uuid().simple())
}

/// Knobs for the settlement flow.
#[derive(Debug, Clone)]
pub struct SettlementSettings {
    /// ISO currency code sent to the processor.
    pub currency: String,
    /// Upper bound on every remote gateway call.
    pub gateway_timeout: Duration,
}

impl Default for SettlementSettings {
    fn default() -> Self {
        Self {
            currency: "INR".to_string(),
            gateway_timeout: Duration::from_secs(10),
        }
    }
}

/// Input of the checkout finalize step.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub session_id: SessionId,
    pub account_id: Option<AccountId>,
    pub email: String,
    pub offer_codes: Vec<String>,
}

/// A settled checkout, ready for the payment-completion step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutReceipt {
    pub order_id: OrderId,
    pub remote_order_id: String,
    pub amount: Money,
    pub currency: String,
}

/// Data the payment-completion view needs to open the processor's widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentPage {
    pub order_id: OrderId,
    pub remote_order_id: Option<String>,
    pub amount: Money,
    pub currency: String,
    pub key_id: String,
}

/// What the processor posts back after the customer paid.
#[derive(Debug, Clone)]
pub struct PaymentCallback {
    pub payment_id: String,
    pub remote_order_id: String,
    pub signature: String,
}

/// Final state of an order after a payment callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentOutcome {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
}

impl PaymentOutcome {
    fn of(order: &Order) -> Self {
        Self {
            order_id: order.id(),
            status: order.status(),
            payment_status: order.payment_status(),
        }
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Success
    }
}

/// Orchestrates checkout settlement and payment completion.
///
/// Checkout runs as one unit of work: the order, its line items, its applied
/// offers and the remote order id are committed together or not at all.
pub struct SettlementCoordinator<S, G>
where
    S: Store,
    G: PaymentGateway,
{
    store: S,
    gateway: G,
    settings: SettlementSettings,
}

impl<S, G> SettlementCoordinator<S, G>
where
    S: Store,
    G: PaymentGateway,
{
    /// Creates a new settlement coordinator.
    pub fn new(store: S, gateway: G, settings: SettlementSettings) -> Self {
        Self {
            store,
            gateway,
            settings,
        }
    }

    pub fn settings(&self) -> &SettlementSettings {
        &self.settings
    }

    /// Evaluates an offer code against the session's cart without recording anything.
    #[tracing::instrument(skip(self))]
    pub async fn preview_offer(&self, session_id: &SessionId, code: &str) -> Result<OfferPreview> {
        let cart = self.store.load_cart(session_id).await?;
        if cart.is_empty() {
            return Err(SettlementError::EmptyCart);
        }

        let offer = self.find_offer(code).await?;
        let usage = self.store.offer_usage_count(offer.id).await?;
        offer
            .preview(cart.total_amount(), Utc::now(), usage)
            .map_err(|reason| SettlementError::OfferRejected {
                code: offer.code.clone(),
                reason,
            })
    }

    /// Turns the session's cart into a pending order with a remote payment order.
    ///
    /// Validation and offer problems are reported before anything is written.
    /// Any failure after the unit of work opens rolls all of it back.
    #[tracing::instrument(skip(self, request), fields(session_id = %request.session_id))]
    pub async fn checkout(&self, request: CheckoutRequest) -> Result<CheckoutReceipt> {
        let account_id = request
            .account_id
            .ok_or_else(|| SettlementError::AuthenticationRequired {
                return_to: CHECKOUT_RETURN_TO.to_string(),
            })?;

        metrics::counter!("settlement_attempts_total").increment(1);
        let start = Instant::now();

        let cart = self.store.load_cart(&request.session_id).await?;
        if cart.is_empty() {
            return Err(SettlementError::EmptyCart);
        }

        let now = Utc::now();
        let mut order = Order::place(account_id, request.email, now);
        order.snapshot_from_cart(&cart)?;
        order.validate()?;

        let offers = self.resolve_offers(&request.offer_codes).await?;
        for offer in &offers {
            let usage = self.store.offer_usage_count(offer.id).await?;
            order
                .apply_offer(offer, usage, now)
                .map_err(|e| offer_error(e, offer))?;
        }
        order.validate()?;

        let result = self.settle(&mut order, &offers).await;
        metrics::histogram!("settlement_duration_seconds").record(start.elapsed().as_secs_f64());

        match result {
            Ok(receipt) => {
                metrics::counter!("settlement_committed_total").increment(1);
                if let Err(e) = self.store.clear_cart(&request.session_id).await {
                    tracing::warn!(order_id = %receipt.order_id, error = %e, "failed to clear cart after checkout");
                }
                tracing::info!(
                    order_id = %receipt.order_id,
                    remote_order_id = %receipt.remote_order_id,
                    amount = %receipt.amount,
                    "checkout settled"
                );
                Ok(receipt)
            }
            Err(e) => {
                metrics::counter!("settlement_rolled_back_total").increment(1);
                match &e {
                    SettlementError::Gateway(cause) => {
                        tracing::error!(order_id = %order.id(), error = %cause, "settlement rolled back: gateway failure");
                    }
                    other => {
                        tracing::warn!(order_id = %order.id(), error = %other, "settlement rolled back");
                    }
                }
                Err(e)
            }
        }
    }

    /// Runs the settlement steps inside one unit of work.
    async fn settle(&self, order: &mut Order, offers: &[Offer]) -> Result<CheckoutReceipt> {
        let mut tx = self.store.begin().await?;

        match self.run_steps(&mut tx, order, offers).await {
            Ok(receipt) => {
                tx.commit().await.map_err(|e| {
                    tracing::warn!(
                        remote_order_id = %receipt.remote_order_id,
                        "commit failed after remote order was created"
                    );
                    store_error(e, offers)
                })?;
                Ok(receipt)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::error!(error = %rollback, "rollback failed");
                }
                Err(e)
            }
        }
    }

    async fn run_steps(
        &self,
        tx: &mut S::Tx,
        order: &mut Order,
        offers: &[Offer],
    ) -> Result<CheckoutReceipt> {
        tracing::debug!(step = steps::STEP_PERSIST_ORDER, "settlement step started");
        tx.insert_order(order).await?;

        tracing::debug!(step = steps::STEP_SNAPSHOT_ITEMS, "settlement step started");
        tx.insert_line_items(order.id(), order.line_items()).await?;

        tracing::debug!(step = steps::STEP_APPLY_OFFERS, "settlement step started");
        for applied in order.applied_offers() {
            let Some(offer) = offers.iter().find(|o| o.id == applied.offer_id) else {
                continue;
            };
            let usage = tx.lock_offer_usage(offer.id).await?;
            if offer.usage_limit_reached(usage) {
                return Err(SettlementError::OfferUnavailable {
                    code: offer.code.clone(),
                });
            }
            tx.insert_applied_offer(order.id(), applied, offer.usage_limit)
                .await
                .map_err(|e| store_error(e, offers))?;
        }

        tracing::info!(
            step = steps::STEP_CREATE_REMOTE_ORDER,
            amount = %order.final_total(),
            "settlement step started"
        );
        let receipt = remote_receipt(order.id());
        let remote = self
            .bounded(
                "create_order",
                self.gateway
                    .create_remote_order(order.final_total(), &self.settings.currency, &receipt),
            )
            .await?;

        order.set_remote_order_id(remote.id.clone(), Utc::now());
        tx.update_order(order).await?;

        Ok(CheckoutReceipt {
            order_id: order.id(),
            remote_order_id: remote.id,
            amount: order.final_total(),
            currency: remote.currency,
        })
    }

    /// Loads what the payment-completion view shows for an order.
    pub async fn payment_page(&self, order_id: OrderId) -> Result<PaymentPage> {
        let order = self.order(order_id).await?;
        Ok(PaymentPage {
            order_id: order.id(),
            remote_order_id: order.remote_order_id().map(str::to_string),
            amount: order.final_total(),
            currency: self.settings.currency.clone(),
            key_id: self.gateway.key_id().to_string(),
        })
    }

    /// Verifies a payment callback and records the result on the order.
    ///
    /// A valid signature is not enough: the payment is re-fetched from the
    /// processor and must read `captured`. Failed verification leaves the
    /// order pending with `payment_status=failed`.
    #[tracing::instrument(skip(self, callback), fields(payment_id = %callback.payment_id))]
    pub async fn complete_payment(
        &self,
        order_id: OrderId,
        callback: PaymentCallback,
    ) -> Result<PaymentOutcome> {
        let mut order = self.order(order_id).await?;

        match order.payment_status() {
            PaymentStatus::Success => {
                record_callback("duplicate");
                tracing::info!(%order_id, "callback for an already paid order");
                return Ok(PaymentOutcome::of(&order));
            }
            PaymentStatus::Failed => {
                record_callback("already_failed");
                tracing::warn!(%order_id, "callback for an order whose payment already failed");
                return Ok(PaymentOutcome::of(&order));
            }
            PaymentStatus::Pending => {}
        }

        let now = Utc::now();
        match self.verify(&order, &callback).await {
            Ok(payment) => {
                order.mark_payment_successful(payment.id, now)?;
                record_callback("success");
                tracing::info!(%order_id, "payment successful");
            }
            Err(reason) => {
                order.mark_payment_failed(Some(callback.payment_id.clone()), now)?;
                record_callback("failed");
                tracing::error!(%order_id, %reason, "payment verification failed");
            }
        }

        self.store.update_order(&order).await?;
        Ok(PaymentOutcome::of(&order))
    }

    /// Asks the processor again about a payment recorded as failed and marks
    /// the order paid if it was captured after all.
    #[tracing::instrument(skip(self))]
    pub async fn reverify_payment(&self, order_id: OrderId) -> Result<PaymentOutcome> {
        let mut order = self.order(order_id).await?;
        if order.payment_status() != PaymentStatus::Failed {
            return Err(OrderError::PaymentNotFailed {
                payment_status: order.payment_status(),
            }
            .into());
        }
        let payment_id = order
            .remote_payment_id()
            .ok_or(OrderError::MissingPaymentId)?
            .to_string();

        let payment = self
            .bounded("fetch_payment", self.gateway.fetch_payment(&payment_id))
            .await?;
        let foreign = payment
            .order_id
            .as_deref()
            .is_some_and(|id| Some(id) != order.remote_order_id());

        if payment.is_captured() && !foreign {
            order.reconcile_payment(payment.id, Utc::now())?;
            self.store.update_order(&order).await?;
            record_reverification("reconciled");
            tracing::info!(%order_id, "failed payment reconciled as captured");
        } else {
            record_reverification("unchanged");
            tracing::warn!(%order_id, status = %payment.status, foreign, "payment still not captured");
        }
        Ok(PaymentOutcome::of(&order))
    }

    /// Refunds a verified payment in full, or `amount` of it.
    #[tracing::instrument(skip(self, reason))]
    pub async fn refund_payment(
        &self,
        order_id: OrderId,
        amount: Option<Money>,
        reason: Option<String>,
    ) -> Result<RemoteRefund> {
        let order = self.order(order_id).await?;
        let payment_id = order.check_refund(amount)?;

        let refund = self
            .bounded(
                "refund",
                self.gateway
                    .refund_payment(payment_id, amount, reason.as_deref()),
            )
            .await?;
        tracing::info!(%order_id, refund_id = %refund.id, amount = %refund.amount, "payment refunded");
        Ok(refund)
    }

    /// Returns the captured payment, or why the callback is not trusted.
    async fn verify(
        &self,
        order: &Order,
        callback: &PaymentCallback,
    ) -> std::result::Result<RemotePayment, String> {
        if order.remote_order_id() != Some(callback.remote_order_id.as_str()) {
            return Err("remote order id does not match the order".to_string());
        }

        self.gateway
            .verify_signature(&callback.payment_id, &callback.remote_order_id, &callback.signature)
            .map_err(|e| e.to_string())?;

        let payment = self
            .bounded("fetch_payment", self.gateway.fetch_payment(&callback.payment_id))
            .await
            .map_err(|e| match e {
                SettlementError::Gateway(cause) => cause.to_string(),
                other => other.to_string(),
            })?;

        if !payment.is_captured() {
            return Err(format!("payment status is {}", payment.status));
        }
        if payment
            .order_id
            .as_deref()
            .is_some_and(|id| id != callback.remote_order_id)
        {
            return Err("payment belongs to another remote order".to_string());
        }
        Ok(payment)
    }

    /// Applies the configured timeout to a gateway call.
    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = std::result::Result<T, GatewayError>>,
    ) -> Result<T> {
        let limit = self.settings.gateway_timeout;
        match tokio::time::timeout(limit, call).await {
            Ok(result) => result.map_err(SettlementError::Gateway),
            Err(_) => {
                metrics::counter!(
                    "gateway_requests_total",
                    "operation" => operation,
                    "outcome" => "timeout"
                )
                .increment(1);
                Err(SettlementError::Gateway(GatewayError::Timeout(limit)))
            }
        }
    }

    async fn order(&self, order_id: OrderId) -> Result<Order> {
        self.store
            .get_order(order_id)
            .await?
            .ok_or(SettlementError::OrderNotFound(order_id))
    }

    async fn find_offer(&self, code: &str) -> Result<Offer> {
        let code = normalize_code(code);
        self.store
            .find_offer_by_code(&code)
            .await?
            .ok_or(SettlementError::OfferNotFound { code })
    }

    async fn resolve_offers(&self, codes: &[String]) -> Result<Vec<Offer>> {
        let mut offers = Vec::with_capacity(codes.len());
        for code in codes.iter().filter(|c| !c.trim().is_empty()) {
            offers.push(self.find_offer(code).await?);
        }
        Ok(offers)
    }
}

fn offer_error(error: OrderError, offer: &Offer) -> SettlementError {
    match error {
        OrderError::OfferAlreadyApplied { code } => SettlementError::DuplicateOffer { code },
        OrderError::OfferNotApplicable { code, reason } => {
            SettlementError::OfferRejected { code, reason }
        }
        other => {
            tracing::warn!(offer = %offer.code, error = %other, "unexpected offer error");
            SettlementError::Order(other)
        }
    }
}

fn store_error(error: StoreError, offers: &[Offer]) -> SettlementError {
    match error {
        StoreError::OfferUsageLimitReached { offer_id } => SettlementError::OfferUnavailable {
            code: offers
                .iter()
                .find(|o| o.id == offer_id)
                .map(|o| o.code.clone())
                .unwrap_or_else(|| offer_id.to_string()),
        },
        other => SettlementError::Store(other),
    }
}

fn record_callback(outcome: &'static str) {
    metrics::counter!("payment_callbacks_total", "outcome" => outcome).increment(1);
}

fn record_reverification(outcome: &'static str) {
    metrics::counter!("payment_reverifications_total", "outcome" => outcome).increment(1);
}
