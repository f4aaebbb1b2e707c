use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AccountId, ContactId, OfferId, OrderId, PlanId, ProductId, SessionId};
use domain::{
    AppliedOffer, Cart, ContactLead, ContactStatus, Money, Offer, Order, OrderLineItem, Product,
    TrialUsage,
};
use serde::Serialize;

use crate::Result;

/// Lead counts shown on the back-office contact list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ContactCounts {
    pub total: u64,
    /// Leads in `new`.
    pub unread: u64,
    /// Leads in `new` or `in_progress`.
    pub pending: u64,
}

/// Core trait for storefront persistence.
///
/// Every method runs as its own statement or short transaction. Checkout
/// writes go through [`Store::begin`] instead.
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Transaction type returned by [`Store::begin`].
    type Tx: UnitOfWork;

    /// Opens an atomic unit of work.
    async fn begin(&self) -> Result<Self::Tx>;

    // Carts

    /// Loads a session's cart, or an empty one if none was saved yet.
    ///
    /// Line names and base prices are read from the current catalog; lines
    /// whose product no longer exists are dropped.
    async fn load_cart(&self, session_id: &SessionId) -> Result<Cart>;

    /// Replaces the stored cart with `cart`. Last write wins.
    async fn save_cart(&self, cart: &Cart) -> Result<()>;

    /// Removes every line of a session's cart.
    async fn clear_cart(&self, session_id: &SessionId) -> Result<()>;

    // Catalog

    /// Inserts a product together with its pricing plans.
    async fn insert_product(&self, product: &Product) -> Result<()>;

    /// Fetches a product with its pricing plans.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Lists products by name, optionally only active ones.
    async fn list_products(&self, active_only: bool) -> Result<Vec<Product>>;

    /// Flips a product's active flag. Returns the new value, or `None` if missing.
    async fn toggle_product(&self, id: ProductId) -> Result<Option<bool>>;

    /// Flips a pricing plan's active flag. Returns the new value, or `None` if missing.
    async fn toggle_plan(&self, id: PlanId) -> Result<Option<bool>>;

    /// Sets the price of every trial plan. Returns how many plans changed.
    async fn update_trial_prices(&self, price: Money) -> Result<u64>;

    // Trial usage

    /// Returns true if the account already consumed the product's trial.
    async fn has_used_trial(&self, account_id: AccountId, product_id: ProductId) -> Result<bool>;

    /// Records trial usage unless one exists. Returns true if this call recorded it.
    async fn record_trial_usage(&self, usage: &TrialUsage) -> Result<bool>;

    /// Deletes a trial usage record. Returns true if one existed.
    async fn reset_trial(&self, account_id: AccountId, product_id: ProductId) -> Result<bool>;

    // Offers

    /// Inserts an offer. Fails with `DuplicateOfferCode` if the code is taken.
    async fn insert_offer(&self, offer: &Offer) -> Result<()>;

    /// Finds an offer by its exact (normalized) code.
    async fn find_offer_by_code(&self, code: &str) -> Result<Option<Offer>>;

    /// Lists active offers whose validity window contains `now`.
    async fn list_available_offers(&self, now: DateTime<Utc>) -> Result<Vec<Offer>>;

    /// Number of committed orders that applied the offer.
    async fn offer_usage_count(&self, offer_id: OfferId) -> Result<u64>;

    // Orders

    /// Fetches an order with its line items and applied offers.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Lists an account's orders, most recent first.
    async fn list_orders_for_account(&self, account_id: AccountId) -> Result<Vec<Order>>;

    /// Persists status, payment status, remote identifiers and timestamps.
    async fn update_order(&self, order: &Order) -> Result<()>;

    /// Total number of stored orders.
    async fn count_orders(&self) -> Result<u64>;

    // Contact leads

    async fn insert_contact(&self, lead: &ContactLead) -> Result<()>;

    /// The `limit` most recent leads, newest first.
    async fn recent_contacts(&self, limit: u32) -> Result<Vec<ContactLead>>;

    async fn contact_counts(&self) -> Result<ContactCounts>;

    /// Returns false if the lead does not exist.
    async fn update_contact_status(&self, id: ContactId, status: ContactStatus) -> Result<bool>;

    /// Returns false if the lead does not exist.
    async fn delete_contact(&self, id: ContactId) -> Result<bool>;
}

/// An atomic set of checkout writes.
///
/// Nothing written through a unit of work is visible to readers until
/// [`UnitOfWork::commit`] succeeds. Dropping it without committing discards
/// every write.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Writes the order header.
    async fn insert_order(&mut self, order: &Order) -> Result<()>;

    /// Writes the order's line items.
    async fn insert_line_items(&mut self, order_id: OrderId, items: &[OrderLineItem]) -> Result<()>;

    /// Locks the offer against concurrent settlements and returns its usage count,
    /// including applications made earlier in this unit of work.
    async fn lock_offer_usage(&mut self, offer_id: OfferId) -> Result<u64>;

    /// Records an applied offer.
    ///
    /// `usage_limit` is re-checked before the write becomes visible; losing that
    /// race fails with `OfferUsageLimitReached`.
    async fn insert_applied_offer(
        &mut self,
        order_id: OrderId,
        applied: &AppliedOffer,
        usage_limit: Option<u32>,
    ) -> Result<()>;

    /// Updates the order's total, remote order id and timestamp.
    async fn update_order(&mut self, order: &Order) -> Result<()>;

    /// Makes every write visible.
    async fn commit(self) -> Result<()>;

    /// Discards every write.
    async fn rollback(self) -> Result<()>;
}
