use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AccountId, ContactId, OfferId, OrderId, PlanId, ProductId, SessionId};
use domain::{
    AppliedOffer, Cart, CatalogError, ContactLead, ContactStatus, Money, Offer, Order, OrderLineItem,
    OrderParts, Product, TrialUsage,
};
use tokio::sync::RwLock;

use crate::{
    Result, StoreError,
    store::{ContactCounts, Store, UnitOfWork},
};

#[derive(Debug, Default)]
struct State {
    carts: HashMap<SessionId, Cart>,
    products: HashMap<ProductId, Product>,
    trial_usages: HashMap<(AccountId, ProductId), TrialUsage>,
    offers: HashMap<OfferId, Offer>,
    orders: HashMap<OrderId, Order>,
    contacts: Vec<ContactLead>,
}

impl State {
    fn offer_usage(&self, offer_id: OfferId) -> u64 {
        self.orders
            .values()
            .filter(|o| o.has_offer(offer_id))
            .count() as u64
    }
}

/// In-memory store implementation for testing and credential-less local runs.
///
/// This implementation keeps everything in memory and provides the same
/// interface as the PostgreSQL implementation.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
    fail_on_commit: Arc<AtomicBool>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures units of work to fail when committing.
    pub fn set_fail_on_commit(&self, fail: bool) {
        self.fail_on_commit.store(fail, Ordering::SeqCst);
    }

    /// Returns the number of stored carts, empty ones included.
    pub async fn cart_count(&self) -> usize {
        self.state.read().await.carts.len()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    type Tx = InMemoryUnitOfWork;

    async fn begin(&self) -> Result<Self::Tx> {
        Ok(InMemoryUnitOfWork {
            state: Arc::clone(&self.state),
            fail_on_commit: self.fail_on_commit.load(Ordering::SeqCst),
            orders: Vec::new(),
        })
    }

    async fn load_cart(&self, session_id: &SessionId) -> Result<Cart> {
        let state = self.state.read().await;
        let Some(stored) = state.carts.get(session_id) else {
            return Ok(Cart::new(session_id.clone()));
        };

        let lines = stored
            .lines()
            .iter()
            .filter_map(|line| {
                let product = state.products.get(&line.product_id)?;
                let mut line = line.clone();
                line.product_name = product.name.clone();
                line.base_price = product.base_price;
                Some(line)
            })
            .collect();

        Ok(Cart::restore(session_id.clone(), stored.account_id, lines))
    }

    async fn save_cart(&self, cart: &Cart) -> Result<()> {
        let mut state = self.state.write().await;
        state.carts.insert(cart.session_id.clone(), cart.clone());
        Ok(())
    }

    async fn clear_cart(&self, session_id: &SessionId) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(cart) = state.carts.get_mut(session_id) {
            cart.clear();
        }
        Ok(())
    }

    async fn insert_product(&self, product: &Product) -> Result<()> {
        let mut state = self.state.write().await;
        state.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.state.read().await.products.get(&id).cloned())
    }

    async fn list_products(&self, active_only: bool) -> Result<Vec<Product>> {
        let state = self.state.read().await;
        let mut products: Vec<_> = state
            .products
            .values()
            .filter(|p| !active_only || p.active)
            .cloned()
            .collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }

    async fn toggle_product(&self, id: ProductId) -> Result<Option<bool>> {
        let mut state = self.state.write().await;
        Ok(state.products.get_mut(&id).map(Product::toggle_active))
    }

    async fn toggle_plan(&self, id: PlanId) -> Result<Option<bool>> {
        let mut state = self.state.write().await;
        let Some(product) = state
            .products
            .values_mut()
            .find(|p| p.plan(id).is_some())
        else {
            return Ok(None);
        };
        Ok(Some(product.toggle_plan(id)?))
    }

    async fn update_trial_prices(&self, price: Money) -> Result<u64> {
        if !price.is_positive() {
            return Err(CatalogError::InvalidPrice { price }.into());
        }
        let mut state = self.state.write().await;
        let mut updated = 0;
        for product in state.products.values_mut() {
            updated += product.set_trial_price(price)? as u64;
        }
        Ok(updated)
    }

    async fn has_used_trial(&self, account_id: AccountId, product_id: ProductId) -> Result<bool> {
        let state = self.state.read().await;
        Ok(state.trial_usages.contains_key(&(account_id, product_id)))
    }

    async fn record_trial_usage(&self, usage: &TrialUsage) -> Result<bool> {
        let mut state = self.state.write().await;
        let key = (usage.account_id, usage.product_id);
        if state.trial_usages.contains_key(&key) {
            return Ok(false);
        }
        state.trial_usages.insert(key, usage.clone());
        Ok(true)
    }

    async fn reset_trial(&self, account_id: AccountId, product_id: ProductId) -> Result<bool> {
        let mut state = self.state.write().await;
        Ok(state
            .trial_usages
            .remove(&(account_id, product_id))
            .is_some())
    }

    async fn insert_offer(&self, offer: &Offer) -> Result<()> {
        let mut state = self.state.write().await;
        if state.offers.values().any(|o| o.code == offer.code) {
            return Err(StoreError::DuplicateOfferCode {
                code: offer.code.clone(),
            });
        }
        state.offers.insert(offer.id, offer.clone());
        Ok(())
    }

    async fn find_offer_by_code(&self, code: &str) -> Result<Option<Offer>> {
        let state = self.state.read().await;
        Ok(state.offers.values().find(|o| o.code == code).cloned())
    }

    async fn list_available_offers(&self, now: DateTime<Utc>) -> Result<Vec<Offer>> {
        let state = self.state.read().await;
        let mut offers: Vec<_> = state
            .offers
            .values()
            .filter(|o| o.is_available(now))
            .cloned()
            .collect();
        offers.sort_by_key(|o| o.valid_until);
        Ok(offers)
    }

    async fn offer_usage_count(&self, offer_id: OfferId) -> Result<u64> {
        Ok(self.state.read().await.offer_usage(offer_id))
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.state.read().await.orders.get(&id).cloned())
    }

    async fn list_orders_for_account(&self, account_id: AccountId) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<_> = state
            .orders
            .values()
            .filter(|o| o.account_id() == account_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(orders)
    }

    async fn update_order(&self, order: &Order) -> Result<()> {
        let mut state = self.state.write().await;
        let stored = state
            .orders
            .get_mut(&order.id())
            .ok_or(StoreError::OrderNotFound(order.id()))?;
        *stored = order.clone();
        Ok(())
    }

    async fn count_orders(&self) -> Result<u64> {
        Ok(self.state.read().await.orders.len() as u64)
    }

    async fn insert_contact(&self, lead: &ContactLead) -> Result<()> {
        self.state.write().await.contacts.push(lead.clone());
        Ok(())
    }

    async fn recent_contacts(&self, limit: u32) -> Result<Vec<ContactLead>> {
        let state = self.state.read().await;
        let mut leads = state.contacts.clone();
        leads.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        leads.truncate(limit as usize);
        Ok(leads)
    }

    async fn contact_counts(&self) -> Result<ContactCounts> {
        let state = self.state.read().await;
        Ok(ContactCounts {
            total: state.contacts.len() as u64,
            unread: state
                .contacts
                .iter()
                .filter(|c| c.status.is_unread())
                .count() as u64,
            pending: state
                .contacts
                .iter()
                .filter(|c| c.status.is_pending())
                .count() as u64,
        })
    }

    async fn update_contact_status(&self, id: ContactId, status: ContactStatus) -> Result<bool> {
        let mut state = self.state.write().await;
        match state.contacts.iter_mut().find(|c| c.id == id) {
            Some(lead) => {
                lead.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_contact(&self, id: ContactId) -> Result<bool> {
        let mut state = self.state.write().await;
        let before = state.contacts.len();
        state.contacts.retain(|c| c.id != id);
        Ok(state.contacts.len() != before)
    }
}

#[derive(Debug)]
struct PendingOrder {
    parts: OrderParts,
    usage_limits: Vec<(OfferId, Option<u32>)>,
}

/// Buffered unit of work over [`InMemoryStore`].
///
/// Writes stay in the buffer until commit, which re-checks offer usage
/// limits under the store's write lock.
#[derive(Debug)]
pub struct InMemoryUnitOfWork {
    state: Arc<RwLock<State>>,
    fail_on_commit: bool,
    orders: Vec<PendingOrder>,
}

impl InMemoryUnitOfWork {
    fn pending_mut(&mut self, order_id: OrderId) -> Result<&mut PendingOrder> {
        self.orders
            .iter_mut()
            .find(|p| p.parts.id == order_id)
            .ok_or(StoreError::OrderNotFound(order_id))
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        self.orders.push(PendingOrder {
            parts: OrderParts {
                id: order.id(),
                account_id: order.account_id(),
                email: order.email().to_string(),
                status: order.status(),
                payment_status: order.payment_status(),
                remote_order_id: order.remote_order_id().map(str::to_string),
                remote_payment_id: order.remote_payment_id().map(str::to_string),
                line_items: Vec::new(),
                applied_offers: Vec::new(),
                created_at: order.created_at(),
                updated_at: order.updated_at(),
            },
            usage_limits: Vec::new(),
        });
        Ok(())
    }

    async fn insert_line_items(&mut self, order_id: OrderId, items: &[OrderLineItem]) -> Result<()> {
        self.pending_mut(order_id)?
            .parts
            .line_items
            .extend_from_slice(items);
        Ok(())
    }

    async fn lock_offer_usage(&mut self, offer_id: OfferId) -> Result<u64> {
        let committed = self.state.read().await.offer_usage(offer_id);
        let pending = self
            .orders
            .iter()
            .filter(|p| p.parts.applied_offers.iter().any(|a| a.offer_id == offer_id))
            .count() as u64;
        Ok(committed + pending)
    }

    async fn insert_applied_offer(
        &mut self,
        order_id: OrderId,
        applied: &AppliedOffer,
        usage_limit: Option<u32>,
    ) -> Result<()> {
        let pending = self.pending_mut(order_id)?;
        if pending
            .parts
            .applied_offers
            .iter()
            .any(|a| a.offer_id == applied.offer_id)
        {
            return Err(StoreError::DuplicateAppliedOffer {
                order_id,
                offer_id: applied.offer_id,
            });
        }
        pending.parts.applied_offers.push(applied.clone());
        pending.usage_limits.push((applied.offer_id, usage_limit));
        Ok(())
    }

    async fn update_order(&mut self, order: &Order) -> Result<()> {
        let pending = self.pending_mut(order.id())?;
        pending.parts.remote_order_id = order.remote_order_id().map(str::to_string);
        pending.parts.updated_at = order.updated_at();
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        if self.fail_on_commit {
            return Err(StoreError::Unavailable("commit failed".to_string()));
        }

        let mut state = self.state.write().await;

        let mut claimed: HashMap<OfferId, u64> = HashMap::new();
        for pending in &self.orders {
            for (offer_id, limit) in &pending.usage_limits {
                let used = claimed.entry(*offer_id).or_insert_with(|| state.offer_usage(*offer_id));
                if let Some(limit) = limit
                    && *used >= u64::from(*limit)
                {
                    return Err(StoreError::OfferUsageLimitReached {
                        offer_id: *offer_id,
                    });
                }
                *used += 1;
            }
        }

        for pending in self.orders {
            let order = Order::restore(pending.parts);
            state.orders.insert(order.id(), order);
        }
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        Ok(())
    }
}
