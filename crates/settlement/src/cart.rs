//! Cart mutations with catalog checks and the one-trial-per-account rule.

use chrono::Utc;
use common::{AccountId, PlanId, ProductId, SessionId};
use domain::{Cart, CartError, MAX_LINE_QUANTITY, Money, Product, TrialUsage};
use serde::{Deserialize, Serialize};
use store::Store;

use crate::error::{Result, SettlementError};

/// Where a guest is sent back to after signing in to claim a trial.
const TRIAL_RETURN_TO: &str = "/cart";

/// A request to put a product into the cart.
#[derive(Debug, Clone, Deserialize)]
pub struct AddToCart {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub plan_id: Option<PlanId>,
}

fn default_quantity() -> u32 {
    1
}

/// Cart totals returned after every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartUpdate {
    pub message: String,
    pub cart_count: u64,
    pub cart_total: Money,
}

impl CartUpdate {
    fn new(message: impl Into<String>, cart: &Cart) -> Self {
        Self {
            message: message.into(),
            cart_count: cart.total_items(),
            cart_total: cart.total_amount(),
        }
    }
}

/// Session cart operations. Every mutation is saved before it returns.
#[derive(Debug, Clone)]
pub struct CartService<S: Store> {
    store: S,
}

impl<S: Store> CartService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Loads the session's cart.
    pub async fn view(&self, session_id: &SessionId) -> Result<Cart> {
        Ok(self.store.load_cart(session_id).await?)
    }

    /// Adds a product, optionally with a pricing plan.
    ///
    /// Trial plans need an account, go in with quantity one and consume the
    /// account's trial for that product.
    #[tracing::instrument(skip(self, item), fields(product_id = %item.product_id))]
    pub async fn add_item(
        &self,
        session_id: &SessionId,
        account_id: Option<AccountId>,
        item: AddToCart,
    ) -> Result<CartUpdate> {
        if item.quantity == 0 {
            return Err(CartError::InvalidQuantity.into());
        }

        let product = self.product(item.product_id).await?;
        let plan = match item.plan_id {
            Some(plan_id) => Some(
                product
                    .plan(plan_id)
                    .ok_or(CartError::PlanNotFound { plan_id })?,
            ),
            None => None,
        };
        Cart::check_addable(&product, plan)?;

        let trial = plan.is_some_and(|p| p.is_trial());
        if trial && account_id.is_none() {
            return Err(SettlementError::AuthenticationRequired {
                return_to: TRIAL_RETURN_TO.to_string(),
            });
        }
        let quantity = if trial { 1 } else { item.quantity };

        let mut cart = self.store.load_cart(session_id).await?;
        cart.check_merge(product.id, quantity, plan)?;
        if let Some(account_id) = account_id {
            cart.attach_account(account_id);
        }
        cart.add_item(&product, quantity, plan);
        if trial {
            cart.update_quantity(product.id, 1);
        }
        ensure_total_fits(&cart)?;

        if trial && let Some(account_id) = account_id {
            self.claim_trial(account_id, product.id).await?;
        }

        if let Err(e) = self.store.save_cart(&cart).await {
            if trial && let Some(account_id) = account_id {
                self.release_trial(account_id, product.id).await;
            }
            return Err(e.into());
        }

        tracing::info!(session_id = %session_id, trial, "item added to cart");
        Ok(CartUpdate::new(format!("{} added to cart!", product.name), &cart))
    }

    /// Sets a line's quantity; zero or less removes it.
    pub async fn update_quantity(
        &self,
        session_id: &SessionId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CartUpdate> {
        let product = self.product(product_id).await?;
        let mut cart = self.store.load_cart(session_id).await?;

        let is_trial_line = cart
            .line(product_id)
            .and_then(|l| l.plan)
            .is_some_and(|p| p.is_trial());
        let quantity = if is_trial_line { quantity.min(1) } else { quantity };
        if quantity > i64::from(MAX_LINE_QUANTITY) {
            return Err(CartError::QuantityTooLarge {
                max: MAX_LINE_QUANTITY,
            }
            .into());
        }

        cart.update_quantity(product.id, quantity);
        ensure_total_fits(&cart)?;
        self.store.save_cart(&cart).await?;
        Ok(CartUpdate::new("Cart updated", &cart))
    }

    /// Removes a product's line.
    pub async fn remove_item(&self, session_id: &SessionId, product_id: ProductId) -> Result<CartUpdate> {
        let product = self.product(product_id).await?;
        let mut cart = self.store.load_cart(session_id).await?;
        cart.remove_item(product.id);
        self.store.save_cart(&cart).await?;
        Ok(CartUpdate::new(format!("{} removed from cart!", product.name), &cart))
    }

    /// Empties the cart.
    pub async fn clear(&self, session_id: &SessionId) -> Result<CartUpdate> {
        self.store.clear_cart(session_id).await?;
        let cart = Cart::new(session_id.clone());
        Ok(CartUpdate::new("Cart cleared!", &cart))
    }

    async fn product(&self, product_id: ProductId) -> Result<Product> {
        self.store
            .get_product(product_id)
            .await?
            .ok_or(SettlementError::ProductNotFound(product_id))
    }

    async fn claim_trial(&self, account_id: AccountId, product_id: ProductId) -> Result<()> {
        let usage = TrialUsage::new(account_id, product_id, Utc::now());
        if self.store.record_trial_usage(&usage).await? {
            metrics::counter!("trial_claims_total").increment(1);
            Ok(())
        } else {
            tracing::info!(%account_id, %product_id, "trial already used");
            Err(SettlementError::TrialAlreadyUsed { product_id })
        }
    }

    async fn release_trial(&self, account_id: AccountId, product_id: ProductId) {
        if let Err(e) = self.store.reset_trial(account_id, product_id).await {
            tracing::warn!(%account_id, %product_id, error = %e, "failed to release trial claim");
        }
    }
}

fn ensure_total_fits(cart: &Cart) -> Result<()> {
    cart.checked_total()
        .map(|_| ())
        .ok_or_else(|| CartError::TotalTooLarge.into())
}
