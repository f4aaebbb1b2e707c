//! Session-scoped shopping cart.

use common::{AccountId, PlanId, ProductId, SessionId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Money;
use crate::catalog::{PlanSnapshot, PricingPlan, Product};

/// Largest quantity one cart line may hold. Lines are stored in an `INTEGER` column.
pub const MAX_LINE_QUANTITY: u32 = i32::MAX as u32;

/// Reasons a product/plan pair cannot go into a cart.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    #[error("Product is currently unavailable")]
    ProductInactive { product_id: ProductId },

    #[error("Product is out of stock")]
    OutOfStock { product_id: ProductId },

    #[error("Selected plan is not available for this product")]
    PlanNotFound { plan_id: PlanId },

    #[error("Selected plan is not available")]
    PlanInactive { plan_id: PlanId },

    #[error("Quantity must be greater than 0")]
    InvalidQuantity,

    #[error("Quantity cannot exceed {max}")]
    QuantityTooLarge { max: u32 },

    #[error("Cart total is too large")]
    TotalTooLarge,

    #[error("Remove the paid item from your cart before choosing its trial")]
    PaidLineExists { product_id: ProductId },

    #[error("Remove the trial from your cart before buying this product")]
    TrialLineExists { product_id: ProductId },
}

/// One product entry in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub product_name: String,
    /// Current catalog price, used when no plan was chosen.
    pub base_price: Money,
    pub quantity: u32,
    pub plan: Option<PlanSnapshot>,
}

impl CartLine {
    /// Plan price if a plan was chosen, otherwise the product's base price.
    pub fn unit_price(&self) -> Money {
        self.plan.map(|p| p.price).unwrap_or(self.base_price)
    }

    /// Quantity times unit price.
    pub fn line_total(&self) -> Money {
        self.unit_price().multiply(self.quantity)
    }
}

/// A browser session's cart.
///
/// Every line has a quantity greater than zero; operations that would bring a
/// quantity to zero remove the line instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub session_id: SessionId,
    pub account_id: Option<AccountId>,
    lines: Vec<CartLine>,
}

impl Cart {
    /// Creates an empty cart for a session.
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            account_id: None,
            lines: Vec::new(),
        }
    }

    /// Rebuilds a cart from persisted lines, dropping any non-positive quantities.
    pub fn restore(
        session_id: SessionId,
        account_id: Option<AccountId>,
        lines: Vec<CartLine>,
    ) -> Self {
        Self {
            session_id,
            account_id,
            lines: lines.into_iter().filter(|l| l.quantity > 0).collect(),
        }
    }

    /// Checks that a product (and optional plan) may be added to a cart.
    pub fn check_addable(product: &Product, plan: Option<&PricingPlan>) -> Result<(), CartError> {
        if !product.active {
            return Err(CartError::ProductInactive {
                product_id: product.id,
            });
        }
        if !product.in_stock() {
            return Err(CartError::OutOfStock {
                product_id: product.id,
            });
        }
        if let Some(plan) = plan {
            if plan.product_id != product.id || product.plan(plan.id).is_none() {
                return Err(CartError::PlanNotFound { plan_id: plan.id });
            }
            if !plan.active {
                return Err(CartError::PlanInactive { plan_id: plan.id });
            }
        }
        Ok(())
    }

    /// Checks that adding `quantity` units keeps the product's line within
    /// [`MAX_LINE_QUANTITY`] and never mixes a trial with paid units.
    pub fn check_merge(
        &self,
        product_id: ProductId,
        quantity: u32,
        plan: Option<&PricingPlan>,
    ) -> Result<(), CartError> {
        let adding_trial = plan.is_some_and(PricingPlan::is_trial);
        let existing = self.line(product_id);

        if let Some(line) = existing {
            let line_is_trial = line.plan.is_some_and(|p| p.is_trial());
            if adding_trial && !line_is_trial {
                return Err(CartError::PaidLineExists { product_id });
            }
            if !adding_trial && line_is_trial {
                return Err(CartError::TrialLineExists { product_id });
            }
        }

        let current = existing.map_or(0, |l| u64::from(l.quantity));
        if current + u64::from(quantity) > u64::from(MAX_LINE_QUANTITY) {
            return Err(CartError::QuantityTooLarge {
                max: MAX_LINE_QUANTITY,
            });
        }
        Ok(())
    }

    /// Links the cart to an account the first time one is known.
    pub fn attach_account(&mut self, account_id: AccountId) {
        if self.account_id.is_none() {
            self.account_id = Some(account_id);
        }
    }

    /// Returns the cart lines.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Returns the line for a product.
    pub fn line(&self, product_id: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }

    /// Returns true if the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Adds `quantity` units of a product, incrementing an existing line.
    ///
    /// A supplied plan overwrites the line's stored plan snapshot. Out-of-stock
    /// products and a zero quantity leave the cart untouched; the return value
    /// tells whether anything changed.
    pub fn add_item(&mut self, product: &Product, quantity: u32, plan: Option<&PricingPlan>) -> bool {
        if quantity == 0 || !product.in_stock() {
            return false;
        }

        let snapshot = plan.map(PricingPlan::snapshot);
        match self.lines.iter_mut().find(|l| l.product_id == product.id) {
            Some(line) => {
                line.quantity = line.quantity.saturating_add(quantity).min(MAX_LINE_QUANTITY);
                line.base_price = product.base_price;
                if snapshot.is_some() {
                    line.plan = snapshot;
                }
            }
            None => self.lines.push(CartLine {
                product_id: product.id,
                product_name: product.name.clone(),
                base_price: product.base_price,
                quantity: quantity.min(MAX_LINE_QUANTITY),
                plan: snapshot,
            }),
        }
        true
    }

    /// Removes a product's line. Absent products are ignored.
    pub fn remove_item(&mut self, product_id: ProductId) {
        self.lines.retain(|l| l.product_id != product_id);
    }

    /// Sets a line's quantity. Zero or negative removes the line.
    pub fn update_quantity(&mut self, product_id: ProductId, quantity: i64) {
        if quantity <= 0 {
            self.remove_item(product_id);
            return;
        }
        let quantity = u32::try_from(quantity)
            .unwrap_or(MAX_LINE_QUANTITY)
            .min(MAX_LINE_QUANTITY);
        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product_id) {
            line.quantity = quantity;
        }
    }

    /// Removes every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Sum of quantities across all lines.
    pub fn total_items(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }

    /// Sum of `quantity * unit_price` across all lines.
    pub fn total_amount(&self) -> Money {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Like [`Cart::total_amount`], but `None` when the total does not fit in a `Money`.
    pub fn checked_total(&self) -> Option<Money> {
        self.lines.iter().try_fold(Money::zero(), |acc, line| {
            line.unit_price()
                .checked_multiply(line.quantity)
                .and_then(|total| acc.checked_add(total))
        })
    }
}
