use common::{PlanId, ProductId};
use serde::{Deserialize, Serialize};

use super::{CatalogError, PricingPlan};
use crate::Money;

/// Catalog entry a buyer can put in the cart.
///
/// The pricing plans are owned by the product and kept private so that the
/// single-default invariant is enforced by the mutating methods below rather
/// than by whoever happens to save a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub base_price: Money,
    pub stock: u32,
    pub active: bool,
    plans: Vec<PricingPlan>,
}

impl Product {
    /// Creates an active product with no pricing plans.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        base_price: Money,
        stock: u32,
    ) -> Result<Self, CatalogError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(CatalogError::NameRequired);
        }
        if !base_price.is_positive() {
            return Err(CatalogError::InvalidPrice { price: base_price });
        }

        Ok(Self {
            id: ProductId::new(),
            name,
            description: description.into(),
            base_price,
            stock,
            active: true,
            plans: Vec::new(),
        })
    }

    /// Rebuilds a product from persisted parts without re-running plan rules.
    pub fn restore(
        id: ProductId,
        name: String,
        description: String,
        base_price: Money,
        stock: u32,
        active: bool,
        plans: Vec<PricingPlan>,
    ) -> Self {
        Self {
            id,
            name,
            description,
            base_price,
            stock,
            active,
            plans,
        }
    }

    /// Returns true if at least one unit is in stock.
    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }

    /// Returns all plans in insertion order.
    pub fn plans(&self) -> &[PricingPlan] {
        &self.plans
    }

    /// Returns a plan by id.
    pub fn plan(&self, plan_id: PlanId) -> Option<&PricingPlan> {
        self.plans.iter().find(|p| p.id == plan_id)
    }

    /// Returns the plans sorted for display by `(sort_order, duration_value)`.
    pub fn ordered_plans(&self) -> Vec<&PricingPlan> {
        let mut plans: Vec<&PricingPlan> = self.plans.iter().collect();
        plans.sort_by_key(|p| (p.sort_order, p.duration_value));
        plans
    }

    /// Returns the active plans in display order.
    pub fn active_plans(&self) -> Vec<&PricingPlan> {
        self.ordered_plans().into_iter().filter(|p| p.active).collect()
    }

    /// Returns the default plan, if one is marked.
    pub fn default_plan(&self) -> Option<&PricingPlan> {
        self.plans.iter().find(|p| p.is_default)
    }

    /// Returns the reserved trial plan, if the product has one.
    pub fn trial_plan(&self) -> Option<&PricingPlan> {
        self.plans.iter().find(|p| p.is_trial())
    }

    /// Attaches a plan. If the plan is marked default, every sibling loses the flag.
    pub fn add_plan(&mut self, plan: PricingPlan) -> Result<(), CatalogError> {
        if plan.product_id != self.id {
            return Err(CatalogError::PlanProductMismatch { plan_id: plan.id });
        }
        if !plan.price.is_positive() {
            return Err(CatalogError::InvalidPrice { price: plan.price });
        }

        if plan.is_default {
            self.clear_default();
        }
        self.plans.push(plan);
        Ok(())
    }

    /// Marks one plan as the default and clears the flag on all others.
    pub fn set_default_plan(&mut self, plan_id: PlanId) -> Result<(), CatalogError> {
        if self.plan(plan_id).is_none() {
            return Err(CatalogError::PlanNotFound {
                product_id: self.id,
                plan_id,
            });
        }
        for plan in &mut self.plans {
            plan.is_default = plan.id == plan_id;
        }
        Ok(())
    }

    /// Flips a plan's active flag and returns the new value.
    pub fn toggle_plan(&mut self, plan_id: PlanId) -> Result<bool, CatalogError> {
        let product_id = self.id;
        let plan = self
            .plans
            .iter_mut()
            .find(|p| p.id == plan_id)
            .ok_or(CatalogError::PlanNotFound {
                product_id,
                plan_id,
            })?;
        plan.active = !plan.active;
        Ok(plan.active)
    }

    /// Flips the product's active flag and returns the new value.
    pub fn toggle_active(&mut self) -> bool {
        self.active = !self.active;
        self.active
    }

    /// Sets the price of the trial plan. Returns how many plans changed.
    pub fn set_trial_price(&mut self, price: Money) -> Result<usize, CatalogError> {
        if !price.is_positive() {
            return Err(CatalogError::InvalidPrice { price });
        }
        let mut updated = 0;
        for plan in self.plans.iter_mut().filter(|p| p.is_trial()) {
            plan.price = price;
            updated += 1;
        }
        Ok(updated)
    }

    /// Adds the default trial plan when the product has no plans yet.
    ///
    /// Returns true if a plan was created.
    pub fn ensure_default_trial(&mut self, trial_price: Money) -> Result<bool, CatalogError> {
        if !self.plans.is_empty() {
            return Ok(false);
        }
        let plan = PricingPlan::trial(self.id, trial_price)?;
        self.add_plan(plan)?;
        Ok(true)
    }

    fn clear_default(&mut self) {
        for plan in &mut self.plans {
            plan.is_default = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DurationType;

    fn product() -> Product {
        Product::new("Bulk SMS Gateway", "SMS campaigns", Money::from_major(1499), 10).unwrap()
    }

    fn plan(product: &Product, days: u32, price: i64) -> PricingPlan {
        PricingPlan::new(
            product.id,
            DurationType::Days,
            days,
            Money::from_major(price),
            format!("{days} Days"),
        )
        .unwrap()
    }

    #[test]
    fn test_new_product_validates() {
        assert_eq!(
            Product::new("", "", Money::from_major(1), 1),
            Err(CatalogError::NameRequired)
        );
        assert!(matches!(
            Product::new("Widget", "", Money::zero(), 1),
            Err(CatalogError::InvalidPrice { .. })
        ));
    }

    #[test]
    fn test_in_stock() {
        let mut p = product();
        assert!(p.in_stock());
        p.stock = 0;
        assert!(!p.in_stock());
    }

    #[test]
    fn test_adding_default_plan_clears_siblings() {
        let mut p = product();
        let mut first = plan(&p, 30, 449);
        first.is_default = true;
        let first_id = first.id;
        p.add_plan(first).unwrap();

        let mut second = plan(&p, 90, 899);
        second.is_default = true;
        let second_id = second.id;
        p.add_plan(second).unwrap();

        assert_eq!(p.plans().iter().filter(|pl| pl.is_default).count(), 1);
        assert_eq!(p.default_plan().unwrap().id, second_id);
        assert!(!p.plan(first_id).unwrap().is_default);
    }

    #[test]
    fn test_set_default_plan() {
        let mut p = product();
        let a = plan(&p, 30, 449);
        let b = plan(&p, 90, 899);
        let (a_id, b_id) = (a.id, b.id);
        p.add_plan(a).unwrap();
        p.add_plan(b).unwrap();

        p.set_default_plan(a_id).unwrap();
        assert_eq!(p.default_plan().unwrap().id, a_id);
        p.set_default_plan(b_id).unwrap();
        assert_eq!(p.default_plan().unwrap().id, b_id);
        assert_eq!(p.plans().iter().filter(|pl| pl.is_default).count(), 1);

        let missing = PlanId::new();
        assert!(matches!(
            p.set_default_plan(missing),
            Err(CatalogError::PlanNotFound { .. })
        ));
    }

    #[test]
    fn test_plan_from_other_product_rejected() {
        let mut p = product();
        let other = product();
        let foreign = plan(&other, 30, 449);
        assert!(matches!(
            p.add_plan(foreign),
            Err(CatalogError::PlanProductMismatch { .. })
        ));
    }

    #[test]
    fn test_ensure_default_trial_only_when_empty() {
        let mut p = product();
        assert!(p.ensure_default_trial(Money::from_major(1)).unwrap());
        assert!(p.trial_plan().is_some());
        assert!(p.trial_plan().unwrap().is_default);

        assert!(!p.ensure_default_trial(Money::from_major(1)).unwrap());
        assert_eq!(p.plans().len(), 1);

        assert_eq!(p.set_trial_price(Money::from_major(2)).unwrap(), 1);
        assert_eq!(p.trial_plan().unwrap().price, Money::from_major(2));
        assert!(p.set_trial_price(Money::zero()).is_err());
    }

    #[test]
    fn test_ordered_and_active_plans() {
        let mut p = product();
        let mut late = plan(&p, 365, 1499);
        late.sort_order = 2;
        let mut early = plan(&p, 30, 449);
        early.sort_order = 1;
        let early_id = early.id;
        p.add_plan(late).unwrap();
        p.add_plan(early).unwrap();

        let ordered = p.ordered_plans();
        assert_eq!(ordered[0].duration_value, 30);
        assert_eq!(ordered[1].duration_value, 365);

        assert!(!p.toggle_plan(early_id).unwrap());
        assert_eq!(p.active_plans().len(), 1);
    }
}
