//! Value objects owned by an order.

use chrono::{DateTime, Utc};
use common::{OfferId, PlanId, ProductId};
use serde::{Deserialize, Serialize};

use crate::Money;
use crate::cart::CartLine;
use crate::catalog::DurationType;

/// A cart line frozen at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    /// Plan price if a plan was chosen, otherwise the base price at purchase time.
    pub unit_price: Money,
    pub plan_id: Option<PlanId>,
    pub duration_type: Option<DurationType>,
    pub duration_value: Option<u32>,
}

impl OrderLineItem {
    /// Copies a cart line's product, quantity, price and plan terms.
    pub fn from_cart_line(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id,
            product_name: line.product_name.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price(),
            plan_id: line.plan.map(|p| p.plan_id),
            duration_type: line.plan.map(|p| p.duration_type),
            duration_value: line.plan.map(|p| p.duration_value),
        }
    }

    /// Returns the total price for this line item.
    pub fn total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// One offer applied to one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedOffer {
    pub offer_id: OfferId,
    pub code: String,
    pub discount_amount: Money,
    pub applied_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PlanSnapshot;

    #[test]
    fn test_line_item_prefers_plan_price() {
        let mut line = CartLine {
            product_id: ProductId::new(),
            product_name: "Bulk SMS".to_string(),
            base_price: Money::from_major(2499),
            quantity: 2,
            plan: None,
        };
        let item = OrderLineItem::from_cart_line(&line);
        assert_eq!(item.unit_price, Money::from_major(2499));
        assert_eq!(item.duration_type, None);

        line.plan = Some(PlanSnapshot {
            plan_id: PlanId::new(),
            duration_type: DurationType::Months,
            duration_value: 3,
            price: Money::from_major(899),
        });
        let item = OrderLineItem::from_cart_line(&line);
        assert_eq!(item.unit_price, Money::from_major(899));
        assert_eq!(item.duration_value, Some(3));
        assert_eq!(item.total(), Money::from_major(1798));
    }
}
