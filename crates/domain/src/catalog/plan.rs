use common::{PlanId, ProductId};
use serde::{Deserialize, Serialize};

use super::CatalogError;
use crate::Money;

/// Unit of a pricing plan's duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationType {
    Days,
    Months,
    Years,
    Lifetime,
}

impl DurationType {
    /// Returns the lowercase storage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            DurationType::Days => "days",
            DurationType::Months => "months",
            DurationType::Years => "years",
            DurationType::Lifetime => "lifetime",
        }
    }

    fn capitalized(&self) -> &'static str {
        match self {
            DurationType::Days => "Days",
            DurationType::Months => "Months",
            DurationType::Years => "Years",
            DurationType::Lifetime => "Lifetime",
        }
    }
}

impl std::fmt::Display for DurationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DurationType {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "days" => Ok(DurationType::Days),
            "months" => Ok(DurationType::Months),
            "years" => Ok(DurationType::Years),
            "lifetime" => Ok(DurationType::Lifetime),
            other => Err(CatalogError::UnknownDurationType(other.to_string())),
        }
    }
}

/// A duration/price combination a buyer may select for a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingPlan {
    pub id: PlanId,
    pub product_id: ProductId,
    pub duration_type: DurationType,
    pub duration_value: u32,
    pub price: Money,
    pub label: String,
    pub is_default: bool,
    pub active: bool,
    pub sort_order: i32,
}

impl PricingPlan {
    /// Creates an active, non-default plan.
    pub fn new(
        product_id: ProductId,
        duration_type: DurationType,
        duration_value: u32,
        price: Money,
        label: impl Into<String>,
    ) -> Result<Self, CatalogError> {
        let label = label.into();
        if !price.is_positive() {
            return Err(CatalogError::InvalidPrice { price });
        }
        if label.trim().is_empty() {
            return Err(CatalogError::LabelRequired);
        }

        Ok(Self {
            id: PlanId::new(),
            product_id,
            duration_type,
            duration_value,
            price,
            label,
            is_default: false,
            active: true,
            sort_order: 0,
        })
    }

    /// Creates the reserved one-day trial plan, marked as default.
    pub fn trial(product_id: ProductId, price: Money) -> Result<Self, CatalogError> {
        let mut plan = Self::new(product_id, DurationType::Days, 1, price, "1 Day Trial")?;
        plan.is_default = true;
        Ok(plan)
    }

    /// Returns true for the reserved one-day trial plan.
    pub fn is_trial(&self) -> bool {
        self.duration_type == DurationType::Days && self.duration_value == 1
    }

    /// Returns true for lifetime plans.
    pub fn is_lifetime(&self) -> bool {
        self.duration_type == DurationType::Lifetime
    }

    /// Human-readable duration, e.g. `"30 Days"`, `"Lifetime"` or `"1 Day Trial"`.
    pub fn display_duration(&self) -> String {
        if self.is_lifetime() {
            "Lifetime".to_string()
        } else if self.is_trial() {
            "1 Day Trial".to_string()
        } else {
            format!("{} {}", self.duration_value, self.duration_type.capitalized())
        }
    }

    /// Captures the plan terms a cart line keeps at add-to-cart time.
    pub fn snapshot(&self) -> PlanSnapshot {
        PlanSnapshot {
            plan_id: self.id,
            duration_type: self.duration_type,
            duration_value: self.duration_value,
            price: self.price,
        }
    }
}

/// Plan terms copied onto a cart line or order line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSnapshot {
    pub plan_id: PlanId,
    pub duration_type: DurationType,
    pub duration_value: u32,
    pub price: Money,
}

impl PlanSnapshot {
    /// Returns true if the snapshot was taken from the trial plan.
    pub fn is_trial(&self) -> bool {
        self.duration_type == DurationType::Days && self.duration_value == 1
    }
}
