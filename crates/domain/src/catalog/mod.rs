//! Product catalog: products, pricing plans and trial usage.

mod legacy;
mod plan;
mod product;
mod seed;
mod trial;

pub use legacy::migrate_legacy_validity_options;
pub use plan::{DurationType, PlanSnapshot, PricingPlan};
pub use product::Product;
pub use seed::{ProductSeed, SeedOptions, build_seed_products};
pub use trial::TrialUsage;

use common::{PlanId, ProductId};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::Money;

/// Errors that can occur during catalog operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// Prices must be strictly positive.
    #[error("Invalid price: {price} (must be greater than 0)")]
    InvalidPrice { price: Money },

    /// A decimal price could not be represented in minor units.
    #[error("Price out of range: {0}")]
    PriceOutOfRange(Decimal),

    /// Product name is required.
    #[error("Product name can't be blank")]
    NameRequired,

    /// Plan label is required.
    #[error("Plan label can't be blank")]
    LabelRequired,

    /// The plan does not exist on the product.
    #[error("Pricing plan {plan_id} not found on product {product_id}")]
    PlanNotFound {
        product_id: ProductId,
        plan_id: PlanId,
    },

    /// A plan was attached to a product it does not belong to.
    #[error("Pricing plan {plan_id} belongs to another product")]
    PlanProductMismatch { plan_id: PlanId },

    /// Unknown plan duration type.
    #[error("Unknown duration type: {0}")]
    UnknownDurationType(String),
}
