use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use super::{CatalogError, Product, migrate_legacy_validity_options};
use crate::Money;

/// Options for bulk catalog loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedOptions {
    /// Give products without any plans the default one-day trial plan.
    pub create_default_trial: bool,
    /// Price of the generated trial plan.
    pub trial_price: Money,
}

impl Default for SeedOptions {
    fn default() -> Self {
        Self {
            create_default_trial: true,
            trial_price: Money::from_major(1),
        }
    }
}

/// One product entry of a catalog seed file.
///
/// `price` is in major units. `validity_options` accepts the legacy inline
/// plan blob and is converted to pricing plans while seeding.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductSeed {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub validity_options: Option<Value>,
}

/// Builds catalog products from seed entries.
pub fn build_seed_products(
    seeds: &[ProductSeed],
    options: SeedOptions,
) -> Result<Vec<Product>, CatalogError> {
    seeds.iter().map(|seed| build_one(seed, options)).collect()
}

fn build_one(seed: &ProductSeed, options: SeedOptions) -> Result<Product, CatalogError> {
    let base_price =
        Money::from_decimal(seed.price).ok_or(CatalogError::PriceOutOfRange(seed.price))?;
    let mut product = Product::new(
        seed.name.clone(),
        seed.description.clone(),
        base_price,
        seed.stock,
    )?;
    if let Some(active) = seed.active {
        product.active = active;
    }

    if let Some(blob) = &seed.validity_options {
        for plan in migrate_legacy_validity_options(product.id, blob, base_price)? {
            product.add_plan(plan)?;
        }
    }

    if options.create_default_trial {
        product.ensure_default_trial(options.trial_price)?;
    }

    Ok(product)
}
