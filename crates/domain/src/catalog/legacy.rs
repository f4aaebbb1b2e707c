use std::str::FromStr;

use common::ProductId;
use rust_decimal::Decimal;
use serde_json::Value;

use super::{CatalogError, DurationType, PricingPlan};
use crate::Money;

/// Converts the legacy inline validity-options blob into normalized pricing plans.
///
/// The blob is a JSON array of `{duration, type, price, label}` objects. The first
/// entry becomes the default plan and each entry's index becomes its sort order.
/// Missing fields fall back to `days`, a duration of 0, the product's base price
/// and a `"<duration> <type>"` label. A blob that is not an array yields no plans;
/// entries that are not objects are skipped.
pub fn migrate_legacy_validity_options(
    product_id: ProductId,
    blob: &Value,
    base_price: Money,
) -> Result<Vec<PricingPlan>, CatalogError> {
    let Some(entries) = blob.as_array() else {
        return Ok(Vec::new());
    };

    let mut plans = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let Some(option) = entry.as_object() else {
            continue;
        };

        let duration_type = match option.get("type").and_then(Value::as_str) {
            Some(raw) if !raw.trim().is_empty() => raw.parse::<DurationType>()?,
            _ => DurationType::Days,
        };
        let duration_value = option.get("duration").map(read_u32).unwrap_or(0);
        let price = match option.get("price").and_then(read_price) {
            Some(price) => price,
            None => base_price,
        };
        let label = match option.get("label").and_then(Value::as_str) {
            Some(label) if !label.trim().is_empty() => label.to_string(),
            _ => format!("{duration_value} {duration_type}"),
        };

        let mut plan = PricingPlan::new(product_id, duration_type, duration_value, price, label)?;
        plan.is_default = plans.is_empty();
        plan.sort_order = i32::try_from(index).unwrap_or(i32::MAX);
        plans.push(plan);
    }

    Ok(plans)
}

fn read_u32(value: &Value) -> u32 {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()).unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

// Legacy prices are major units, stored either as numbers or strings.
fn read_price(value: &Value) -> Option<Money> {
    let decimal = match value {
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok()?,
        Value::String(s) if !s.trim().is_empty() => Decimal::from_str(s.trim()).ok()?,
        _ => return None,
    };
    Money::from_decimal(decimal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_converts_entries_in_order() {
        let product_id = ProductId::new();
        let blob = json!([
            {"duration": 30, "type": "days", "price": 749, "label": "30 Days"},
            {"duration": 1, "type": "years", "price": "2499.50"},
            {"type": "lifetime", "price": 3749}
        ]);

        let plans =
            migrate_legacy_validity_options(product_id, &blob, Money::from_major(999)).unwrap();
        assert_eq!(plans.len(), 3);

        assert!(plans[0].is_default);
        assert!(!plans[1].is_default);
        assert_eq!(plans[0].sort_order, 0);
        assert_eq!(plans[2].sort_order, 2);

        assert_eq!(plans[0].label, "30 Days");
        assert_eq!(plans[1].label, "1 years");
        assert_eq!(plans[1].price, Money::from_minor(249_950));
        assert!(plans[2].is_lifetime());
        assert!(plans.iter().all(|p| p.product_id == product_id));
    }

    #[test]
    fn test_missing_fields_fall_back() {
        let blob = json!([{"duration": "90"}]);
        let plans =
            migrate_legacy_validity_options(ProductId::new(), &blob, Money::from_major(999))
                .unwrap();

        assert_eq!(plans[0].duration_type, DurationType::Days);
        assert_eq!(plans[0].duration_value, 90);
        assert_eq!(plans[0].price, Money::from_major(999));
        assert_eq!(plans[0].label, "90 days");
    }

    #[test]
    fn test_non_array_and_junk_entries() {
        let base = Money::from_major(10);
        let none = migrate_legacy_validity_options(ProductId::new(), &json!({"a": 1}), base);
        assert!(none.unwrap().is_empty());

        let mixed = json!(["junk", 4, {"duration": 7}]);
        let plans = migrate_legacy_validity_options(ProductId::new(), &mixed, base).unwrap();
        assert_eq!(plans.len(), 1);
        assert!(plans[0].is_default);
        assert_eq!(plans[0].sort_order, 2);
    }

    #[test]
    fn test_unknown_type_is_an_error() {
        let blob = json!([{"duration": 2, "type": "weeks"}]);
        assert_eq!(
            migrate_legacy_validity_options(ProductId::new(), &blob, Money::from_major(1)),
            Err(CatalogError::UnknownDurationType("weeks".to_string()))
        );
    }
}
