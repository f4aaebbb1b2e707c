//! Promotional offers and the discount rules that evaluate them.

use chrono::{DateTime, Utc};
use common::OfferId;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::{Validate, ValidationError};

use crate::Money;
use crate::validation::{FieldErrors, violation};

/// How an offer reduces the amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Discount {
    /// Percent of the amount, e.g. `10` for 10%.
    Percentage(Decimal),
    /// Flat amount, never more than the amount it applies to.
    Fixed(Money),
}

impl Discount {
    /// Builds a discount from its storage form. Fixed values are minor units.
    pub fn from_parts(kind: DiscountKind, value: Decimal) -> Option<Self> {
        match kind {
            DiscountKind::Percentage => Some(Discount::Percentage(value)),
            DiscountKind::Fixed => value.to_i64().map(|minor| Discount::Fixed(Money::from_minor(minor))),
        }
    }

    pub fn kind(&self) -> DiscountKind {
        match self {
            Discount::Percentage(_) => DiscountKind::Percentage,
            Discount::Fixed(_) => DiscountKind::Fixed,
        }
    }

    /// Storage value: the percent, or the fixed amount in minor units.
    pub fn value(&self) -> Decimal {
        match self {
            Discount::Percentage(percent) => *percent,
            Discount::Fixed(amount) => Decimal::from(amount.minor()),
        }
    }
}

/// Discount type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountKind {
    Percentage,
    Fixed,
}

impl DiscountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountKind::Percentage => "percentage",
            DiscountKind::Fixed => "fixed",
        }
    }
}

impl std::fmt::Display for DiscountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DiscountKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentage" => Ok(DiscountKind::Percentage),
            "fixed" => Ok(DiscountKind::Fixed),
            other => Err(format!("unknown discount type: {other}")),
        }
    }
}

/// Why an offer does not apply.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferRejection {
    #[error("Offer is not active")]
    Inactive,

    #[error("Offer is not valid yet")]
    NotStarted,

    #[error("Offer has expired")]
    Expired,

    #[error("Offer usage limit has been reached")]
    UsageLimitReached,

    #[error("Minimum order amount of {minimum} required for this offer")]
    BelowMinimum { minimum: Money },
}

/// A promotional code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    pub id: OfferId,
    pub code: String,
    pub name: String,
    pub description: String,
    pub discount: Discount,
    pub minimum_amount: Money,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub usage_limit: Option<u32>,
    pub active: bool,
}

impl Offer {
    /// Checks the offer against an order amount.
    ///
    /// `usage_count` is the number of orders that already applied this offer.
    pub fn validate(
        &self,
        amount: Money,
        now: DateTime<Utc>,
        usage_count: u64,
    ) -> Result<(), OfferRejection> {
        if !self.active {
            return Err(OfferRejection::Inactive);
        }
        if now < self.valid_from {
            return Err(OfferRejection::NotStarted);
        }
        if now > self.valid_until {
            return Err(OfferRejection::Expired);
        }
        if self.usage_limit_reached(usage_count) {
            return Err(OfferRejection::UsageLimitReached);
        }
        if amount < self.minimum_amount {
            return Err(OfferRejection::BelowMinimum {
                minimum: self.minimum_amount,
            });
        }
        Ok(())
    }

    /// Boolean form of [`Offer::validate`].
    pub fn is_valid_for(&self, amount: Money, now: DateTime<Utc>, usage_count: u64) -> bool {
        self.validate(amount, now, usage_count).is_ok()
    }

    /// Returns true once `usage_count` reaches the limit. Unlimited offers never do.
    pub fn usage_limit_reached(&self, usage_count: u64) -> bool {
        self.usage_limit
            .is_some_and(|limit| usage_count >= u64::from(limit))
    }

    /// Returns true if the offer is active and inside its validity window.
    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        self.active && self.valid_from <= now && now <= self.valid_until
    }

    /// Discount this offer grants on `subtotal`. Never exceeds the subtotal.
    pub fn compute_discount(&self, subtotal: Money) -> Money {
        if !subtotal.is_positive() {
            return Money::zero();
        }
        let discount = match self.discount {
            Discount::Percentage(percent) => subtotal.percentage(percent),
            Discount::Fixed(amount) => amount,
        };
        discount.clamp(Money::zero(), subtotal)
    }

    /// Short label such as `"10% OFF"` or `"500.00 OFF"`.
    pub fn display_discount(&self) -> String {
        match self.discount {
            Discount::Percentage(percent) => format!("{}% OFF", percent.normalize()),
            Discount::Fixed(amount) => format!("{amount} OFF"),
        }
    }

    /// Evaluates the offer against a subtotal without recording anything.
    pub fn preview(
        &self,
        subtotal: Money,
        now: DateTime<Utc>,
        usage_count: u64,
    ) -> Result<OfferPreview, OfferRejection> {
        self.validate(subtotal, now, usage_count)?;
        let discount = self.compute_discount(subtotal);
        Ok(OfferPreview {
            code: self.code.clone(),
            subtotal,
            discount,
            final_total: subtotal - discount,
            display: self.display_discount(),
        })
    }
}

/// Result of evaluating an offer against the current cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OfferPreview {
    pub code: String,
    pub subtotal: Money,
    pub discount: Money,
    pub final_total: Money,
    pub display: String,
}

/// Canonical lookup form of a code: trimmed and uppercased.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

fn validate_code(code: &str) -> Result<(), ValidationError> {
    if !code.is_empty() && code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(violation("code", "must contain only uppercase letters and numbers"))
    }
}

fn validate_discount_value(value: &Decimal) -> Result<(), ValidationError> {
    if *value > Decimal::ZERO {
        Ok(())
    } else {
        Err(violation("range", "must be greater than 0"))
    }
}

fn validate_minimum_amount(value: &Decimal) -> Result<(), ValidationError> {
    if *value >= Decimal::ZERO {
        Ok(())
    } else {
        Err(violation("range", "must be greater than or equal to 0"))
    }
}

fn validate_draft(draft: &OfferDraft) -> Result<(), ValidationError> {
    if draft.valid_until <= draft.valid_from {
        return Err(violation("window", "Valid until must be after valid from"));
    }
    if draft.discount_type == DiscountKind::Percentage && draft.discount_value > Decimal::ONE_HUNDRED {
        return Err(violation("percentage", "Percentage discount cannot exceed 100"));
    }
    Ok(())
}

/// Back-office input for a new offer.
///
/// `discount_value` is a percent for percentage offers and a major-unit amount
/// for fixed ones; `minimum_amount` is in major units.
#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "validate_draft", skip_on_field_errors = false))]
pub struct OfferDraft {
    #[validate(custom = "validate_code")]
    pub code: String,
    #[validate(length(min = 1, message = "can't be blank"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub discount_type: DiscountKind,
    #[validate(custom = "validate_discount_value")]
    pub discount_value: Decimal,
    #[serde(default)]
    #[validate(custom = "validate_minimum_amount")]
    pub minimum_amount: Decimal,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    #[validate(range(min = 1, message = "must be greater than 0"))]
    pub usage_limit: Option<u32>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl OfferDraft {
    /// Validates the draft and builds the offer. The code is normalized first.
    pub fn into_offer(mut self) -> Result<Offer, FieldErrors> {
        self.code = normalize_code(&self.code);
        self.validate()?;

        let mut errors = FieldErrors::new();
        let discount = match self.discount_type {
            DiscountKind::Percentage => Some(Discount::Percentage(self.discount_value)),
            DiscountKind::Fixed => Money::from_decimal(self.discount_value).map(Discount::Fixed),
        };
        let minimum_amount = Money::from_decimal(self.minimum_amount);
        if discount.is_none() {
            errors.add("discount_value", "is out of range");
        }
        if minimum_amount.is_none() {
            errors.add("minimum_amount", "is out of range");
        }
        let (Some(discount), Some(minimum_amount)) = (discount, minimum_amount) else {
            return Err(errors);
        };

        Ok(Offer {
            id: OfferId::new(),
            code: self.code,
            name: self.name,
            description: self.description,
            discount,
            minimum_amount,
            valid_from: self.valid_from,
            valid_until: self.valid_until,
            usage_limit: self.usage_limit,
            active: self.active,
        })
    }
}
