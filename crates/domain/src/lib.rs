//! Storefront domain layer.
//!
//! This crate provides the core business rules:
//! - Session cart with plan-aware pricing
//! - Product catalog, pricing plans and trial usage
//! - Offer evaluation and discount computation
//! - Order aggregate with its status machines
//! - Contact leads

pub mod cart;
pub mod catalog;
pub mod contact;
pub mod money;
pub mod offer;
pub mod order;
pub mod validation;

pub use cart::{Cart, CartError, CartLine, MAX_LINE_QUANTITY};
pub use catalog::{
    CatalogError, DurationType, PlanSnapshot, PricingPlan, Product, ProductSeed, SeedOptions,
    TrialUsage, build_seed_products, migrate_legacy_validity_options,
};
pub use contact::{ContactError, ContactForm, ContactLead, ContactStatus};
pub use money::Money;
pub use offer::{
    Discount, DiscountKind, Offer, OfferDraft, OfferPreview, OfferRejection, normalize_code,
};
pub use order::{
    AppliedOffer, Order, OrderDraft, OrderError, OrderLineItem, OrderParts, OrderStatus,
    PaymentStatus,
};
pub use validation::FieldErrors;
