//! Identifier types shared by every storefront crate.

mod types;

pub use types::{AccountId, ContactId, OfferId, OrderId, PlanId, ProductId, SessionId};
