//! Request handlers grouped by resource.

pub mod admin;
pub mod cart;
pub mod checkout;
pub mod contact;
pub mod health;
pub mod metrics;
pub mod offers;
pub mod orders;
pub mod payment;
pub mod products;
