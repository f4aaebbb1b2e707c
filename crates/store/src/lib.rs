//! Persistence layer for the storefront.
//!
//! [`Store`] covers plain reads and writes; [`UnitOfWork`] is the atomic
//! transaction a checkout settles in. Both have an in-memory implementation
//! for tests and local runs and a PostgreSQL one.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::{InMemoryStore, InMemoryUnitOfWork};
pub use postgres::{PgUnitOfWork, PostgresStore};
pub use store::{ContactCounts, Store, UnitOfWork};
