use common::{OfferId, OrderId};
use domain::CatalogError;
use thiserror::Error;

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another offer already uses this code.
    #[error("Offer code already exists: {code}")]
    DuplicateOfferCode { code: String },

    /// The offer is already applied to the order.
    #[error("Offer {offer_id} is already applied to order {order_id}")]
    DuplicateAppliedOffer { order_id: OrderId, offer_id: OfferId },

    /// A concurrent settlement used up the offer's last slot.
    #[error("Offer {offer_id} reached its usage limit")]
    OfferUsageLimitReached { offer_id: OfferId },

    /// The order being updated does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// A stored value could not be mapped back to a domain type.
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// A catalog rule rejected the change.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The backing store refused the operation.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
