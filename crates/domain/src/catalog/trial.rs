use chrono::{DateTime, Utc};
use common::{AccountId, ProductId};
use serde::{Deserialize, Serialize};

/// Records that an account consumed a product's trial plan.
///
/// At most one record exists per `(account_id, product_id)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialUsage {
    pub account_id: AccountId,
    pub product_id: ProductId,
    pub used_at: DateTime<Utc>,
}

impl TrialUsage {
    pub fn new(account_id: AccountId, product_id: ProductId, used_at: DateTime<Utc>) -> Self {
        Self {
            account_id,
            product_id,
            used_at,
        }
    }
}
