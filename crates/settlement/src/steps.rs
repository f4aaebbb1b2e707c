//! Checkout settlement step names, used in logs and error reports.

/// Step name: write the order header.
pub const STEP_PERSIST_ORDER: &str = "persist_order";

/// Step name: copy the cart lines onto the order.
pub const STEP_SNAPSHOT_ITEMS: &str = "snapshot_items";

/// Step name: record the applied offers under their usage locks.
pub const STEP_APPLY_OFFERS: &str = "apply_offers";

/// Step name: create the payment order on the processor.
pub const STEP_CREATE_REMOTE_ORDER: &str = "create_remote_order";
