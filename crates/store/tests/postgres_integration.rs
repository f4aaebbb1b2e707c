//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency and truncate
//! every table before each test, so they run serially.
//!
//! ```bash
//! cargo test -p store --test postgres_integration
//! ```

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::{AccountId, OfferId, SessionId};
use domain::{
    Cart, ContactForm, ContactStatus, Discount, DurationType, Money, Offer, Order, OrderStatus,
    PricingPlan, Product, TrialUsage,
};
use serial_test::serial;
use sqlx::PgPool;
use store::{PostgresStore, Store, StoreError, UnitOfWork};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            PostgresStore::new(temp_pool.clone())
                .run_migrations()
                .await
                .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query(
        "TRUNCATE TABLE applied_offers, order_line_items, orders, offers, trial_usages, \
         cart_items, carts, pricing_plans, products, contacts",
    )
    .execute(&pool)
    .await
    .unwrap();

    PostgresStore::new(pool)
}

fn product_with_plans() -> (Product, PricingPlan) {
    let mut product = Product::new("Bulk SMS Gateway", "SMS", Money::from_major(1000), 10).unwrap();
    product.ensure_default_trial(Money::from_major(1)).unwrap();
    let monthly = PricingPlan::new(
        product.id,
        DurationType::Days,
        30,
        Money::from_major(449),
        "30 Days",
    )
    .unwrap();
    product.add_plan(monthly.clone()).unwrap();
    (product, monthly)
}

fn offer(code: &str, limit: Option<u32>) -> Offer {
    let now = Utc::now();
    Offer {
        id: OfferId::new(),
        code: code.to_string(),
        name: code.to_string(),
        description: String::new(),
        discount: Discount::Fixed(Money::from_major(500)),
        minimum_amount: Money::from_major(1000),
        valid_from: now - Duration::days(1),
        valid_until: now + Duration::days(1),
        usage_limit: limit,
        active: true,
    }
}

fn order_from(cart: &Cart) -> Order {
    let mut order = Order::place(AccountId::new(), "buyer@example.com", Utc::now());
    order.snapshot_from_cart(cart).unwrap();
    order
}

async fn settle(store: &PostgresStore, order: &mut Order, offer: &Offer) -> store::Result<()> {
    let mut tx = store.begin().await?;
    tx.insert_order(order).await?;
    tx.insert_line_items(order.id(), order.line_items()).await?;
    let used = tx.lock_offer_usage(offer.id).await?;
    order.apply_offer(offer, used, Utc::now()).unwrap();
    let applied = order.applied_offers().last().unwrap().clone();
    tx.insert_applied_offer(order.id(), &applied, offer.usage_limit)
        .await?;
    order.set_remote_order_id("order_TEST", Utc::now());
    tx.update_order(order).await?;
    tx.commit().await
}

#[tokio::test]
#[serial]
async fn product_round_trips_with_plans() {
    let store = get_test_store().await;
    let (product, monthly) = product_with_plans();
    store.insert_product(&product).await.unwrap();

    let loaded = store.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(loaded.plans().len(), 2);
    assert!(loaded.trial_plan().unwrap().is_default);
    assert_eq!(loaded.plan(monthly.id).unwrap().price, Money::from_major(449));

    assert_eq!(store.toggle_product(product.id).await.unwrap(), Some(false));
    assert!(store.list_products(true).await.unwrap().is_empty());
    assert_eq!(store.toggle_plan(monthly.id).await.unwrap(), Some(false));

    assert_eq!(store.update_trial_prices(Money::from_major(2)).await.unwrap(), 1);
    let loaded = store.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(loaded.trial_plan().unwrap().price, Money::from_major(2));
}

#[tokio::test]
#[serial]
async fn cart_lines_replace_on_save() {
    let store = get_test_store().await;
    let (product, monthly) = product_with_plans();
    store.insert_product(&product).await.unwrap();

    let session = SessionId::new("sess-pg");
    let mut cart = store.load_cart(&session).await.unwrap();
    cart.add_item(&product, 2, Some(&monthly));
    cart.attach_account(AccountId::new());
    store.save_cart(&cart).await.unwrap();

    let loaded = store.load_cart(&session).await.unwrap();
    assert_eq!(loaded.total_items(), 2);
    assert_eq!(loaded.total_amount(), Money::from_major(898));
    assert_eq!(loaded.account_id, cart.account_id);

    let mut updated = loaded.clone();
    updated.update_quantity(product.id, 0);
    store.save_cart(&updated).await.unwrap();
    assert!(store.load_cart(&session).await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn trial_usage_is_unique() {
    let store = get_test_store().await;
    let (product, _) = product_with_plans();
    store.insert_product(&product).await.unwrap();

    let usage = TrialUsage::new(AccountId::new(), product.id, Utc::now());
    assert!(store.record_trial_usage(&usage).await.unwrap());
    assert!(!store.record_trial_usage(&usage).await.unwrap());
    assert!(store.reset_trial(usage.account_id, product.id).await.unwrap());
    assert!(!store.has_used_trial(usage.account_id, product.id).await.unwrap());
}

#[tokio::test]
#[serial]
async fn offer_codes_are_unique() {
    let store = get_test_store().await;
    store.insert_offer(&offer("FLASH500", None)).await.unwrap();

    let err = store.insert_offer(&offer("FLASH500", None)).await.unwrap_err();
    assert!(matches!(err, StoreError::DuplicateOfferCode { .. }));

    let found = store.find_offer_by_code("FLASH500").await.unwrap().unwrap();
    assert_eq!(found.discount, Discount::Fixed(Money::from_major(500)));
    assert_eq!(store.list_available_offers(Utc::now()).await.unwrap().len(), 1);
}

#[tokio::test]
#[serial]
async fn settlement_commits_atomically() {
    let store = get_test_store().await;
    let (product, _) = product_with_plans();
    store.insert_product(&product).await.unwrap();
    let flash = offer("FLASH500", None);
    store.insert_offer(&flash).await.unwrap();

    let mut cart = Cart::new(SessionId::new("s"));
    cart.add_item(&product, 2, None);
    let mut order = order_from(&cart);
    settle(&store, &mut order, &flash).await.unwrap();

    let loaded = store.get_order(order.id()).await.unwrap().unwrap();
    assert_eq!(loaded.total_amount(), Money::from_major(1500));
    assert_eq!(loaded.line_items().len(), 1);
    assert_eq!(loaded.remote_order_id(), Some("order_TEST"));
    assert_eq!(store.offer_usage_count(flash.id).await.unwrap(), 1);

    let mut paid = loaded.clone();
    paid.mark_payment_successful("pay_TEST", Utc::now()).unwrap();
    store.update_order(&paid).await.unwrap();
    let loaded = store.get_order(order.id()).await.unwrap().unwrap();
    assert_eq!(loaded.status(), OrderStatus::Paid);
    assert_eq!(
        store
            .list_orders_for_account(order.account_id())
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
#[serial]
async fn rollback_leaves_no_rows() {
    let store = get_test_store().await;
    let (product, _) = product_with_plans();
    store.insert_product(&product).await.unwrap();

    let mut cart = Cart::new(SessionId::new("s"));
    cart.add_item(&product, 1, None);
    let order = order_from(&cart);

    let before = store.count_orders().await.unwrap();
    let mut tx = store.begin().await.unwrap();
    tx.insert_order(&order).await.unwrap();
    tx.insert_line_items(order.id(), order.line_items())
        .await
        .unwrap();
    tx.rollback().await.unwrap();

    assert_eq!(store.count_orders().await.unwrap(), before);
    assert!(store.get_order(order.id()).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn usage_limit_holds_under_sequential_settlements() {
    let store = get_test_store().await;
    let (product, _) = product_with_plans();
    store.insert_product(&product).await.unwrap();
    let limited = offer("ONCE", Some(1));
    store.insert_offer(&limited).await.unwrap();

    let mut cart = Cart::new(SessionId::new("s"));
    cart.add_item(&product, 2, None);

    let mut first = order_from(&cart);
    settle(&store, &mut first, &limited).await.unwrap();

    // A second unit of work that skipped the usage check still cannot exceed the limit.
    let mut second = order_from(&cart);
    second.apply_offer(&limited, 0, Utc::now()).unwrap();
    let mut tx = store.begin().await.unwrap();
    tx.insert_order(&second).await.unwrap();
    let err = tx
        .insert_applied_offer(second.id(), &second.applied_offers()[0], limited.usage_limit)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::OfferUsageLimitReached { .. }));
    tx.rollback().await.unwrap();

    assert_eq!(store.count_orders().await.unwrap(), 1);
}

#[tokio::test]
#[serial]
async fn contact_leads() {
    let store = get_test_store().await;
    let lead = ContactForm {
        name: "Meera".to_string(),
        phone: "9123456780".to_string(),
        email: "meera@example.com".to_string(),
        source: Some("landing".to_string()),
        role: None,
        requirement: None,
        message: "Looking for an email campaign tool.".to_string(),
    }
    .into_lead(Utc::now())
    .unwrap();
    store.insert_contact(&lead).await.unwrap();

    assert!(
        store
            .update_contact_status(lead.id, ContactStatus::Responded)
            .await
            .unwrap()
    );
    let counts = store.contact_counts().await.unwrap();
    assert_eq!((counts.total, counts.unread, counts.pending), (1, 0, 0));

    let recent = store.recent_contacts(20).await.unwrap();
    assert_eq!(recent[0].status, ContactStatus::Responded);
    assert!(store.delete_contact(lead.id).await.unwrap());
}
