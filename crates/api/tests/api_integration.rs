//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use api::AppState;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use common::{AccountId, ProductId};
use domain::{Money, Product};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use settlement::{InMemoryPaymentGateway, SettlementSettings};
use store::{InMemoryStore, Store};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestApp {
    router: Router,
    store: InMemoryStore,
    gateway: InMemoryPaymentGateway,
}

fn setup() -> TestApp {
    let store = InMemoryStore::new();
    let gateway = InMemoryPaymentGateway::default();
    let state = Arc::new(AppState::new(
        store.clone(),
        gateway.clone(),
        SettlementSettings::default(),
        Money::from_minor(100),
    ));
    TestApp {
        router: api::create_app(state, get_metrics_handle()),
        store,
        gateway,
    }
}

impl TestApp {
    async fn send(
        &self,
        method: &str,
        uri: &str,
        session: Option<&str>,
        account: Option<AccountId>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(session) = session {
            builder = builder.header("x-session-id", session);
        }
        if let Some(account) = account {
            builder = builder.header("x-account-id", account.to_string());
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    async fn product(&self, name: &str, major: i64, stock: u32) -> Product {
        let mut product = Product::new(name, "", Money::from_major(major), stock).unwrap();
        product.ensure_default_trial(Money::from_minor(100)).unwrap();
        self.store.insert_product(&product).await.unwrap();
        product
    }

    async fn add_to_cart(&self, session: &str, product_id: ProductId, quantity: u32) {
        let (status, _) = self
            .send(
                "POST",
                "/cart/items",
                Some(session),
                None,
                Some(json!({ "product_id": product_id, "quantity": quantity })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    async fn create_offer(&self, body: Value) -> (StatusCode, Value) {
        self.send("POST", "/admin/offers", None, None, Some(body)).await
    }
}

fn flash500() -> Value {
    let now = Utc::now();
    json!({
        "code": "flash500",
        "name": "Flash Sale",
        "discount_type": "fixed",
        "discount_value": "500",
        "minimum_amount": "1000",
        "valid_from": now - Duration::days(1),
        "valid_until": now + Duration::days(30),
        "usage_limit": 100
    })
}

#[tokio::test]
async fn test_health_check() {
    let app = setup();

    let (status, json) = app.send("GET", "/health", None, None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup();

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));
}

#[tokio::test]
async fn test_cart_requires_session() {
    let app = setup();

    let (status, json) = app.send("GET", "/cart", None, None, None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("x-session-id"));
}

#[tokio::test]
async fn test_add_and_view_cart() {
    let app = setup();
    let product = app.product("Bulk SMS", 1000, 10).await;

    let (status, json) = app
        .send(
            "POST",
            "/cart/items",
            Some("s1"),
            None,
            Some(json!({ "product_id": product.id, "quantity": 2 })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["message"], "Bulk SMS added to cart!");
    assert_eq!(json["cart_count"], 2);
    assert_eq!(json["cart_total"], 200_000);

    let (status, cart) = app.send("GET", "/cart", Some("s1"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["lines"].as_array().unwrap().len(), 1);
    assert_eq!(cart["lines"][0]["line_total"], 200_000);
    assert_eq!(cart["cart_count"], 2);

    let (_, other) = app.send("GET", "/cart", Some("s2"), None, None).await;
    assert_eq!(other["cart_count"], 0);
}

#[tokio::test]
async fn test_update_remove_and_clear_cart() {
    let app = setup();
    let product = app.product("Bulk SMS", 1000, 10).await;
    app.add_to_cart("s1", product.id, 1).await;

    let uri = format!("/cart/items/{}", product.id);
    let (status, json) = app
        .send("PATCH", &uri, Some("s1"), None, Some(json!({ "quantity": 3 })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["cart_count"], 3);

    let (status, json) = app.send("DELETE", &uri, Some("s1"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Bulk SMS removed from cart!");
    assert_eq!(json["cart_count"], 0);

    app.add_to_cart("s1", product.id, 2).await;
    let (status, json) = app.send("DELETE", "/cart", Some("s1"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Cart cleared!");
    assert_eq!(json["cart_total"], 0);
}

#[tokio::test]
async fn test_add_rejections() {
    let app = setup();
    let sold_out = app.product("Sold Out", 500, 0).await;

    let (status, json) = app
        .send(
            "POST",
            "/cart/items",
            Some("s1"),
            None,
            Some(json!({ "product_id": sold_out.id })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Product is out of stock");

    let (status, _) = app
        .send(
            "POST",
            "/cart/items",
            Some("s1"),
            None,
            Some(json!({ "product_id": ProductId::new() })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send("PATCH", "/cart/items/not-a-uuid", Some("s1"), None, Some(json!({ "quantity": 1 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let product = app.product("Bulk SMS", 1000, 10).await;
    let (status, json) = app
        .send(
            "POST",
            "/cart/items",
            Some("s1"),
            None,
            Some(json!({ "product_id": product.id, "quantity": 4_000_000_000u32 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Quantity cannot exceed 2147483647");

    app.add_to_cart("s1", product.id, 2).await;
    let (status, _) = app
        .send(
            "PATCH",
            &format!("/cart/items/{}", product.id),
            Some("s1"),
            None,
            Some(json!({ "quantity": 1_000_000_000_000i64 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let trial = product.trial_plan().unwrap().id;
    let (status, json) = app
        .send(
            "POST",
            "/cart/items",
            Some("s1"),
            Some(AccountId::new()),
            Some(json!({ "product_id": product.id, "plan_id": trial })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json["error"],
        "Remove the paid item from your cart before choosing its trial"
    );

    let (_, cart) = app.send("GET", "/cart", Some("s1"), None, None).await;
    assert_eq!(cart["cart_count"], 2);
}

#[tokio::test]
async fn test_trial_rules() {
    let app = setup();
    let product = app.product("Bulk SMS", 1000, 10).await;
    let trial = product.trial_plan().unwrap().id;
    let body = json!({ "product_id": product.id, "plan_id": trial, "quantity": 4 });

    let (status, json) = app
        .send("POST", "/cart/items", Some("guest"), None, Some(body.clone()))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["redirect"], "/login?return_to=/cart");

    let account = AccountId::new();
    let (status, json) = app
        .send("POST", "/cart/items", Some("s1"), Some(account), Some(body.clone()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["cart_count"], 1);
    assert_eq!(json["cart_total"], 100);

    let (status, _) = app
        .send("POST", "/cart/items", Some("s2"), Some(account), Some(body.clone()))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let reset = format!("/admin/accounts/{account}/trials/{}/reset", product.id);
    let (status, _) = app.send("POST", &reset, None, None, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.send("POST", &reset, None, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send("POST", "/cart/items", Some("s2"), Some(account), Some(body))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_offers_listing_and_preview() {
    let app = setup();
    let product = app.product("Bulk SMS", 1000, 10).await;
    let (status, offer) = app.create_offer(flash500()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(offer["code"], "FLASH500");

    let (status, offers) = app.send("GET", "/offers", None, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(offers[0]["code"], "FLASH500");
    assert_eq!(offers[0]["display"], "500.00 OFF");

    app.add_to_cart("s1", product.id, 2).await;
    let (status, preview) = app
        .send(
            "POST",
            "/checkout/offers/preview",
            Some("s1"),
            None,
            Some(json!({ "code": " flash500 " })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(preview["subtotal"], 200_000);
    assert_eq!(preview["discount"], 50_000);
    assert_eq!(preview["final_total"], 150_000);

    let (status, json) = app
        .send(
            "POST",
            "/checkout/offers/preview",
            Some("s1"),
            None,
            Some(json!({ "code": "NOPE" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Invalid offer code");
}

#[tokio::test]
async fn test_offer_creation_validation() {
    let app = setup();

    let (status, _) = app.create_offer(flash500()).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app.create_offer(flash500()).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let mut bad = flash500();
    bad["code"] = json!("bad code!");
    bad["discount_type"] = json!("percentage");
    bad["discount_value"] = json!("150");
    let (status, json) = app.create_offer(bad).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json["fields"]["code"].is_array());
}

#[tokio::test]
async fn test_checkout_and_payment_flow() {
    let app = setup();
    let account = AccountId::new();
    let product = app.product("Bulk SMS", 1000, 10).await;
    app.create_offer(flash500()).await;
    app.add_to_cart("s1", product.id, 2).await;

    let (status, receipt) = app
        .send(
            "POST",
            "/checkout",
            Some("s1"),
            Some(account),
            Some(json!({ "email": "buyer@example.com", "offer_codes": ["FLASH500"] })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(receipt["amount"], 150_000);
    assert_eq!(receipt["currency"], "INR");
    let order_id = receipt["order_id"].as_str().unwrap().to_string();
    let remote_order_id = receipt["remote_order_id"].as_str().unwrap().to_string();
    assert_eq!(receipt["redirect"], format!("/payment/{order_id}"));

    let (_, cart) = app.send("GET", "/cart", Some("s1"), None, None).await;
    assert_eq!(cart["cart_count"], 0);

    let (status, page) = app
        .send("GET", &format!("/payment/{order_id}"), None, None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["key_id"], "rzp_test_sandbox");
    assert_eq!(page["remote_order_id"], remote_order_id.as_str());

    let payment_id = app
        .gateway
        .record_payment(&remote_order_id, "captured")
        .await
        .unwrap();
    let signature = app.gateway.sign(&payment_id, &remote_order_id).unwrap();
    let (status, outcome) = app
        .send(
            "POST",
            &format!("/payment/{order_id}/callback"),
            None,
            None,
            Some(json!({
                "payment_id": payment_id,
                "remote_order_id": remote_order_id,
                "signature": signature
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["status"], "paid");
    assert_eq!(outcome["payment_status"], "success");
    assert_eq!(outcome["redirect"], format!("/orders/{order_id}"));

    let (status, orders) = app.send("GET", "/orders", Some("s1"), Some(account), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(orders[0]["status"], "paid");
    assert_eq!(orders[0]["offer_codes"][0], "FLASH500");

    let detail_uri = format!("/orders/{order_id}");
    let (status, detail) = app
        .send("GET", &detail_uri, Some("s1"), Some(account), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["total_amount"], 150_000);
    assert_eq!(detail["line_items"].as_array().unwrap().len(), 1);

    let (status, _) = app
        .send("GET", &detail_uri, Some("s9"), Some(AccountId::new()), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_checkout_rejections() {
    let app = setup();
    let account = AccountId::new();
    let product = app.product("Bulk SMS", 1000, 10).await;

    let (status, json) = app
        .send(
            "POST",
            "/checkout",
            Some("s1"),
            None,
            Some(json!({ "email": "buyer@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["redirect"], "/login?return_to=/checkout");

    let (status, _) = app
        .send(
            "POST",
            "/checkout",
            Some("s1"),
            Some(account),
            Some(json!({ "email": "buyer@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.add_to_cart("s1", product.id, 1).await;
    let (status, json) = app
        .send(
            "POST",
            "/checkout",
            Some("s1"),
            Some(account),
            Some(json!({ "email": "not-an-email" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["fields"]["email"][0], "is invalid");
    assert_eq!(app.store.count_orders().await.unwrap(), 0);
}

#[tokio::test]
async fn test_gateway_failure_is_generic_and_rolls_back() {
    let app = setup();
    let product = app.product("Bulk SMS", 1000, 10).await;
    app.add_to_cart("s1", product.id, 1).await;
    app.gateway.set_fail_on_create(true).await;

    let (status, json) = app
        .send(
            "POST",
            "/checkout",
            Some("s1"),
            Some(AccountId::new()),
            Some(json!({ "email": "buyer@example.com" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["error"], settlement::GATEWAY_ERROR_MESSAGE);
    assert_eq!(app.store.count_orders().await.unwrap(), 0);

    let (_, cart) = app.send("GET", "/cart", Some("s1"), None, None).await;
    assert_eq!(cart["cart_count"], 1);
}

#[tokio::test]
async fn test_bad_signature_marks_payment_failed() {
    let app = setup();
    let account = AccountId::new();
    let product = app.product("Bulk SMS", 1000, 10).await;
    app.add_to_cart("s1", product.id, 1).await;
    let (_, receipt) = app
        .send(
            "POST",
            "/checkout",
            Some("s1"),
            Some(account),
            Some(json!({ "email": "buyer@example.com" })),
        )
        .await;
    let order_id = receipt["order_id"].as_str().unwrap().to_string();
    let remote_order_id = receipt["remote_order_id"].as_str().unwrap().to_string();

    let (status, outcome) = app
        .send(
            "POST",
            &format!("/payment/{order_id}/callback"),
            None,
            None,
            Some(json!({
                "payment_id": "pay_forged",
                "remote_order_id": remote_order_id,
                "signature": "00ff"
            })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["status"], "pending");
    assert_eq!(outcome["payment_status"], "failed");
    assert_eq!(
        outcome["message"],
        "Payment verification failed. Please contact support."
    );
}

#[tokio::test]
async fn test_admin_order_status() {
    let app = setup();
    let product = app.product("Bulk SMS", 1000, 10).await;
    app.add_to_cart("s1", product.id, 1).await;
    let (_, receipt) = app
        .send(
            "POST",
            "/checkout",
            Some("s1"),
            Some(AccountId::new()),
            Some(json!({ "email": "buyer@example.com" })),
        )
        .await;
    let uri = format!("/admin/orders/{}/status", receipt["order_id"].as_str().unwrap());

    let (status, _) = app
        .send("PATCH", &uri, None, None, Some(json!({ "status": "paid" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .send("PATCH", &uri, None, None, Some(json!({ "status": "teleported" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = app
        .send("PATCH", &uri, None, None, Some(json!({ "status": "cancelled" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "cancelled");

    let (status, _) = app
        .send("PATCH", &uri, None, None, Some(json!({ "status": "shipped" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_admin_reverify_and_refund() {
    let app = setup();
    let product = app.product("Bulk SMS", 1000, 10).await;
    app.add_to_cart("s1", product.id, 1).await;
    let (_, receipt) = app
        .send(
            "POST",
            "/checkout",
            Some("s1"),
            Some(AccountId::new()),
            Some(json!({ "email": "buyer@example.com" })),
        )
        .await;
    let order_id = receipt["order_id"].as_str().unwrap().to_string();
    let remote_order_id = receipt["remote_order_id"].as_str().unwrap().to_string();
    let reverify = format!("/admin/orders/{order_id}/reverify");
    let refund = format!("/admin/orders/{order_id}/refund");

    let (status, _) = app.send("POST", &reverify, None, None, None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let payment_id = app
        .gateway
        .record_payment(&remote_order_id, "captured")
        .await
        .unwrap();
    let signature = app.gateway.sign(&payment_id, &remote_order_id).unwrap();
    app.gateway.set_fail_on_fetch(true).await;
    let (_, outcome) = app
        .send(
            "POST",
            &format!("/payment/{order_id}/callback"),
            None,
            None,
            Some(json!({
                "payment_id": payment_id,
                "remote_order_id": remote_order_id,
                "signature": signature
            })),
        )
        .await;
    assert_eq!(outcome["payment_status"], "failed");

    let (status, _) = app.send("POST", &reverify, None, None, None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    app.gateway.set_fail_on_fetch(false).await;
    let (status, json) = app.send("POST", &reverify, None, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "paid");
    assert_eq!(json["payment_status"], "success");
    assert_eq!(json["message"], "Payment verified. The order is now paid.");

    let (status, _) = app
        .send("POST", &refund, None, None, Some(json!({ "amount": "2000" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = app
        .send(
            "POST",
            &refund,
            None,
            None,
            Some(json!({ "amount": "5", "reason": "goodwill" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["amount"], 500);
    assert_eq!(json["status"], "processed");
    assert_eq!(app.gateway.refund_count().await, 1);
}

#[tokio::test]
async fn test_admin_catalog() {
    let app = setup();

    let (status, product) = app
        .send(
            "POST",
            "/admin/products",
            None,
            None,
            Some(json!({ "name": "WhatsApp Suite", "price": "2499", "stock": 5 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(product["plans"].as_array().unwrap().len(), 1);
    assert_eq!(product["plans"][0]["duration_value"], 1);
    assert_eq!(product["plans"][0]["price"], 100);
    let product_id = product["id"].as_str().unwrap().to_string();
    let plan_id = product["plans"][0]["id"].as_str().unwrap().to_string();

    let (status, json) = app
        .send(
            "POST",
            "/admin/products/trial-price",
            None,
            None,
            Some(json!({ "trial_price": "2" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["updated"], 1);
    assert_eq!(json["trial_price"], 200);

    let (status, json) = app
        .send("PATCH", &format!("/admin/plans/{plan_id}/toggle"), None, None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["active"], false);

    let (status, json) = app
        .send("PATCH", &format!("/admin/products/{product_id}/toggle"), None, None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["active"], false);

    let (status, _) = app
        .send(
            "POST",
            "/cart/items",
            Some("s1"),
            None,
            Some(json!({ "product_id": product_id })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            "POST",
            "/admin/products",
            None,
            None,
            Some(json!({ "name": " ", "price": "10" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_contact_leads() {
    let app = setup();

    let (status, json) = app
        .send(
            "POST",
            "/contact",
            None,
            None,
            Some(json!({
                "name": "Asha",
                "phone": "+91 98765 43210",
                "email": "asha@example.com",
                "message": "Need a bulk SMS quote."
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let contact_id = json["id"].as_str().unwrap().to_string();

    let (status, json) = app
        .send(
            "POST",
            "/contact",
            None,
            None,
            Some(json!({ "name": "A", "phone": "1", "email": "x", "message": "hi" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json["fields"]["phone"].is_array());

    let (status, list) = app.send("GET", "/admin/contacts", None, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["total"], 1);
    assert_eq!(list["unread"], 1);
    assert_eq!(list["contacts"][0]["name"], "Asha");

    let uri = format!("/admin/contacts/{contact_id}");
    let (status, _) = app
        .send("PATCH", &uri, None, None, Some(json!({ "status": "in_progress" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, list) = app.send("GET", "/admin/contacts", None, None, None).await;
    assert_eq!(list["unread"], 0);
    assert_eq!(list["pending"], 1);

    let (status, _) = app
        .send("PATCH", &uri, None, None, Some(json!({ "status": "archived" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.send("DELETE", &uri, None, None, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.send("DELETE", &uri, None, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_catalog_browsing() {
    let app = setup();
    let product = app.product("Bulk SMS", 1000, 10).await;
    let hidden = app.product("Retired Plan", 10, 10).await;
    app.store.toggle_product(hidden.id).await.unwrap();

    let (status, products) = app.send("GET", "/products", None, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(products.as_array().unwrap().len(), 1);
    assert_eq!(products[0]["name"], "Bulk SMS");
    assert_eq!(products[0]["plans"][0]["display_duration"], "1 Day Trial");
    assert_eq!(products[0]["plans"][0]["trial_used"], false);

    let account = AccountId::new();
    let trial = product.trial_plan().unwrap().id;
    app.send(
        "POST",
        "/cart/items",
        Some("s1"),
        Some(account),
        Some(json!({ "product_id": product.id, "plan_id": trial })),
    )
    .await;

    let (status, detail) = app
        .send("GET", &format!("/products/{}", product.id), Some("s1"), Some(account), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["plans"][0]["trial_used"], true);

    let (status, _) = app
        .send("GET", &format!("/products/{}", hidden.id), None, None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
