use chrono::{Duration, Utc};
use common::{AccountId, OfferId, SessionId};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use domain::{Cart, Discount, Money, Offer, Order, Product};
use rust_decimal::Decimal;

fn filled_cart(lines: usize) -> Cart {
    let mut cart = Cart::new(SessionId::new("bench"));
    for i in 0..lines {
        let product = Product::new(
            format!("Product {i}"),
            "",
            Money::from_minor(1_000 + i as i64),
            100,
        )
        .unwrap();
        cart.add_item(&product, 2, None);
    }
    cart
}

fn offer(discount: Discount) -> Offer {
    let now = Utc::now();
    Offer {
        id: OfferId::new(),
        code: "BENCH".to_string(),
        name: "Bench".to_string(),
        description: String::new(),
        discount,
        minimum_amount: Money::from_major(10),
        valid_from: now - Duration::days(1),
        valid_until: now + Duration::days(1),
        usage_limit: Some(1_000),
        active: true,
    }
}

fn bench_cart_totals(c: &mut Criterion) {
    let cart = filled_cart(50);

    c.bench_function("domain/cart_total_amount", |b| {
        b.iter(|| black_box(cart.total_amount()));
    });
}

fn bench_offer_evaluation(c: &mut Criterion) {
    let percentage = offer(Discount::Percentage(Decimal::new(125, 1)));
    let subtotal = Money::from_minor(123_456);
    let now = Utc::now();

    c.bench_function("domain/offer_validate_and_discount", |b| {
        b.iter(|| {
            if percentage.is_valid_for(subtotal, now, 10) {
                black_box(percentage.compute_discount(subtotal));
            }
        });
    });
}

fn bench_settle_order(c: &mut Criterion) {
    let cart = filled_cart(10);
    let fixed = offer(Discount::Fixed(Money::from_major(5)));
    let percentage = offer(Discount::Percentage(Decimal::from(10)));

    c.bench_function("domain/snapshot_and_apply_offers", |b| {
        b.iter(|| {
            let now = Utc::now();
            let mut order = Order::place(AccountId::new(), "bench@example.com", now);
            order.snapshot_from_cart(&cart).unwrap();
            order.apply_offer(&fixed, 0, now).unwrap();
            order.apply_offer(&percentage, 0, now).unwrap();
            black_box(order.total_amount())
        });
    });
}

criterion_group!(
    benches,
    bench_cart_totals,
    bench_offer_evaluation,
    bench_settle_order
);
criterion_main!(benches);
