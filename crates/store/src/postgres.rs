use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AccountId, ContactId, OfferId, OrderId, PlanId, ProductId, SessionId};
use domain::{
    AppliedOffer, Cart, CartLine, CatalogError, ContactLead, ContactStatus, Discount,
    DiscountKind, DurationType, Money, Offer, Order, OrderLineItem, OrderParts, PlanSnapshot,
    PricingPlan, Product, TrialUsage,
};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Result, StoreError,
    store::{ContactCounts, Store, UnitOfWork},
};

const PRODUCT_COLUMNS: &str = "id, name, description, base_price, stock, active";
const PLAN_COLUMNS: &str = "id, product_id, duration_type, duration_value, price, label, is_default, active, sort_order";
const OFFER_COLUMNS: &str = "id, code, name, description, discount_type, discount_value, minimum_amount, valid_from, valid_until, usage_limit, active";
const ORDER_COLUMNS: &str = "id, account_id, email, status, payment_status, remote_order_id, remote_payment_id, created_at, updated_at";
const CONTACT_COLUMNS: &str = "id, name, phone, email, source, role, requirement, message, status, created_at";

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        tracing::debug!("storefront migrations applied");
        Ok(())
    }

    async fn plans_for(&self, product_ids: &[Uuid]) -> Result<Vec<PricingPlan>> {
        let rows = sqlx::query(&format!(
            "SELECT {PLAN_COLUMNS} FROM pricing_plans WHERE product_id = ANY($1) ORDER BY sort_order, duration_value"
        ))
        .bind(product_ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_plan).collect()
    }

    async fn products_with_plans(&self, rows: Vec<PgRow>) -> Result<Vec<Product>> {
        let ids = rows
            .iter()
            .map(|row| row.try_get::<Uuid, _>("id"))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let mut plans = self.plans_for(&ids).await?;

        rows.into_iter()
            .map(|row| {
                let id = ProductId::from_uuid(row.try_get("id")?);
                let (own, rest): (Vec<_>, Vec<_>) =
                    plans.drain(..).partition(|p| p.product_id == id);
                plans = rest;
                row_to_product(row, own)
            })
            .collect()
    }

    async fn load_order(&self, row: PgRow) -> Result<Order> {
        let order_id: Uuid = row.try_get("id")?;

        let items = sqlx::query(
            r#"
            SELECT product_id, product_name, quantity, unit_price, plan_id, duration_type, duration_value
            FROM order_line_items
            WHERE order_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(row_to_line_item)
        .collect::<Result<Vec<_>>>()?;

        let offers = sqlx::query(
            r#"
            SELECT offer_id, code, discount_amount, applied_at
            FROM applied_offers
            WHERE order_id = $1
            ORDER BY applied_at ASC
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(row_to_applied_offer)
        .collect::<Result<Vec<_>>>()?;

        Ok(Order::restore(OrderParts {
            id: OrderId::from_uuid(order_id),
            account_id: AccountId::from_uuid(row.try_get("account_id")?),
            email: row.try_get("email")?,
            status: parse(row.try_get::<String, _>("status")?, "order status")?,
            payment_status: parse(
                row.try_get::<String, _>("payment_status")?,
                "payment status",
            )?,
            remote_order_id: row.try_get("remote_order_id")?,
            remote_payment_id: row.try_get("remote_payment_id")?,
            line_items: items,
            applied_offers: offers,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        }))
    }
}

#[async_trait]
impl Store for PostgresStore {
    type Tx = PgUnitOfWork;

    async fn begin(&self) -> Result<Self::Tx> {
        Ok(PgUnitOfWork {
            tx: self.pool.begin().await?,
            line_position: 0,
        })
    }

    async fn load_cart(&self, session_id: &SessionId) -> Result<Cart> {
        let account: Option<Option<Uuid>> =
            sqlx::query_scalar("SELECT account_id FROM carts WHERE session_id = $1")
                .bind(session_id.as_str())
                .fetch_optional(&self.pool)
                .await?;
        let Some(account) = account else {
            return Ok(Cart::new(session_id.clone()));
        };

        let rows = sqlx::query(
            r#"
            SELECT ci.product_id, ci.quantity, ci.plan_id, ci.plan_duration_type,
                   ci.plan_duration_value, ci.plan_price, p.name, p.base_price
            FROM cart_items ci
            JOIN products p ON p.id = ci.product_id
            WHERE ci.session_id = $1
            ORDER BY ci.position ASC
            "#,
        )
        .bind(session_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        let lines = rows
            .into_iter()
            .map(row_to_cart_line)
            .collect::<Result<Vec<_>>>()?;

        Ok(Cart::restore(
            session_id.clone(),
            account.map(AccountId::from_uuid),
            lines,
        ))
    }

    async fn save_cart(&self, cart: &Cart) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO carts (session_id, account_id)
            VALUES ($1, $2)
            ON CONFLICT (session_id) DO UPDATE SET
                account_id = COALESCE(carts.account_id, EXCLUDED.account_id),
                updated_at = NOW()
            "#,
        )
        .bind(cart.session_id.as_str())
        .bind(cart.account_id.map(|a| a.as_uuid()))
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM cart_items WHERE session_id = $1")
            .bind(cart.session_id.as_str())
            .execute(&mut *tx)
            .await?;

        for (position, line) in cart.lines().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO cart_items (session_id, product_id, position, quantity, plan_id,
                                        plan_duration_type, plan_duration_value, plan_price)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(cart.session_id.as_str())
            .bind(line.product_id.as_uuid())
            .bind(to_i32(position, "cart position")?)
            .bind(to_i32(line.quantity, "quantity")?)
            .bind(line.plan.map(|p| p.plan_id.as_uuid()))
            .bind(line.plan.map(|p| p.duration_type.as_str()))
            .bind(
                line.plan
                    .map(|p| to_i32(p.duration_value, "duration"))
                    .transpose()?,
            )
            .bind(line.plan.map(|p| p.price.minor()))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn clear_cart(&self, session_id: &SessionId) -> Result<()> {
        sqlx::query("DELETE FROM cart_items WHERE session_id = $1")
            .bind(session_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_product(&self, product: &Product) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, base_price, stock, active)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.base_price.minor())
        .bind(to_i32(product.stock, "stock")?)
        .bind(product.active)
        .execute(&mut *tx)
        .await?;

        for plan in product.plans() {
            sqlx::query(
                r#"
                INSERT INTO pricing_plans (id, product_id, duration_type, duration_value, price,
                                           label, is_default, active, sort_order)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(plan.id.as_uuid())
            .bind(product.id.as_uuid())
            .bind(plan.duration_type.as_str())
            .bind(to_i32(plan.duration_value, "duration")?)
            .bind(plan.price.minor())
            .bind(&plan.label)
            .bind(plan.is_default)
            .bind(plan.active)
            .bind(plan.sort_order)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.products_with_plans(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_products(&self, active_only: bool) -> Result<Vec<Product>> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE active OR NOT $1 ORDER BY name ASC"
        ))
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;

        self.products_with_plans(rows).await
    }

    async fn toggle_product(&self, id: ProductId) -> Result<Option<bool>> {
        let active: Option<bool> = sqlx::query_scalar(
            "UPDATE products SET active = NOT active WHERE id = $1 RETURNING active",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        Ok(active)
    }

    async fn toggle_plan(&self, id: PlanId) -> Result<Option<bool>> {
        let active: Option<bool> = sqlx::query_scalar(
            "UPDATE pricing_plans SET active = NOT active WHERE id = $1 RETURNING active",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        Ok(active)
    }

    async fn update_trial_prices(&self, price: Money) -> Result<u64> {
        if !price.is_positive() {
            return Err(CatalogError::InvalidPrice { price }.into());
        }
        let result = sqlx::query(
            "UPDATE pricing_plans SET price = $1 WHERE duration_type = 'days' AND duration_value = 1",
        )
        .bind(price.minor())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn has_used_trial(&self, account_id: AccountId, product_id: ProductId) -> Result<bool> {
        let used: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM trial_usages WHERE account_id = $1 AND product_id = $2)",
        )
        .bind(account_id.as_uuid())
        .bind(product_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;
        Ok(used)
    }

    async fn record_trial_usage(&self, usage: &TrialUsage) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO trial_usages (account_id, product_id, used_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (account_id, product_id) DO NOTHING
            "#,
        )
        .bind(usage.account_id.as_uuid())
        .bind(usage.product_id.as_uuid())
        .bind(usage.used_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn reset_trial(&self, account_id: AccountId, product_id: ProductId) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM trial_usages WHERE account_id = $1 AND product_id = $2")
                .bind(account_id.as_uuid())
                .bind(product_id.as_uuid())
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_offer(&self, offer: &Offer) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO offers (id, code, name, description, discount_type, discount_value,
                                minimum_amount, valid_from, valid_until, usage_limit, active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(offer.id.as_uuid())
        .bind(&offer.code)
        .bind(&offer.name)
        .bind(&offer.description)
        .bind(offer.discount.kind().as_str())
        .bind(offer.discount.value())
        .bind(offer.minimum_amount.minor())
        .bind(offer.valid_from)
        .bind(offer.valid_until)
        .bind(offer.usage_limit.map(|l| to_i32(l, "usage limit")).transpose()?)
        .bind(offer.active)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("unique_offer_code")
            {
                return StoreError::DuplicateOfferCode {
                    code: offer.code.clone(),
                };
            }
            StoreError::Database(e)
        })?;
        Ok(())
    }

    async fn find_offer_by_code(&self, code: &str) -> Result<Option<Offer>> {
        let row = sqlx::query(&format!("SELECT {OFFER_COLUMNS} FROM offers WHERE code = $1"))
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_offer).transpose()
    }

    async fn list_available_offers(&self, now: DateTime<Utc>) -> Result<Vec<Offer>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {OFFER_COLUMNS} FROM offers
            WHERE active AND valid_from <= $1 AND valid_until >= $1
            ORDER BY valid_until ASC
            "#
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_offer).collect()
    }

    async fn offer_usage_count(&self, offer_id: OfferId) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM applied_offers WHERE offer_id = $1")
            .bind(offer_id.as_uuid())
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(Some(self.load_order(row).await?)),
            None => Ok(None),
        }
    }

    async fn list_orders_for_account(&self, account_id: AccountId) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE account_id = $1 ORDER BY created_at DESC"
        ))
        .bind(account_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            orders.push(self.load_order(row).await?);
        }
        Ok(orders)
    }

    async fn update_order(&self, order: &Order) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE orders SET
                status = $2,
                payment_status = $3,
                remote_order_id = $4,
                remote_payment_id = $5,
                total_amount = $6,
                updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(order.status().as_str())
        .bind(order.payment_status().as_str())
        .bind(order.remote_order_id())
        .bind(order.remote_payment_id())
        .bind(order.total_amount().minor())
        .bind(order.updated_at())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::OrderNotFound(order.id()));
        }
        Ok(())
    }

    async fn count_orders(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn insert_contact(&self, lead: &ContactLead) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO contacts (id, name, phone, email, source, role, requirement, message,
                                  status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(lead.id.as_uuid())
        .bind(&lead.name)
        .bind(&lead.phone)
        .bind(&lead.email)
        .bind(&lead.source)
        .bind(&lead.role)
        .bind(&lead.requirement)
        .bind(&lead.message)
        .bind(lead.status.as_str())
        .bind(lead.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn recent_contacts(&self, limit: u32) -> Result<Vec<ContactLead>> {
        let rows = sqlx::query(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts ORDER BY created_at DESC LIMIT $1"
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_contact).collect()
    }

    async fn contact_counts(&self) -> Result<ContactCounts> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE status = 'new') AS unread,
                   COUNT(*) FILTER (WHERE status IN ('new', 'in_progress')) AS pending
            FROM contacts
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(ContactCounts {
            total: row.try_get::<i64, _>("total")? as u64,
            unread: row.try_get::<i64, _>("unread")? as u64,
            pending: row.try_get::<i64, _>("pending")? as u64,
        })
    }

    async fn update_contact_status(&self, id: ContactId, status: ContactStatus) -> Result<bool> {
        let result = sqlx::query("UPDATE contacts SET status = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_contact(&self, id: ContactId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM contacts WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Unit of work backed by a PostgreSQL transaction.
///
/// Dropping it without committing rolls the transaction back.
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
    line_position: i32,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, account_id, email, status, payment_status, remote_order_id,
                                remote_payment_id, total_amount, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(order.account_id().as_uuid())
        .bind(order.email())
        .bind(order.status().as_str())
        .bind(order.payment_status().as_str())
        .bind(order.remote_order_id())
        .bind(order.remote_payment_id())
        .bind(order.total_amount().minor())
        .bind(order.created_at())
        .bind(order.updated_at())
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_line_items(&mut self, order_id: OrderId, items: &[OrderLineItem]) -> Result<()> {
        for item in items {
            sqlx::query(
                r#"
                INSERT INTO order_line_items (order_id, position, product_id, product_name,
                                              quantity, unit_price, plan_id, duration_type,
                                              duration_value)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(order_id.as_uuid())
            .bind(self.line_position)
            .bind(item.product_id.as_uuid())
            .bind(&item.product_name)
            .bind(to_i32(item.quantity, "quantity")?)
            .bind(item.unit_price.minor())
            .bind(item.plan_id.map(|p| p.as_uuid()))
            .bind(item.duration_type.map(|d| d.as_str()))
            .bind(
                item.duration_value
                    .map(|v| to_i32(v, "duration"))
                    .transpose()?,
            )
            .execute(&mut *self.tx)
            .await?;
            self.line_position += 1;
        }
        Ok(())
    }

    async fn lock_offer_usage(&mut self, offer_id: OfferId) -> Result<u64> {
        sqlx::query("SELECT id FROM offers WHERE id = $1 FOR UPDATE")
            .bind(offer_id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM applied_offers WHERE offer_id = $1")
            .bind(offer_id.as_uuid())
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(count as u64)
    }

    async fn insert_applied_offer(
        &mut self,
        order_id: OrderId,
        applied: &AppliedOffer,
        usage_limit: Option<u32>,
    ) -> Result<()> {
        if let Some(limit) = usage_limit {
            let used = self.lock_offer_usage(applied.offer_id).await?;
            if used >= u64::from(limit) {
                metrics::counter!("store_offer_usage_conflicts_total").increment(1);
                tracing::warn!(offer_id = %applied.offer_id, used, limit, "offer usage limit reached inside settlement");
                return Err(StoreError::OfferUsageLimitReached {
                    offer_id: applied.offer_id,
                });
            }
        }

        sqlx::query(
            r#"
            INSERT INTO applied_offers (order_id, offer_id, code, discount_amount, applied_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(applied.offer_id.as_uuid())
        .bind(&applied.code)
        .bind(applied.discount_amount.minor())
        .bind(applied.applied_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("unique_offer_per_order")
            {
                return StoreError::DuplicateAppliedOffer {
                    order_id,
                    offer_id: applied.offer_id,
                };
            }
            StoreError::Database(e)
        })?;
        Ok(())
    }

    async fn update_order(&mut self, order: &Order) -> Result<()> {
        let result = sqlx::query(
            "UPDATE orders SET total_amount = $2, remote_order_id = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(order.id().as_uuid())
        .bind(order.total_amount().minor())
        .bind(order.remote_order_id())
        .bind(order.updated_at())
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::OrderNotFound(order.id()));
        }
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

fn parse<T: std::str::FromStr>(raw: String, what: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| StoreError::Corrupt(format!("invalid {what}: {raw}")))
}

fn to_i32<T>(value: T, what: &str) -> Result<i32>
where
    T: TryInto<i32> + Copy + std::fmt::Display,
{
    value
        .try_into()
        .map_err(|_| StoreError::Corrupt(format!("{what} out of range: {value}")))
}

fn to_u32(value: i32, what: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("negative {what}: {value}")))
}

fn row_to_product(row: PgRow, plans: Vec<PricingPlan>) -> Result<Product> {
    Ok(Product::restore(
        ProductId::from_uuid(row.try_get("id")?),
        row.try_get("name")?,
        row.try_get("description")?,
        Money::from_minor(row.try_get("base_price")?),
        to_u32(row.try_get("stock")?, "stock")?,
        row.try_get("active")?,
        plans,
    ))
}

fn row_to_plan(row: PgRow) -> Result<PricingPlan> {
    Ok(PricingPlan {
        id: PlanId::from_uuid(row.try_get("id")?),
        product_id: ProductId::from_uuid(row.try_get("product_id")?),
        duration_type: parse(row.try_get::<String, _>("duration_type")?, "duration type")?,
        duration_value: to_u32(row.try_get("duration_value")?, "duration")?,
        price: Money::from_minor(row.try_get("price")?),
        label: row.try_get("label")?,
        is_default: row.try_get("is_default")?,
        active: row.try_get("active")?,
        sort_order: row.try_get("sort_order")?,
    })
}

fn row_to_cart_line(row: PgRow) -> Result<CartLine> {
    let plan_id: Option<Uuid> = row.try_get("plan_id")?;
    let plan = match plan_id {
        Some(plan_id) => {
            let duration_type: Option<String> = row.try_get("plan_duration_type")?;
            let duration_value: Option<i32> = row.try_get("plan_duration_value")?;
            let price: Option<i64> = row.try_get("plan_price")?;
            match (duration_type, duration_value, price) {
                (Some(duration_type), Some(duration_value), Some(price)) => Some(PlanSnapshot {
                    plan_id: PlanId::from_uuid(plan_id),
                    duration_type: parse::<DurationType>(duration_type, "duration type")?,
                    duration_value: to_u32(duration_value, "duration")?,
                    price: Money::from_minor(price),
                }),
                _ => return Err(StoreError::Corrupt(format!("incomplete plan on cart line {plan_id}"))),
            }
        }
        None => None,
    };

    Ok(CartLine {
        product_id: ProductId::from_uuid(row.try_get("product_id")?),
        product_name: row.try_get("name")?,
        base_price: Money::from_minor(row.try_get("base_price")?),
        quantity: to_u32(row.try_get("quantity")?, "quantity")?,
        plan,
    })
}

fn row_to_offer(row: PgRow) -> Result<Offer> {
    let kind: DiscountKind = parse(row.try_get::<String, _>("discount_type")?, "discount type")?;
    let value: Decimal = row.try_get("discount_value")?;
    let discount = Discount::from_parts(kind, value)
        .ok_or_else(|| StoreError::Corrupt(format!("invalid discount value: {value}")))?;
    let usage_limit: Option<i32> = row.try_get("usage_limit")?;

    Ok(Offer {
        id: OfferId::from_uuid(row.try_get("id")?),
        code: row.try_get("code")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        discount,
        minimum_amount: Money::from_minor(row.try_get("minimum_amount")?),
        valid_from: row.try_get("valid_from")?,
        valid_until: row.try_get("valid_until")?,
        usage_limit: usage_limit.map(|l| to_u32(l, "usage limit")).transpose()?,
        active: row.try_get("active")?,
    })
}

fn row_to_line_item(row: PgRow) -> Result<OrderLineItem> {
    let plan_id: Option<Uuid> = row.try_get("plan_id")?;
    let duration_type: Option<String> = row.try_get("duration_type")?;
    let duration_value: Option<i32> = row.try_get("duration_value")?;

    Ok(OrderLineItem {
        product_id: ProductId::from_uuid(row.try_get("product_id")?),
        product_name: row.try_get("product_name")?,
        quantity: to_u32(row.try_get("quantity")?, "quantity")?,
        unit_price: Money::from_minor(row.try_get("unit_price")?),
        plan_id: plan_id.map(PlanId::from_uuid),
        duration_type: duration_type
            .map(|d| parse::<DurationType>(d, "duration type"))
            .transpose()?,
        duration_value: duration_value
            .map(|v| to_u32(v, "duration"))
            .transpose()?,
    })
}

fn row_to_applied_offer(row: PgRow) -> Result<AppliedOffer> {
    Ok(AppliedOffer {
        offer_id: OfferId::from_uuid(row.try_get("offer_id")?),
        code: row.try_get("code")?,
        discount_amount: Money::from_minor(row.try_get("discount_amount")?),
        applied_at: row.try_get("applied_at")?,
    })
}

fn row_to_contact(row: PgRow) -> Result<ContactLead> {
    Ok(ContactLead {
        id: ContactId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        phone: row.try_get("phone")?,
        email: row.try_get("email")?,
        source: row.try_get("source")?,
        role: row.try_get("role")?,
        requirement: row.try_get("requirement")?,
        message: row.try_get("message")?,
        status: parse::<ContactStatus>(row.try_get::<String, _>("status")?, "contact status")?,
        created_at: row.try_get("created_at")?,
    })
}
