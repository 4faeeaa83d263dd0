//! Persistence gateway: the `Storage` trait the engine talks to and its
//! PostgreSQL implementation.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use tracing::{debug, info};

use crate::models::{
    CartItem, CartLine, NewMessage, NewOrder, NewQuickOrder, Order, OrderItem, Product,
    QuickOrder, SessionPatch, SessionRow, UserProfile, STATUS_NEW,
};

/// Typed operations over users, sessions, carts, orders, quick orders,
/// messages, products and admins.
///
/// Implementations must make [`Storage::commit_order`] atomic: the order row,
/// its items and the cart clearance either all land or none do.
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    async fn upsert_user(&self, user: &UserProfile) -> Result<()>;

    async fn load_session(&self, user_id: i64) -> Result<Option<SessionRow>>;
    async fn save_session(&self, user_id: i64, patch: &SessionPatch) -> Result<()>;
    async fn clear_session(&self, user_id: i64) -> Result<()>;

    /// Active products ordered by id
    async fn list_active_products(&self) -> Result<Vec<Product>>;

    async fn cart_items(&self, user_id: i64) -> Result<Vec<CartItem>>;
    /// Insert a cart line or add `quantity` to the existing one for the same product
    async fn add_to_cart(&self, user_id: i64, product_id: i64, quantity: f64) -> Result<CartLine>;
    async fn remove_cart_line(&self, user_id: i64, cart_id: i64) -> Result<bool>;
    async fn clear_cart(&self, user_id: i64) -> Result<u64>;

    /// Insert the order with its items and empty the user's cart in one transaction
    async fn commit_order(&self, order: &NewOrder) -> Result<i64>;
    async fn recent_orders(&self, user_id: i64, limit: i64) -> Result<Vec<Order>>;
    async fn order_for_user(&self, user_id: i64, order_id: i64) -> Result<Option<Order>>;
    async fn order_items(&self, order_id: i64) -> Result<Vec<OrderItem>>;

    async fn create_quick_order(&self, order: &NewQuickOrder) -> Result<i64>;
    /// Back-fill the customer's text; returns false when the order is unknown
    /// or already carries text
    async fn fill_quick_order_text(&self, user_id: i64, order_id: i64, text: &str)
        -> Result<bool>;
    async fn quick_order(&self, id: i64) -> Result<Option<QuickOrder>>;

    async fn record_message(&self, message: &NewMessage) -> Result<i64>;

    async fn admin_ids(&self) -> Result<Vec<i64>>;
}

const SCHEMA: &[(&str, &str)] = &[
    (
        "users",
        "CREATE TABLE IF NOT EXISTS users (
            user_id BIGINT PRIMARY KEY,
            first_name TEXT NOT NULL,
            last_name TEXT,
            username TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    ),
    (
        "user_sessions",
        "CREATE TABLE IF NOT EXISTS user_sessions (
            user_id BIGINT PRIMARY KEY,
            state TEXT NOT NULL DEFAULT '',
            temp_data TEXT NOT NULL DEFAULT '{}',
            last_section TEXT NOT NULL DEFAULT 'main_menu',
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    ),
    (
        "products",
        "CREATE TABLE IF NOT EXISTS products (
            id BIGINT PRIMARY KEY,
            name TEXT NOT NULL,
            price DOUBLE PRECISION NOT NULL,
            category TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            unit TEXT NOT NULL DEFAULT '',
            image_glyph TEXT NOT NULL DEFAULT '',
            image_file_ref TEXT,
            image_path TEXT,
            details TEXT NOT NULL DEFAULT '',
            is_active BOOLEAN NOT NULL DEFAULT TRUE
        )",
    ),
    (
        "carts",
        "CREATE TABLE IF NOT EXISTS carts (
            id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL,
            product_id BIGINT NOT NULL REFERENCES products(id),
            quantity DOUBLE PRECISION NOT NULL CHECK (quantity > 0),
            added_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            UNIQUE (user_id, product_id)
        )",
    ),
    (
        "orders",
        "CREATE TABLE IF NOT EXISTS orders (
            order_id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL,
            user_name TEXT NOT NULL,
            username TEXT,
            phone TEXT NOT NULL,
            city TEXT NOT NULL,
            np_department TEXT NOT NULL,
            total DOUBLE PRECISION NOT NULL,
            status TEXT NOT NULL DEFAULT 'new',
            order_type TEXT NOT NULL DEFAULT 'regular',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    ),
    (
        "order_items",
        "CREATE TABLE IF NOT EXISTS order_items (
            id BIGSERIAL PRIMARY KEY,
            order_id BIGINT NOT NULL REFERENCES orders(order_id) ON DELETE CASCADE,
            product_name TEXT NOT NULL,
            quantity DOUBLE PRECISION NOT NULL,
            unit_price DOUBLE PRECISION NOT NULL
        )",
    ),
    (
        "messages",
        "CREATE TABLE IF NOT EXISTS messages (
            id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL,
            user_name TEXT NOT NULL,
            username TEXT,
            text TEXT NOT NULL,
            kind TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    ),
    (
        "quick_orders",
        "CREATE TABLE IF NOT EXISTS quick_orders (
            id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL,
            user_name TEXT NOT NULL,
            username TEXT,
            product_id BIGINT NOT NULL,
            product_name TEXT NOT NULL,
            quantity DOUBLE PRECISION NOT NULL DEFAULT 0,
            phone TEXT,
            contact_method TEXT NOT NULL,
            free_text TEXT,
            status TEXT NOT NULL DEFAULT 'new',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    ),
    (
        "admins",
        "CREATE TABLE IF NOT EXISTS admins (
            user_id BIGINT PRIMARY KEY,
            username TEXT,
            added_by BIGINT,
            added_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    ),
];

/// Initialize the database schema
pub async fn init_database_schema(pool: &PgPool) -> Result<()> {
    info!("Initializing database schema...");

    for (table, ddl) in SCHEMA {
        sqlx::query(ddl)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to create {table} table"))?;
    }

    info!("Database schema initialized successfully");
    Ok(())
}

/// Insert the given catalog when the products table is empty.
///
/// Returns the number of inserted products.
pub async fn seed_products(pool: &PgPool, products: &[Product]) -> Result<u64> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
        .fetch_one(pool)
        .await
        .context("Failed to count products")?;
    if existing > 0 {
        debug!(existing, "Products table already populated, skipping seed");
        return Ok(0);
    }

    let mut inserted = 0;
    for product in products {
        inserted += sqlx::query(
            "INSERT INTO products
                (id, name, price, category, description, unit, image_glyph,
                 image_file_ref, image_path, details, is_active)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(product.price)
        .bind(&product.category)
        .bind(&product.description)
        .bind(&product.unit)
        .bind(&product.image_glyph)
        .bind(&product.image_file_ref)
        .bind(&product.image_path)
        .bind(&product.details)
        .bind(product.is_active)
        .execute(pool)
        .await
        .with_context(|| format!("Failed to seed product {}", product.id))?
        .rows_affected();
    }

    info!(inserted, "Seeded product catalog");
    Ok(inserted)
}

/// Register bootstrap administrators, leaving existing rows untouched
pub async fn seed_admins(pool: &PgPool, admin_ids: &[i64]) -> Result<u64> {
    let mut inserted = 0;
    for admin_id in admin_ids {
        inserted += sqlx::query(
            "INSERT INTO admins (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(admin_id)
        .execute(pool)
        .await
        .with_context(|| format!("Failed to register admin {admin_id}"))?
        .rows_affected();
    }
    Ok(inserted)
}

/// PostgreSQL-backed [`Storage`]
#[derive(Clone, Debug)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a connection pool against `database_url`
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

const ORDER_COLUMNS: &str = "order_id, user_id, user_name, username, phone, city, np_department, \
     total, status, order_type, created_at";

#[async_trait]
impl Storage for PgStorage {
    async fn upsert_user(&self, user: &UserProfile) -> Result<()> {
        sqlx::query(
            "INSERT INTO users (user_id, first_name, last_name, username)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (user_id) DO UPDATE SET
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                username = EXCLUDED.username",
        )
        .bind(user.user_id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.username)
        .execute(&self.pool)
        .await
        .context("Failed to upsert user")?;
        Ok(())
    }

    async fn load_session(&self, user_id: i64) -> Result<Option<SessionRow>> {
        let row = sqlx::query(
            "SELECT state, temp_data, last_section FROM user_sessions WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to load session")?;

        let Some(row) = row else {
            return Ok(None);
        };
        let temp_data: String = row.try_get("temp_data")?;
        Ok(Some(SessionRow {
            state_tag: row.try_get("state")?,
            scratch: serde_json::from_str(&temp_data)
                .context("Session temp_data is not valid JSON")?,
            last_section: row.try_get("last_section")?,
        }))
    }

    async fn save_session(&self, user_id: i64, patch: &SessionPatch) -> Result<()> {
        let temp_data = patch
            .scratch
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .context("Failed to encode session scratch")?;

        sqlx::query(
            "INSERT INTO user_sessions (user_id, state, temp_data, last_section, updated_at)
             VALUES ($1, COALESCE($2, ''), COALESCE($3, '{}'), COALESCE($4, 'main_menu'), NOW())
             ON CONFLICT (user_id) DO UPDATE SET
                state = COALESCE($2, user_sessions.state),
                temp_data = COALESCE($3, user_sessions.temp_data),
                last_section = COALESCE($4, user_sessions.last_section),
                updated_at = NOW()",
        )
        .bind(user_id)
        .bind(&patch.state_tag)
        .bind(&temp_data)
        .bind(&patch.last_section)
        .execute(&self.pool)
        .await
        .context("Failed to save session")?;
        Ok(())
    }

    async fn clear_session(&self, user_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM user_sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .context("Failed to clear session")?;
        Ok(())
    }

    async fn list_active_products(&self) -> Result<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT id, name, price, category, description, unit, image_glyph,
                    image_file_ref, image_path, details, is_active
             FROM products WHERE is_active ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list products")?;
        Ok(products)
    }

    async fn cart_items(&self, user_id: i64) -> Result<Vec<CartItem>> {
        let items = sqlx::query_as::<_, CartItem>(
            "SELECT c.id AS cart_id, c.product_id, p.name, p.price, p.unit, c.quantity
             FROM carts c JOIN products p ON p.id = c.product_id
             WHERE c.user_id = $1
             ORDER BY c.added_at, c.id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to load cart")?;
        Ok(items)
    }

    async fn add_to_cart(&self, user_id: i64, product_id: i64, quantity: f64) -> Result<CartLine> {
        let line = sqlx::query_as::<_, CartLine>(
            "INSERT INTO carts (user_id, product_id, quantity)
             VALUES ($1, $2, $3)
             ON CONFLICT (user_id, product_id)
             DO UPDATE SET quantity = carts.quantity + EXCLUDED.quantity
             RETURNING id, user_id, product_id, quantity, added_at",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .fetch_one(&self.pool)
        .await
        .context("Failed to add product to cart")?;
        Ok(line)
    }

    async fn remove_cart_line(&self, user_id: i64, cart_id: i64) -> Result<bool> {
        let rows = sqlx::query("DELETE FROM carts WHERE id = $1 AND user_id = $2")
            .bind(cart_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .context("Failed to remove cart line")?
            .rows_affected();
        Ok(rows > 0)
    }

    async fn clear_cart(&self, user_id: i64) -> Result<u64> {
        let rows = sqlx::query("DELETE FROM carts WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .context("Failed to clear cart")?
            .rows_affected();
        Ok(rows)
    }

    async fn commit_order(&self, order: &NewOrder) -> Result<i64> {
        let mut tx = self.pool.begin().await.context("Failed to open transaction")?;

        let order_id: i64 = sqlx::query_scalar(
            "INSERT INTO orders
                (user_id, user_name, username, phone, city, np_department, total, status, order_type)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING order_id",
        )
        .bind(order.user_id)
        .bind(&order.user_name)
        .bind(&order.username)
        .bind(&order.phone)
        .bind(&order.city)
        .bind(&order.np_department)
        .bind(order.total)
        .bind(STATUS_NEW)
        .bind(order.order_type.as_str())
        .fetch_one(&mut *tx)
        .await
        .context("Failed to insert order")?;

        for item in &order.items {
            sqlx::query(
                "INSERT INTO order_items (order_id, product_name, quantity, unit_price)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(order_id)
            .bind(&item.product_name)
            .bind(item.quantity)
            .bind(item.unit_price)
            .execute(&mut *tx)
            .await
            .context("Failed to insert order item")?;
        }

        sqlx::query("DELETE FROM carts WHERE user_id = $1")
            .bind(order.user_id)
            .execute(&mut *tx)
            .await
            .context("Failed to clear cart for order")?;

        tx.commit().await.context("Failed to commit order")?;

        info!(order_id, user_id = order.user_id, items = order.items.len(), "Order committed");
        Ok(order_id)
    }

    async fn recent_orders(&self, user_id: i64, limit: i64) -> Result<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1
             ORDER BY created_at DESC, order_id DESC LIMIT $2"
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list orders")?;
        Ok(orders)
    }

    async fn order_for_user(&self, user_id: i64, order_id: i64) -> Result<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = $1 AND user_id = $2"
        ))
        .bind(order_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to read order")?;
        Ok(order)
    }

    async fn order_items(&self, order_id: i64) -> Result<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(
            "SELECT id, order_id, product_name, quantity, unit_price
             FROM order_items WHERE order_id = $1 ORDER BY id",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to read order items")?;
        Ok(items)
    }

    async fn create_quick_order(&self, order: &NewQuickOrder) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO quick_orders
                (user_id, user_name, username, product_id, product_name, quantity,
                 phone, contact_method, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING id",
        )
        .bind(order.user_id)
        .bind(&order.user_name)
        .bind(&order.username)
        .bind(order.product_id)
        .bind(&order.product_name)
        .bind(order.quantity)
        .bind(&order.phone)
        .bind(order.contact_method.as_str())
        .bind(STATUS_NEW)
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert quick order")?;
        Ok(id)
    }

    async fn fill_quick_order_text(
        &self,
        user_id: i64,
        order_id: i64,
        text: &str,
    ) -> Result<bool> {
        let rows = sqlx::query(
            "UPDATE quick_orders SET free_text = $3
             WHERE id = $1 AND user_id = $2 AND free_text IS NULL",
        )
        .bind(order_id)
        .bind(user_id)
        .bind(text)
        .execute(&self.pool)
        .await
        .context("Failed to attach text to quick order")?
        .rows_affected();
        Ok(rows == 1)
    }

    async fn quick_order(&self, id: i64) -> Result<Option<QuickOrder>> {
        let order = sqlx::query_as::<_, QuickOrder>(
            "SELECT id, user_id, user_name, username, product_id, product_name, quantity,
                    phone, contact_method, free_text, status, created_at
             FROM quick_orders WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to read quick order")?;
        Ok(order)
    }

    async fn record_message(&self, message: &NewMessage) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO messages (user_id, user_name, username, text, kind)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id",
        )
        .bind(message.user_id)
        .bind(&message.user_name)
        .bind(&message.username)
        .bind(&message.text)
        .bind(message.kind.as_str())
        .fetch_one(&self.pool)
        .await
        .context("Failed to store message")?;
        Ok(id)
    }

    async fn admin_ids(&self) -> Result<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>("SELECT user_id FROM admins ORDER BY user_id")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list admins")?;
        Ok(ids)
    }
}
