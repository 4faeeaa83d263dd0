//! In-process [`Storage`] used by the test-suite and for dry runs without a
//! database. Every operation takes a single lock, so each call is atomic.

use std::collections::{BTreeMap, HashMap};

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::db::Storage;
use crate::models::{
    Admin, CartItem, CartLine, CustomerMessage, NewMessage, NewOrder, NewQuickOrder, Order,
    OrderItem, Product, QuickOrder, SessionPatch, SessionRow, User, UserProfile, STATUS_NEW,
};

#[derive(Default)]
struct Tables {
    users: HashMap<i64, User>,
    sessions: HashMap<i64, SessionRow>,
    products: BTreeMap<i64, Product>,
    carts: Vec<CartLine>,
    orders: Vec<Order>,
    order_items: Vec<OrderItem>,
    quick_orders: Vec<QuickOrder>,
    messages: Vec<CustomerMessage>,
    admins: BTreeMap<i64, Admin>,
    next_id: i64,
    fail_commits: bool,
    fail_messages: bool,
    fail_session_clears: bool,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    tables: Mutex<Tables>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_products(products: Vec<Product>) -> Self {
        Self {
            tables: Mutex::new(Tables {
                products: products.into_iter().map(|p| (p.id, p)).collect(),
                ..Tables::default()
            }),
        }
    }

    /// Insert or replace a catalog entry, as out-of-band tooling would
    pub async fn put_product(&self, product: Product) {
        self.tables.lock().await.products.insert(product.id, product);
    }

    pub async fn remove_product(&self, product_id: i64) {
        self.tables.lock().await.products.remove(&product_id);
    }

    pub async fn add_admin(&self, user_id: i64, username: Option<&str>, added_by: Option<i64>) {
        self.tables.lock().await.admins.insert(
            user_id,
            Admin {
                user_id,
                username: username.map(str::to_string),
                added_by,
                added_at: Utc::now(),
            },
        );
    }

    pub async fn remove_admin(&self, user_id: i64) {
        self.tables.lock().await.admins.remove(&user_id);
    }

    /// Make every following order commit fail before anything is written
    pub async fn fail_order_commits(&self, fail: bool) {
        self.tables.lock().await.fail_commits = fail;
    }

    /// Make every following customer message insert fail
    pub async fn fail_message_records(&self, fail: bool) {
        self.tables.lock().await.fail_messages = fail;
    }

    pub async fn fail_session_clears(&self, fail: bool) {
        self.tables.lock().await.fail_session_clears = fail;
    }

    pub async fn user(&self, user_id: i64) -> Option<User> {
        self.tables.lock().await.users.get(&user_id).cloned()
    }

    pub async fn orders(&self) -> Vec<Order> {
        self.tables.lock().await.orders.clone()
    }

    pub async fn all_order_items(&self) -> Vec<OrderItem> {
        self.tables.lock().await.order_items.clone()
    }

    pub async fn quick_orders(&self) -> Vec<QuickOrder> {
        self.tables.lock().await.quick_orders.clone()
    }

    pub async fn messages(&self) -> Vec<CustomerMessage> {
        self.tables.lock().await.messages.clone()
    }

    pub async fn cart_lines(&self, user_id: i64) -> Vec<CartLine> {
        self.tables
            .lock()
            .await
            .carts
            .iter()
            .filter(|line| line.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn upsert_user(&self, user: &UserProfile) -> Result<()> {
        let mut tables = self.tables.lock().await;
        let created_at = tables
            .users
            .get(&user.user_id)
            .map(|u| u.created_at)
            .unwrap_or_else(Utc::now);
        tables.users.insert(
            user.user_id,
            User {
                user_id: user.user_id,
                first_name: user.first_name.clone(),
                last_name: user.last_name.clone(),
                username: user.username.clone(),
                created_at,
            },
        );
        Ok(())
    }

    async fn load_session(&self, user_id: i64) -> Result<Option<SessionRow>> {
        Ok(self.tables.lock().await.sessions.get(&user_id).cloned())
    }

    async fn save_session(&self, user_id: i64, patch: &SessionPatch) -> Result<()> {
        let mut tables = self.tables.lock().await;
        let row = tables.sessions.entry(user_id).or_insert_with(|| SessionRow {
            state_tag: String::new(),
            scratch: serde_json::json!({}),
            last_section: "main_menu".to_string(),
        });
        if let Some(tag) = &patch.state_tag {
            row.state_tag = tag.clone();
        }
        if let Some(scratch) = &patch.scratch {
            row.scratch = scratch.clone();
        }
        if let Some(section) = &patch.last_section {
            row.last_section = section.clone();
        }
        Ok(())
    }

    async fn clear_session(&self, user_id: i64) -> Result<()> {
        let mut tables = self.tables.lock().await;
        if tables.fail_session_clears {
            bail!("session clear rejected");
        }
        tables.sessions.remove(&user_id);
        Ok(())
    }

    async fn list_active_products(&self) -> Result<Vec<Product>> {
        Ok(self
            .tables
            .lock()
            .await
            .products
            .values()
            .filter(|p| p.is_active)
            .cloned()
            .collect())
    }

    async fn cart_items(&self, user_id: i64) -> Result<Vec<CartItem>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .carts
            .iter()
            .filter(|line| line.user_id == user_id)
            .filter_map(|line| {
                tables.products.get(&line.product_id).map(|p| CartItem {
                    cart_id: line.id,
                    product_id: p.id,
                    name: p.name.clone(),
                    price: p.price,
                    unit: p.unit.clone(),
                    quantity: line.quantity,
                })
            })
            .collect())
    }

    async fn add_to_cart(&self, user_id: i64, product_id: i64, quantity: f64) -> Result<CartLine> {
        let mut tables = self.tables.lock().await;
        if !tables.products.contains_key(&product_id) {
            bail!("product {product_id} does not exist");
        }
        if let Some(line) = tables
            .carts
            .iter_mut()
            .find(|l| l.user_id == user_id && l.product_id == product_id)
        {
            line.quantity += quantity;
            return Ok(line.clone());
        }
        let line = CartLine {
            id: tables.next_id(),
            user_id,
            product_id,
            quantity,
            added_at: Utc::now(),
        };
        tables.carts.push(line.clone());
        Ok(line)
    }

    async fn remove_cart_line(&self, user_id: i64, cart_id: i64) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        let before = tables.carts.len();
        tables
            .carts
            .retain(|l| !(l.id == cart_id && l.user_id == user_id));
        Ok(tables.carts.len() < before)
    }

    async fn clear_cart(&self, user_id: i64) -> Result<u64> {
        let mut tables = self.tables.lock().await;
        let before = tables.carts.len();
        tables.carts.retain(|l| l.user_id != user_id);
        Ok((before - tables.carts.len()) as u64)
    }

    async fn commit_order(&self, order: &NewOrder) -> Result<i64> {
        let mut tables = self.tables.lock().await;
        if tables.fail_commits {
            bail!("order commit rejected");
        }
        let order_id = tables.next_id();
        tables.orders.push(Order {
            order_id,
            user_id: order.user_id,
            user_name: order.user_name.clone(),
            username: order.username.clone(),
            phone: order.phone.clone(),
            city: order.city.clone(),
            np_department: order.np_department.clone(),
            total: order.total,
            status: STATUS_NEW.to_string(),
            order_type: order.order_type.as_str().to_string(),
            created_at: Utc::now(),
        });
        for item in &order.items {
            let id = tables.next_id();
            tables.order_items.push(OrderItem {
                id,
                order_id,
                product_name: item.product_name.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
            });
        }
        tables.carts.retain(|l| l.user_id != order.user_id);
        Ok(order_id)
    }

    async fn recent_orders(&self, user_id: i64, limit: i64) -> Result<Vec<Order>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .orders
            .iter()
            .rev()
            .filter(|o| o.user_id == user_id)
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect())
    }

    async fn order_for_user(&self, user_id: i64, order_id: i64) -> Result<Option<Order>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .orders
            .iter()
            .find(|o| o.order_id == order_id && o.user_id == user_id)
            .cloned())
    }

    async fn order_items(&self, order_id: i64) -> Result<Vec<OrderItem>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .order_items
            .iter()
            .filter(|i| i.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn create_quick_order(&self, order: &NewQuickOrder) -> Result<i64> {
        let mut tables = self.tables.lock().await;
        let id = tables.next_id();
        tables.quick_orders.push(QuickOrder {
            id,
            user_id: order.user_id,
            user_name: order.user_name.clone(),
            username: order.username.clone(),
            product_id: order.product_id,
            product_name: order.product_name.clone(),
            quantity: order.quantity,
            phone: order.phone.clone(),
            contact_method: order.contact_method.as_str().to_string(),
            free_text: None,
            status: STATUS_NEW.to_string(),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn fill_quick_order_text(
        &self,
        user_id: i64,
        order_id: i64,
        text: &str,
    ) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        match tables
            .quick_orders
            .iter_mut()
            .find(|q| q.id == order_id && q.user_id == user_id && q.free_text.is_none())
        {
            Some(order) => {
                order.free_text = Some(text.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn quick_order(&self, id: i64) -> Result<Option<QuickOrder>> {
        let tables = self.tables.lock().await;
        Ok(tables.quick_orders.iter().find(|q| q.id == id).cloned())
    }

    async fn record_message(&self, message: &NewMessage) -> Result<i64> {
        let mut tables = self.tables.lock().await;
        if tables.fail_messages {
            bail!("message insert rejected");
        }
        let id = tables.next_id();
        tables.messages.push(CustomerMessage {
            id,
            user_id: message.user_id,
            user_name: message.user_name.clone(),
            username: message.username.clone(),
            text: message.text.clone(),
            kind: message.kind.as_str().to_string(),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn admin_ids(&self) -> Result<Vec<i64>> {
        Ok(self.tables.lock().await.admins.keys().copied().collect())
    }
}
