//! Persisted entities and the payloads used to create them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Status every order and quick order starts with
pub const STATUS_NEW: &str = "new";

/// Telegram user as seen on an inbound event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: i64,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

impl UserProfile {
    /// First and last name joined, as shown to admins
    pub fn display_name(&self) -> String {
        match self.last_name.as_deref() {
            Some(last) if !last.is_empty() => format!("{} {}", self.first_name, last),
            _ => self.first_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct User {
    pub user_id: i64,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Catalog entry
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub category: String,
    pub description: String,
    pub unit: String,
    pub image_glyph: String,
    /// File id already known to Telegram
    pub image_file_ref: Option<String>,
    /// Photo on local disk, preferred over `image_file_ref`
    pub image_path: Option<String>,
    pub details: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct CartLine {
    pub id: i64,
    pub user_id: i64,
    pub product_id: i64,
    pub quantity: f64,
    pub added_at: DateTime<Utc>,
}

/// Cart line joined with the product it points to
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct CartItem {
    pub cart_id: i64,
    pub product_id: i64,
    pub name: String,
    pub price: f64,
    pub unit: String,
    pub quantity: f64,
}

impl CartItem {
    pub fn line_total(&self) -> f64 {
        self.price * self.quantity
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Regular,
    Quick,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Regular => "regular",
            OrderType::Quick => "quick",
        }
    }
}

/// Snapshot of one cart line taken when the order review is built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: i64,
    pub product_name: String,
    pub quantity: f64,
    pub unit_price: f64,
}

impl OrderLine {
    pub fn line_total(&self) -> f64 {
        self.unit_price * self.quantity
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub user_id: i64,
    pub user_name: String,
    pub username: Option<String>,
    pub phone: String,
    pub city: String,
    pub np_department: String,
    pub items: Vec<OrderLine>,
    pub total: f64,
    pub order_type: OrderType,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Order {
    pub order_id: i64,
    pub user_id: i64,
    pub user_name: String,
    pub username: Option<String>,
    pub phone: String,
    pub city: String,
    pub np_department: String,
    pub total: f64,
    pub status: String,
    pub order_type: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_name: String,
    pub quantity: f64,
    pub unit_price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactMethod {
    Call,
    Chat,
}

impl ContactMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactMethod::Call => "call",
            ContactMethod::Chat => "chat",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewQuickOrder {
    pub user_id: i64,
    pub user_name: String,
    pub username: Option<String>,
    pub product_id: i64,
    pub product_name: String,
    /// Zero while the customer has not said how much they want
    pub quantity: f64,
    pub phone: Option<String>,
    pub contact_method: ContactMethod,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct QuickOrder {
    pub id: i64,
    pub user_id: i64,
    pub user_name: String,
    pub username: Option<String>,
    pub product_id: i64,
    pub product_name: String,
    pub quantity: f64,
    pub phone: Option<String>,
    pub contact_method: String,
    pub free_text: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Sent through the "write to us" menu entry
    Menu,
    /// Attached to a quick order
    QuickOrder,
    /// Typed while no flow was active
    Direct,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Menu => "menu",
            MessageKind::QuickOrder => "quick_order",
            MessageKind::Direct => "direct",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub user_id: i64,
    pub user_name: String,
    pub username: Option<String>,
    pub text: String,
    pub kind: MessageKind,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct CustomerMessage {
    pub id: i64,
    pub user_id: i64,
    pub user_name: String,
    pub username: Option<String>,
    pub text: String,
    pub kind: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Admin {
    pub user_id: i64,
    pub username: Option<String>,
    pub added_by: Option<i64>,
    pub added_at: DateTime<Utc>,
}

/// Raw session row: `temp_data` is kept as parsed JSON
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRow {
    pub state_tag: String,
    pub scratch: serde_json::Value,
    pub last_section: String,
}

/// Partial session update; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionPatch {
    pub state_tag: Option<String>,
    pub scratch: Option<serde_json::Value>,
    pub last_section: Option<String>,
}
