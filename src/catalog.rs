//! Catalog view: a read-through snapshot of the active products.
//!
//! The engine refreshes the snapshot before showing the product list or a
//! product card, so edits made by admin tooling show up on the next visit.

use std::sync::{Arc, RwLock};

use anyhow::Result;
use tracing::debug;

use crate::db::Storage;
use crate::models::Product;

pub struct Catalog<S: Storage> {
    store: Arc<S>,
    snapshot: RwLock<Arc<Vec<Product>>>,
}

impl<S: Storage> Catalog<S> {
    /// Create an empty catalog; call [`Catalog::refresh`] to populate it
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            snapshot: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Re-read the active products from the store
    pub async fn refresh(&self) -> Result<()> {
        let products = self.store.list_active_products().await?;
        debug!(count = products.len(), "Catalog refreshed");
        // A poisoned lock only means a reader panicked; the data is still whole
        let mut guard = self.snapshot.write().unwrap_or_else(|e| e.into_inner());
        *guard = Arc::new(products);
        Ok(())
    }

    /// Ordered snapshot of the active products
    pub fn list_products(&self) -> Arc<Vec<Product>> {
        Arc::clone(&self.snapshot.read().unwrap_or_else(|e| e.into_inner()))
    }

    pub fn by_id(&self, id: i64) -> Option<Product> {
        self.list_products().iter().find(|p| p.id == id).cloned()
    }
}

fn product(
    id: i64,
    name: &str,
    price: f64,
    glyph: &str,
    description: &str,
    details: &str,
) -> Product {
    Product {
        id,
        name: name.to_string(),
        price,
        category: "Мед".to_string(),
        description: description.to_string(),
        unit: "л".to_string(),
        image_glyph: glyph.to_string(),
        image_file_ref: None,
        image_path: None,
        details: details.to_string(),
        is_active: true,
    }
}

/// Catalog inserted into an empty products table on first start
pub fn default_products() -> Vec<Product> {
    vec![
        product(
            1,
            "Мед соняшниковий",
            250.0,
            "🌻",
            "Світлий мед з яскравим ароматом, швидко кристалізується.",
            "Збір: липень. Фасування: банки 0,5 л та 1 л.",
        ),
        product(
            2,
            "Мед різнотрав'я",
            250.0,
            "🌼",
            "Лучне різнотрав'я з м'яким квітковим смаком.",
            "Збір: червень. Фасування: банки 0,5 л та 1 л.",
        ),
        product(
            3,
            "Мед гречаний",
            290.0,
            "🌾",
            "Темний мед з насиченим терпким смаком.",
            "Збір: серпень. Фасування: банки 0,5 л та 1 л.",
        ),
        product(
            4,
            "Мед акацієвий",
            320.0,
            "🌸",
            "Прозорий ніжний мед, довго залишається рідким.",
            "Збір: травень. Фасування: банки 0,5 л та 1 л.",
        ),
        product(
            5,
            "Мед у стільниках",
            380.0,
            "🍯",
            "Натуральні стільники прямо з вулика.",
            "Продається рамками, ціна за 1 л об'єму.",
        ),
    ]
}
