//! Cart arithmetic shared by the cart view and the order review.

use crate::models::{CartItem, OrderLine};

/// Distinct cart lines needed before the discount applies
pub const DISCOUNT_MIN_LINES: usize = 3;
pub const DISCOUNT_RATE: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CartSummary {
    pub subtotal: f64,
    pub discount: f64,
    pub total: f64,
}

impl CartSummary {
    pub fn has_discount(&self) -> bool {
        self.discount > 0.0
    }
}

/// Totals for `lines` cart lines summing to `subtotal`.
///
/// The discount counts distinct lines, not jars: two lines of ten jars each
/// pay full price.
pub fn summarize(subtotal: f64, lines: usize) -> CartSummary {
    if lines >= DISCOUNT_MIN_LINES {
        let total = subtotal * (1.0 - DISCOUNT_RATE);
        CartSummary {
            subtotal,
            discount: subtotal - total,
            total,
        }
    } else {
        CartSummary {
            subtotal,
            discount: 0.0,
            total: subtotal,
        }
    }
}

pub fn summarize_cart(items: &[CartItem]) -> CartSummary {
    summarize(items.iter().map(CartItem::line_total).sum(), items.len())
}

pub fn summarize_lines(lines: &[OrderLine]) -> CartSummary {
    summarize(lines.iter().map(OrderLine::line_total).sum(), lines.len())
}

/// Freeze names and prices of the current cart for the order
pub fn snapshot_lines(items: &[CartItem]) -> Vec<OrderLine> {
    items
        .iter()
        .map(|item| OrderLine {
            product_id: item.product_id,
            product_name: item.name.clone(),
            quantity: item.quantity,
            unit_price: item.price,
        })
        .collect()
}
