//! UI Builder module: pure functions from view data to replies with keyboards.
//!
//! All text interpolated here is HTML-escaped; replies are sent with the HTML
//! parse mode.

use std::path::PathBuf;

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use teloxide::utils::html::escape;

use crate::cart::{summarize_cart, summarize_lines, CartSummary};
use crate::localization::{t, t_args};
use crate::models::{CartItem, Order, OrderItem, OrderLine, Product};
use crate::session::Section;

use super::callback_actions::CallbackAction;
use super::reply::{PhotoSource, Reply};

/// Number of entries in the FAQ resource (`faq-q-N` / `faq-a-N`)
pub const FAQ_COUNT: usize = 5;

/// Telegram rejects longer callback button labels in practice
const MAX_BUTTON_LABEL: usize = 40;

/// Format a money amount: `500`, `1106.75`
pub fn format_money(amount: f64) -> String {
    let formatted = format!("{amount:.2}");
    match formatted.strip_suffix(".00") {
        Some(whole) => whole.to_string(),
        None => formatted,
    }
}

/// Format a quantity without trailing zeros: `2`, `1.5`
pub fn format_quantity(quantity: f64) -> String {
    let formatted = format!("{quantity:.3}");
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

fn button(label: impl Into<String>, action: CallbackAction) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(label, action.token())
}

fn truncate_label(label: &str) -> String {
    if label.chars().count() > MAX_BUTTON_LABEL {
        let cut: String = label.chars().take(MAX_BUTTON_LABEL - 1).collect();
        format!("{cut}…")
    } else {
        label.to_string()
    }
}

fn back_row(section: Section) -> Vec<InlineKeyboardButton> {
    let label = if section == Section::MainMenu {
        t("btn-main-menu")
    } else {
        t("btn-back")
    };
    vec![button(label, CallbackAction::Back(section))]
}

fn single_back(section: Section) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![back_row(section)])
}

/// Main menu keyboard shown under most terminal replies
pub fn main_menu_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![
            button(t("btn-company"), CallbackAction::Company),
            button(t("btn-products"), CallbackAction::Products),
        ],
        vec![
            button(t("btn-faq"), CallbackAction::Faq),
            button(t("btn-cart"), CallbackAction::Cart),
        ],
        vec![
            button(t("btn-my-orders"), CallbackAction::MyOrders),
            button(t("btn-contact"), CallbackAction::Contact),
        ],
        vec![button(t("btn-write-here"), CallbackAction::WriteHere)],
    ])
}

/// Any notice followed by the main menu keyboard
pub fn notice_with_menu(text: impl Into<String>) -> Reply {
    Reply::text(text).with_keyboard(main_menu_keyboard())
}

pub fn main_menu_view() -> Reply {
    notice_with_menu(t("main-menu"))
}

pub fn welcome_view(first_name: &str) -> Reply {
    let text = format!(
        "{}\n\n{}",
        t_args("welcome", &[("name", &escape(first_name))]),
        t("main-menu")
    );
    notice_with_menu(text)
}

pub fn help_view() -> Reply {
    notice_with_menu(t("help"))
}

pub fn cancelled_view() -> Reply {
    notice_with_menu(format!("{}\n\n{}", t("cancelled"), t("main-menu")))
}

pub fn failure_view() -> Reply {
    notice_with_menu(t("error-generic"))
}

pub fn company_view() -> Reply {
    Reply::text(t("company-info")).with_keyboard(InlineKeyboardMarkup::new(vec![
        vec![button(t("btn-products"), CallbackAction::Products)],
        back_row(Section::MainMenu),
    ]))
}

pub fn products_view(products: &[Product]) -> Reply {
    if products.is_empty() {
        return Reply::text(t("products-empty")).with_keyboard(single_back(Section::MainMenu));
    }

    let mut rows: Vec<Vec<InlineKeyboardButton>> = products
        .iter()
        .map(|product| {
            let label = t_args(
                "product-button",
                &[
                    ("glyph", &product.image_glyph),
                    ("name", &product.name),
                    ("price", &format_money(product.price)),
                    ("unit", &product.unit),
                ],
            );
            vec![button(truncate_label(&label), CallbackAction::Product(product.id))]
        })
        .collect();
    rows.push(back_row(Section::MainMenu));

    Reply::text(t("products-title")).with_keyboard(InlineKeyboardMarkup::new(rows))
}

/// Photo for a product card: local file first, then a Telegram file id
pub fn product_photo(product: &Product) -> Option<PhotoSource> {
    if let Some(path) = product.image_path.as_deref().filter(|p| !p.is_empty()) {
        return Some(PhotoSource::Local(PathBuf::from(path)));
    }
    product
        .image_file_ref
        .as_deref()
        .filter(|r| !r.is_empty())
        .map(|r| PhotoSource::FileRef(r.to_string()))
}

pub fn product_detail_view(product: &Product) -> Reply {
    let text = t_args(
        "product-card",
        &[
            ("glyph", &product.image_glyph),
            ("name", &escape(&product.name)),
            ("description", &escape(&product.description)),
            ("price", &format_money(product.price)),
            ("unit", &escape(&product.unit)),
            ("details", &escape(&product.details)),
        ],
    );
    let keyboard = InlineKeyboardMarkup::new(vec![
        vec![button(t("btn-add-to-cart"), CallbackAction::AddToCart(product.id))],
        vec![button(t("btn-quick-order"), CallbackAction::QuickOrder(product.id))],
        back_row(Section::Products),
    ]);
    Reply::text(text.trim_end())
        .with_keyboard(keyboard)
        .with_photo(product_photo(product))
}

pub fn product_not_found_view(products: &[Product]) -> Vec<Reply> {
    vec![Reply::text(t("product-not-found")), products_view(products)]
}

pub fn quick_order_picker_view(product: &Product) -> Reply {
    let text = t_args("quick-order-picker", &[("name", &escape(&product.name))]);
    Reply::text(text).with_keyboard(InlineKeyboardMarkup::new(vec![
        vec![button(t("btn-quick-call"), CallbackAction::QuickCall(product.id))],
        vec![button(t("btn-quick-chat"), CallbackAction::QuickChat(product.id))],
        vec![button(t("btn-back"), CallbackAction::Product(product.id))],
    ]))
}

pub fn quantity_prompt_view(product: &Product) -> Reply {
    let text = t_args(
        "quantity-prompt",
        &[
            ("glyph", &product.image_glyph),
            ("name", &escape(&product.name)),
            ("price", &format_money(product.price)),
            ("unit", &escape(&product.unit)),
        ],
    );
    Reply::text(text).with_keyboard(single_back(Section::Products))
}

pub fn added_to_cart_view(product: &Product, quantity: f64, cart_lines: usize) -> Reply {
    Reply::text(t_args(
        "added-to-cart",
        &[
            ("name", &escape(&product.name)),
            ("quantity", &format_quantity(quantity)),
            ("unit", &escape(&product.unit)),
            ("total", &format_money(product.price * quantity)),
            ("count", &cart_lines.to_string()),
        ],
    ))
}

pub fn faq_view() -> Reply {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = (1..=FAQ_COUNT)
        .map(|i| {
            vec![button(
                truncate_label(&t(&format!("faq-q-{i}"))),
                CallbackAction::FaqItem(i),
            )]
        })
        .collect();
    rows.push(back_row(Section::MainMenu));
    Reply::text(t("faq-title")).with_keyboard(InlineKeyboardMarkup::new(rows))
}

/// Answer for the one-based FAQ entry, `None` when out of range
pub fn faq_answer_view(index: usize) -> Option<Reply> {
    if !(1..=FAQ_COUNT).contains(&index) {
        return None;
    }
    let text = format!(
        "❓ <b>{}</b>\n\n{}",
        t(&format!("faq-q-{index}")),
        t(&format!("faq-a-{index}"))
    );
    Some(Reply::text(text).with_keyboard(single_back(Section::Faq)))
}

fn summary_lines(summary: &CartSummary) -> Vec<String> {
    let mut lines = vec![t_args(
        "cart-subtotal",
        &[("subtotal", &format_money(summary.subtotal))],
    )];
    if summary.has_discount() {
        lines.push(t_args(
            "cart-discount",
            &[("discount", &format_money(summary.discount))],
        ));
    }
    lines.push(t_args("cart-total", &[("total", &format_money(summary.total))]));
    lines
}

pub fn cart_view(items: &[CartItem]) -> Reply {
    if items.is_empty() {
        return Reply::text(t("cart-empty")).with_keyboard(InlineKeyboardMarkup::new(vec![
            vec![button(t("btn-products"), CallbackAction::Products)],
            back_row(Section::MainMenu),
        ]));
    }

    let mut text = vec![t("cart-title"), String::new()];
    for item in items {
        text.push(t_args(
            "cart-line",
            &[
                ("name", &escape(&item.name)),
                ("quantity", &format_quantity(item.quantity)),
                ("unit", &escape(&item.unit)),
                ("price", &format_money(item.price)),
                ("total", &format_money(item.line_total())),
            ],
        ));
    }
    text.push(String::new());
    text.extend(summary_lines(&summarize_cart(items)));

    let mut rows: Vec<Vec<InlineKeyboardButton>> = items
        .iter()
        .map(|item| {
            vec![button(
                truncate_label(&t_args("btn-remove-line", &[("name", &item.name)])),
                CallbackAction::RemoveFromCart(item.cart_id),
            )]
        })
        .collect();
    rows.push(vec![button(t("btn-checkout"), CallbackAction::CheckoutCart)]);
    rows.push(vec![
        button(t("btn-clear-cart"), CallbackAction::ClearCart),
        button(t("btn-products"), CallbackAction::Products),
    ]);
    rows.push(back_row(Section::MainMenu));

    Reply::text(text.join("\n")).with_keyboard(InlineKeyboardMarkup::new(rows))
}

pub fn cart_cleared_view() -> Reply {
    notice_with_menu(t("cart-cleared"))
}

pub fn checkout_empty_view() -> Reply {
    Reply::text(t("checkout-empty")).with_keyboard(InlineKeyboardMarkup::new(vec![
        vec![button(t("btn-products"), CallbackAction::Products)],
        back_row(Section::MainMenu),
    ]))
}

fn order_line_text(line: &OrderLine) -> String {
    t_args(
        "order-line",
        &[
            ("name", &escape(&line.product_name)),
            ("quantity", &format_quantity(line.quantity)),
            ("price", &format_money(line.unit_price)),
            ("total", &format_money(line.line_total())),
        ],
    )
}

/// Review of a pending order with confirm / cancel buttons
pub fn order_review_view(
    user_name: &str,
    phone: &str,
    city: &str,
    np_department: &str,
    items: &[OrderLine],
) -> Reply {
    let mut text = vec![t("order-review-title"), String::new()];
    text.extend(items.iter().map(order_line_text));
    text.push(String::new());
    text.extend(summary_lines(&summarize_lines(items)));
    text.push(String::new());
    text.push(t_args(
        "order-customer",
        &[
            ("name", &escape(user_name)),
            ("phone", &escape(phone)),
            ("city", &escape(city)),
            ("depot", &escape(np_department)),
        ],
    ));

    Reply::text(text.join("\n")).with_keyboard(InlineKeyboardMarkup::new(vec![vec![
        button(t("btn-confirm-yes"), CallbackAction::ConfirmOrderYes),
        button(t("btn-confirm-no"), CallbackAction::ConfirmOrderNo),
    ]]))
}

pub fn order_confirmed_view(order_id: i64, total: f64) -> Reply {
    notice_with_menu(t_args(
        "order-confirmed",
        &[
            ("order_id", &order_id.to_string()),
            ("total", &format_money(total)),
        ],
    ))
}

pub fn my_orders_view(orders: &[Order]) -> Reply {
    if orders.is_empty() {
        return Reply::text(t("my-orders-empty")).with_keyboard(InlineKeyboardMarkup::new(vec![
            vec![button(t("btn-products"), CallbackAction::Products)],
            back_row(Section::MainMenu),
        ]));
    }

    let mut rows: Vec<Vec<InlineKeyboardButton>> = orders
        .iter()
        .map(|order| {
            let label = t_args(
                "my-orders-button",
                &[
                    ("order_id", &order.order_id.to_string()),
                    ("date", &order.created_at.format("%d.%m.%Y").to_string()),
                    ("total", &format_money(order.total)),
                ],
            );
            vec![button(label, CallbackAction::UserOrder(order.order_id))]
        })
        .collect();
    rows.push(back_row(Section::MainMenu));

    Reply::text(t("my-orders-title")).with_keyboard(InlineKeyboardMarkup::new(rows))
}

fn status_label(status: &str) -> String {
    let key = format!("order-status-{status}");
    if crate::localization::get_localization_manager().has_message(&key) {
        t(&key)
    } else {
        escape(status)
    }
}

pub fn order_detail_view(order: &Order, items: &[OrderItem]) -> Reply {
    let order_type = if order.order_type == "quick" {
        t("order-type-quick")
    } else {
        t("order-type-regular")
    };
    let mut text = vec![t_args(
        "order-detail",
        &[
            ("order_id", &order.order_id.to_string()),
            ("date", &order.created_at.format("%d.%m.%Y %H:%M").to_string()),
            ("status", &status_label(&order.status)),
            ("order_type", &order_type),
            ("total", &format_money(order.total)),
        ],
    )];
    if !items.is_empty() {
        text.push(String::new());
        text.extend(items.iter().map(|item| {
            order_line_text(&OrderLine {
                product_id: 0,
                product_name: item.product_name.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
            })
        }));
    }
    text.push(String::new());
    text.push(t("order-detail-note"));

    Reply::text(text.join("\n")).with_keyboard(single_back(Section::MyOrders))
}

pub fn order_not_found_view() -> Reply {
    Reply::text(t("order-not-found")).with_keyboard(single_back(Section::MyOrders))
}

pub fn contact_view() -> Reply {
    Reply::text(t("contact-info")).with_keyboard(InlineKeyboardMarkup::new(vec![
        vec![
            button(t("btn-call-us"), CallbackAction::CallUs),
            button(t("btn-our-address"), CallbackAction::OurAddress),
        ],
        vec![button(t("btn-write-here"), CallbackAction::WriteHere)],
        back_row(Section::MainMenu),
    ]))
}

pub fn call_us_view() -> Reply {
    Reply::text(t("call-us")).with_keyboard(single_back(Section::Contact))
}

pub fn our_address_view() -> Reply {
    Reply::text(t("our-address")).with_keyboard(single_back(Section::Contact))
}

/// Plain prompt with a way back to the main menu
pub fn prompt_view(key: &str) -> Reply {
    Reply::text(t(key)).with_keyboard(single_back(Section::MainMenu))
}

pub fn quick_call_prompt_view(product: &Product) -> Reply {
    Reply::text(t_args("quick-call-prompt", &[("name", &escape(&product.name))]))
        .with_keyboard(single_back(Section::Products))
}

pub fn quick_order_accepted_view(key: &str, order_id: i64) -> Reply {
    notice_with_menu(t_args(key, &[("order_id", &order_id.to_string())]))
}
