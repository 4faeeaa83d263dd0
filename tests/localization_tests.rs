//! # Localization Tests
//!
//! Message retrieval and formatting against the bundled Ukrainian resource.

use std::collections::HashMap;

use storefront::localization::{t, t_args, LocalizationManager};

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_localization() -> LocalizationManager {
        LocalizationManager::new()
    }

    #[test]
    fn test_get_message_existing_key() {
        let manager = setup_localization();
        let message = manager.get_message("main-menu", None);
        assert!(message.contains("Головне меню"));
    }

    #[test]
    fn test_get_message_nonexistent_key() {
        let manager = setup_localization();
        assert_eq!(
            manager.get_message("no-such-key", None),
            "Missing translation: no-such-key"
        );
        assert!(!manager.has_message("no-such-key"));
    }

    #[test]
    fn test_get_message_with_args() {
        let manager = setup_localization();
        let mut args = HashMap::new();
        args.insert("name", "Оксана");
        let message = manager.get_message("welcome", Some(&args));
        assert!(message.contains("Вітаємо, Оксана!"));
    }

    #[test]
    fn test_no_isolation_marks() {
        // Bidi isolation characters would leak into Telegram messages
        let message = t_args("order-confirmed", &[("order_id", "17"), ("total", "500")]);
        assert!(message.contains("№17"));
        assert!(!message.contains('\u{2068}'));
        assert!(!message.contains('\u{2069}'));
    }

    #[test]
    fn test_every_ui_key_is_present() {
        let manager = setup_localization();
        let keys = [
            "welcome", "help", "cancelled", "main-menu", "error-generic", "unknown-action",
            "text-only", "cmd-start", "cmd-help", "cmd-cancel",
            "btn-company", "btn-products", "btn-faq", "btn-cart", "btn-my-orders",
            "btn-contact", "btn-write-here", "btn-back", "btn-main-menu",
            "company-info", "contact-info", "call-us", "our-address",
            "products-title", "products-empty", "product-card", "product-not-found",
            "cart-title", "cart-empty", "cart-cleared", "quantity-prompt", "added-to-cart",
            "error-quantity-not-number", "error-quantity-not-positive",
            "error-quantity-too-large", "error-phone-invalid",
            "error-field-empty", "error-field-too-long",
            "message-prompt", "message-received",
            "quick-call-prompt", "quick-call-accepted", "quick-chat-prompt",
            "quick-chat-accepted", "quick-order-missing",
            "order-name-prompt", "order-phone-prompt", "order-city-prompt", "order-np-prompt",
            "checkout-empty", "order-review-title", "order-confirmed", "order-cancelled",
            "order-failed", "order-no-pending",
            "my-orders-title", "my-orders-empty", "order-detail", "order-not-found",
            "admin-new-order", "admin-new-quick-order", "admin-quick-order-with-message",
            "admin-customer-message", "admin-kind-menu", "admin-kind-direct",
            "admin-kind-quick_order",
        ];
        for key in keys {
            assert!(manager.has_message(key), "missing {key}");
        }
        for i in 1..=5 {
            assert!(manager.has_message(&format!("faq-q-{i}")));
            assert!(manager.has_message(&format!("faq-a-{i}")));
        }
    }

    #[test]
    fn test_from_source_with_custom_resource() {
        let manager = LocalizationManager::from_source("en", "hello = Hello, { $who }!\n");
        assert_eq!(
            manager.get_message_with_args("hello", &[("who", "world")]),
            "Hello, world!"
        );
    }

    #[test]
    fn test_broken_resource_keeps_valid_entries() {
        let manager = LocalizationManager::from_source("uk", "good = Добре\nbad = { \n");
        assert_eq!(manager.get_message("good", None), "Добре");
    }

    #[test]
    fn test_global_helpers() {
        assert_eq!(t("cart-empty"), setup_localization().get_message("cart-empty", None));
        let line = t_args(
            "cart-line",
            &[
                ("name", "Мед"),
                ("quantity", "2"),
                ("unit", "л"),
                ("price", "250"),
                ("total", "500"),
            ],
        );
        assert!(line.contains("2 л × 250 грн"));
    }
}
