//! Callback token grammar for inline buttons.
//!
//! Tokens are flat `_`-delimited strings. Parsing splits on every `_` and
//! matches the whole segment list, so multi-word prefixes such as
//! `quick_chat_<id>` are never confused with `quick_order_<id>`.

use std::fmt;

use crate::session::Section;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    Back(Section),
    Company,
    Products,
    Faq,
    Cart,
    MyOrders,
    Contact,
    WriteHere,
    Product(i64),
    AddToCart(i64),
    QuickOrder(i64),
    QuickCall(i64),
    QuickChat(i64),
    /// One-based FAQ entry
    FaqItem(usize),
    RemoveFromCart(i64),
    CheckoutCart,
    ClearCart,
    ConfirmOrderYes,
    ConfirmOrderNo,
    CallUs,
    OurAddress,
    UserOrder(i64),
}

impl CallbackAction {
    pub fn parse(token: &str) -> Option<Self> {
        let parts: Vec<&str> = token.split('_').collect();
        let action = match parts.as_slice() {
            ["back", rest @ ..] => CallbackAction::Back(Section::parse(&rest.join("_"))?),
            ["company"] => CallbackAction::Company,
            ["products"] => CallbackAction::Products,
            ["faq"] => CallbackAction::Faq,
            ["cart"] => CallbackAction::Cart,
            ["my", "orders"] => CallbackAction::MyOrders,
            ["contact"] => CallbackAction::Contact,
            ["write", "here"] => CallbackAction::WriteHere,
            ["product", id] => CallbackAction::Product(id.parse().ok()?),
            ["add", "to", "cart", id] => CallbackAction::AddToCart(id.parse().ok()?),
            ["quick", "order", id] => CallbackAction::QuickOrder(id.parse().ok()?),
            ["quick", "call", id] => CallbackAction::QuickCall(id.parse().ok()?),
            ["quick", "chat", id] => CallbackAction::QuickChat(id.parse().ok()?),
            ["faq", index] => CallbackAction::FaqItem(index.parse().ok()?),
            ["remove", "from", "cart", id] => CallbackAction::RemoveFromCart(id.parse().ok()?),
            ["checkout", "cart"] => CallbackAction::CheckoutCart,
            ["clear", "cart"] => CallbackAction::ClearCart,
            ["confirm", "order", "yes"] => CallbackAction::ConfirmOrderYes,
            ["confirm", "order", "no"] => CallbackAction::ConfirmOrderNo,
            ["call", "us"] => CallbackAction::CallUs,
            ["our", "address"] => CallbackAction::OurAddress,
            ["user", "order", id] => CallbackAction::UserOrder(id.parse().ok()?),
            _ => return None,
        };
        Some(action)
    }

    pub fn token(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackAction::Back(section) => write!(f, "back_{section}"),
            CallbackAction::Company => f.write_str("company"),
            CallbackAction::Products => f.write_str("products"),
            CallbackAction::Faq => f.write_str("faq"),
            CallbackAction::Cart => f.write_str("cart"),
            CallbackAction::MyOrders => f.write_str("my_orders"),
            CallbackAction::Contact => f.write_str("contact"),
            CallbackAction::WriteHere => f.write_str("write_here"),
            CallbackAction::Product(id) => write!(f, "product_{id}"),
            CallbackAction::AddToCart(id) => write!(f, "add_to_cart_{id}"),
            CallbackAction::QuickOrder(id) => write!(f, "quick_order_{id}"),
            CallbackAction::QuickCall(id) => write!(f, "quick_call_{id}"),
            CallbackAction::QuickChat(id) => write!(f, "quick_chat_{id}"),
            CallbackAction::FaqItem(index) => write!(f, "faq_{index}"),
            CallbackAction::RemoveFromCart(id) => write!(f, "remove_from_cart_{id}"),
            CallbackAction::CheckoutCart => f.write_str("checkout_cart"),
            CallbackAction::ClearCart => f.write_str("clear_cart"),
            CallbackAction::ConfirmOrderYes => f.write_str("confirm_order_yes"),
            CallbackAction::ConfirmOrderNo => f.write_str("confirm_order_no"),
            CallbackAction::CallUs => f.write_str("call_us"),
            CallbackAction::OurAddress => f.write_str("our_address"),
            CallbackAction::UserOrder(id) => write!(f, "user_order_{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fixed_tokens() {
        assert_eq!(CallbackAction::parse("company"), Some(CallbackAction::Company));
        assert_eq!(CallbackAction::parse("my_orders"), Some(CallbackAction::MyOrders));
        assert_eq!(CallbackAction::parse("write_here"), Some(CallbackAction::WriteHere));
        assert_eq!(CallbackAction::parse("checkout_cart"), Some(CallbackAction::CheckoutCart));
        assert_eq!(
            CallbackAction::parse("confirm_order_no"),
            Some(CallbackAction::ConfirmOrderNo)
        );
    }

    #[test]
    fn test_parse_back_sections_with_underscores() {
        assert_eq!(
            CallbackAction::parse("back_main_menu"),
            Some(CallbackAction::Back(Section::MainMenu))
        );
        assert_eq!(
            CallbackAction::parse("back_my_orders"),
            Some(CallbackAction::Back(Section::MyOrders))
        );
        assert_eq!(CallbackAction::parse("back_basement"), None);
    }

    #[test]
    fn test_quick_tokens_are_not_confused() {
        assert_eq!(CallbackAction::parse("quick_chat_3"), Some(CallbackAction::QuickChat(3)));
        assert_eq!(CallbackAction::parse("quick_call_2"), Some(CallbackAction::QuickCall(2)));
        assert_eq!(CallbackAction::parse("quick_order_1"), Some(CallbackAction::QuickOrder(1)));
    }

    #[test]
    fn test_product_and_cart_ids() {
        assert_eq!(CallbackAction::parse("product_12"), Some(CallbackAction::Product(12)));
        assert_eq!(CallbackAction::parse("add_to_cart_5"), Some(CallbackAction::AddToCart(5)));
        assert_eq!(
            CallbackAction::parse("remove_from_cart_77"),
            Some(CallbackAction::RemoveFromCart(77))
        );
        assert_eq!(CallbackAction::parse("faq_2"), Some(CallbackAction::FaqItem(2)));
        assert_eq!(CallbackAction::parse("user_order_9"), Some(CallbackAction::UserOrder(9)));
    }

    #[test]
    fn test_malformed_tokens() {
        for token in ["", "product_", "product_x", "add_to_cart", "quick_chat_3_4", "unknown"] {
            assert_eq!(CallbackAction::parse(token), None, "{token}");
        }
    }

    #[test]
    fn test_token_parses_back() {
        let actions = [
            CallbackAction::Back(Section::Cart),
            CallbackAction::QuickChat(3),
            CallbackAction::RemoveFromCart(8),
            CallbackAction::FaqItem(1),
            CallbackAction::ConfirmOrderYes,
        ];
        for action in actions {
            assert_eq!(CallbackAction::parse(&action.token()), Some(action));
        }
    }
}
