//! Dialogue Manager: free-text transitions for each dialogue state, plus the
//! order commit triggered from the review screen.

use anyhow::Result;
use tracing::{debug, error, info};

use crate::cart::{snapshot_lines, summarize_lines};
use crate::db::Storage;
use crate::dialogue::DialogueState;
use crate::localization::t;
use crate::models::{
    ContactMethod, MessageKind, NewMessage, NewOrder, NewQuickOrder, OrderType, Product,
    UserProfile,
};
use crate::notifier::AdminEvent;
use crate::session::Section;
use crate::validators::{normalize_phone, parse_quantity, validate_field, ValidationError};

use super::engine::{Engine, Step};
use super::reply::Reply;
use super::ui_builder;

fn invalid_input(error: &ValidationError) -> Step {
    Step::keep(vec![Reply::text(t(error.message_key()))])
}

impl<S: Storage> Engine<S> {
    /// Route non-command text according to the current state
    pub(super) async fn on_text(
        &self,
        user: &UserProfile,
        state: DialogueState,
        text: &str,
    ) -> Result<Step> {
        debug!(user_id = user.user_id, state = state.tag(), "Text input");
        match state {
            DialogueState::Idle => self.direct_message(user, text).await,
            DialogueState::WaitingQuantity { product_id } => {
                self.quantity_input(user, product_id, text).await
            }
            DialogueState::WaitingMessage => self.menu_message(user, text).await,
            DialogueState::WaitingMessageForQuickOrder {
                order_id,
                product_name,
            } => {
                self.quick_order_message(user, order_id, &product_name, text)
                    .await
            }
            DialogueState::WaitingPhoneForQuickOrder { product_id } => {
                self.quick_order_phone(user, product_id, text).await
            }
            DialogueState::FullOrderName => match validate_field(text) {
                Ok(user_name) => Ok(Step::set(
                    DialogueState::FullOrderPhone { user_name },
                    vec![ui_builder::prompt_view("order-phone-prompt")],
                )),
                Err(e) => Ok(invalid_input(&e)),
            },
            DialogueState::FullOrderPhone { user_name } => match normalize_phone(text) {
                Ok(phone) => Ok(Step::set(
                    DialogueState::FullOrderCity { user_name, phone },
                    vec![ui_builder::prompt_view("order-city-prompt")],
                )),
                Err(e) => Ok(invalid_input(&e)),
            },
            DialogueState::FullOrderCity { user_name, phone } => match validate_field(text) {
                Ok(city) => Ok(Step::set(
                    DialogueState::FullOrderNp {
                        user_name,
                        phone,
                        city,
                    },
                    vec![ui_builder::prompt_view("order-np-prompt")],
                )),
                Err(e) => Ok(invalid_input(&e)),
            },
            DialogueState::FullOrderNp {
                user_name,
                phone,
                city,
            } => match validate_field(text) {
                Ok(np_department) => {
                    self.build_review(user, user_name, phone, city, &np_department)
                        .await
                }
                Err(e) => Ok(invalid_input(&e)),
            },
            // Awaiting a button press: show the review again
            DialogueState::FullOrderConfirm {
                ref user_name,
                ref phone,
                ref city,
                ref np_department,
                ref items,
                ..
            } => Ok(Step::keep(vec![ui_builder::order_review_view(
                user_name,
                phone,
                city,
                np_department,
                items,
            )])),
        }
    }

    /// Active product by id, re-reading the catalog first
    pub(super) async fn fresh_product(&self, product_id: i64) -> Result<Option<Product>> {
        self.catalog.refresh().await?;
        Ok(self.catalog.by_id(product_id))
    }

    fn product_gone(&self) -> Step {
        let products = self.catalog.list_products();
        Step::clear(ui_builder::product_not_found_view(&products)).in_section(Section::Products)
    }

    async fn quantity_input(&self, user: &UserProfile, product_id: i64, text: &str) -> Result<Step> {
        let quantity = match parse_quantity(text) {
            Ok(quantity) => quantity,
            Err(e) => return Ok(invalid_input(&e)),
        };
        let Some(product) = self.fresh_product(product_id).await? else {
            return Ok(self.product_gone());
        };

        let line = self.store.add_to_cart(user.user_id, product.id, quantity).await?;
        let lines = self.store.cart_items(user.user_id).await?.len();
        info!(
            user_id = user.user_id,
            product_id,
            quantity,
            line_quantity = line.quantity,
            "Added to cart"
        );

        let products = self.catalog.list_products();
        Ok(Step::set(
            DialogueState::Idle,
            vec![
                ui_builder::added_to_cart_view(&product, quantity, lines),
                ui_builder::products_view(&products),
            ],
        )
        .in_section(Section::Products))
    }

    async fn record(&self, user: &UserProfile, text: &str, kind: MessageKind) -> Result<i64> {
        self.store
            .record_message(&NewMessage {
                user_id: user.user_id,
                user_name: user.display_name(),
                username: user.username.clone(),
                text: text.to_string(),
                kind,
            })
            .await
    }

    async fn direct_message(&self, user: &UserProfile, text: &str) -> Result<Step> {
        self.record(user, text, MessageKind::Direct).await?;
        self.notifier.notify(AdminEvent::CustomerMessage {
            customer: user.clone(),
            kind: MessageKind::Direct,
            text: text.to_string(),
        });
        Ok(Step::keep(vec![ui_builder::notice_with_menu(t("message-received"))]))
    }

    async fn menu_message(&self, user: &UserProfile, text: &str) -> Result<Step> {
        self.record(user, text, MessageKind::Menu).await?;
        self.notifier.notify(AdminEvent::CustomerMessage {
            customer: user.clone(),
            kind: MessageKind::Menu,
            text: text.to_string(),
        });
        Ok(Step::clear(vec![ui_builder::notice_with_menu(t("message-received"))]))
    }

    async fn quick_order_message(
        &self,
        user: &UserProfile,
        order_id: i64,
        product_name: &str,
        text: &str,
    ) -> Result<Step> {
        let pending = self
            .store
            .quick_order(order_id)
            .await?
            .is_some_and(|q| q.user_id == user.user_id && q.free_text.is_none());
        if !pending {
            debug!(user_id = user.user_id, order_id, "Quick order missing or already filled");
            return Ok(Step::clear(vec![ui_builder::notice_with_menu(t(
                "quick-order-missing",
            ))]));
        }

        // free_text is written last so a failed insert leaves the order unfilled
        self.record(user, text, MessageKind::QuickOrder).await?;
        if !self
            .store
            .fill_quick_order_text(user.user_id, order_id, text)
            .await?
        {
            return Ok(Step::clear(vec![ui_builder::notice_with_menu(t(
                "quick-order-missing",
            ))]));
        }
        self.notifier.notify(AdminEvent::QuickOrderWithMessage {
            order_id,
            customer: user.clone(),
            product_name: product_name.to_string(),
            text: text.to_string(),
        });
        info!(user_id = user.user_id, order_id, "Quick chat order completed");
        Ok(Step::clear(vec![ui_builder::quick_order_accepted_view(
            "quick-chat-accepted",
            order_id,
        )])
        .committed())
    }

    async fn quick_order_phone(&self, user: &UserProfile, product_id: i64, text: &str) -> Result<Step> {
        let phone = match normalize_phone(text) {
            Ok(phone) => phone,
            Err(e) => return Ok(invalid_input(&e)),
        };
        let Some(product) = self.fresh_product(product_id).await? else {
            return Ok(self.product_gone());
        };

        let order_id = self
            .store
            .create_quick_order(&NewQuickOrder {
                user_id: user.user_id,
                user_name: user.display_name(),
                username: user.username.clone(),
                product_id: product.id,
                product_name: product.name.clone(),
                quantity: 0.0,
                phone: Some(phone.clone()),
                contact_method: ContactMethod::Call,
            })
            .await?;
        self.notifier.notify(AdminEvent::NewQuickOrder {
            order_id,
            customer: user.clone(),
            product_name: product.name,
            phone,
        });
        info!(user_id = user.user_id, order_id, "Quick call order created");
        Ok(Step::clear(vec![ui_builder::quick_order_accepted_view(
            "quick-call-accepted",
            order_id,
        )])
        .committed())
    }

    async fn build_review(
        &self,
        user: &UserProfile,
        user_name: String,
        phone: String,
        city: String,
        np_department: &str,
    ) -> Result<Step> {
        let cart = self.store.cart_items(user.user_id).await?;
        if cart.is_empty() {
            return Ok(Step::clear(vec![ui_builder::checkout_empty_view()]));
        }

        let items = snapshot_lines(&cart);
        let total = summarize_lines(&items).total;
        let review = ui_builder::order_review_view(&user_name, &phone, &city, np_department, &items);
        Ok(Step::set(
            DialogueState::FullOrderConfirm {
                user_name,
                phone,
                city,
                np_department: np_department.to_string(),
                items,
                total,
                order_type: OrderType::Regular,
            },
            vec![review],
        ))
    }

    /// `confirm_order_yes`: commit the pending order in one transaction
    pub(super) async fn confirm_order(&self, user: &UserProfile, state: DialogueState) -> Result<Step> {
        let DialogueState::FullOrderConfirm {
            user_name,
            phone,
            city,
            np_department,
            items,
            total,
            order_type,
        } = state
        else {
            return Ok(Step::keep(vec![ui_builder::notice_with_menu(t("order-no-pending"))]));
        };

        let order = NewOrder {
            user_id: user.user_id,
            user_name,
            username: user.username.clone(),
            phone,
            city,
            np_department,
            items,
            total,
            order_type,
        };
        match self.store.commit_order(&order).await {
            Ok(order_id) => {
                info!(user_id = user.user_id, order_id, total, "Order committed");
                let reply = ui_builder::order_confirmed_view(order_id, order.total);
                self.notifier.notify(AdminEvent::NewOrder {
                    order_id,
                    customer: user.clone(),
                    user_name: order.user_name,
                    phone: order.phone,
                    city: order.city,
                    np_department: order.np_department,
                    items: order.items,
                    total: order.total,
                });
                Ok(Step::clear(vec![reply]).committed())
            }
            Err(e) => {
                error!(user_id = user.user_id, error = %e, "Order commit failed");
                Ok(Step::clear(vec![ui_builder::notice_with_menu(t("order-failed"))]))
            }
        }
    }

    /// `confirm_order_no`: drop the pending order, keep the cart
    pub(super) fn cancel_order(&self, state: &DialogueState) -> Step {
        if matches!(state, DialogueState::FullOrderConfirm { .. }) {
            Step::clear(vec![ui_builder::notice_with_menu(t("order-cancelled"))])
        } else {
            Step::keep(vec![ui_builder::notice_with_menu(t("order-no-pending"))])
        }
    }
}
