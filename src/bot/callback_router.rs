//! Callback transitions: one arm per button token.

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::db::Storage;
use crate::dialogue::DialogueState;
use crate::localization::t;
use crate::models::{ContactMethod, NewQuickOrder, UserProfile};
use crate::session::{Section, Session};

use super::callback_actions::CallbackAction;
use super::engine::{Engine, Next, Step};
use super::reply::Reply;
use super::ui_builder;

/// How many orders the "my orders" view lists
pub const RECENT_ORDERS_LIMIT: i64 = 10;

/// Opening a view abandons any pending text prompt
fn navigate(session: &Session, section: Option<Section>, replies: Vec<Reply>) -> Step {
    let next = if session.state.is_idle() {
        Next::Keep
    } else {
        Next::Set(DialogueState::Idle)
    };
    Step {
        replies,
        next,
        section,
        committed: false,
    }
}

impl<S: Storage> Engine<S> {
    pub(super) async fn on_callback(
        &self,
        user: &UserProfile,
        session: Session,
        token: &str,
    ) -> Result<Step> {
        let Some(action) = CallbackAction::parse(token) else {
            warn!(user_id = user.user_id, token, "Unknown callback token");
            return Ok(Step::keep(vec![ui_builder::notice_with_menu(t("unknown-action"))]));
        };
        debug!(user_id = user.user_id, %action, state = session.state.tag(), "Callback");

        match action {
            CallbackAction::Back(section) => {
                let replies = self.render_section(user, section).await?;
                Ok(navigate(&session, Some(section), replies))
            }
            CallbackAction::Products => {
                let replies = self.render_section(user, Section::Products).await?;
                Ok(navigate(&session, Some(Section::Products), replies))
            }
            CallbackAction::Faq => Ok(navigate(&session, Some(Section::Faq), vec![ui_builder::faq_view()])),
            CallbackAction::Cart => {
                let replies = self.render_section(user, Section::Cart).await?;
                Ok(navigate(&session, Some(Section::Cart), replies))
            }
            CallbackAction::MyOrders => {
                let replies = self.render_section(user, Section::MyOrders).await?;
                Ok(navigate(&session, Some(Section::MyOrders), replies))
            }
            CallbackAction::Contact => Ok(navigate(
                &session,
                Some(Section::Contact),
                vec![ui_builder::contact_view()],
            )),
            CallbackAction::Company => Ok(navigate(&session, None, vec![ui_builder::company_view()])),
            CallbackAction::CallUs => Ok(navigate(
                &session,
                Some(Section::Contact),
                vec![ui_builder::call_us_view()],
            )),
            CallbackAction::OurAddress => Ok(navigate(
                &session,
                Some(Section::Contact),
                vec![ui_builder::our_address_view()],
            )),
            CallbackAction::FaqItem(index) => {
                let reply = ui_builder::faq_answer_view(index).unwrap_or_else(ui_builder::faq_view);
                Ok(navigate(&session, Some(Section::Faq), vec![reply]))
            }
            CallbackAction::WriteHere => Ok(Step::set(
                DialogueState::WaitingMessage,
                vec![ui_builder::prompt_view("message-prompt")],
            )),
            CallbackAction::Product(product_id) => {
                let reply = match self.fresh_product(product_id).await? {
                    Some(product) => vec![ui_builder::product_detail_view(&product)],
                    None => ui_builder::product_not_found_view(&self.catalog.list_products()),
                };
                Ok(navigate(&session, Some(Section::Products), reply))
            }
            CallbackAction::QuickOrder(product_id) => {
                let reply = match self.fresh_product(product_id).await? {
                    Some(product) => vec![ui_builder::quick_order_picker_view(&product)],
                    None => ui_builder::product_not_found_view(&self.catalog.list_products()),
                };
                Ok(navigate(&session, Some(Section::Products), reply))
            }
            CallbackAction::AddToCart(product_id) => match self.fresh_product(product_id).await? {
                Some(product) => Ok(Step::set(
                    DialogueState::WaitingQuantity { product_id },
                    vec![ui_builder::quantity_prompt_view(&product)],
                )
                .in_section(Section::Products)),
                None => Ok(self.missing_product(&session)),
            },
            CallbackAction::QuickCall(product_id) => match self.fresh_product(product_id).await? {
                Some(product) => Ok(Step::set(
                    DialogueState::WaitingPhoneForQuickOrder { product_id },
                    vec![ui_builder::quick_call_prompt_view(&product)],
                )),
                None => Ok(self.missing_product(&session)),
            },
            CallbackAction::QuickChat(product_id) => {
                let Some(product) = self.fresh_product(product_id).await? else {
                    return Ok(self.missing_product(&session));
                };
                let order_id = self
                    .store
                    .create_quick_order(&NewQuickOrder {
                        user_id: user.user_id,
                        user_name: user.display_name(),
                        username: user.username.clone(),
                        product_id,
                        product_name: product.name.clone(),
                        quantity: 0.0,
                        phone: None,
                        contact_method: ContactMethod::Chat,
                    })
                    .await?;
                info!(user_id = user.user_id, order_id, product_id, "Quick chat order opened");
                Ok(Step::set(
                    DialogueState::WaitingMessageForQuickOrder {
                        order_id,
                        product_name: product.name,
                    },
                    vec![ui_builder::prompt_view("quick-chat-prompt")],
                ))
            }
            CallbackAction::RemoveFromCart(cart_id) => {
                let removed = self.store.remove_cart_line(user.user_id, cart_id).await?;
                debug!(user_id = user.user_id, cart_id, removed, "Remove cart line");
                let items = self.store.cart_items(user.user_id).await?;
                Ok(navigate(&session, Some(Section::Cart), vec![ui_builder::cart_view(&items)]))
            }
            CallbackAction::ClearCart => {
                let removed = self.store.clear_cart(user.user_id).await?;
                debug!(user_id = user.user_id, removed, "Cart cleared");
                Ok(navigate(&session, Some(Section::Cart), vec![ui_builder::cart_cleared_view()]))
            }
            CallbackAction::CheckoutCart => {
                if self.store.cart_items(user.user_id).await?.is_empty() {
                    return Ok(navigate(
                        &session,
                        Some(Section::Cart),
                        vec![ui_builder::checkout_empty_view()],
                    ));
                }
                Ok(Step::set(
                    DialogueState::FullOrderName,
                    vec![ui_builder::prompt_view("order-name-prompt")],
                )
                .in_section(Section::Cart))
            }
            CallbackAction::ConfirmOrderYes => self.confirm_order(user, session.state).await,
            CallbackAction::ConfirmOrderNo => Ok(self.cancel_order(&session.state)),
            CallbackAction::UserOrder(order_id) => {
                let reply = match self.store.order_for_user(user.user_id, order_id).await? {
                    Some(order) => {
                        let items = self.store.order_items(order.order_id).await?;
                        ui_builder::order_detail_view(&order, &items)
                    }
                    None => ui_builder::order_not_found_view(),
                };
                Ok(navigate(&session, Some(Section::MyOrders), vec![reply]))
            }
        }
    }

    fn missing_product(&self, session: &Session) -> Step {
        navigate(
            session,
            Some(Section::Products),
            ui_builder::product_not_found_view(&self.catalog.list_products()),
        )
    }

    async fn render_section(&self, user: &UserProfile, section: Section) -> Result<Vec<Reply>> {
        let reply = match section {
            Section::MainMenu => ui_builder::main_menu_view(),
            Section::Products => {
                self.catalog.refresh().await?;
                ui_builder::products_view(&self.catalog.list_products())
            }
            Section::Faq => ui_builder::faq_view(),
            Section::Contact => ui_builder::contact_view(),
            Section::Cart => ui_builder::cart_view(&self.store.cart_items(user.user_id).await?),
            Section::MyOrders => ui_builder::my_orders_view(
                &self
                    .store
                    .recent_orders(user.user_id, RECENT_ORDERS_LIMIT)
                    .await?,
            ),
        };
        Ok(vec![reply])
    }
}
