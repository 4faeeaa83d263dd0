//! Message Handler module for processing incoming Telegram messages

use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::User;
use tracing::debug;

use crate::db::Storage;
use crate::localization::t;
use crate::models::UserProfile;

use super::engine::{Engine, InboundEvent};
use super::outbound::{send_replies, send_reply};
use super::reply::Reply;
use super::ui_builder;

/// Profile of the Telegram user behind an update
pub fn user_profile(user: &User) -> UserProfile {
    UserProfile {
        user_id: user.id.0 as i64,
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        username: user.username.clone(),
    }
}

pub async fn message_handler<S: Storage>(
    bot: Bot,
    msg: Message,
    engine: Arc<Engine<S>>,
) -> Result<()> {
    let Some(user) = msg.from.as_ref() else {
        debug!(chat_id = %msg.chat.id, "Ignoring message without sender");
        return Ok(());
    };
    let profile = user_profile(user);

    let Some(text) = msg.text() else {
        debug!(user_id = profile.user_id, "Non-text message received");
        let reply = Reply::text(t("text-only")).with_keyboard(ui_builder::main_menu_keyboard());
        send_reply(&bot, msg.chat.id, &reply).await?;
        return Ok(());
    };

    debug!(user_id = profile.user_id, "Received text message");
    let replies = engine.handle(InboundEvent::text(profile, text)).await;
    send_replies(&bot, msg.chat.id, &replies).await;
    Ok(())
}
