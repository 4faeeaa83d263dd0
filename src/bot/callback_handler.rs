//! Callback Handler module for processing inline keyboard callback queries

use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use tracing::{debug, warn};

use crate::db::Storage;

use super::engine::{Engine, InboundEvent};
use super::message_handler::user_profile;
use super::outbound::{edit_or_send, send_replies};

/// Handle callback queries from inline keyboards
pub async fn callback_handler<S: Storage>(
    bot: Bot,
    q: CallbackQuery,
    engine: Arc<Engine<S>>,
) -> Result<()> {
    // Always answer so the client stops its spinner
    if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
        warn!(user_id = %q.from.id, error = %e, "Failed to answer callback query");
    }

    let Some(data) = q.data.clone() else {
        debug!(user_id = %q.from.id, "Callback query without data");
        return Ok(());
    };
    debug!(user_id = %q.from.id, data = %data, "Received callback query");

    let replies = engine
        .handle(InboundEvent::callback(user_profile(&q.from), data))
        .await;

    match &q.message {
        Some(message) => edit_or_send(&bot, message.chat().id, message.id(), &replies).await,
        None => send_replies(&bot, ChatId(q.from.id.0 as i64), &replies).await,
    }
    Ok(())
}
