//! Delivery of engine replies over the customer bot.

use anyhow::{Context, Result};
use teloxide::prelude::*;
use teloxide::types::{FileId, InputFile, MessageId, ParseMode};
use tracing::{debug, error, warn};

use super::reply::{PhotoSource, Reply};

fn input_file(photo: &PhotoSource) -> InputFile {
    match photo {
        PhotoSource::Local(path) => InputFile::file(path.clone()),
        PhotoSource::FileRef(file_ref) => InputFile::file_id(FileId(file_ref.clone())),
    }
}

async fn send_text(bot: &Bot, chat_id: ChatId, reply: &Reply) -> Result<()> {
    let mut request = bot
        .send_message(chat_id, reply.text.clone())
        .parse_mode(ParseMode::Html);
    if let Some(keyboard) = &reply.keyboard {
        request = request.reply_markup(keyboard.clone());
    }
    request.await.context("Failed to send message")?;
    Ok(())
}

async fn send_photo(bot: &Bot, chat_id: ChatId, reply: &Reply, photo: &PhotoSource) -> Result<()> {
    let mut request = bot
        .send_photo(chat_id, input_file(photo))
        .caption(reply.text.clone())
        .parse_mode(ParseMode::Html);
    if let Some(keyboard) = &reply.keyboard {
        request = request.reply_markup(keyboard.clone());
    }
    request.await.context("Failed to send photo")?;
    Ok(())
}

/// Send one reply as a new message; a photo that cannot be sent degrades to text
pub async fn send_reply(bot: &Bot, chat_id: ChatId, reply: &Reply) -> Result<()> {
    if let Some(photo) = &reply.photo {
        match send_photo(bot, chat_id, reply, photo).await {
            Ok(()) => return Ok(()),
            Err(e) => warn!(chat_id = %chat_id, error = %e, "Photo delivery failed, sending text"),
        }
    }
    send_text(bot, chat_id, reply).await
}

/// Send every reply in order, logging and skipping failures
pub async fn send_replies(bot: &Bot, chat_id: ChatId, replies: &[Reply]) {
    for reply in replies {
        if let Err(e) = send_reply(bot, chat_id, reply).await {
            error!(chat_id = %chat_id, error = %e, "Failed to deliver reply");
        }
    }
}

/// Answer a button press: the first reply replaces the pressed message when it
/// is plain text, otherwise (or if editing fails) a new message is sent
pub async fn edit_or_send(bot: &Bot, chat_id: ChatId, message_id: MessageId, replies: &[Reply]) {
    let Some((first, rest)) = replies.split_first() else {
        return;
    };

    let edited = if first.photo.is_none() {
        let mut request = bot
            .edit_message_text(chat_id, message_id, first.text.clone())
            .parse_mode(ParseMode::Html);
        if let Some(keyboard) = &first.keyboard {
            request = request.reply_markup(keyboard.clone());
        }
        match request.await {
            Ok(_) => true,
            Err(e) => {
                warn!(chat_id = %chat_id, error = %e, "Edit failed, sending a new message");
                false
            }
        }
    } else {
        false
    };

    if !edited {
        if let Err(e) = send_reply(bot, chat_id, first).await {
            error!(chat_id = %chat_id, error = %e, "Failed to deliver reply");
        }
    } else {
        debug!(chat_id = %chat_id, message_id = message_id.0, "Message edited");
    }
    send_replies(bot, chat_id, rest).await;
}
