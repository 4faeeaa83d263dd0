//! Outbound reply produced by the engine and delivered by the transport layer.

use std::path::PathBuf;

use teloxide::types::{InlineKeyboardButtonKind, InlineKeyboardMarkup};

/// Where a product photo comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoSource {
    /// File on local disk
    Local(PathBuf),
    /// File id Telegram already knows
    FileRef(String),
}

/// One message to send back to the user.
///
/// When `photo` is set the text is sent as the photo caption.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Option<InlineKeyboardMarkup>,
    pub photo: Option<PhotoSource>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
            photo: None,
        }
    }

    pub fn with_keyboard(mut self, keyboard: InlineKeyboardMarkup) -> Self {
        self.keyboard = Some(keyboard);
        self
    }

    pub fn with_photo(mut self, photo: Option<PhotoSource>) -> Self {
        self.photo = photo;
        self
    }

    /// Callback data of every button, row by row
    pub fn callback_tokens(&self) -> Vec<String> {
        self.keyboard
            .iter()
            .flat_map(|markup| markup.inline_keyboard.iter().flatten())
            .filter_map(|button| match &button.kind {
                InlineKeyboardButtonKind::CallbackData(data) => Some(data.clone()),
                _ => None,
            })
            .collect()
    }
}
