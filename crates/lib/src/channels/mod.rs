//! Telegram channel: webhook update decoding and the Bot API client.
//!
//! Updates arrive as webhook POST bodies; files and replies go through [`TelegramClient`].

mod telegram;
mod update;

pub use telegram::{FetchError, SendError, TelegramClient, TelegramFile};
pub use update::{
    decode_update, DecodeError, Document, MissingAttachment, ImageRequest, PhotoSize, TelegramChat, TelegramMessage,
    TelegramUpdate,
};
