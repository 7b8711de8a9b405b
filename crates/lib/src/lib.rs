//! Recicla core library — Telegram webhook handling, file download, image classification,
//! and the localized reply, used by the `recicla` CLI.

pub mod channels;
pub mod classifier;
pub mod config;
pub mod gateway;
pub mod labels;
pub mod pipeline;
