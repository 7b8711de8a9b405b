//! Per-update pipeline: decode → fetch → classify → reply.
//!
//! Stages run strictly in order and the first failure ends the request. Nothing is retried and
//! the chat is not told about failures; the caller only gets an HTTP status.

use crate::channels::{
    decode_update, DecodeError, FetchError, MissingAttachment, SendError, TelegramClient,
};
use crate::classifier::{ClassifierClient, ClassifyError};
use crate::config::Settings;
use crate::labels::{reply_text, UnknownClass, WasteClass};
use axum::http::StatusCode;
use std::fmt;

/// Pipeline stage, used to report where a request stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Decoding,
    Fetching,
    Classifying,
    Replying,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Decoding => "decode",
            Stage::Fetching => "fetch",
            Stage::Classifying => "classify",
            Stage::Replying => "reply",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    MissingAttachment(#[from] MissingAttachment),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Classify(#[from] ClassifyError),
    #[error(transparent)]
    UnknownClass(#[from] UnknownClass),
    #[error(transparent)]
    Send(#[from] SendError),
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Decode(_) | PipelineError::MissingAttachment(_) => Stage::Decoding,
            PipelineError::Fetch(_) => Stage::Fetching,
            PipelineError::Classify(_) => Stage::Classifying,
            PipelineError::UnknownClass(_) | PipelineError::Send(_) => Stage::Replying,
        }
    }

    /// Status returned to the webhook caller: 400 for bad input, 500 for downstream failures.
    pub fn status_code(&self) -> StatusCode {
        match self.stage() {
            Stage::Decoding => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// A request that made it through every stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub update_id: i64,
    pub chat_id: i64,
    pub class: WasteClass,
    pub text: String,
}

/// Clients shared by every request. Holds no per-request state.
#[derive(Clone)]
pub struct Pipeline {
    telegram: TelegramClient,
    classifier: ClassifierClient,
    max_download_bytes: u64,
}

impl Pipeline {
    pub fn new(telegram: TelegramClient, classifier: ClassifierClient, max_download_bytes: u64) -> Self {
        Self {
            telegram,
            classifier,
            max_download_bytes,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, ClassifyError> {
        let telegram = TelegramClient::new(
            settings.bot_token.clone(),
            settings.telegram_api_base.clone(),
        );
        let classifier = ClassifierClient::new(
            settings.classifier_endpoint.clone(),
            settings.classifier_timeout,
            settings.status_policy,
        )?;
        Ok(Self::new(telegram, classifier, settings.max_download_bytes))
    }

    pub fn telegram(&self) -> &TelegramClient {
        &self.telegram
    }

    /// Run one webhook body through every stage.
    pub async fn handle(&self, body: &[u8]) -> Result<Outcome, PipelineError> {
        let update = decode_update(body)?;
        log::debug!("decoded update: {:?}", update);
        let request = update.image_request()?;

        let image = self
            .telegram
            .fetch(&request.file_id, self.max_download_bytes)
            .await?;
        log::debug!(
            "fetched file {} ({} bytes) for chat {}",
            request.file_id,
            image.len(),
            request.chat_id
        );

        let verdict = self.classifier.classify(image).await?;
        let class = WasteClass::from_label(&verdict.class)?;
        let text = reply_text(&verdict.probability, class);

        self.telegram.send_message(request.chat_id, &text).await?;
        Ok(Outcome {
            update_id: update.update_id,
            chat_id: request.chat_id,
            class,
            text,
        })
    }
}
