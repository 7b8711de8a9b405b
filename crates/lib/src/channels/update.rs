//! Telegram webhook update payload and attachment selection.

use serde::Deserialize;

/// Inbound body could not be decoded as a Telegram update.
#[derive(Debug, thiserror::Error)]
#[error("could not decode update: {0}")]
pub struct DecodeError(#[from] serde_json::Error);

/// Update carries no document or photo to classify.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("update has no photo or document")]
pub struct MissingAttachment;

/// Telegram update payload (webhook POST body). Unknown fields are ignored.
#[derive(Debug, Deserialize)]
pub struct TelegramUpdate {
    #[serde(default)]
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramMessage {
    pub chat: TelegramChat,
    /// Photo variants, smallest to largest.
    #[serde(default)]
    pub photo: Option<Vec<PhotoSize>>,
    #[serde(default)]
    pub document: Option<Document>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    #[serde(default)]
    pub file_unique_id: String,
    #[serde(default)]
    pub width: i64,
    #[serde(default)]
    pub height: i64,
    #[serde(default)]
    pub file_size: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub file_id: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

/// What the pipeline needs from an update: where to reply and which file to classify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub chat_id: i64,
    pub file_id: String,
}

/// Parse a webhook body.
pub fn decode_update(body: &[u8]) -> Result<TelegramUpdate, DecodeError> {
    Ok(serde_json::from_slice(body)?)
}

impl TelegramMessage {
    /// File id to classify: a document with a non-empty file id wins, otherwise the last
    /// (largest) photo variant. `None` when neither is usable.
    pub fn attachment_file_id(&self) -> Option<&str> {
        let document = self
            .document
            .as_ref()
            .map(|d| d.file_id.as_str())
            .filter(|id| !id.is_empty());
        document.or_else(|| {
            self.photo
                .as_deref()
                .and_then(<[PhotoSize]>::last)
                .map(|p| p.file_id.as_str())
                .filter(|id| !id.is_empty())
        })
    }
}

impl TelegramUpdate {
    /// Chat id and attachment file id. Fails when the update has no message or no usable image.
    pub fn image_request(&self) -> Result<ImageRequest, MissingAttachment> {
        let msg = self.message.as_ref().ok_or(MissingAttachment)?;
        let file_id = msg.attachment_file_id().ok_or(MissingAttachment)?;
        Ok(ImageRequest {
            chat_id: msg.chat.id,
            file_id: file_id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(body: &str) -> Result<ImageRequest, MissingAttachment> {
        decode_update(body.as_bytes()).unwrap().image_request()
    }

    #[test]
    fn document_only() {
        let r = request(r#"{"message":{"chat":{"id":42},"document":{"file_id":"F1"}}}"#).unwrap();
        assert_eq!(r.chat_id, 42);
        assert_eq!(r.file_id, "F1");
    }

    #[test]
    fn document_preferred_over_photo() {
        let r = request(
            r#"{"update_id":7,"message":{"chat":{"id":1},
                "photo":[{"file_id":"small","file_unique_id":"a","width":90,"height":90,"file_size":100},
                         {"file_id":"big","file_unique_id":"b","width":800,"height":800,"file_size":9000}],
                "document":{"file_id":"DOC"}}}"#,
        )
        .unwrap();
        assert_eq!(r.file_id, "DOC");
    }

    #[test]
    fn last_photo_wins() {
        let r = request(
            r#"{"message":{"chat":{"id":5},"photo":[
                {"file_id":"p1","width":90,"height":90},
                {"file_id":"p2","width":320,"height":320},
                {"file_id":"p3","width":1280,"height":1280}]}}"#,
        )
        .unwrap();
        assert_eq!(r.file_id, "p3");
    }

    #[test]
    fn single_photo() {
        let r = request(r#"{"message":{"chat":{"id":5},"photo":[{"file_id":"only","width":1,"height":1}]}}"#)
            .unwrap();
        assert_eq!(r.file_id, "only");
    }

    #[test]
    fn empty_document_id_falls_back_to_photo() {
        let r = request(
            r#"{"message":{"chat":{"id":5},"document":{"file_id":""},
                "photo":[{"file_id":"p1","width":1,"height":1}]}}"#,
        )
        .unwrap();
        assert_eq!(r.file_id, "p1");
    }

    #[test]
    fn no_attachment() {
        assert_eq!(
            request(r#"{"message":{"chat":{"id":5},"photo":[],"text":"hola"}}"#),
            Err(MissingAttachment)
        );
        assert_eq!(request(r#"{"message":{"chat":{"id":5}}}"#), Err(MissingAttachment));
        assert_eq!(request(r#"{"update_id":3}"#), Err(MissingAttachment));
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let r = request(
            r#"{"update_id":1,"message":{"message_id":9,"date":0,"from":{"id":2,"is_bot":false},
                "chat":{"id":77,"type":"private"},"document":{"file_id":"F","thumbnail":{}}}}"#,
        )
        .unwrap();
        assert_eq!(r.chat_id, 77);
    }

    #[test]
    fn malformed_body() {
        assert!(decode_update(b"not json").is_err());
        assert!(decode_update(br#"{"message":{"document":{"file_id":"F"}}}"#).is_err());
        assert!(decode_update(br#"{"message":{"chat":{"id":"x"}}}"#).is_err());
    }
}
