//! Telegram Bot API client: getFile, file download, sendMessage, and webhook registration.

use futures_util::StreamExt;
use serde::Deserialize;

/// Resolving or downloading a Telegram file failed.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("getFile failed: {0}")]
    Resolve(String),
    #[error("file download failed: {0}")]
    Download(String),
    #[error("file exceeds {limit} bytes")]
    TooLarge { limit: u64 },
}

/// Posting the reply failed.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("sendMessage request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("sendMessage failed: {0}")]
    Status(reqwest::StatusCode),
}

#[derive(Debug, Deserialize)]
struct GetFileResponse {
    ok: bool,
    #[serde(default)]
    result: Option<TelegramFile>,
    #[serde(default)]
    description: Option<String>,
}

/// getFile result: the path to pass to the file endpoint.
#[derive(Debug, Deserialize)]
pub struct TelegramFile {
    #[serde(default)]
    pub file_id: String,
    #[serde(default)]
    pub file_path: Option<String>,
}

/// Client for one bot token against a Bot API base URL.
#[derive(Clone)]
pub struct TelegramClient {
    api_base: String,
    token: String,
    client: reqwest::Client,
}

impl TelegramClient {
    pub fn new(token: String, api_base: String) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
            client: reqwest::Client::new(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    /// GET getFile?file_id=… — resolve a file id to its download path.
    pub async fn get_file(&self, file_id: &str) -> Result<TelegramFile, FetchError> {
        let res = self
            .client
            .get(self.method_url("getFile"))
            .query(&[("file_id", file_id)])
            .send()
            .await
            .map_err(|e| FetchError::Resolve(e.to_string()))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(FetchError::Resolve(format!("{} {}", status, body)));
        }
        let data: GetFileResponse = res
            .json()
            .await
            .map_err(|e| FetchError::Resolve(e.to_string()))?;
        if !data.ok {
            return Err(FetchError::Resolve(
                data.description
                    .unwrap_or_else(|| "getFile returned ok: false".to_string()),
            ));
        }
        let file = data
            .result
            .ok_or_else(|| FetchError::Resolve("getFile returned no result".to_string()))?;
        if !file.file_path.as_deref().is_some_and(|p| !p.is_empty()) {
            return Err(FetchError::Resolve(format!(
                "no file_path for file {}",
                file_id
            )));
        }
        Ok(file)
    }

    /// GET file/bot…/{file_path} — read the file body, refusing anything over `max_bytes`.
    pub async fn download_file(&self, file_path: &str, max_bytes: u64) -> Result<Vec<u8>, FetchError> {
        let url = format!(
            "{}/file/bot{}/{}",
            self.api_base,
            self.token,
            file_path.trim_start_matches('/')
        );
        let res = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Download(e.to_string()))?;
        if !res.status().is_success() {
            return Err(FetchError::Download(res.status().to_string()));
        }
        if res.content_length().is_some_and(|len| len > max_bytes) {
            return Err(FetchError::TooLarge { limit: max_bytes });
        }
        let mut data = Vec::new();
        let mut stream = res.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| FetchError::Download(e.to_string()))?;
            if data.len() as u64 + chunk.len() as u64 > max_bytes {
                return Err(FetchError::TooLarge { limit: max_bytes });
            }
            data.extend_from_slice(&chunk);
        }
        Ok(data)
    }

    /// Resolve then download. The download is never attempted when resolving fails.
    pub async fn fetch(&self, file_id: &str, max_bytes: u64) -> Result<Vec<u8>, FetchError> {
        let file = self.get_file(file_id).await?;
        let path = file.file_path.unwrap_or_default();
        log::debug!("telegram: resolved file {} to {}", file_id, path);
        self.download_file(&path, max_bytes).await
    }

    /// Send a text message to a chat via sendMessage API.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), SendError> {
        let body = serde_json::json!({ "chat_id": chat_id, "text": text });
        let res = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&body)
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(SendError::Status(res.status()));
        }
        Ok(())
    }

    /// Set webhook URL. Telegram then POSTs updates to the URL.
    pub async fn set_webhook(&self, url: &str) -> Result<(), String> {
        let body = serde_json::json!({ "url": url, "allowed_updates": ["message"] });
        let res = self
            .client
            .post(self.method_url("setWebhook"))
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(format!("setWebhook failed: {} {}", status, body));
        }
        Ok(())
    }

    /// Remove the webhook registration.
    pub async fn delete_webhook(&self) -> Result<(), String> {
        let res = self
            .client
            .post(self.method_url("deleteWebhook"))
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(format!("deleteWebhook failed: {} {}", status, body));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> TelegramClient {
        TelegramClient::new("TOKEN".to_string(), server.uri())
    }

    #[tokio::test]
    async fn fetch_resolves_then_downloads() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/botTOKEN/getFile"))
            .and(query_param("file_id", "F1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "result": {"file_id": "F1", "file_path": "photos/file_1.jpg"}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/file/botTOKEN/photos/file_1.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 0xFF]))
            .expect(1)
            .mount(&server)
            .await;

        let bytes = client(&server).fetch("F1", 1024).await.unwrap();
        assert_eq!(bytes, vec![0xFF, 0xD8, 0xFF]);
    }

    #[tokio::test]
    async fn resolve_404_skips_download() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/botTOKEN/getFile"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/file/botTOKEN/p1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client(&server).fetch("F1", 1024).await.unwrap_err();
        assert!(matches!(err, FetchError::Resolve(_)));
    }

    #[tokio::test]
    async fn resolve_not_ok() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/botTOKEN/getFile"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": false,
                "description": "Bad Request: invalid file_id"
            })))
            .mount(&server)
            .await;

        let err = client(&server).get_file("nope").await.unwrap_err();
        assert!(err.to_string().contains("invalid file_id"));
    }

    #[tokio::test]
    async fn resolve_bad_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/botTOKEN/getFile"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client(&server).get_file("F1").await.unwrap_err();
        assert!(matches!(err, FetchError::Resolve(_)));
    }

    #[tokio::test]
    async fn download_failure_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/file/botTOKEN/p1"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client(&server).download_file("p1", 1024).await.unwrap_err();
        assert!(matches!(err, FetchError::Download(_)));
    }

    #[tokio::test]
    async fn download_over_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/file/botTOKEN/p1"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 64]))
            .mount(&server)
            .await;

        let err = client(&server).download_file("p1", 16).await.unwrap_err();
        assert!(matches!(err, FetchError::TooLarge { limit: 16 }));
    }

    #[tokio::test]
    async fn send_message_posts_chat_and_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTOKEN/sendMessage"))
            .and(body_json(serde_json::json!({"chat_id": 42, "text": "hola"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        client(&server).send_message(42, "hola").await.unwrap();
    }

    #[tokio::test]
    async fn send_message_non_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTOKEN/sendMessage"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let err = client(&server).send_message(42, "hola").await.unwrap_err();
        assert!(matches!(err, SendError::Status(s) if s.as_u16() == 403));
    }

    #[tokio::test]
    async fn set_and_delete_webhook() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTOKEN/setWebhook"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/botTOKEN/deleteWebhook"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let c = client(&server);
        c.set_webhook("https://bot.example/hook").await.unwrap();
        c.delete_webhook().await.unwrap();
    }
}
