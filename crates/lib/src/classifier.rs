//! Image classifier client: POSTs raw JPEG bytes and reads `{class, probability}`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// How a non-2xx classifier response is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusPolicy {
    /// Log the status and still decode the body; the call fails only if decoding fails.
    #[default]
    #[serde(rename = "decode")]
    DecodeBody,
    /// Fail with [`ClassifyError::Status`] without looking at the body.
    #[serde(rename = "reject")]
    Reject,
}

pub const DEFAULT_STATUS_POLICY: StatusPolicy = StatusPolicy::DecodeBody;

#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("classifier timed out after {0:?}")]
    Timeout(Duration),
    #[error("classifier request failed: {0}")]
    Transport(reqwest::Error),
    #[error("classifier returned {0}")]
    Status(reqwest::StatusCode),
    #[error("could not decode classifier response: {0}")]
    Decode(String),
}

/// Classifier verdict. `probability` is passed through as the classifier formatted it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Classification {
    pub class: String,
    pub probability: String,
}

/// Client for the classification endpoint.
#[derive(Clone)]
pub struct ClassifierClient {
    endpoint: String,
    timeout: Duration,
    policy: StatusPolicy,
    client: reqwest::Client,
}

impl ClassifierClient {
    pub fn new(endpoint: String, timeout: Duration, policy: StatusPolicy) -> Result<Self, ClassifyError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClassifyError::Transport)?;
        Ok(Self {
            endpoint,
            timeout,
            policy,
            client,
        })
    }

    /// POST the image bytes with `Content-Type: image/jpeg` and decode the verdict.
    pub async fn classify(&self, image: Vec<u8>) -> Result<Classification, ClassifyError> {
        let res = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "image/jpeg")
            .body(image)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let status = res.status();
        if !status.is_success() {
            match self.policy {
                StatusPolicy::Reject => return Err(ClassifyError::Status(status)),
                StatusPolicy::DecodeBody => {
                    log::warn!("classifier returned {}, decoding body anyway", status);
                }
            }
        }
        let body = res.bytes().await.map_err(|e| self.transport_error(e))?;
        let verdict: Classification =
            serde_json::from_slice(&body).map_err(|e| ClassifyError::Decode(e.to_string()))?;
        log::debug!(
            "classifier verdict: class={} probability={}",
            verdict.class,
            verdict.probability
        );
        Ok(verdict)
    }

    fn transport_error(&self, e: reqwest::Error) -> ClassifyError {
        if e.is_timeout() {
            ClassifyError::Timeout(self.timeout)
        } else {
            ClassifyError::Transport(e)
        }
    }
}
