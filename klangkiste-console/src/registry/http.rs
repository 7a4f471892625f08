//! HTTP implementation of the tag registry client
//!
//! Talks JSON to the collaborator backend under a configured base URL. The
//! backend's error envelope is `{"error": {"code", "message"}}`; codes and
//! status lines are folded into the shared error taxonomy here so callers
//! never see transport details.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::{BoxStatus, ClaimedTag, NfcCommand, TagRegistry};
use crate::models::{BoxLocalTag, Tag};
use klangkiste_common::{Error, Result};

const USER_AGENT: &str = concat!("klangkiste-console/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Backend error envelope
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Registry client over HTTP/JSON
#[derive(Debug, Clone)]
pub struct HttpTagRegistry {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTagRegistry {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Map a non-success response into the error taxonomy
    async fn error_from(response: reqwest::Response) -> Error {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let (code, message) = match serde_json::from_str::<ErrorEnvelope>(&body) {
            Ok(envelope) => (envelope.error.code, envelope.error.message),
            Err(_) => (String::new(), body),
        };

        tracing::warn!(status, code = %code, message = %message, "registry call failed");

        match status {
            400 if code == "INVALID_UID" => Error::InvalidUid(message),
            400 => Error::InvalidInput(message),
            404 => Error::NotFound(message),
            409 => Error::Conflict(message),
            _ => Error::Registry {
                code: status,
                message,
            },
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Self::error_from(response).await)
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        Self::check(response).await
    }

    async fn send_unit(&self, request: reqwest::RequestBuilder) -> Result<()> {
        self.send(request).await.map(|_| ())
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| Error::Transport(format!("malformed registry response: {e}")))
    }
}

#[async_trait]
impl TagRegistry for HttpTagRegistry {
    async fn get_tags(&self) -> Result<Vec<Tag>> {
        let response = self.send(self.client.get(self.url("/api/tags"))).await?;
        Self::decode(response).await
    }

    async fn claim_tag(&self, uid: &str, label: &str) -> Result<ClaimedTag> {
        tracing::debug!(uid, label, "claiming tag");
        let response = self
            .send(
                self.client
                    .post(self.url("/api/tags"))
                    .json(&json!({ "uid": uid, "label": label })),
            )
            .await?;
        Self::decode(response).await
    }

    async fn mark_tag_written(&self, uid: &str) -> Result<()> {
        self.send_unit(
            self.client
                .post(self.url(&format!("/api/tags/{uid}/written"))),
        )
        .await
    }

    async fn delete_tag(&self, uid: &str) -> Result<()> {
        self.send_unit(self.client.delete(self.url(&format!("/api/tags/{uid}"))))
            .await
    }

    async fn set_tag_media(&self, uid: &str, media_path: Option<&str>) -> Result<()> {
        self.send_unit(
            self.client
                .put(self.url(&format!("/api/tags/{uid}/media")))
                .json(&json!({ "media_path": media_path })),
        )
        .await
    }

    async fn set_tag_alias(&self, uid: &str, alias: Option<&str>) -> Result<()> {
        self.send_unit(
            self.client
                .put(self.url(&format!("/api/tags/{uid}/alias")))
                .json(&json!({ "alias": alias })),
        )
        .await
    }

    async fn get_box_tags(&self, box_id: &str) -> Result<Vec<Tag>> {
        let response = self
            .send(self.client.get(self.url(&format!("/api/boxes/{box_id}/tags"))))
            .await?;
        Self::decode(response).await
    }

    async fn get_box_local_tags(&self, box_id: &str) -> Result<Vec<BoxLocalTag>> {
        let response = self
            .send(
                self.client
                    .get(self.url(&format!("/api/boxes/{box_id}/local-tags"))),
            )
            .await?;
        Self::decode(response).await
    }

    async fn assign_tag(&self, uid: &str, box_id: &str) -> Result<()> {
        tracing::debug!(uid, box_id, "assigning tag");
        self.send_unit(
            self.client
                .post(self.url(&format!("/api/boxes/{box_id}/assign")))
                .json(&json!({ "uid": uid })),
        )
        .await
    }

    async fn unassign_tag(&self, uid: &str, box_id: &str) -> Result<()> {
        self.send_unit(
            self.client
                .post(self.url(&format!("/api/boxes/{box_id}/unassign")))
                .json(&json!({ "uid": uid })),
        )
        .await
    }

    async fn pull_tag_from_box(&self, box_id: &str, uid: &str, target_folder: &str) -> Result<()> {
        self.send_unit(
            self.client
                .post(self.url(&format!("/api/boxes/{box_id}/pull")))
                .json(&json!({ "uid": uid, "target_folder": target_folder })),
        )
        .await
    }

    async fn get_tag_blocks(&self, box_id: &str) -> Result<Vec<String>> {
        let response = self
            .send(
                self.client
                    .get(self.url(&format!("/api/boxes/{box_id}/blocks"))),
            )
            .await?;
        Self::decode(response).await
    }

    async fn set_tag_block(&self, box_id: &str, uid: &str, blocked: bool) -> Result<()> {
        self.send_unit(
            self.client
                .put(self.url(&format!("/api/boxes/{box_id}/blocks/{uid}")))
                .json(&json!({ "blocked": blocked })),
        )
        .await
    }

    async fn send_command(&self, box_id: &str, command: NfcCommand, uid: &str) -> Result<()> {
        tracing::debug!(box_id, command = command.as_str(), uid, "sending box command");
        self.send_unit(
            self.client
                .post(self.url(&format!("/api/boxes/{box_id}/command")))
                .json(&json!({ "command": command.as_str(), "uid": uid })),
        )
        .await
    }

    async fn get_status(&self, box_id: &str) -> Result<BoxStatus> {
        let response = self
            .send(
                self.client
                    .get(self.url(&format!("/api/boxes/{box_id}/status"))),
            )
            .await?;
        Self::decode(response).await
    }

    async fn set_box_alias(&self, box_id: &str, alias: Option<&str>) -> Result<()> {
        self.send_unit(
            self.client
                .put(self.url(&format!("/api/boxes/{box_id}/alias")))
                .json(&json!({ "alias": alias })),
        )
        .await
    }
}
