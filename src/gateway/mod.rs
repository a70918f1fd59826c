//! Outbound gateway client.
//!
//! Thin request/response mapping onto the WhatsApp-web gateway's HTTP API:
//! `send/*` for outgoing messages and media, `app/*` for device session
//! management, `user/avatar` for profile pictures. Endpoints are rooted under
//! the channel's own number (`<base>/<number>/...`). Responses use one
//! envelope: `code == "SUCCESS"` with an optional `results.message_id`.

use async_trait::async_trait;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::{json, Value};
use tracing::{debug, error, info};

use crate::config::GatewayConfig;
use crate::errors::{WabridgeError, WabridgeResult};
use crate::identity::AvatarSource;

pub struct GatewayClient {
    http: reqwest::Client,
    base_url: String,
    phone_number: String,
    basic_auth: Option<(String, String)>,
}

/// Strip whitespace and a leading `+` — the gateway wants bare digits.
pub fn sanitize_number(number: &str) -> String {
    number.trim().trim_start_matches('+').to_string()
}

impl GatewayClient {
    pub fn new(config: &GatewayConfig, phone_number: &str) -> Self {
        let basic_auth = match (&config.basic_auth_user, &config.basic_auth_password) {
            (Some(user), Some(password))
                if !user.trim().is_empty() && !password.trim().is_empty() =>
            {
                Some((user.clone(), password.clone()))
            }
            _ => None,
        };
        Self {
            http: reqwest::Client::builder()
                .connect_timeout(std::time::Duration::from_secs(10))
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            phone_number: phone_number.to_string(),
            basic_auth,
        }
    }

    fn api_path(&self) -> String {
        format!("{}/{}", self.base_url, sanitize_number(&self.phone_number))
    }

    /// Direct URL for a stored media path as reported in webhook payloads.
    pub fn media_url(&self, media_id: &str) -> String {
        format!("{}/{}", self.api_path(), media_id.trim_start_matches('/'))
    }

    /// Shared header contract: JSON content type plus a Basic-Auth header
    /// when both credentials are configured.
    pub fn api_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some((user, password)) = &self.basic_auth {
            let token = base64::engine::general_purpose::STANDARD
                .encode(format!("{}:{}", user, password));
            if let Ok(value) = HeaderValue::from_str(&format!("Basic {}", token)) {
                headers.insert(AUTHORIZATION, value);
            }
        }
        headers
    }

    async fn get_json(&self, endpoint: &str, query: &[(&str, &str)]) -> WabridgeResult<Value> {
        let url = format!("{}/{}", self.api_path(), endpoint);
        debug!("gateway: GET {}", url);
        let response = self
            .http
            .get(&url)
            .headers(self.api_headers())
            .query(query)
            .send()
            .await
            .map_err(|e| WabridgeError::Gateway {
                message: e.to_string(),
            })?;
        Self::parse_response(response).await
    }

    async fn post_json(&self, endpoint: &str, body: &Value) -> WabridgeResult<Value> {
        let url = format!("{}/{}", self.api_path(), endpoint);
        debug!("gateway: POST {}", url);
        let response = self
            .http
            .post(&url)
            .headers(self.api_headers())
            .json(body)
            .send()
            .await
            .map_err(|e| WabridgeError::Gateway {
                message: e.to_string(),
            })?;
        Self::parse_response(response).await
    }

    /// Non-2xx responses surface the gateway's own message text when one is
    /// present in the body; callers decide retry policy.
    async fn parse_response(response: reqwest::Response) -> WabridgeResult<Value> {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let parsed: Option<Value> = serde_json::from_str(&body).ok();

        if !status.is_success() {
            let message = parsed
                .as_ref()
                .and_then(|v| {
                    v.pointer("/error/message")
                        .or_else(|| v.get("message"))
                        .and_then(Value::as_str)
                })
                .map_or_else(
                    || format!("{}: {}", status, body),
                    std::string::ToString::to_string,
                );
            return Err(WabridgeError::Gateway { message });
        }

        Ok(parsed.unwrap_or(Value::Null))
    }

    /// Extract the sent message id from the gateway response envelope.
    /// Anything other than a clean SUCCESS is logged and yields `None`.
    fn sent_message_id(response: &Value) -> Option<String> {
        if response.get("code").and_then(Value::as_str) == Some("SUCCESS") {
            if let Some(message_id) = response
                .pointer("/results/message_id")
                .and_then(Value::as_str)
                .filter(|id| !id.is_empty())
            {
                info!("gateway: message sent with id {}", message_id);
                return Some(message_id.to_string());
            }
        }
        error!("gateway: send failed: {}", response);
        None
    }

    // --- outgoing messages ---

    pub async fn send_message(
        &self,
        phone: &str,
        message: &str,
        reply_message_id: Option<&str>,
    ) -> WabridgeResult<Option<String>> {
        let mut body = json!({
            "phone": sanitize_number(phone),
            "message": message,
        });
        if let Some(reply_id) = reply_message_id.filter(|id| !id.is_empty()) {
            body["reply_message_id"] = Value::String(reply_id.to_string());
        }
        let response = self.post_json("send/message", &body).await?;
        Ok(Self::sent_message_id(&response))
    }

    pub async fn send_image(
        &self,
        phone: &str,
        caption: &str,
        image_url: &str,
    ) -> WabridgeResult<Option<String>> {
        let body = json!({
            "phone": sanitize_number(phone),
            "caption": caption,
            "image_url": image_url,
        });
        let response = self.post_json("send/image", &body).await?;
        Ok(Self::sent_message_id(&response))
    }

    pub async fn send_audio(&self, phone: &str, audio_url: &str) -> WabridgeResult<Option<String>> {
        let body = json!({
            "phone": sanitize_number(phone),
            "audio": audio_url,
        });
        let response = self.post_json("send/audio", &body).await?;
        Ok(Self::sent_message_id(&response))
    }

    pub async fn send_video(
        &self,
        phone: &str,
        caption: &str,
        video_url: &str,
    ) -> WabridgeResult<Option<String>> {
        let body = json!({
            "phone": sanitize_number(phone),
            "caption": caption,
            "video": video_url,
        });
        let response = self.post_json("send/video", &body).await?;
        Ok(Self::sent_message_id(&response))
    }

    pub async fn send_file(
        &self,
        phone: &str,
        caption: &str,
        file_url: &str,
    ) -> WabridgeResult<Option<String>> {
        let body = json!({
            "phone": sanitize_number(phone),
            "caption": caption,
            "file": file_url,
        });
        let response = self.post_json("send/file", &body).await?;
        Ok(Self::sent_message_id(&response))
    }

    // --- device session ---

    pub async fn login(&self) -> WabridgeResult<Value> {
        self.get_json("app/login", &[]).await
    }

    pub async fn login_with_code(&self, phone: &str) -> WabridgeResult<Value> {
        self.get_json(
            "app/login-with-code",
            &[("phone", sanitize_number(phone).as_str())],
        )
        .await
    }

    pub async fn devices(&self) -> WabridgeResult<Value> {
        self.get_json("app/devices", &[]).await
    }

    pub async fn logout(&self) -> WabridgeResult<Value> {
        self.get_json("app/logout", &[]).await
    }

    pub async fn reconnect(&self) -> WabridgeResult<Value> {
        self.get_json("app/reconnect", &[]).await
    }

    /// Whether the gateway is reachable and the device session answers.
    pub async fn validate_connection(&self) -> bool {
        match self.devices().await {
            Ok(_) => true,
            Err(e) => {
                error!("gateway: connection check failed: {}", e);
                false
            }
        }
    }

    // --- profile data ---

    pub async fn fetch_avatar_url(&self, identifier: &str) -> WabridgeResult<Option<String>> {
        let response = self
            .get_json(
                "user/avatar",
                &[("phone", identifier), ("is_preview", "true")],
            )
            .await?;
        Ok(response
            .pointer("/results/url")
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    /// Fetch stored media bytes through the shared header contract.
    pub async fn download_media(&self, media_id: &str) -> WabridgeResult<Vec<u8>> {
        let url = self.media_url(media_id);
        debug!("gateway: downloading media from {}", url);
        let response = self
            .http
            .get(&url)
            .headers(self.api_headers())
            .send()
            .await
            .map_err(|e| WabridgeError::Gateway {
                message: e.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(WabridgeError::Gateway {
                message: format!("media download failed: {}", response.status()),
            });
        }
        let bytes = response.bytes().await.map_err(|e| WabridgeError::Gateway {
            message: e.to_string(),
        })?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl AvatarSource for GatewayClient {
    async fn avatar_url(&self, identifier: &str) -> anyhow::Result<Option<String>> {
        Ok(self.fetch_avatar_url(identifier).await?)
    }
}

#[cfg(test)]
mod tests;
