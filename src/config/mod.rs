use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
}

/// The messaging channel this bridge serves: its own phone number (used to
/// tell outgoing-from-company messages apart) and the binding namespace.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChannelConfig {
    #[serde(default, rename = "phoneNumber")]
    pub phone_number: String,
    #[serde(default = "default_channel_id", rename = "channelId")]
    pub channel_id: String,
}

fn default_channel_id() -> String {
    "whatsapp-web".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GatewayConfig {
    #[serde(default = "default_base_url", rename = "baseUrl")]
    pub base_url: String,
    #[serde(default, rename = "basicAuthUser")]
    pub basic_auth_user: Option<String>,
    #[serde(default, rename = "basicAuthPassword")]
    pub basic_auth_password: Option<String>,
}

fn default_base_url() -> String {
    "http://localhost:3001".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    #[serde(default = "default_webhook_port")]
    pub port: u16,
    #[serde(default = "default_webhook_path")]
    pub path: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            port: default_webhook_port(),
            path: default_webhook_path(),
        }
    }
}

fn default_webhook_port() -> u16 {
    3010
}

fn default_webhook_path() -> String {
    "/webhooks/whatsapp".to_string()
}

pub fn get_config_path() -> PathBuf {
    PathBuf::from("wabridge.json")
}

pub fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let default_path = get_config_path();
    let path = config_path.unwrap_or(default_path.as_path());

    if path.exists() {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config JSON from {}", path.display()))?;
        return Ok(config);
    }

    Ok(Config::default())
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.channel.phone_number.trim().is_empty() {
            anyhow::bail!("channel.phoneNumber is required");
        }
        url::Url::parse(&self.gateway.base_url)
            .with_context(|| format!("gateway.baseUrl is not a valid URL: {}", self.gateway.base_url))?;
        if !self.webhook.path.starts_with('/') {
            anyhow::bail!("webhook.path must start with '/': {}", self.webhook.path);
        }
        Ok(())
    }
}
