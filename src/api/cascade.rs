use super::device::SignalTransport;
use super::{ApiClient, ApiError};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CascadeState {
    Enabled,
    Disabled,
    Registered,
    Unregistered,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for CascadeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Enabled => "ENABLED",
            Self::Disabled => "DISABLED",
            Self::Registered => "REGISTERED",
            Self::Unregistered => "UNREGISTERED",
            Self::Unknown => "UNKNOWN",
        })
    }
}

/// Upstream platform this one registers to as a subordinate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub platform_id: String,
    pub platform_name: String,
    pub server_ip: String,
    pub server_port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_domain: Option<String>,
    pub local_id: String,
    pub local_ip: String,
    pub local_port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keepalive_interval: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<SignalTransport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charset: Option<String>,
    pub status: CascadeState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub register_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_keepalive_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeStatus {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub register_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_keepalive_time: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CascadeApi {
    client: Arc<ApiClient>,
}

impl CascadeApi {
    #[must_use]
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn list(&self) -> Result<Vec<CascadeConfig>, ApiError> {
        self.client.get(&["cascade", "list"]).await
    }

    pub async fn add(&self, config: &CascadeConfig) -> Result<(), ApiError> {
        let builder = self
            .client
            .request(Method::POST, &["cascade", "add"])?
            .json(config);
        self.client.fetch_unit(builder).await
    }

    pub async fn update(&self, config: &CascadeConfig) -> Result<(), ApiError> {
        let builder = self
            .client
            .request(Method::PUT, &["cascade", "update"])?
            .json(config);
        self.client.fetch_unit(builder).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), ApiError> {
        let id = id.to_string();
        let builder = self
            .client
            .request(Method::DELETE, &["cascade", "delete", &id])?;
        self.client.fetch_unit(builder).await
    }

    pub async fn register(&self, id: i64) -> Result<(), ApiError> {
        self.post_action(&["cascade", "register"], id).await
    }

    pub async fn unregister(&self, id: i64) -> Result<(), ApiError> {
        self.post_action(&["cascade", "unregister"], id).await
    }

    pub async fn status(&self, id: i64) -> Result<CascadeStatus, ApiError> {
        self.client
            .get(&["cascade", "status", &id.to_string()])
            .await
    }

    /// Pushes the local device catalog to the upstream platform.
    pub async fn sync_catalog(&self, id: i64) -> Result<(), ApiError> {
        self.post_action(&["cascade", "catalog", "sync"], id).await
    }

    async fn post_action(&self, prefix: &[&str], id: i64) -> Result<(), ApiError> {
        let id = id.to_string();
        let mut segments = prefix.to_vec();
        segments.push(&id);
        let builder = self.client.request(Method::POST, &segments)?;
        self.client.fetch_unit(builder).await
    }
}
