use super::{ApiClient, ApiError};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub const MIN_SPEED: u8 = 1;
pub const MAX_SPEED: u8 = 100;
pub const DEFAULT_SPEED: u8 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PtzAction {
    Left,
    Right,
    Up,
    Down,
    ZoomIn,
    ZoomOut,
    Stop,
}

impl fmt::Display for PtzAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
            Self::Up => "UP",
            Self::Down => "DOWN",
            Self::ZoomIn => "ZOOM_IN",
            Self::ZoomOut => "ZOOM_OUT",
            Self::Stop => "STOP",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PtzCommand {
    pub device_id: String,
    pub channel_id: String,
    pub command: PtzAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<u8>,
}

impl PtzCommand {
    #[must_use]
    pub fn new(
        device_id: impl Into<String>,
        channel_id: impl Into<String>,
        command: PtzAction,
        speed: Option<u8>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            channel_id: channel_id.into(),
            command,
            speed: speed.map(clamp_speed),
        }
    }
}

#[must_use]
pub fn clamp_speed(speed: u8) -> u8 {
    speed.clamp(MIN_SPEED, MAX_SPEED)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PtzPreset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub device_id: String,
    pub channel_id: String,
    pub preset_id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset_name: Option<String>,
}

/// Body for preset set/call/delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetRequest {
    pub device_id: String,
    pub channel_id: String,
    pub preset_id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PresetQuery<'a> {
    device_id: &'a str,
    channel_id: &'a str,
}

#[derive(Debug, Clone)]
pub struct PtzApi {
    client: Arc<ApiClient>,
}

impl PtzApi {
    #[must_use]
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn control(&self, command: &PtzCommand) -> Result<(), ApiError> {
        let builder = self
            .client
            .request(Method::POST, &["ptz", "control"])?
            .json(command);
        self.client.fetch_unit(builder).await
    }

    pub async fn set_preset(&self, request: &PresetRequest) -> Result<(), ApiError> {
        self.post_preset("set", request).await
    }

    pub async fn call_preset(&self, request: &PresetRequest) -> Result<(), ApiError> {
        self.post_preset("call", request).await
    }

    pub async fn delete_preset(&self, request: &PresetRequest) -> Result<(), ApiError> {
        self.post_preset("delete", request).await
    }

    pub async fn presets(
        &self,
        device_id: &str,
        channel_id: &str,
    ) -> Result<Vec<PtzPreset>, ApiError> {
        let builder = self
            .client
            .request(Method::GET, &["ptz", "preset", "list"])?
            .query(&PresetQuery {
                device_id,
                channel_id,
            });
        self.client.fetch(builder).await
    }

    async fn post_preset(&self, action: &str, request: &PresetRequest) -> Result<(), ApiError> {
        let builder = self
            .client
            .request(Method::POST, &["ptz", "preset", action])?
            .json(request);
        self.client.fetch_unit(builder).await
    }
}
