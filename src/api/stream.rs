use super::{ApiClient, ApiError};
use crate::session::StreamBackend;
use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreamType {
    #[default]
    Live,
    Playback,
}

impl fmt::Display for StreamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Live => "LIVE",
            Self::Playback => "PLAYBACK",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Active,
    Closed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayRequest {
    pub device_id: String,
    pub channel_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_type: Option<StreamType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}

impl PlayRequest {
    #[must_use]
    pub fn live(device_id: impl Into<String>, channel_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            channel_id: channel_id.into(),
            stream_type: Some(StreamType::Live),
            start_time: None,
            end_time: None,
        }
    }

    #[must_use]
    pub fn playback(
        device_id: impl Into<String>,
        channel_id: impl Into<String>,
        start_time: impl Into<String>,
        end_time: impl Into<String>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            channel_id: channel_id.into(),
            stream_type: Some(StreamType::Playback),
            start_time: Some(start_time.into()),
            end_time: Some(end_time.into()),
        }
    }
}

/// Session handle and per-protocol URLs returned when a stream starts.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayResponse {
    pub session_id: String,
    pub flv_url: String,
    pub hls_url: String,
    pub rtmp_url: String,
    pub rtsp_url: String,
    pub webrtc_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub session_id: String,
    pub device_id: String,
    pub channel_id: String,
    pub stream_type: StreamType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssrc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_server_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flv_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hls_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rtmp_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rtsp_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webrtc_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StopRequest<'a> {
    session_id: &'a str,
}

#[derive(Debug, Clone)]
pub struct StreamApi {
    client: Arc<ApiClient>,
}

impl StreamApi {
    #[must_use]
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn play(&self, request: &PlayRequest) -> Result<PlayResponse, ApiError> {
        let builder = self
            .client
            .request(Method::POST, &["stream", "play"])?
            .json(request);
        self.client.fetch(builder).await
    }

    /// Dedicated recording-playback endpoint.
    pub async fn playback(&self, request: &PlayRequest) -> Result<PlayResponse, ApiError> {
        let builder = self
            .client
            .request(Method::POST, &["stream", "playback"])?
            .json(request);
        self.client.fetch(builder).await
    }

    pub async fn stop(&self, session_id: &str) -> Result<(), ApiError> {
        let builder = self
            .client
            .request(Method::POST, &["stream", "stop"])?
            .json(&StopRequest { session_id });
        self.client.fetch_unit(builder).await
    }

    pub async fn info(&self, session_id: &str) -> Result<StreamSession, ApiError> {
        self.client.get(&["stream", "info", session_id]).await
    }

    pub async fn list(&self) -> Result<Vec<StreamSession>, ApiError> {
        self.client.get(&["stream", "list"]).await
    }
}

#[async_trait]
impl StreamBackend for StreamApi {
    async fn start_stream(&self, request: &PlayRequest) -> Result<PlayResponse, ApiError> {
        self.play(request).await
    }

    async fn stop_stream(&self, session_id: &str) -> Result<(), ApiError> {
        self.stop(session_id).await
    }
}
