use super::{ApiClient, ApiError};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceType {
    #[serde(rename = "GB28181")]
    Gb28181,
    #[serde(rename = "ONVIF")]
    Onvif,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceStatus {
    Online,
    Offline,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalTransport {
    Udp,
    Tcp,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaStreamMode {
    Udp,
    TcpPassive,
    TcpActive,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelStatus {
    On,
    Off,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Gb28181 => "GB28181",
            Self::Onvif => "ONVIF",
            Self::Unknown => "UNKNOWN",
        })
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Online => "ONLINE",
            Self::Offline => "OFFLINE",
            Self::Unknown => "UNKNOWN",
        })
    }
}

/// A registered camera or encoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub device_id: String,
    pub device_name: String,
    pub device_type: DeviceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firmware: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub status: DeviceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub register_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_keepalive_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<SignalTransport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_mode: Option<MediaStreamMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keepalive_interval: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
}

impl Device {
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.status == DeviceStatus::Online
    }
}

/// An addressable video feed within a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceChannel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub device_id: String,
    pub channel_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub civil_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parental: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub status: ChannelStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ptz_type: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
}

impl DeviceChannel {
    #[must_use]
    pub fn is_on(&self) -> bool {
        self.status == ChannelStatus::On
    }

    /// Channel name when the device reported one, otherwise the channel id.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.channel_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.channel_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceStatusCounts {
    pub total: u64,
    pub online: u64,
    pub offline: u64,
}

/// Query parameters accepted by `GET /device/list`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<DeviceStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_type: Option<DeviceType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DeviceApi {
    client: Arc<ApiClient>,
}

impl DeviceApi {
    #[must_use]
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn list(&self, filter: &DeviceFilter) -> Result<Vec<Device>, ApiError> {
        let builder = self
            .client
            .request(Method::GET, &["device", "list"])?
            .query(filter);
        self.client.fetch(builder).await
    }

    pub async fn detail(&self, id: i64) -> Result<Device, ApiError> {
        self.client
            .get(&["device", "detail", &id.to_string()])
            .await
    }

    pub async fn add(&self, device: &Device) -> Result<(), ApiError> {
        let builder = self
            .client
            .request(Method::POST, &["device", "add"])?
            .json(device);
        self.client.fetch_unit(builder).await
    }

    pub async fn update(&self, device: &Device) -> Result<(), ApiError> {
        let builder = self
            .client
            .request(Method::PUT, &["device", "update"])?
            .json(device);
        self.client.fetch_unit(builder).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), ApiError> {
        let builder = self
            .client
            .request(Method::DELETE, &["device", "delete", &id.to_string()])?;
        self.client.fetch_unit(builder).await
    }

    pub async fn channels(&self, device_id: &str) -> Result<Vec<DeviceChannel>, ApiError> {
        self.client.get(&["device", "channels", device_id]).await
    }

    /// Asks the backend to re-query the device catalog.
    pub async fn sync_channels(&self, device_id: &str) -> Result<(), ApiError> {
        let builder = self
            .client
            .request(Method::POST, &["device", "sync", device_id])?;
        self.client.fetch_unit(builder).await
    }

    pub async fn status_counts(&self) -> Result<DeviceStatusCounts, ApiError> {
        self.client.get(&["device", "status"]).await
    }
}

#[cfg(test)]
mod tests {
    use super::{ChannelStatus, Device, DeviceChannel, DeviceFilter, DeviceStatus, DeviceType};

    #[test]
    fn device_decodes_backend_payload() {
        let raw = r#"{
            "id": 3,
            "deviceId": "34020000001320000001",
            "deviceName": "Gate camera",
            "deviceType": "GB28181",
            "status": "ONLINE",
            "transport": "UDP",
            "streamMode": "TCP_PASSIVE",
            "keepaliveInterval": 60
        }"#;
        let device: Device = serde_json::from_str(raw).expect("decode");
        assert_eq!(device.device_type, DeviceType::Gb28181);
        assert!(device.is_online());
        assert_eq!(device.keepalive_interval, Some(60));
        assert_eq!(device.ip_address, None);
    }

    #[test]
    fn unknown_status_does_not_break_decoding() {
        let raw = r#"{"deviceId":"D1","deviceName":"x","deviceType":"RTMP","status":"MAINTENANCE"}"#;
        let device: Device = serde_json::from_str(raw).expect("decode");
        assert_eq!(device.status, DeviceStatus::Unknown);
        assert_eq!(device.device_type, DeviceType::Unknown);
    }

    #[test]
    fn channel_display_name_falls_back_to_id() {
        let raw = r#"{"deviceId":"D1","channelId":"C7","channelName":" ","status":"ON"}"#;
        let channel: DeviceChannel = serde_json::from_str(raw).expect("decode");
        assert_eq!(channel.status, ChannelStatus::On);
        assert_eq!(channel.display_name(), "C7");
    }

    #[test]
    fn filter_serializes_only_set_fields() {
        let filter = DeviceFilter {
            status: Some(DeviceStatus::Online),
            ..DeviceFilter::default()
        };
        assert_eq!(
            serde_json::to_value(&filter).expect("encode"),
            serde_json::json!({"status": "ONLINE"})
        );
    }
}
