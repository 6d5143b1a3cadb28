//! REST client for the platform backend.
//!
//! Every endpoint answers with an envelope `{code, message, data, timestamp}`.
//! [`ApiClient`] unwraps it, attaches the bearer token and folds transport and
//! application failures into [`ApiError`], whose
//! [`notification_text`](ApiError::notification_text) is what the operator sees.

pub mod cascade;
pub mod device;
pub mod ptz;
pub mod stream;

use crate::config::ConsoleConfig;
use crate::notify::Notification;
use parking_lot::RwLock;
use reqwest::{Client, Method, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

pub use cascade::CascadeApi;
pub use device::DeviceApi;
pub use ptz::PtzApi;
pub use stream::StreamApi;

pub const SUCCESS_CODE: i64 = 200;

const FALLBACK_MESSAGE: &str = "Request failed";

#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub code: i64,
    pub message: Option<String>,
    pub data: Option<T>,
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("access denied")]
    Forbidden,
    #[error("resource not found")]
    NotFound,
    #[error("server error: {}", message.as_deref().unwrap_or("no detail"))]
    Server { message: Option<String> },
    #[error("HTTP {status}: {}", message.as_deref().unwrap_or("no detail"))]
    Status { status: u16, message: Option<String> },
    #[error("network error: {0}")]
    Network(String),
    #[error("backend rejected request (code {code}): {message}")]
    Application { code: i64, message: String },
    #[error("response envelope carried no data")]
    MissingData,
    #[error("failed decoding response: {0}")]
    Decode(String),
    #[error("invalid request URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    #[must_use]
    pub fn from_status(status: u16, message: Option<String>) -> Self {
        match status {
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            500 => Self::Server { message },
            _ => Self::Status { status, message },
        }
    }

    /// Text shown to the operator, keyed by failure class.
    #[must_use]
    pub fn notification_text(&self) -> String {
        match self {
            Self::Unauthorized => "Unauthorized, please login".to_owned(),
            Self::Forbidden => "Access denied".to_owned(),
            Self::NotFound => "Resource not found".to_owned(),
            Self::Server { message } => non_empty(message.as_deref())
                .unwrap_or("Server error")
                .to_owned(),
            Self::Status { message, .. } => non_empty(message.as_deref())
                .unwrap_or(FALLBACK_MESSAGE)
                .to_owned(),
            Self::Network(_) => "Network error, please check your connection".to_owned(),
            Self::Application { message, .. } => non_empty(Some(message.as_str()))
                .unwrap_or(FALLBACK_MESSAGE)
                .to_owned(),
            Self::MissingData | Self::Decode(_) => FALLBACK_MESSAGE.to_owned(),
            Self::InvalidUrl(detail) => format!("Request error: {detail}"),
        }
    }

    #[must_use]
    pub fn notification(&self) -> Notification {
        Notification::error(self.notification_text())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Shared handle to the backend. Construct once and hand out clones or `Arc`s.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    token: Arc<RwLock<Option<String>>>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("has_token", &self.token.read().is_some())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self, ApiError> {
        let base_url = normalize_base_url(base_url)?;
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ApiError::Network(err.to_string()))?;
        debug!(base_url = %base_url, "created API client");

        Ok(Self {
            http,
            base_url,
            token: Arc::new(RwLock::new(token)),
        })
    }

    pub fn from_config(config: &ConsoleConfig) -> Result<Self, ApiError> {
        Self::new(
            &config.api_base_url,
            config.token.clone(),
            config.request_timeout(),
        )
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn set_token(&self, token: Option<String>) {
        *self.token.write() = token;
    }

    #[must_use]
    pub fn has_token(&self) -> bool {
        self.token.read().is_some()
    }

    /// Resolves path segments below the base URL; each segment is percent-encoded.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ApiError> {
        let url = self.endpoint(segments)?;
        let mut builder = self.http.request(method, url);
        if let Some(token) = self.token.read().as_deref() {
            builder = builder.bearer_auth(token);
        }
        Ok(builder)
    }

    /// Sends the request and returns the unwrapped `data`, failing if it is absent.
    pub async fn fetch<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        self.execute::<T>(builder).await?.ok_or(ApiError::MissingData)
    }

    /// Sends the request for an endpoint whose success payload is ignored.
    pub async fn fetch_unit(&self, builder: RequestBuilder) -> Result<(), ApiError> {
        self.execute::<serde_json::Value>(builder).await.map(|_| ())
    }

    pub async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        self.fetch(self.request(Method::GET, segments)?).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<Option<T>, ApiError> {
        let request = builder
            .build()
            .map_err(|err| ApiError::InvalidUrl(err.to_string()))?;
        let method = request.method().clone();
        let url = request.url().clone();
        debug!(%method, url = %url, "sending request");

        let response = self.http.execute(request).await.map_err(|err| {
            warn!(%method, url = %url, "request failed before a response: {err}");
            ApiError::Network(err.to_string())
        })?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| ApiError::Network(err.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_slice::<Envelope<serde_json::Value>>(&body)
                .ok()
                .and_then(|envelope| envelope.message);
            let err = ApiError::from_status(status.as_u16(), message);
            warn!(%method, url = %url, status = status.as_u16(), "request failed: {err}");
            return Err(err);
        }

        let envelope = serde_json::from_slice::<Envelope<T>>(&body)
            .map_err(|err| ApiError::Decode(err.to_string()))?;
        if envelope.code != SUCCESS_CODE {
            let err = ApiError::Application {
                code: envelope.code,
                message: envelope.message.unwrap_or_default(),
            };
            warn!(%method, url = %url, "backend rejected request: {err}");
            return Err(err);
        }

        Ok(envelope.data)
    }
}

fn normalize_base_url(raw: &str) -> Result<Url, ApiError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_owned()
    } else {
        warn!("API base URL '{trimmed}' has no scheme, assuming http://");
        format!("http://{trimmed}")
    };
    Url::parse(&with_scheme).map_err(|err| ApiError::InvalidUrl(format!("{with_scheme}: {err}")))
}
