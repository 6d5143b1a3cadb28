use crate::session::ReplacePolicy;
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "vsp-console";
const CONFIG_FILE: &str = "config.json";
const LOG_FILE: &str = "vsp-console.log";

pub const ENV_API_URL: &str = "VSP_API_URL";
pub const ENV_TOKEN: &str = "VSP_TOKEN";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Base URL of the platform REST API, including any path prefix.
    pub api_base_url: String,
    /// Bearer token attached to every request.
    pub token: Option<String>,
    pub request_timeout_secs: u64,
    /// Number of windows on the live wall.
    pub window_count: usize,
    pub replace_policy: ReplacePolicy,
    pub autoplay: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8080/api".to_owned(),
            token: None,
            request_timeout_secs: 30,
            window_count: crate::session::DEFAULT_WINDOW_COUNT,
            replace_policy: ReplacePolicy::default(),
            autoplay: true,
        }
    }
}

impl ConsoleConfig {
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Applies `VSP_API_URL` / `VSP_TOKEN` from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_URL).filter(|value| !value.trim().is_empty()) {
            self.api_base_url = url.trim().to_owned();
        }
        if let Some(token) = lookup(ENV_TOKEN) {
            let token = token.trim();
            self.token = (!token.is_empty()).then(|| token.to_owned());
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_count == 0 {
            return Err(anyhow!("window_count must be a positive integer"));
        }
        let candidate = if self.api_base_url.contains("://") {
            self.api_base_url.clone()
        } else {
            format!("http://{}", self.api_base_url)
        };
        url::Url::parse(&candidate)
            .with_context(|| format!("invalid api_base_url '{}'", self.api_base_url))?;
        Ok(())
    }
}

pub fn config_path() -> Result<PathBuf> {
    scoped_path(CONFIG_FILE)
}

pub fn log_path() -> Result<PathBuf> {
    scoped_path(LOG_FILE)
}

pub fn load_or_create_config() -> Result<ConsoleConfig> {
    load_or_create_at(&config_path()?)
}

/// Reads the config at `path`, writing the defaults there first if the file is missing.
pub fn load_or_create_at(path: &Path) -> Result<ConsoleConfig> {
    if !path.exists() {
        let config = ConsoleConfig::default();
        save_config_at(path, &config)?;
        return Ok(config);
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed reading console config at {}", path.display()))?;
    let parsed = serde_json::from_str::<ConsoleConfig>(&raw)
        .with_context(|| format!("failed parsing console config at {}", path.display()))?;
    Ok(parsed)
}

pub fn save_config_at(path: &Path, config: &ConsoleConfig) -> Result<()> {
    ensure_parent_dir(path)?;
    let payload =
        serde_json::to_string_pretty(config).context("failed serializing console config")?;
    fs::write(path, payload)
        .with_context(|| format!("failed writing console config at {}", path.display()))?;
    Ok(())
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed creating config directory {}", parent.display()))?;
    }
    Ok(())
}

fn data_root() -> Result<PathBuf> {
    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .context("unable to determine user data directory")
}

fn scoped_path(file: &str) -> Result<PathBuf> {
    Ok(data_root()?.join(APP_DIR).join(file))
}
