use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use dirs_next::{config_dir, data_dir};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

const ENHANCER_API_BASE_URL: &str = "ENHANCER_API_BASE_URL";
const ENHANCER_DATA_DIR: &str = "ENHANCER_DATA_DIR";
const ENHANCER_MAX_RPM: &str = "ENHANCER_MAX_RPM";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EnhancerConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default)]
    pub data_dir: Option<String>,
    #[serde(default = "default_max_requests_per_minute")]
    pub max_requests_per_minute: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

fn default_api_base_url() -> String {
    "https://api.openai.com/v1/".to_string()
}
fn default_max_requests_per_minute() -> usize {
    10
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_base_delay_ms() -> u64 {
    1000
}

impl Default for EnhancerConfig {
    fn default() -> Self {
        EnhancerConfig {
            api_base_url: default_api_base_url(),
            data_dir: None,
            max_requests_per_minute: default_max_requests_per_minute(),
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

impl EnhancerConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Environment variables win over the file.
    fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = env::var(ENHANCER_API_BASE_URL) {
            self.api_base_url = url;
        }
        if let Ok(dir) = env::var(ENHANCER_DATA_DIR) {
            self.data_dir = Some(dir);
        }
        if let Some(rpm) = env::var(ENHANCER_MAX_RPM).ok().and_then(|v| v.parse().ok()) {
            self.max_requests_per_minute = rpm;
        }
        self
    }

    /// Full chat-completions endpoint derived from `api_base_url`.
    pub fn completions_url(&self) -> Result<String, url::ParseError> {
        let mut base = self.api_base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        Ok(Url::parse(&base)?.join("chat/completions")?.to_string())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn storage_path(&self) -> PathBuf {
        let mut path = match &self.data_dir {
            Some(dir) => PathBuf::from(dir),
            None => {
                let mut path = data_dir()
                    .or_else(|| env::current_dir().ok())
                    .unwrap_or_else(|| PathBuf::from("."));
                path.push("enhancer");
                path
            }
        };
        path.push("storage.json");
        path
    }
}

static CONFIG: OnceCell<EnhancerConfig> = OnceCell::new();

fn get_enhancer_config_path() -> PathBuf {
    let mut path = config_dir()
        .or_else(|| env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));
    path.push("enhancer");
    path.push("enhancer.toml");
    path
}

fn load_config_file() -> EnhancerConfig {
    let path = get_enhancer_config_path();
    debug!("Loading config from {}", path.display());
    if path.exists() {
        let content = fs::read_to_string(&path).unwrap_or_default();
        match EnhancerConfig::from_toml_str(&content) {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring invalid config at {}: {}", path.display(), e);
                EnhancerConfig::default()
            }
        }
    } else {
        // Create the directory and file, and write defaults
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        let default = EnhancerConfig::default();
        let toml_str = toml::to_string_pretty(&default).unwrap_or_default();
        let _ = fs::write(&path, toml_str);
        default
    }
}

pub fn get_config() -> &'static EnhancerConfig {
    CONFIG.get_or_init(|| load_config_file().with_env_overrides())
}
