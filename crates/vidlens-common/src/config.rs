use serde::{Deserialize, Serialize};
use std::env;
use config::{Config, ConfigError, File, Environment};

// --- Constants for Default Configuration ---
pub const DEFAULT_INDEXER_BASE_URL: &str = "https://api.videoindexer.ai";
pub const DEFAULT_INDEXER_LOCATION: &str = "trial";
pub const DEFAULT_INDEXER_LANGUAGE: &str = "English";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_SEARCH_MAX_IN_FLIGHT: usize = 8;
pub const DEFAULT_IMAGE_RESULT_LIMIT: usize = 10;

pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";
pub const DEFAULT_SERVER_PORT: u16 = 3000;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerConfig {
    pub base_url: String,
    pub account_id: String,
    pub location: String,
    pub api_key: String,
    pub language: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionConfig {
    pub endpoint: String,
    pub api_key: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Upper bound on concurrent insight/thumbnail requests per query.
    pub max_in_flight: usize,
    /// Image searches return at most this many results.
    pub image_result_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub indexer: IndexerConfig,
    pub vision: VisionConfig,
    pub search: SearchConfig,
    pub server: ServerConfig,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_INDEXER_BASE_URL.into(),
            account_id: String::new(),
            location: DEFAULT_INDEXER_LOCATION.into(),
            api_key: String::new(),
            language: DEFAULT_INDEXER_LANGUAGE.into(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_in_flight: DEFAULT_SEARCH_MAX_IN_FLIGHT,
            image_result_limit: DEFAULT_IMAGE_RESULT_LIMIT,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SERVER_HOST.into(),
            port: DEFAULT_SERVER_PORT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            indexer: IndexerConfig::default(),
            vision: VisionConfig::default(),
            search: SearchConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            // Default settings
            .set_default("indexer.base_url", DEFAULT_INDEXER_BASE_URL)?
            .set_default("indexer.account_id", "")?
            .set_default("indexer.location", DEFAULT_INDEXER_LOCATION)?
            .set_default("indexer.api_key", "")?
            .set_default("indexer.language", DEFAULT_INDEXER_LANGUAGE)?
            .set_default("indexer.request_timeout_secs", DEFAULT_REQUEST_TIMEOUT_SECS)?
            .set_default("vision.endpoint", "")?
            .set_default("vision.api_key", "")?
            .set_default("vision.request_timeout_secs", DEFAULT_REQUEST_TIMEOUT_SECS)?
            .set_default("search.max_in_flight", DEFAULT_SEARCH_MAX_IN_FLIGHT as i64)?
            .set_default("search.image_result_limit", DEFAULT_IMAGE_RESULT_LIMIT as i64)?
            .set_default("server.host", DEFAULT_SERVER_HOST)?
            .set_default("server.port", DEFAULT_SERVER_PORT as i64)?
            .set_default("server.max_upload_bytes", DEFAULT_MAX_UPLOAD_BYTES as i64)?

            // File: config.toml
            .add_source(File::with_name("config").required(false))

            // Environment: VIDLENS_SEARCH__MAX_IN_FLIGHT=16 -> search.max_in_flight=16
            .add_source(Environment::with_prefix("VIDLENS").prefix_separator("_").separator("__"))

            // Variable names used by earlier deployments
            .set_override_option("indexer.account_id", env::var("VIDEO_INDEXER_ACCOUNT_ID").ok())?
            .set_override_option("indexer.location", env::var("VIDEO_INDEXER_LOCATION").ok())?
            .set_override_option("indexer.api_key", env::var("VIDEO_INDEXER_API_KEY").ok())?
            .set_override_option("vision.endpoint", env::var("COMPUTER_VISION_API_ENDPOINT").ok())?
            .set_override_option("vision.api_key", env::var("COMPUTER_VISION_API_KEY").ok())?
            .set_override_option("server.port", env::var("PORT").ok().and_then(|v| v.parse::<i64>().ok()))?

            .build()?;

        s.try_deserialize()
    }

    /// Checks the settings the server cannot run without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let missing = [
            ("indexer.account_id", self.indexer.account_id.is_empty()),
            ("indexer.api_key", self.indexer.api_key.is_empty()),
            ("vision.endpoint", self.vision.endpoint.is_empty()),
            ("vision.api_key", self.vision.api_key.is_empty()),
        ];
        if let Some((key, _)) = missing.iter().find(|(_, empty)| *empty) {
            return Err(ConfigError::Message(format!("{} must be set", key)));
        }
        if self.search.max_in_flight == 0 {
            return Err(ConfigError::Message("search.max_in_flight must be at least 1".into()));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
