// MIT License - Copyright (c) 2026 the hms2mqtt authors

use crate::constants::DEFAULT_TIMEOUT_MS;

/// Configuration for talking to the HMS cloud.
#[derive(Debug, Clone)]
pub struct HmsConfig {
    /// Cloud API base URL, without a trailing slash
    pub base_url: String,
    /// API key id issued by the vendor portal
    pub key_id: String,
    /// API key secret
    pub api_key: String,
    /// Device id of the monitoring hub (MAC-style)
    pub device_id: String,
    /// Accessory display name used in logs and bus messages
    pub display_name: String,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for HmsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.hms.example.com".to_string(),
            key_id: String::new(),
            api_key: String::new(),
            device_id: String::new(),
            display_name: "Security System".to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl HmsConfig {
    /// Create a new config builder starting from defaults.
    pub fn builder() -> HmsConfigBuilder {
        HmsConfigBuilder::default()
    }
}

/// Builder for HmsConfig.
#[derive(Debug, Clone, Default)]
pub struct HmsConfigBuilder {
    config: HmsConfig,
}

impl HmsConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn key_id(mut self, key_id: impl Into<String>) -> Self {
        self.config.key_id = key_id.into();
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.config.api_key = api_key.into();
        self
    }

    pub fn device_id(mut self, device_id: impl Into<String>) -> Self {
        self.config.device_id = device_id.into();
        self
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.config.display_name = name.into();
        self
    }

    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.config.timeout_ms = ms;
        self
    }

    pub fn build(self) -> HmsConfig {
        self.config
    }
}
