// MIT License - Copyright (c) 2026 the hms2mqtt authors

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::client::HmsClient;
use crate::config::HmsConfig;
use crate::constants::{HEADER_API_KEY, HEADER_KEY_ID, PATH_PROFILE};
use crate::error::{HmsError, Result};
use crate::protocol::{
    device_path, state_path, status_path, ApiEnvelope, DeviceData, ProfileData,
    StateChangeRequest, StatusData,
};
use crate::state::{ArmCommand, ConnectionState, DeviceHealth, DeviceSnapshot, HmsId, HmsStatus};

/// Device record returned by [`HmsCloudClient::device_health`].
#[derive(Debug, Clone)]
pub struct DeviceRecord {
    /// Nickname assigned to the hub in the vendor app
    pub nickname: String,
    pub health: DeviceHealth,
}

/// HTTPS client for the HMS cloud monitoring API.
///
/// Cheap to clone; clones share the underlying connection pool. Every
/// request carries the key-id/api-key headers and the configured timeout.
#[derive(Debug, Clone)]
pub struct HmsCloudClient {
    http: reqwest::Client,
    base_url: String,
    device_id: String,
}

impl HmsCloudClient {
    /// Build a client from config. Fails when the key material cannot be
    /// encoded as header values or the TLS backend fails to initialize.
    pub fn new(config: &HmsConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static(HEADER_KEY_ID),
            header_value(&config.key_id, "key_id")?,
        );
        headers.insert(
            HeaderName::from_static(HEADER_API_KEY),
            header_value(&config.api_key, "api_key")?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            device_id: config.device_id.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_data<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self.http.get(self.url(path)).send().await?;
        let envelope: ApiEnvelope<T> = resp.error_for_status()?.json().await?;
        envelope.into_data()
    }

    /// Fetch the configured device's cloud record (nickname + connectivity).
    ///
    /// The bridge loop uses this to build the health input for each refresh
    /// and, at startup, to verify the configured credentials.
    pub async fn device_health(&self) -> Result<DeviceRecord> {
        let data: DeviceData = self.get_data(&device_path(&self.device_id)).await?;
        Ok(DeviceRecord {
            nickname: data.nickname,
            health: DeviceHealth::new(ConnectionState::from_conn_state(data.conn_state)),
        })
    }
}

fn header_value(raw: &str, field: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(raw).map_err(|_| HmsError::InvalidConfig {
        details: format!("{field} is not a valid header value"),
    })
}

impl HmsClient for HmsCloudClient {
    async fn resolve_identifier(&self) -> Result<HmsId> {
        let data: ProfileData = self.get_data(PATH_PROFILE).await?;
        debug!("Resolved monitoring profile {}", data.profile_id);
        Ok(HmsId::new(data.profile_id))
    }

    async fn fetch_status(&self, id: &HmsId) -> Result<DeviceSnapshot> {
        let data: StatusData = self.get_data(&status_path(id.as_str())).await?;
        Ok(DeviceSnapshot {
            connection: ConnectionState::from_conn_state(data.conn_state),
            status: HmsStatus::from_wire(&data.status),
        })
    }

    async fn push_state(&self, id: &HmsId, command: ArmCommand) -> Result<()> {
        let body = StateChangeRequest {
            state: command.as_wire_str(),
        };
        let resp = self
            .http
            .post(self.url(&state_path(id.as_str())))
            .json(&body)
            .send()
            .await?;
        let envelope: ApiEnvelope<serde_json::Value> = resp.error_for_status()?.json().await?;
        envelope.ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let config = HmsConfig::builder()
            .base_url("https://hms.example.net/")
            .key_id("kid")
            .api_key("key")
            .device_id("A4DA22112233")
            .build();
        let client = HmsCloudClient::new(&config).unwrap();
        assert_eq!(
            client.url("/v1/monitoring/profile"),
            "https://hms.example.net/v1/monitoring/profile"
        );
    }

    #[test]
    fn test_rejects_unencodable_key_material() {
        let config = HmsConfig::builder()
            .base_url("https://hms.example.net")
            .key_id("kid\n")
            .api_key("key")
            .build();
        assert!(matches!(
            HmsCloudClient::new(&config),
            Err(HmsError::InvalidConfig { .. })
        ));
    }
}
