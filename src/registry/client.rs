//! Admin API client for the tailnet device registry.
//!
//! # Responsibilities
//! - Query the tailnet device list with bearer authentication
//! - Validate the body into typed [`Device`]s before handing it on
//!
//! The reconciler bounds each fetch with `registry.timeout_secs`; the client
//! itself does not time out.

use std::future::Future;
use std::time::Instant;

use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;

use crate::config::RegistryConfig;
use crate::observability::metrics;
use crate::registry::types::{Device, DeviceList, RegistryError, RegistryResult};

/// Anything that can produce the current device list.
///
/// The reconciler is generic over this so tests can script registry outcomes.
pub trait DeviceSource: Send + Sync {
    fn fetch_devices(&self) -> impl Future<Output = RegistryResult<Vec<Device>>> + Send;
}

/// HTTP client for the tailnet admin API.
#[derive(Clone)]
pub struct RegistryClient {
    http: reqwest::Client,
    devices_url: url::Url,
    api_token: String,
}

impl RegistryClient {
    /// Create a new registry client.
    pub fn new(config: &RegistryConfig) -> RegistryResult<Self> {
        let base: url::Url = config.api_base_url.parse().map_err(|e| {
            RegistryError::Malformed(format!("invalid API URL '{}': {}", config.api_base_url, e))
        })?;
        let devices_url = base
            .join(&format!("api/v2/tailnet/{}/devices", config.tailnet))
            .map_err(|e| RegistryError::Malformed(format!("invalid tailnet '{}': {}", config.tailnet, e)))?;

        Ok(Self {
            http: reqwest::Client::new(),
            devices_url,
            api_token: config.api_token.clone(),
        })
    }

    /// The fully-resolved devices endpoint.
    pub fn devices_url(&self) -> &url::Url {
        &self.devices_url
    }

    async fn request_devices(&self) -> RegistryResult<Vec<Device>> {
        let response = self
            .http
            .get(self.devices_url.clone())
            .header(AUTHORIZATION, format!("Bearer {}", self.api_token))
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let list: DeviceList = serde_json::from_slice(&bytes)
            .map_err(|e| RegistryError::Malformed(e.to_string()))?;

        list.devices.into_iter().map(Device::from_wire).collect()
    }
}

impl DeviceSource for RegistryClient {
    async fn fetch_devices(&self) -> RegistryResult<Vec<Device>> {
        let start = Instant::now();
        let result = self.request_devices().await;
        metrics::record_registry_fetch(result.is_ok(), start);
        result
    }
}

impl std::fmt::Debug for RegistryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryClient")
            .field("devices_url", &self.devices_url.as_str())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> RegistryConfig {
        RegistryConfig {
            api_base_url: "http://127.0.0.1:1".to_string(),
            tailnet: "example.com".to_string(),
            api_token: "tskey-api-secret".to_string(),
            timeout_secs: 1,
        }
    }

    #[test]
    fn test_devices_url() {
        let client = RegistryClient::new(&test_config()).unwrap();
        assert_eq!(
            client.devices_url().as_str(),
            "http://127.0.0.1:1/api/v2/tailnet/example.com/devices"
        );
    }

    #[test]
    fn test_debug_hides_token() {
        let client = RegistryClient::new(&test_config()).unwrap();
        let debug = format!("{:?}", client);
        assert!(!debug.contains("tskey-api-secret"));
    }

    #[tokio::test]
    async fn test_unreachable_registry_is_an_error() {
        let client = RegistryClient::new(&test_config()).unwrap();
        assert!(client.fetch_devices().await.is_err());
    }
}
