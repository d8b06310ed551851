//! Device model and registry error definitions.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A device known to the registry.
///
/// Built only through [`Device::from_wire`], so every address is a parsed IP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub addresses: Vec<IpAddr>,
    pub tags: Vec<String>,
}

impl Device {
    /// Create a device from already-validated parts.
    pub fn new(
        id: impl Into<String>,
        addresses: Vec<IpAddr>,
        tags: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            addresses,
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true if the device carries `tag` (exact match).
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Validate a wire record into a device.
    pub fn from_wire(wire: WireDevice) -> RegistryResult<Self> {
        let addresses = wire
            .addresses
            .iter()
            .map(|raw| {
                raw.parse::<IpAddr>().map_err(|_| RegistryError::Malformed(format!(
                    "device '{}' has invalid address '{}'",
                    wire.id, raw
                )))
            })
            .collect::<RegistryResult<Vec<_>>>()?;

        Ok(Self {
            id: wire.id,
            name: wire.name,
            addresses,
            tags: wire.tags,
        })
    }
}

/// Device record as returned by the admin API.
#[derive(Debug, Clone, Deserialize)]
pub struct WireDevice {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub addresses: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Top-level body of `GET /api/v2/tailnet/{tailnet}/devices`.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceList {
    pub devices: Vec<WireDevice>,
}

/// Errors that can occur while fetching devices.
///
/// Every variant is transient from the reconciler's point of view.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Connection or request failed.
    #[error("registry request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The fetch did not complete within the configured bound.
    #[error("registry request timed out after {0} seconds")]
    Timeout(u64),

    /// The registry answered with anything but 200 OK.
    #[error("registry returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The body could not be decoded or failed validation.
    #[error("malformed registry response: {0}")]
    Malformed(String),
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
