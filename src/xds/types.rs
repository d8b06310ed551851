//! xDS discovery messages in their JSON form.

use serde::{Deserialize, Serialize};

use crate::topology::Resource;

/// Identifies the requesting proxy. Unknown node fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Node {
    pub id: String,
    pub cluster: String,
}

/// `google.rpc.Status`, carried on a request that rejects the previous response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorDetail {
    pub code: i32,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryRequest {
    /// Version the proxy last accepted; empty on first request.
    pub version_info: String,
    pub node: Option<Node>,
    /// Requested resource names; empty means all.
    pub resource_names: Vec<String>,
    pub type_url: String,
    pub response_nonce: String,
    /// Set when the proxy rejected the previous response (NACK).
    pub error_detail: Option<ErrorDetail>,
}

impl DiscoveryRequest {
    /// The requesting node id, if one was sent.
    pub fn node_id(&self) -> Option<&str> {
        self.node
            .as_ref()
            .map(|n| n.id.as_str())
            .filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryResponse {
    pub version_info: String,
    pub resources: Vec<Resource>,
    pub type_url: String,
    pub nonce: String,
}
