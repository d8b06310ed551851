//! Envoy v3 resource types served over xDS.
//!
//! Only the fields this control plane sets are modelled. Field names follow
//! the proto definitions, which Envoy's JSON parser accepts directly; durations
//! use the proto3 JSON form (`"5s"`).

use std::fmt;

use serde::{Deserialize, Serialize};

pub const CLUSTER_TYPE_URL: &str = "type.googleapis.com/envoy.config.cluster.v3.Cluster";
pub const LISTENER_TYPE_URL: &str = "type.googleapis.com/envoy.config.listener.v3.Listener";
pub const ROUTE_TYPE_URL: &str = "type.googleapis.com/envoy.config.route.v3.RouteConfiguration";
pub const ENDPOINT_TYPE_URL: &str =
    "type.googleapis.com/envoy.config.endpoint.v3.ClusterLoadAssignment";

const HCM_TYPE_URL: &str =
    "type.googleapis.com/envoy.extensions.filters.network.http_connection_manager.v3.HttpConnectionManager";
const ROUTER_TYPE_URL: &str = "type.googleapis.com/envoy.extensions.filters.http.router.v3.Router";

/// The four resource families this control plane serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Cluster,
    Listener,
    Route,
    Endpoint,
}

impl ResourceType {
    pub const ALL: [ResourceType; 4] = [
        ResourceType::Cluster,
        ResourceType::Listener,
        ResourceType::Route,
        ResourceType::Endpoint,
    ];

    pub fn type_url(self) -> &'static str {
        match self {
            ResourceType::Cluster => CLUSTER_TYPE_URL,
            ResourceType::Listener => LISTENER_TYPE_URL,
            ResourceType::Route => ROUTE_TYPE_URL,
            ResourceType::Endpoint => ENDPOINT_TYPE_URL,
        }
    }

    pub fn from_type_url(type_url: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.type_url() == type_url)
    }

    /// Path segment of the REST discovery endpoint (`/v3/discovery:<segment>`).
    pub fn rest_segment(self) -> &'static str {
        match self {
            ResourceType::Cluster => "clusters",
            ResourceType::Listener => "listeners",
            ResourceType::Route => "routes",
            ResourceType::Endpoint => "endpoints",
        }
    }

    pub fn from_rest_segment(segment: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.rest_segment() == segment)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.rest_segment())
    }
}

/// A single typed resource, serialized with its `@type` URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "@type")]
pub enum Resource {
    #[serde(rename = "type.googleapis.com/envoy.config.cluster.v3.Cluster")]
    Cluster(Cluster),
    #[serde(rename = "type.googleapis.com/envoy.config.listener.v3.Listener")]
    Listener(Listener),
    #[serde(rename = "type.googleapis.com/envoy.config.route.v3.RouteConfiguration")]
    Route(RouteConfiguration),
    #[serde(rename = "type.googleapis.com/envoy.config.endpoint.v3.ClusterLoadAssignment")]
    Endpoint(ClusterLoadAssignment),
}

impl Resource {
    pub fn resource_type(&self) -> ResourceType {
        match self {
            Resource::Cluster(_) => ResourceType::Cluster,
            Resource::Listener(_) => ResourceType::Listener,
            Resource::Route(_) => ResourceType::Route,
            Resource::Endpoint(_) => ResourceType::Endpoint,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Resource::Cluster(c) => &c.name,
            Resource::Listener(l) => &l.name,
            Resource::Route(r) => &r.name,
            Resource::Endpoint(e) => &e.cluster_name,
        }
    }
}

// --- Shared core types ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub socket_address: SocketAddress,
}

impl Address {
    pub fn socket(address: impl Into<String>, port: u16) -> Self {
        Self {
            socket_address: SocketAddress {
                address: address.into(),
                port_value: u32::from(port),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketAddress {
    pub address: String,
    pub port_value: u32,
}

/// A config source pointing back at this server's REST discovery API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSource {
    pub resource_api_version: String,
    pub api_config_source: ApiConfigSource,
}

impl ConfigSource {
    /// Poll `xds_cluster` over REST every `refresh_delay_secs`.
    pub fn rest(xds_cluster: &str, refresh_delay_secs: u64, request_timeout_secs: u64) -> Self {
        Self {
            resource_api_version: "V3".to_string(),
            api_config_source: ApiConfigSource {
                api_type: "REST".to_string(),
                transport_api_version: "V3".to_string(),
                cluster_names: vec![xds_cluster.to_string()],
                refresh_delay: duration_secs(refresh_delay_secs),
                request_timeout: duration_secs(request_timeout_secs),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfigSource {
    pub api_type: String,
    pub transport_api_version: String,
    /// Statically defined bootstrap cluster that reaches this control plane.
    pub cluster_names: Vec<String>,
    pub refresh_delay: String,
    pub request_timeout: String,
}

/// Render seconds in proto3 JSON duration form.
pub fn duration_secs(secs: u64) -> String {
    format!("{}s", secs)
}

// --- Cluster ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub name: String,
    #[serde(rename = "type")]
    pub discovery_type: String,
    pub connect_timeout: String,
    pub eds_cluster_config: EdsClusterConfig,
    pub common_lb_config: CommonLbConfig,
    pub health_checks: Vec<HealthCheck>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdsClusterConfig {
    pub service_name: String,
    pub eds_config: ConfigSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonLbConfig {
    pub locality_weighted_lb_config: LocalityWeightedLbConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalityWeightedLbConfig {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub timeout: String,
    pub interval: String,
    pub unhealthy_threshold: u32,
    pub healthy_threshold: u32,
    pub http_health_check: HttpHealthCheck,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpHealthCheck {
    pub host: String,
    pub path: String,
}

// --- Endpoints ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterLoadAssignment {
    pub cluster_name: String,
    #[serde(default)]
    pub endpoints: Vec<LocalityLbEndpoints>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalityLbEndpoints {
    pub locality: Locality,
    pub priority: u32,
    pub load_balancing_weight: u32,
    pub lb_endpoints: Vec<LbEndpoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locality {
    pub region: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LbEndpoint {
    pub endpoint: Endpoint,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub address: Address,
}

// --- Listener ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listener {
    pub name: String,
    pub address: Address,
    pub filter_chains: Vec<FilterChain>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterChain {
    pub filters: Vec<NetworkFilter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkFilter {
    pub name: String,
    pub typed_config: HttpConnectionManager,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConnectionManager {
    #[serde(rename = "@type")]
    pub type_url: String,
    pub stat_prefix: String,
    pub rds: Rds,
    pub http_filters: Vec<HttpFilter>,
}

impl HttpConnectionManager {
    /// HCM fetching its routes over RDS and terminating in the router filter.
    pub fn with_rds(stat_prefix: &str, route_config_name: &str, config_source: ConfigSource) -> Self {
        Self {
            type_url: HCM_TYPE_URL.to_string(),
            stat_prefix: stat_prefix.to_string(),
            rds: Rds {
                route_config_name: route_config_name.to_string(),
                config_source,
            },
            http_filters: vec![HttpFilter {
                name: "envoy.filters.http.router".to_string(),
                typed_config: TypedRouter {
                    type_url: ROUTER_TYPE_URL.to_string(),
                },
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rds {
    pub route_config_name: String,
    pub config_source: ConfigSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpFilter {
    pub name: String,
    pub typed_config: TypedRouter,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedRouter {
    #[serde(rename = "@type")]
    pub type_url: String,
}

// --- Routes ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteConfiguration {
    pub name: String,
    pub virtual_hosts: Vec<VirtualHost>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualHost {
    pub name: String,
    pub domains: Vec<String>,
    pub routes: Vec<Route>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    #[serde(rename = "match")]
    pub route_match: RouteMatch,
    pub route: RouteAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteMatch {
    pub prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteAction {
    pub cluster: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_url_lookup() {
        for t in ResourceType::ALL {
            assert_eq!(ResourceType::from_type_url(t.type_url()), Some(t));
            assert_eq!(ResourceType::from_rest_segment(t.rest_segment()), Some(t));
        }
        assert_eq!(ResourceType::from_type_url("type.googleapis.com/unknown"), None);
        assert_eq!(ResourceType::from_rest_segment("secrets"), None);
    }

    #[test]
    fn test_resource_carries_type_url() {
        let resource = Resource::Endpoint(ClusterLoadAssignment {
            cluster_name: "backend".into(),
            endpoints: vec![LocalityLbEndpoints {
                locality: Locality { region: "weight-2".into() },
                priority: 0,
                load_balancing_weight: 2,
                lb_endpoints: vec![LbEndpoint {
                    endpoint: Endpoint {
                        address: Address::socket("10.0.0.1", 8080),
                    },
                }],
            }],
        });

        let json = serde_json::to_value(&resource).unwrap();
        assert_eq!(json["@type"], ENDPOINT_TYPE_URL);
        assert_eq!(json["cluster_name"], "backend");
        assert_eq!(json["endpoints"][0]["load_balancing_weight"], 2);
        assert_eq!(
            json["endpoints"][0]["lb_endpoints"][0]["endpoint"]["address"]["socket_address"]["port_value"],
            8080
        );
        assert_eq!(resource.name(), "backend");
        assert_eq!(resource.resource_type(), ResourceType::Endpoint);
    }

    #[test]
    fn test_route_match_field_name() {
        let route = Route {
            route_match: RouteMatch { prefix: "/".into() },
            route: RouteAction { cluster: "backend".into() },
        };
        let json = serde_json::to_value(&route).unwrap();
        assert_eq!(json["match"]["prefix"], "/");
    }

    #[test]
    fn test_rest_config_source_json() {
        let json = serde_json::to_value(ConfigSource::rest("xds_cluster", 1, 5)).unwrap();
        assert_eq!(json["resource_api_version"], "V3");
        assert!(json.get("ads").is_none());

        let api = &json["api_config_source"];
        assert_eq!(api["api_type"], "REST");
        assert_eq!(api["transport_api_version"], "V3");
        assert_eq!(api["cluster_names"], serde_json::json!(["xds_cluster"]));
        assert_eq!(api["refresh_delay"], "1s");
        assert_eq!(api["request_timeout"], "5s");
    }
}
