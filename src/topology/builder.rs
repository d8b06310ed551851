//! Topology construction.
//!
//! # Responsibilities
//! - Build the static cluster/listener/route resources once at startup
//! - Build the weighted endpoint assignment on every reconcile tick
//!
//! # Design Decisions
//! - Configured tag order is the output locality order (the only tie-break)
//! - Tags without addresses are omitted, never emitted empty
//! - A device carrying several configured tags joins every matching locality
//! - Addresses are not deduplicated beyond what the registry returns

use std::collections::HashSet;
use std::net::IpAddr;

use serde::Serialize;
use thiserror::Error;

use crate::config::{EnvoyConfig, HealthCheckConfig};
use crate::registry::Device;
use crate::topology::resources::{self as envoy, duration_secs, Resource};
use crate::topology::weight::resolve_weight;

/// Errors raised while building topology.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    /// The same tag was configured twice; localities must be distinct.
    #[error("duplicate discovery tag '{0}'")]
    DuplicateTag(String),

    /// Static resources cannot be built from the given configuration.
    #[error("invalid static resource configuration: {0}")]
    InvalidStatic(String),
}

/// A weighted group of endpoint addresses sharing one tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Locality {
    pub tag: String,
    pub weight: u32,
    pub addresses: Vec<IpAddr>,
}

/// The weighted localities of one cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointAssignment {
    pub cluster_name: String,
    pub localities: Vec<Locality>,
}

impl EndpointAssignment {
    /// An assignment with no localities (before the first successful poll).
    pub fn empty(cluster_name: impl Into<String>) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            localities: Vec::new(),
        }
    }

    pub fn endpoint_count(&self) -> usize {
        self.localities.iter().map(|l| l.addresses.len()).sum()
    }

    /// Render as an Envoy `ClusterLoadAssignment`, every endpoint on `port`.
    pub fn to_load_assignment(&self, port: u16) -> envoy::ClusterLoadAssignment {
        let endpoints = self
            .localities
            .iter()
            .map(|locality| envoy::LocalityLbEndpoints {
                locality: envoy::Locality {
                    region: locality.tag.clone(),
                },
                priority: 0,
                load_balancing_weight: locality.weight,
                lb_endpoints: locality
                    .addresses
                    .iter()
                    .map(|ip| envoy::LbEndpoint {
                        endpoint: envoy::Endpoint {
                            address: envoy::Address::socket(ip.to_string(), port),
                        },
                    })
                    .collect(),
            })
            .collect();

        envoy::ClusterLoadAssignment {
            cluster_name: self.cluster_name.clone(),
            endpoints,
        }
    }
}

/// Resources computed once and carried into every snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticResources {
    pub cluster: envoy::Cluster,
    pub listener: envoy::Listener,
    pub route: envoy::RouteConfiguration,
}

impl StaticResources {
    pub fn cluster_name(&self) -> &str {
        &self.cluster.name
    }

    pub fn to_resources(&self) -> [Resource; 3] {
        [
            Resource::Cluster(self.cluster.clone()),
            Resource::Listener(self.listener.clone()),
            Resource::Route(self.route.clone()),
        ]
    }
}

/// Builds static and dynamic topology for a single EDS cluster.
#[derive(Debug, Clone)]
pub struct TopologyBuilder {
    envoy: EnvoyConfig,
    health_check: HealthCheckConfig,
}

impl TopologyBuilder {
    pub fn new(envoy: EnvoyConfig, health_check: HealthCheckConfig) -> Self {
        Self { envoy, health_check }
    }

    pub fn cluster_name(&self) -> &str {
        &self.envoy.cluster_name
    }

    pub fn endpoint_port(&self) -> u16 {
        self.envoy.endpoint_port
    }

    /// Build the cluster, listener and route. Called once at startup.
    pub fn build_static(&self) -> Result<StaticResources, TopologyError> {
        let cfg = &self.envoy;
        for (field, value) in [
            ("cluster name", &cfg.cluster_name),
            ("listener name", &cfg.listener_name),
            ("route name", &cfg.route_name),
            ("xds cluster name", &cfg.xds_cluster_name),
        ] {
            if value.is_empty() {
                return Err(TopologyError::InvalidStatic(format!("{} is empty", field)));
            }
        }
        if cfg.listener_port == 0 {
            return Err(TopologyError::InvalidStatic("listener port is 0".to_string()));
        }

        let config_source = envoy::ConfigSource::rest(
            &cfg.xds_cluster_name,
            cfg.xds_refresh_delay_secs,
            cfg.xds_request_timeout_secs,
        );

        let hc = &self.health_check;
        let cluster = envoy::Cluster {
            name: cfg.cluster_name.clone(),
            discovery_type: "EDS".to_string(),
            connect_timeout: duration_secs(cfg.connect_timeout_secs),
            eds_cluster_config: envoy::EdsClusterConfig {
                service_name: cfg.cluster_name.clone(),
                eds_config: config_source.clone(),
            },
            common_lb_config: envoy::CommonLbConfig {
                locality_weighted_lb_config: envoy::LocalityWeightedLbConfig {},
            },
            health_checks: vec![envoy::HealthCheck {
                timeout: duration_secs(hc.timeout_secs),
                interval: duration_secs(hc.interval_secs),
                unhealthy_threshold: hc.unhealthy_threshold,
                healthy_threshold: hc.healthy_threshold,
                http_health_check: envoy::HttpHealthCheck {
                    host: hc.host.clone(),
                    path: hc.path.clone(),
                },
            }],
        };

        let listener = envoy::Listener {
            name: cfg.listener_name.clone(),
            address: envoy::Address::socket("0.0.0.0", cfg.listener_port),
            filter_chains: vec![envoy::FilterChain {
                filters: vec![envoy::NetworkFilter {
                    name: "envoy.filters.network.http_connection_manager".to_string(),
                    typed_config: envoy::HttpConnectionManager::with_rds(
                        "ingress_hcm",
                        &cfg.route_name,
                        config_source,
                    ),
                }],
            }],
        };

        let route = envoy::RouteConfiguration {
            name: cfg.route_name.clone(),
            virtual_hosts: vec![envoy::VirtualHost {
                name: "weighted_service".to_string(),
                domains: vec!["*".to_string()],
                routes: vec![envoy::Route {
                    route_match: envoy::RouteMatch {
                        prefix: "/".to_string(),
                    },
                    route: envoy::RouteAction {
                        cluster: cfg.cluster_name.clone(),
                    },
                }],
            }],
        };

        Ok(StaticResources {
            cluster,
            listener,
            route,
        })
    }

    /// Build the weighted assignment for `tags` (in order) over `devices`.
    pub fn build_assignment(
        &self,
        tags: &[String],
        devices: &[Device],
    ) -> Result<EndpointAssignment, TopologyError> {
        let mut seen = HashSet::with_capacity(tags.len());
        let mut localities = Vec::with_capacity(tags.len());

        for tag in tags {
            if !seen.insert(tag.as_str()) {
                return Err(TopologyError::DuplicateTag(tag.clone()));
            }

            let addresses: Vec<IpAddr> = devices
                .iter()
                .filter(|d| d.has_tag(tag))
                .flat_map(|d| d.addresses.iter().copied())
                .collect();

            if addresses.is_empty() {
                tracing::debug!(tag = %tag, "No devices carry tag, omitting locality");
                continue;
            }

            let weight = resolve_weight(tag);
            tracing::debug!(tag = %tag, addresses = addresses.len(), weight, "Built locality");
            localities.push(Locality {
                tag: tag.clone(),
                weight,
                addresses,
            });
        }

        Ok(EndpointAssignment {
            cluster_name: self.envoy.cluster_name.clone(),
            localities,
        })
    }
}
