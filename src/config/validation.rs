//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, ports valid)
//! - Reject duplicate discovery tags and node ids
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ControlPlaneConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ControlPlaneConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("invalid socket address for {field}: {value}")]
    Address { field: &'static str, value: String },

    #[error("invalid registry URL '{0}'")]
    RegistryUrl(String),

    #[error("duplicate discovery tag '{0}'")]
    DuplicateTag(String),

    #[error("duplicate node id '{0}'")]
    DuplicateNode(String),

    #[error("request timeout ({request}s) must exceed the discovery hold timeout ({hold}s)")]
    HoldExceedsRequestTimeout { hold: u64, request: u64 },

    #[error("envoy.xds_request_timeout_secs ({proxy}s) must exceed the discovery hold timeout ({hold}s)")]
    HoldExceedsProxyTimeout { hold: u64, proxy: u64 },
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ControlPlaneConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::Address {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::Address {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if url::Url::parse(&config.registry.api_base_url).is_err() {
        errors.push(ValidationError::RegistryUrl(config.registry.api_base_url.clone()));
    }
    if config.registry.tailnet.is_empty() {
        errors.push(ValidationError::Empty { field: "registry.tailnet" });
    }
    if config.registry.api_token.is_empty() {
        errors.push(ValidationError::Empty { field: "registry.api_token" });
    }
    if config.registry.timeout_secs == 0 {
        errors.push(ValidationError::Zero { field: "registry.timeout_secs" });
    }
    if config.reconcile.poll_interval_secs == 0 {
        errors.push(ValidationError::Zero { field: "reconcile.poll_interval_secs" });
    }

    if config.discovery.node_ids.is_empty() {
        errors.push(ValidationError::Empty { field: "discovery.node_ids" });
    }
    let mut nodes = HashSet::new();
    for node in &config.discovery.node_ids {
        if node.is_empty() {
            errors.push(ValidationError::Empty { field: "discovery.node_ids[]" });
        } else if !nodes.insert(node.as_str()) {
            errors.push(ValidationError::DuplicateNode(node.clone()));
        }
    }
    errors.extend(validate_tags(&config.discovery.tags));

    if config.listener.request_timeout_secs <= config.discovery.hold_timeout_secs {
        errors.push(ValidationError::HoldExceedsRequestTimeout {
            hold: config.discovery.hold_timeout_secs,
            request: config.listener.request_timeout_secs,
        });
    }

    let envoy = &config.envoy;
    for (field, value) in [
        ("envoy.cluster_name", &envoy.cluster_name),
        ("envoy.listener_name", &envoy.listener_name),
        ("envoy.route_name", &envoy.route_name),
        ("envoy.xds_cluster_name", &envoy.xds_cluster_name),
    ] {
        if value.is_empty() {
            errors.push(ValidationError::Empty { field });
        }
    }
    if envoy.listener_port == 0 {
        errors.push(ValidationError::Zero { field: "envoy.listener_port" });
    }
    if envoy.endpoint_port == 0 {
        errors.push(ValidationError::Zero { field: "envoy.endpoint_port" });
    }
    if envoy.xds_refresh_delay_secs == 0 {
        errors.push(ValidationError::Zero { field: "envoy.xds_refresh_delay_secs" });
    }
    if envoy.xds_request_timeout_secs == 0 {
        errors.push(ValidationError::Zero { field: "envoy.xds_request_timeout_secs" });
    } else if config.discovery.hold_timeout_secs >= envoy.xds_request_timeout_secs {
        errors.push(ValidationError::HoldExceedsProxyTimeout {
            hold: config.discovery.hold_timeout_secs,
            proxy: envoy.xds_request_timeout_secs,
        });
    }

    let hc = &config.health_check;
    if hc.interval_secs == 0 {
        errors.push(ValidationError::Zero { field: "health_check.interval_secs" });
    }
    if hc.timeout_secs == 0 {
        errors.push(ValidationError::Zero { field: "health_check.timeout_secs" });
    }
    if hc.unhealthy_threshold == 0 {
        errors.push(ValidationError::Zero { field: "health_check.unhealthy_threshold" });
    }
    if hc.healthy_threshold == 0 {
        errors.push(ValidationError::Zero { field: "health_check.healthy_threshold" });
    }

    if config.admin.enabled && config.admin.api_key.is_empty() {
        errors.push(ValidationError::Empty { field: "admin.api_key" });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Tag list checks, shared with the hot-reload path.
pub fn validate_tags(tags: &[String]) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();
    for tag in tags {
        if tag.is_empty() {
            errors.push(ValidationError::Empty { field: "discovery.tags[]" });
        } else if !seen.insert(tag.as_str()) {
            errors.push(ValidationError::DuplicateTag(tag.clone()));
        }
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> ControlPlaneConfig {
        let mut config = ControlPlaneConfig::default();
        config.registry.tailnet = "example.com".into();
        config.registry.api_token = "tskey-api-test".into();
        config.discovery.tags = vec!["weight-1".into(), "weight-2".into()];
        config
    }

    #[test]
    fn test_valid_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = valid_config();
        config.registry.tailnet.clear();
        config.reconcile.poll_interval_secs = 0;
        config.listener.bind_address = "not-an-address".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::Empty { field: "registry.tailnet" }));
        assert!(errors.contains(&ValidationError::Zero { field: "reconcile.poll_interval_secs" }));
    }

    #[test]
    fn test_duplicate_tag_rejected() {
        let mut config = valid_config();
        config.discovery.tags.push("weight-1".into());

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::DuplicateTag("weight-1".into())]);
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let mut config = valid_config();
        config.discovery.node_ids = vec!["a".into(), "a".into()];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::DuplicateNode("a".into())]);
    }

    #[test]
    fn test_hold_must_fit_request_timeout() {
        let mut config = valid_config();
        config.discovery.hold_timeout_secs = 60;
        config.listener.request_timeout_secs = 60;

        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::HoldExceedsRequestTimeout { .. }));
    }

    #[test]
    fn test_hold_must_fit_proxy_request_timeout() {
        let mut config = valid_config();
        config.discovery.hold_timeout_secs = 5;
        config.envoy.xds_request_timeout_secs = 5;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::HoldExceedsProxyTimeout { hold: 5, proxy: 5 }]
        );

        config.envoy.xds_request_timeout_secs = 10;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_xds_cluster_name_required() {
        let mut config = valid_config();
        config.envoy.xds_cluster_name.clear();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::Empty { field: "envoy.xds_cluster_name" }]);
    }

    #[test]
    fn test_empty_tag_list_is_allowed() {
        let mut config = valid_config();
        config.discovery.tags.clear();
        assert!(validate_config(&config).is_ok());
    }
}
