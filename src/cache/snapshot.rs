//! Immutable, versioned resource snapshots.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use thiserror::Error;

use crate::topology::{EndpointAssignment, Resource, ResourceType, StaticResources};

/// Errors detected while assembling a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("endpoint assignment targets cluster '{assigned}' but the snapshot defines '{defined}'")]
    UnknownCluster { assigned: String, defined: String },

    #[error("locality tag '{0}' appears more than once")]
    DuplicateLocality(String),

    #[error("snapshot version must be at least 1")]
    ZeroVersion,
}

/// A complete, immutable set of resources served to one node.
///
/// There is no mutable access once built; a new topology always means a new
/// snapshot value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    version: u64,
    resources: BTreeMap<ResourceType, Vec<Resource>>,
    #[serde(skip)]
    assignment: EndpointAssignment,
}

impl Snapshot {
    /// Assemble a snapshot from static resources and a fresh assignment.
    pub fn new(
        version: u64,
        statics: &StaticResources,
        assignment: EndpointAssignment,
        endpoint_port: u16,
    ) -> Result<Self, SnapshotError> {
        if version == 0 {
            return Err(SnapshotError::ZeroVersion);
        }
        if assignment.cluster_name != statics.cluster_name() {
            return Err(SnapshotError::UnknownCluster {
                assigned: assignment.cluster_name.clone(),
                defined: statics.cluster_name().to_string(),
            });
        }
        let mut tags = HashSet::new();
        for locality in &assignment.localities {
            if !tags.insert(locality.tag.as_str()) {
                return Err(SnapshotError::DuplicateLocality(locality.tag.clone()));
            }
        }

        let mut resources: BTreeMap<ResourceType, Vec<Resource>> = BTreeMap::new();
        for resource in statics.to_resources() {
            resources.entry(resource.resource_type()).or_default().push(resource);
        }
        resources.insert(
            ResourceType::Endpoint,
            vec![Resource::Endpoint(assignment.to_load_assignment(endpoint_port))],
        );

        Ok(Self {
            version,
            resources,
            assignment,
        })
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// The version as sent on the wire (`version_info`).
    pub fn version_info(&self) -> String {
        self.version.to_string()
    }

    /// All resources of one type, in insertion order.
    pub fn resources(&self, resource_type: ResourceType) -> &[Resource] {
        self.resources
            .get(&resource_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The endpoint assignment this snapshot was built from.
    pub fn assignment(&self) -> &EndpointAssignment {
        &self.assignment
    }
}
