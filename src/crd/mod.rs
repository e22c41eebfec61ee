//! Custom Resource Definitions for the Vertica operator
//!
//! Two schema versions are served. `v1` is the hub that admission runs
//! against; `v1beta1` holds the legacy shapes plus the kinds that were never
//! promoted.

pub mod types;
pub mod v1;
pub mod v1beta1;

#[cfg(test)]
mod tests;

use std::fmt;
use std::str::FromStr;

use kube::core::crd::merge_crds;
use kube::CustomResourceExt;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;

pub use types::*;

use crate::error::{Error, Result};

/// Every resource kind handled by this crate
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    VerticaDB,
    VerticaAutoscaler,
    EventTrigger,
    VerticaRestorePointsQuery,
    VerticaScrutinize,
    VerticaReplicator,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 6] = [
        ResourceKind::VerticaDB,
        ResourceKind::VerticaAutoscaler,
        ResourceKind::EventTrigger,
        ResourceKind::VerticaRestorePointsQuery,
        ResourceKind::VerticaScrutinize,
        ResourceKind::VerticaReplicator,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::VerticaDB => "VerticaDB",
            ResourceKind::VerticaAutoscaler => "VerticaAutoscaler",
            ResourceKind::EventTrigger => "EventTrigger",
            ResourceKind::VerticaRestorePointsQuery => "VerticaRestorePointsQuery",
            ResourceKind::VerticaScrutinize => "VerticaScrutinize",
            ResourceKind::VerticaReplicator => "VerticaReplicator",
        }
    }

    /// Lowercase plural, as used in resource URLs and webhook paths
    pub fn plural(&self) -> &'static str {
        match self {
            ResourceKind::VerticaDB => "verticadbs",
            ResourceKind::VerticaAutoscaler => "verticaautoscalers",
            ResourceKind::EventTrigger => "eventtriggers",
            ResourceKind::VerticaRestorePointsQuery => "verticarestorepointsqueries",
            ResourceKind::VerticaScrutinize => "verticascrutinizers",
            ResourceKind::VerticaReplicator => "verticareplicators",
        }
    }

    /// The CRD for this kind, with every served version merged in
    pub fn crd(&self) -> Result<CustomResourceDefinition> {
        let merged = match self {
            ResourceKind::VerticaDB => {
                merge_crds(vec![v1::VerticaDB::crd(), v1beta1::VerticaDB::crd()], v1::VERSION)
            }
            ResourceKind::VerticaAutoscaler => merge_crds(
                vec![v1::VerticaAutoscaler::crd(), v1beta1::VerticaAutoscaler::crd()],
                v1::VERSION,
            ),
            ResourceKind::EventTrigger => return Ok(v1beta1::EventTrigger::crd()),
            ResourceKind::VerticaRestorePointsQuery => {
                return Ok(v1beta1::VerticaRestorePointsQuery::crd())
            }
            ResourceKind::VerticaScrutinize => return Ok(v1beta1::VerticaScrutinize::crd()),
            ResourceKind::VerticaReplicator => return Ok(v1beta1::VerticaReplicator::crd()),
        };
        merged.map_err(|e| Error::Config(format!("merging {} CRD versions: {e}", self)))
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = Error;

    /// Accepts the kind name in any case, or its plural form
    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s) || k.plural() == s)
            .ok_or_else(|| Error::UnknownKind(s.to_string()))
    }
}

/// Splits `group/version` into its parts. A bare version has an empty group.
pub fn split_api_version(api_version: &str) -> (&str, &str) {
    match api_version.rsplit_once('/') {
        Some((group, version)) => (group, version),
        None => ("", api_version),
    }
}
