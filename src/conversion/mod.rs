//! Schema version conversion
//!
//! Each multi-version kind has a typed [`Converter`] between its legacy and
//! current shapes. [`VersionConverter`] wraps those for the conversion webhook,
//! which only ever sees untyped JSON.

mod autoscaler;
mod database;

pub use autoscaler::AutoscalerConverter;
pub use database::DatabaseConverter;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::crd::{split_api_version, ResourceKind, GROUP};
use crate::error::{Error, Result};

/// Maps one kind between its legacy (`L`) and current (`C`) representations
pub trait Converter<L, C> {
    /// Legacy to current. Total over well-formed input.
    fn to_current(&self, legacy: &L) -> C;

    /// Current to legacy. May refuse with [`Error::UnsupportedConversion`].
    fn to_legacy(&self, current: &C) -> Result<L>;

    /// Converts `legacy` into the hub version
    fn convert_to(&self, legacy: &L) -> Result<C> {
        Ok(self.to_current(legacy))
    }

    /// Fills a legacy object from the hub version
    fn convert_from(&self, current: &C) -> Result<L> {
        self.to_legacy(current)
    }
}

/// Untyped conversion used by the conversion webhook and the CLI
pub trait VersionConverter: Send + Sync {
    fn kind(&self) -> ResourceKind;

    /// Converts a whole object (with `apiVersion` and `kind`) to
    /// `desired_api_version`. Returns the input unchanged if it is already in
    /// that version.
    fn convert(&self, object: Value, desired_api_version: &str) -> Result<Value>;
}

/// Shared driver for the typed converters: picks a direction from the
/// object's apiVersion and round-trips through the typed shapes.
pub(crate) fn convert_value<L, C, K>(
    converter: &K,
    kind: ResourceKind,
    legacy_version: &str,
    current_version: &str,
    object: Value,
    desired_api_version: &str,
) -> Result<Value>
where
    K: Converter<L, C>,
    L: DeserializeOwned + Serialize,
    C: DeserializeOwned + Serialize,
{
    let from = object
        .get("apiVersion")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let from_version = served_version(kind, &from)?;
    let to_version = served_version(kind, desired_api_version)?;

    if from_version == to_version {
        debug!(%kind, version = from_version, "Object already in desired version");
        return Ok(object);
    }

    let converted = if from_version == legacy_version && to_version == current_version {
        let legacy: L = serde_json::from_value(object)?;
        serde_json::to_value(converter.convert_to(&legacy)?)?
    } else if from_version == current_version && to_version == legacy_version {
        let current: C = serde_json::from_value(object)?;
        serde_json::to_value(converter.convert_from(&current)?)?
    } else {
        return Err(Error::unsupported_conversion(
            kind.as_str(),
            from.as_str(),
            desired_api_version,
        ));
    };

    info!(%kind, from = %from, to = desired_api_version, "Converted object");
    Ok(converted)
}

/// Checks the group and returns the version part
fn served_version(kind: ResourceKind, api_version: &str) -> Result<&str> {
    match split_api_version(api_version) {
        (GROUP, version) if !version.is_empty() => Ok(version),
        _ => Err(Error::UnknownVersion {
            kind: kind.as_str().to_string(),
            api_version: api_version.to_string(),
        }),
    }
}
