//! Mutating admission: defaulting expressed as a JSON patch

use json_patch::Patch;
use serde_json::Value;
use tracing::{debug, info};

use crate::admission::AdmissionPipeline;
use crate::crd::ResourceKind;
use crate::error::Result;

/// Returns the patch that takes `object` to its defaulted form, or None when
/// defaulting changes nothing
pub fn default_patch(
    pipeline: &AdmissionPipeline,
    kind: ResourceKind,
    object: &Value,
) -> Result<Option<Patch>> {
    let defaulted = pipeline.apply_defaults(kind, object.clone())?;
    let patch = json_patch::diff(object, &defaulted);
    if patch.0.is_empty() {
        debug!(%kind, "Defaulting produced no changes");
        return Ok(None);
    }
    info!(%kind, operations = patch.0.len(), "Applied defaults");
    Ok(Some(patch))
}
