//! Admission state machine and the request-level entry point

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, instrument};

use super::registry::SchemeRegistry;
use super::{
    annotations_of, display_name, Admissible, AdmissionContext, AdmissionError, AdmissionInput,
    Operation, Verdict,
};
use crate::crd::ResourceKind;
use crate::error::{Error, Result};
use crate::validation::FieldErrorList;

/// States a request moves through. Only the last two are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    Received,
    Defaulted,
    StructurallyChecked,
    ConsistencyChecked,
    ImmutabilityChecked,
    Accepted,
    Rejected,
}

impl Stage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Accepted | Stage::Rejected)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Received => "Received",
            Stage::Defaulted => "Defaulted",
            Stage::StructurallyChecked => "StructurallyChecked",
            Stage::ConsistencyChecked => "ConsistencyChecked",
            Stage::ImmutabilityChecked => "ImmutabilityChecked",
            Stage::Accepted => "Accepted",
            Stage::Rejected => "Rejected",
        };
        f.write_str(s)
    }
}

struct Trace {
    kind: &'static str,
    name: String,
    stages: Vec<Stage>,
}

impl Trace {
    fn enter(&mut self, stage: Stage, found: usize) {
        debug!(kind = self.kind, name = %self.name, %stage, errors = found, "Admission stage");
        self.stages.push(stage);
    }
}

/// Drives one typed request from Received to a terminal stage
pub(crate) fn run<K: Admissible>(
    operation: Operation,
    object: Option<K>,
    old: Option<K>,
    mut warnings: Vec<String>,
    ctx: &AdmissionContext,
) -> Verdict {
    let name = object
        .as_ref()
        .or(old.as_ref())
        .map(display_name)
        .unwrap_or_default();
    let mut trace = Trace {
        kind: K::KIND.as_str(),
        name,
        stages: Vec::new(),
    };
    trace.enter(Stage::Received, 0);

    // Deletes are never checked
    let Some(mut object) = object.filter(|_| operation != Operation::Delete) else {
        trace.enter(Stage::Accepted, 0);
        info!(kind = trace.kind, name = %trace.name, %operation, "Admission accepted");
        return Verdict {
            warnings,
            error: None,
            stages: trace.stages,
        };
    };

    object.apply_defaults();
    trace.enter(Stage::Defaulted, 0);

    let mut errors = FieldErrorList::new();
    errors.append(object.check_structure(ctx));
    trace.enter(Stage::StructurallyChecked, errors.len());

    errors.append(object.check_consistency());
    trace.enter(Stage::ConsistencyChecked, errors.len());

    if operation == Operation::Update {
        if let Some(mut old) = old {
            // The stored object was defaulted when it was admitted
            old.apply_defaults();
            errors.append(object.check_immutable(&old));
            trace.enter(Stage::ImmutabilityChecked, errors.len());
        }
    }

    warnings.extend(object.advisories());
    warnings.extend(object.recovered_fields().iter().map(ToString::to_string));

    if errors.is_empty() {
        trace.enter(Stage::Accepted, 0);
        info!(kind = trace.kind, name = %trace.name, %operation, warnings = warnings.len(), "Admission accepted");
        Verdict {
            warnings,
            error: None,
            stages: trace.stages,
        }
    } else {
        trace.enter(Stage::Rejected, errors.len());
        info!(kind = trace.kind, name = %trace.name, %operation, errors = errors.len(), "Admission rejected");
        Verdict {
            warnings,
            error: Some(AdmissionError {
                kind: K::KIND,
                name: trace.name.clone(),
                errors,
            }),
            stages: trace.stages,
        }
    }
}

/// A request as it arrives, in whatever served version the client used
#[derive(Clone, Debug)]
pub struct AdmissionRequest {
    pub kind: ResourceKind,
    pub operation: Operation,
    pub object: Option<Value>,
    pub old_object: Option<Value>,
}

/// Entry point for admission and conversion, backed by a [`SchemeRegistry`]
#[derive(Clone)]
pub struct AdmissionPipeline {
    registry: Arc<SchemeRegistry>,
}

impl AdmissionPipeline {
    pub fn new(registry: Arc<SchemeRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &SchemeRegistry {
        &self.registry
    }

    /// Converts any legacy-version documents to the hub, then runs the
    /// kind's handler
    #[instrument(skip(self, request), fields(kind = %request.kind, operation = %request.operation))]
    pub fn admit(&self, request: AdmissionRequest) -> Result<Verdict> {
        let kind = request.kind;
        let handler = self.registry.handler(kind)?;
        let mut warnings = Vec::new();

        let object = match request.object {
            Some(object) => {
                let (hub, notes) = self.to_hub(kind, object)?;
                warnings.extend(notes);
                Some(hub)
            }
            None => None,
        };
        // Warnings only describe the incoming object
        let old_object = match request.old_object {
            Some(old) => Some(self.to_hub(kind, old)?.0),
            None => None,
        };

        let ctx = AdmissionContext {
            now: self.registry.now(),
            served_db_api_versions: self.registry.served_api_versions(ResourceKind::VerticaDB),
        };
        handler.review(
            AdmissionInput {
                operation: request.operation,
                object,
                old_object,
                warnings,
            },
            &ctx,
        )
    }

    /// Defaults an object in its hub version. Objects in any other version
    /// are returned unchanged.
    pub fn apply_defaults(&self, kind: ResourceKind, object: Value) -> Result<Value> {
        let hub = self.registry.hub_api_version(kind)?;
        if api_version_of(&object) != hub {
            debug!(%kind, api_version = api_version_of(&object), "Skipping defaults for non-hub version");
            return Ok(object);
        }
        self.registry.handler(kind)?.apply_defaults(object)
    }

    /// Converts a whole object to `desired_api_version`
    pub fn convert(&self, object: Value, desired_api_version: &str) -> Result<Value> {
        let kind: ResourceKind = object
            .get("kind")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .parse()?;
        if api_version_of(&object) == desired_api_version {
            return Ok(object);
        }
        let converter = self.registry.converter(kind).ok_or_else(|| {
            Error::unsupported_conversion(kind.as_str(), api_version_of(&object), desired_api_version)
        })?;
        converter.convert(object, desired_api_version)
    }

    /// Brings an object to the hub version, collecting the warnings that a
    /// legacy document earns on the way
    fn to_hub(&self, kind: ResourceKind, object: Value) -> Result<(Value, Vec<String>)> {
        let hub = self.registry.hub_api_version(kind)?;
        let api_version = api_version_of(&object).to_string();
        if api_version.is_empty() || api_version == hub {
            return Ok((object, Vec::new()));
        }
        if !self.registry.is_served(kind, &api_version) {
            return Err(Error::UnknownVersion {
                kind: kind.as_str().to_string(),
                api_version,
            });
        }

        let mut warnings = vec![format!("{api_version} {kind} is deprecated, use {hub} {kind}")];
        let handler = self.registry.handler(kind)?;
        warnings.extend(
            handler
                .recovered_legacy_fields(&annotations_of(&object))
                .iter()
                .map(ToString::to_string),
        );

        let converted = self.convert(object, &hub)?;
        debug!(%kind, from = %api_version, to = %hub, "Converted request object to hub version");
        Ok((converted, warnings))
    }
}

fn api_version_of(object: &Value) -> &str {
    object
        .get("apiVersion")
        .and_then(Value::as_str)
        .unwrap_or_default()
}
