//! Admission for every resource kind
//!
//! A request runs through defaulting, structural checks, consistency checks
//! and (on update) immutability checks. All violations are collected into a
//! single [`AdmissionError`]. Warnings never block.
//!
//! Each kind implements [`Admissible`] on its hub type. The registry stores
//! kinds behind the object-safe [`AdmissionHandler`], which works on untyped
//! JSON so that the webhook and the CLI never need to know the concrete type.

mod kinds;
mod pipeline;
mod registry;

pub use pipeline::{AdmissionPipeline, AdmissionRequest, Stage};
pub use registry::{Clock, FixedClock, SchemeRegistry, SystemClock};

use std::fmt;
use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use kube::Resource;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::annotations::{Annotations, RecoveredField};
use crate::crd::{ResourceKind, GROUP};
use crate::error::Result;
use crate::validation::FieldErrorList;

/// Operation carried by an admission request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "CREATE",
            Operation::Update => "UPDATE",
            Operation::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rejected request: every violation found, attributed to one object
#[derive(Clone, Debug, PartialEq)]
pub struct AdmissionError {
    pub kind: ResourceKind,
    pub name: String,
    pub errors: FieldErrorList,
}

impl fmt::Display for AdmissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} {:?} is invalid: {}",
            self.kind, GROUP, self.name, self.errors
        )
    }
}

impl std::error::Error for AdmissionError {}

/// Outcome of one admission request
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Verdict {
    pub warnings: Vec<String>,
    pub error: Option<AdmissionError>,
    /// Stages the request passed through, ending in Accepted or Rejected
    pub stages: Vec<Stage>,
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        self.error.is_none()
    }

    /// Rejection message as shown to the API client
    pub fn message(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }
}

/// Read-only facts a rule may need beyond the object itself
#[derive(Clone, Debug)]
pub struct AdmissionContext {
    pub now: DateTime<Utc>,
    /// Every `group/version` the VerticaDB kind is served under
    pub served_db_api_versions: Vec<String>,
}

/// Admission contract implemented by each kind's hub type
pub trait Admissible:
    Resource<DynamicType = ()> + Clone + DeserializeOwned + Serialize + Send + Sync + 'static
{
    const KIND: ResourceKind;

    /// Fills gaps. Never fails and is idempotent.
    fn apply_defaults(&mut self) {}

    fn check_structure(&self, ctx: &AdmissionContext) -> FieldErrorList;

    fn check_consistency(&self) -> FieldErrorList {
        FieldErrorList::new()
    }

    /// Compares against the previously accepted object
    fn check_immutable(&self, _old: &Self) -> FieldErrorList {
        FieldErrorList::new()
    }

    /// Advisory messages about fields that are accepted but discouraged
    fn advisories(&self) -> Vec<String> {
        Vec::new()
    }

    /// Side-channel values on the hub object that fell back to defaults
    fn recovered_fields(&self) -> Vec<RecoveredField> {
        Vec::new()
    }

    /// Side-channel values on a legacy object that will fall back to
    /// defaults once it is converted
    fn recovered_legacy_fields(_annotations: &Annotations) -> Vec<RecoveredField> {
        Vec::new()
    }
}

/// One admission request, untyped, already converted to the hub version
#[derive(Clone, Debug)]
pub struct AdmissionInput {
    pub operation: Operation,
    pub object: Option<Value>,
    pub old_object: Option<Value>,
    /// Warnings gathered before the handler runs, e.g. during conversion
    pub warnings: Vec<String>,
}

/// Object-safe handler stored in the [`SchemeRegistry`]
pub trait AdmissionHandler: Send + Sync {
    fn kind(&self) -> ResourceKind;

    /// Defaults a hub-version object
    fn apply_defaults(&self, object: Value) -> Result<Value>;

    fn review(&self, input: AdmissionInput, ctx: &AdmissionContext) -> Result<Verdict>;

    fn recovered_legacy_fields(&self, annotations: &Annotations) -> Vec<RecoveredField>;
}

/// Bridges an [`Admissible`] type to [`AdmissionHandler`]
pub struct TypedHandler<K>(PhantomData<fn() -> K>);

impl<K> TypedHandler<K> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<K> Default for TypedHandler<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Admissible> AdmissionHandler for TypedHandler<K> {
    fn kind(&self) -> ResourceKind {
        K::KIND
    }

    fn apply_defaults(&self, object: Value) -> Result<Value> {
        let mut typed: K = serde_json::from_value(object)?;
        typed.apply_defaults();
        Ok(serde_json::to_value(typed)?)
    }

    fn review(&self, input: AdmissionInput, ctx: &AdmissionContext) -> Result<Verdict> {
        let object = input.object.map(serde_json::from_value::<K>).transpose()?;
        let old = input.old_object.map(serde_json::from_value::<K>).transpose()?;
        Ok(pipeline::run(input.operation, object, old, input.warnings, ctx))
    }

    fn recovered_legacy_fields(&self, annotations: &Annotations) -> Vec<RecoveredField> {
        K::recovered_legacy_fields(annotations)
    }
}

/// Name used when reporting on an object; falls back to generateName
pub(crate) fn display_name<K: Resource>(object: &K) -> String {
    object
        .meta()
        .name
        .clone()
        .or_else(|| object.meta().generate_name.clone())
        .unwrap_or_default()
}

/// Annotations of an untyped object, empty when absent or malformed
pub(crate) fn annotations_of(object: &Value) -> Annotations {
    object
        .pointer("/metadata/annotations")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}
