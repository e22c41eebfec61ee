//! Which kinds exist, which versions they are served in and who handles them

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::{AdmissionHandler, TypedHandler};
use crate::conversion::{AutoscalerConverter, DatabaseConverter, VersionConverter};
use crate::crd::{v1, v1beta1, ResourceKind, GROUP};
use crate::error::{Error, Result};

/// Source of "now" for rules that compare against the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always reports the same instant
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

struct KindEntry {
    /// Served versions, hub first
    versions: Vec<&'static str>,
    handler: Box<dyn AdmissionHandler>,
    converter: Option<Box<dyn VersionConverter>>,
}

/// Built once at startup and shared read-only by every request
pub struct SchemeRegistry {
    kinds: BTreeMap<ResourceKind, KindEntry>,
    clock: Box<dyn Clock>,
}

impl SchemeRegistry {
    /// An empty registry
    pub fn empty(clock: Box<dyn Clock>) -> Self {
        Self {
            kinds: BTreeMap::new(),
            clock,
        }
    }

    /// Every kind this crate knows, on the system clock
    pub fn new() -> Self {
        Self::with_clock(Box::new(SystemClock))
    }

    /// Every kind this crate knows, on the given clock
    pub fn with_clock(clock: Box<dyn Clock>) -> Self {
        let mut registry = Self::empty(clock);
        registry.register(
            vec![v1::VERSION, v1beta1::VERSION],
            Box::new(TypedHandler::<v1::VerticaDB>::new()),
            Some(Box::new(DatabaseConverter)),
        );
        registry.register(
            vec![v1::VERSION, v1beta1::VERSION],
            Box::new(TypedHandler::<v1::VerticaAutoscaler>::new()),
            Some(Box::new(AutoscalerConverter)),
        );
        registry.register(
            vec![v1beta1::VERSION],
            Box::new(TypedHandler::<v1beta1::EventTrigger>::new()),
            None,
        );
        registry.register(
            vec![v1beta1::VERSION],
            Box::new(TypedHandler::<v1beta1::VerticaRestorePointsQuery>::new()),
            None,
        );
        registry.register(
            vec![v1beta1::VERSION],
            Box::new(TypedHandler::<v1beta1::VerticaScrutinize>::new()),
            None,
        );
        registry.register(
            vec![v1beta1::VERSION],
            Box::new(TypedHandler::<v1beta1::VerticaReplicator>::new()),
            None,
        );
        registry
    }

    /// Adds or replaces a kind. The first version is the hub.
    pub fn register(
        &mut self,
        versions: Vec<&'static str>,
        handler: Box<dyn AdmissionHandler>,
        converter: Option<Box<dyn VersionConverter>>,
    ) {
        let kind = handler.kind();
        debug!(%kind, ?versions, "Registering kind");
        self.kinds.insert(
            kind,
            KindEntry {
                versions,
                handler,
                converter,
            },
        );
    }

    pub fn kinds(&self) -> impl Iterator<Item = ResourceKind> + '_ {
        self.kinds.keys().copied()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn entry(&self, kind: ResourceKind) -> Result<&KindEntry> {
        self.kinds
            .get(&kind)
            .ok_or_else(|| Error::UnknownKind(kind.as_str().to_string()))
    }

    pub fn handler(&self, kind: ResourceKind) -> Result<&dyn AdmissionHandler> {
        Ok(self.entry(kind)?.handler.as_ref())
    }

    /// None for single-version kinds
    pub fn converter(&self, kind: ResourceKind) -> Option<&dyn VersionConverter> {
        self.kinds.get(&kind)?.converter.as_deref()
    }

    /// Full `group/version` strings, hub first. Empty for unknown kinds.
    pub fn served_api_versions(&self, kind: ResourceKind) -> Vec<String> {
        self.kinds
            .get(&kind)
            .map(|e| e.versions.iter().map(|v| format!("{GROUP}/{v}")).collect())
            .unwrap_or_default()
    }

    pub fn hub_api_version(&self, kind: ResourceKind) -> Result<String> {
        let entry = self.entry(kind)?;
        entry
            .versions
            .first()
            .map(|v| format!("{GROUP}/{v}"))
            .ok_or_else(|| Error::Config(format!("{kind} is registered without versions")))
    }

    pub fn is_served(&self, kind: ResourceKind, api_version: &str) -> bool {
        self.served_api_versions(kind).iter().any(|v| v == api_version)
    }
}

impl Default for SchemeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
