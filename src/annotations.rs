//! Typed access to fields carried in `metadata.annotations`
//!
//! Some fields exist natively in only one schema version. The other version
//! carries them as annotations so that conversion loses nothing. The raw
//! string map is only touched here; everything else works with
//! [`DatabaseExtensions`] and [`AutoscalerExtensions`].
//!
//! Decoding is lossy on purpose: a value that fails to parse falls back to the
//! field default and is reported as a [`RecoveredField`], which admission turns
//! into a warning. It is never an error.

use std::collections::BTreeMap;
use std::fmt;

use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscalerBehavior;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::crd::v1::{
    CustomAutoscalerSpec, HPASpec, MetricDefinition, ScaleTrigger, ScaledObjectSpec,
};

pub type Annotations = BTreeMap<String, String>;

pub const PREFIX: &str = "vertica.com/";

pub const K_SAFETY: &str = "vertica.com/k-safety";
pub const REQUEUE_TIME: &str = "vertica.com/requeue-time";
pub const UPGRADE_REQUEUE_TIME: &str = "vertica.com/upgrade-requeue-time";
pub const RESTART_TIMEOUT: &str = "vertica.com/restart-timeout";
pub const IGNORE_CLUSTER_LEASE: &str = "vertica.com/ignore-cluster-lease";
pub const IGNORE_UPGRADE_PATH: &str = "vertica.com/ignore-upgrade-path";
pub const INCLUDE_UID_IN_PATH: &str = "vertica.com/include-uid-in-path";
pub const SSH_SECRET: &str = "vertica.com/ssh-secret";

/// Records which version an object was converted from
pub const API_CONVERSION: &str = "vertica.com/api-conversion";

pub const VAS_CUSTOM_AUTOSCALER_TYPE: &str = "vertica.com/vas-custom-autoscaler-type";
pub const VAS_HPA_MIN_REPLICAS: &str = "vertica.com/vas-hpa-min-replicas";
pub const VAS_HPA_MAX_REPLICAS: &str = "vertica.com/vas-hpa-max-replicas";
pub const VAS_HPA_METRICS: &str = "vertica.com/vas-hpa-metrics";
pub const VAS_HPA_BEHAVIOR: &str = "vertica.com/vas-hpa-behavior";
pub const VAS_SO_MIN_REPLICAS: &str = "vertica.com/vas-so-min-replicas";
pub const VAS_SO_MAX_REPLICAS: &str = "vertica.com/vas-so-max-replicas";
pub const VAS_SO_POLLING_INTERVAL: &str = "vertica.com/vas-so-polling-interval";
pub const VAS_SO_COOLDOWN_PERIOD: &str = "vertica.com/vas-so-cooldown-period";
pub const VAS_SO_METRICS: &str = "vertica.com/vas-so-metrics";
pub const VAS_SO_BEHAVIOR: &str = "vertica.com/vas-so-behavior";

pub const VAS_KEYS: [&str; 11] = [
    VAS_CUSTOM_AUTOSCALER_TYPE,
    VAS_HPA_MIN_REPLICAS,
    VAS_HPA_MAX_REPLICAS,
    VAS_HPA_METRICS,
    VAS_HPA_BEHAVIOR,
    VAS_SO_MIN_REPLICAS,
    VAS_SO_MAX_REPLICAS,
    VAS_SO_POLLING_INTERVAL,
    VAS_SO_COOLDOWN_PERIOD,
    VAS_SO_METRICS,
    VAS_SO_BEHAVIOR,
];

pub const DEFAULT_K_SAFETY: &str = "1";

/// An annotation whose value could not be parsed and was replaced by the
/// field default
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecoveredField {
    pub key: String,
    pub value: String,
    pub reason: String,
}

impl fmt::Display for RecoveredField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "annotation {}={:?} could not be parsed ({}); the default was used",
            self.key, self.value, self.reason
        )
    }
}

/// Result of decoding: the typed value plus whatever had to be recovered
#[derive(Clone, Debug, PartialEq)]
pub struct Decoded<T> {
    pub value: T,
    pub recovered: Vec<RecoveredField>,
}

/// Reads annotations, collecting recoveries as it goes
struct Reader<'a> {
    annotations: &'a Annotations,
    recovered: Vec<RecoveredField>,
}

impl<'a> Reader<'a> {
    fn new(annotations: &'a Annotations) -> Self {
        Self {
            annotations,
            recovered: Vec::new(),
        }
    }

    fn string(&self, key: &str) -> Option<String> {
        self.annotations.get(key).cloned()
    }

    fn parse_with<T>(
        &mut self,
        key: &str,
        parse: impl FnOnce(&str) -> Result<T, String>,
    ) -> Option<T> {
        let raw = self.annotations.get(key)?;
        match parse(raw.trim()) {
            Ok(v) => Some(v),
            Err(reason) => {
                warn!(key, value = %raw, %reason, "Falling back to default for unparsable annotation");
                self.recovered.push(RecoveredField {
                    key: key.to_string(),
                    value: raw.clone(),
                    reason,
                });
                None
            }
        }
    }

    fn int(&mut self, key: &str) -> Option<i32> {
        self.parse_with(key, |s| s.parse::<i32>().map_err(|e| e.to_string()))
    }

    fn bool(&mut self, key: &str) -> Option<bool> {
        self.parse_with(key, parse_bool)
    }

    fn json<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        self.parse_with(key, |s| serde_json::from_str(s).map_err(|e| e.to_string()))
    }
}

/// Accepts the spellings Kubernetes tooling commonly writes for booleans
pub fn parse_bool(s: &str) -> Result<bool, String> {
    match s {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        other => Err(format!("invalid boolean {other:?}")),
    }
}

fn set_or_remove(annotations: &mut Annotations, key: &str, value: Option<String>) {
    match value {
        Some(v) => {
            annotations.insert(key.to_string(), v);
        }
        None => {
            annotations.remove(key);
        }
    }
}

fn non_default<T: PartialEq + Default + ToString>(v: &T) -> Option<String> {
    (*v != T::default()).then(|| v.to_string())
}

fn to_json<T: Serialize>(v: &T) -> Option<String> {
    serde_json::to_string(v).ok()
}

/// VerticaDB fields that only the legacy version has a native slot for
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatabaseExtensions {
    /// Kept as text so admission can reject values other than "0" and "1"
    pub k_safety: String,
    pub requeue_time: i32,
    pub upgrade_requeue_time: i32,
    pub restart_timeout: i32,
    pub ignore_cluster_lease: bool,
    pub ignore_upgrade_path: bool,
    pub include_uid_in_path: bool,
    pub ssh_secret: String,
}

impl Default for DatabaseExtensions {
    fn default() -> Self {
        Self {
            k_safety: DEFAULT_K_SAFETY.to_string(),
            requeue_time: 0,
            upgrade_requeue_time: 0,
            restart_timeout: 0,
            ignore_cluster_lease: false,
            ignore_upgrade_path: false,
            include_uid_in_path: false,
            ssh_secret: String::new(),
        }
    }
}

impl DatabaseExtensions {
    pub fn decode(annotations: &Annotations) -> Decoded<Self> {
        let mut r = Reader::new(annotations);
        let defaults = Self::default();
        let value = Self {
            k_safety: r.string(K_SAFETY).unwrap_or(defaults.k_safety),
            requeue_time: r.int(REQUEUE_TIME).unwrap_or(defaults.requeue_time),
            upgrade_requeue_time: r
                .int(UPGRADE_REQUEUE_TIME)
                .unwrap_or(defaults.upgrade_requeue_time),
            restart_timeout: r.int(RESTART_TIMEOUT).unwrap_or(defaults.restart_timeout),
            ignore_cluster_lease: r
                .bool(IGNORE_CLUSTER_LEASE)
                .unwrap_or(defaults.ignore_cluster_lease),
            ignore_upgrade_path: r
                .bool(IGNORE_UPGRADE_PATH)
                .unwrap_or(defaults.ignore_upgrade_path),
            include_uid_in_path: r
                .bool(INCLUDE_UID_IN_PATH)
                .unwrap_or(defaults.include_uid_in_path),
            ssh_secret: r.string(SSH_SECRET).unwrap_or(defaults.ssh_secret),
        };
        Decoded {
            value,
            recovered: r.recovered,
        }
    }

    /// Writes non-default values and drops keys that hold the default
    pub fn encode_into(&self, annotations: &mut Annotations) {
        let k_safety = (self.k_safety != DEFAULT_K_SAFETY).then(|| self.k_safety.clone());
        set_or_remove(annotations, K_SAFETY, k_safety);
        set_or_remove(annotations, REQUEUE_TIME, non_default(&self.requeue_time));
        set_or_remove(
            annotations,
            UPGRADE_REQUEUE_TIME,
            non_default(&self.upgrade_requeue_time),
        );
        set_or_remove(annotations, RESTART_TIMEOUT, non_default(&self.restart_timeout));
        set_or_remove(
            annotations,
            IGNORE_CLUSTER_LEASE,
            non_default(&self.ignore_cluster_lease),
        );
        set_or_remove(
            annotations,
            IGNORE_UPGRADE_PATH,
            non_default(&self.ignore_upgrade_path),
        );
        set_or_remove(
            annotations,
            INCLUDE_UID_IN_PATH,
            non_default(&self.include_uid_in_path),
        );
        set_or_remove(annotations, SSH_SECRET, non_default(&self.ssh_secret));
    }
}

/// The current-only `customAutoscaler` block, flattened for the legacy shape
///
/// A block that exists always writes its type key, and each sub-policy that
/// exists always writes its marker key (`hpa-max-replicas`, `so-metrics`), so
/// an empty block survives the trip.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AutoscalerExtensions {
    pub custom_autoscaler: Option<CustomAutoscalerSpec>,
}

impl AutoscalerExtensions {
    pub fn decode(annotations: &Annotations) -> Decoded<Self> {
        let mut r = Reader::new(annotations);
        let has_block = VAS_KEYS.iter().any(|k| annotations.contains_key(*k));
        if !has_block {
            return Decoded {
                value: Self::default(),
                recovered: Vec::new(),
            };
        }

        let hpa = annotations.contains_key(VAS_HPA_MAX_REPLICAS).then(|| HPASpec {
            min_replicas: r.int(VAS_HPA_MIN_REPLICAS),
            max_replicas: r.int(VAS_HPA_MAX_REPLICAS).unwrap_or_default(),
            metrics: r
                .json::<Vec<MetricDefinition>>(VAS_HPA_METRICS)
                .unwrap_or_default(),
            behavior: r.json::<HorizontalPodAutoscalerBehavior>(VAS_HPA_BEHAVIOR),
        });

        let scaled_object = annotations.contains_key(VAS_SO_METRICS).then(|| ScaledObjectSpec {
            min_replicas: r.int(VAS_SO_MIN_REPLICAS),
            max_replicas: r.int(VAS_SO_MAX_REPLICAS),
            polling_interval: r.int(VAS_SO_POLLING_INTERVAL),
            cooldown_period: r.int(VAS_SO_COOLDOWN_PERIOD),
            metrics: r.json::<Vec<ScaleTrigger>>(VAS_SO_METRICS).unwrap_or_default(),
            behavior: r.json::<HorizontalPodAutoscalerBehavior>(VAS_SO_BEHAVIOR),
        });

        let value = Self {
            custom_autoscaler: Some(CustomAutoscalerSpec {
                type_: r.string(VAS_CUSTOM_AUTOSCALER_TYPE).unwrap_or_default(),
                hpa,
                scaled_object,
            }),
        };
        Decoded {
            value,
            recovered: r.recovered,
        }
    }

    pub fn encode_into(&self, annotations: &mut Annotations) {
        Self::clear(annotations);
        let Some(ca) = &self.custom_autoscaler else {
            return;
        };
        annotations.insert(VAS_CUSTOM_AUTOSCALER_TYPE.to_string(), ca.type_.clone());

        if let Some(hpa) = &ca.hpa {
            set_or_remove(
                annotations,
                VAS_HPA_MIN_REPLICAS,
                hpa.min_replicas.map(|v| v.to_string()),
            );
            annotations.insert(VAS_HPA_MAX_REPLICAS.to_string(), hpa.max_replicas.to_string());
            if !hpa.metrics.is_empty() {
                set_or_remove(annotations, VAS_HPA_METRICS, to_json(&hpa.metrics));
            }
            set_or_remove(
                annotations,
                VAS_HPA_BEHAVIOR,
                hpa.behavior.as_ref().and_then(to_json),
            );
        }

        if let Some(so) = &ca.scaled_object {
            set_or_remove(
                annotations,
                VAS_SO_MIN_REPLICAS,
                so.min_replicas.map(|v| v.to_string()),
            );
            set_or_remove(
                annotations,
                VAS_SO_MAX_REPLICAS,
                so.max_replicas.map(|v| v.to_string()),
            );
            set_or_remove(
                annotations,
                VAS_SO_POLLING_INTERVAL,
                so.polling_interval.map(|v| v.to_string()),
            );
            set_or_remove(
                annotations,
                VAS_SO_COOLDOWN_PERIOD,
                so.cooldown_period.map(|v| v.to_string()),
            );
            set_or_remove(annotations, VAS_SO_METRICS, to_json(&so.metrics));
            set_or_remove(
                annotations,
                VAS_SO_BEHAVIOR,
                so.behavior.as_ref().and_then(to_json),
            );
        }
    }

    /// Removes every `vas-*` key
    pub fn clear(annotations: &mut Annotations) {
        for key in VAS_KEYS {
            annotations.remove(key);
        }
    }
}
