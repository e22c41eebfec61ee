//! Prometheus metrics for the admission and conversion webhooks
//!
//! # Exported metrics
//! - `vertica_admission_requests_total` (counter): admission requests labeled by
//!   kind, operation and whether the request was allowed.
//! - `vertica_conversion_requests_total` (counter): conversion requests labeled
//!   by kind and result (`success` or an error reason).

use std::sync::atomic::AtomicU64;

use once_cell::sync::Lazy;
use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;

/// Labels for admission requests
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct AdmissionLabels {
    pub kind: String,
    /// CREATE, UPDATE or DELETE
    pub operation: String,
    pub allowed: String,
}

/// Labels for conversion requests
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ConversionLabels {
    pub kind: String,
    pub result: String,
}

pub static ADMISSION_REQUESTS_TOTAL: Lazy<Family<AdmissionLabels, Counter<u64, AtomicU64>>> =
    Lazy::new(Family::default);

pub static CONVERSION_REQUESTS_TOTAL: Lazy<Family<ConversionLabels, Counter<u64, AtomicU64>>> =
    Lazy::new(Family::default);

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let mut registry = Registry::default();

    registry.register(
        "vertica_admission_requests",
        "Total number of admission requests",
        ADMISSION_REQUESTS_TOTAL.clone(),
    );
    registry.register(
        "vertica_conversion_requests",
        "Total number of conversion requests",
        CONVERSION_REQUESTS_TOTAL.clone(),
    );

    registry
});

pub fn inc_admission_request(kind: &str, operation: &str, allowed: bool) {
    let labels = AdmissionLabels {
        kind: kind.to_string(),
        operation: operation.to_string(),
        allowed: allowed.to_string(),
    };
    ADMISSION_REQUESTS_TOTAL.get_or_create(&labels).inc();
}

/// `result` is `success` or the error reason
pub fn inc_conversion_request(kind: &str, result: &str) {
    let labels = ConversionLabels {
        kind: kind.to_string(),
        result: result.to_string(),
    };
    CONVERSION_REQUESTS_TOTAL.get_or_create(&labels).inc();
}

/// Renders the registry in the OpenMetrics text format
pub fn render() -> Result<String, std::fmt::Error> {
    let mut buffer = String::new();
    encode(&mut buffer, &REGISTRY)?;
    Ok(buffer)
}
