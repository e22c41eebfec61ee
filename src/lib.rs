//! Vertica K8s admission: schema conversion and admission validation for the
//! Vertica operator's custom resources
//!
//! VerticaDB and VerticaAutoscaler are served in a legacy (`v1beta1`) and a
//! current (`v1`) schema version. This crate converts between them without
//! losing fields, and decides whether a proposed object is well-formed,
//! internally consistent and a legal transition from its previous state.

pub mod admission;
pub mod annotations;
pub mod conversion;
pub mod crd;
pub mod defaults;
pub mod error;
pub mod validation;

#[cfg(feature = "metrics")]
pub mod metrics;

#[cfg(feature = "admission-webhook")]
pub mod webhook;

pub use crate::error::{Error, Result};
