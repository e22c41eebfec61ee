//! Webhook Module
//!
//! HTTP transport for the admission pipeline: mutating and validating
//! admission webhooks plus the CRD conversion webhook.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vertica_k8s_admission::admission::{AdmissionPipeline, SchemeRegistry};
//! use vertica_k8s_admission::webhook::WebhookServer;
//!
//! let pipeline = AdmissionPipeline::new(Arc::new(SchemeRegistry::new()));
//! WebhookServer::new(pipeline)
//!     .with_tls("tls.crt".into(), "tls.key".into())
//!     .start("0.0.0.0:9443".parse()?)
//!     .await?;
//! ```

pub mod mutation;
pub mod server;
pub mod types;

pub use mutation::default_patch;
pub use server::{HealthResponse, TlsConfig, WebhookServer};
pub use types::{ConversionRequest, ConversionResponse, ConversionResult, ConversionReview};
