//! Crate-wide error type
//!
//! Field-level admission violations are not errors in this sense; they are
//! collected into a [`crate::validation::FieldErrorList`] and surfaced through
//! [`crate::admission::AdmissionError`]. This type covers everything that aborts
//! an operation outright.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A conversion direction that has no mapping for the given kind
    #[error("conversion of {kind} from {from} to {to} is not implemented")]
    UnsupportedConversion {
        kind: String,
        from: String,
        to: String,
    },

    #[error("unknown resource kind: {0}")]
    UnknownKind(String),

    #[error("apiVersion {api_version} is not served for kind {kind}")]
    UnknownVersion { kind: String, api_version: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("webhook error: {0}")]
    Webhook(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn unsupported_conversion(
        kind: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Error::UnsupportedConversion {
            kind: kind.into(),
            from: from.into(),
            to: to.into(),
        }
    }

    /// Short machine-readable reason, used for metric labels and
    /// conversion failure statuses.
    pub fn reason(&self) -> &'static str {
        match self {
            Error::UnsupportedConversion { .. } => "UnsupportedConversion",
            Error::UnknownKind(_) => "UnknownKind",
            Error::UnknownVersion { .. } => "UnknownVersion",
            Error::Serialization(_) | Error::Yaml(_) => "BadRequest",
            Error::Io(_) => "IoError",
            Error::Config(_) => "ConfigError",
            Error::Webhook(_) => "WebhookError",
        }
    }
}
