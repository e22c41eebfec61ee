//! Wire types for the CRD conversion webhook
//!
//! The API server sends a `ConversionReview` with a batch of objects and the
//! apiVersion they should end up in. The response echoes the request uid.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const CONVERSION_REVIEW_API_VERSION: &str = "apiextensions.k8s.io/v1";
pub const CONVERSION_REVIEW_KIND: &str = "ConversionReview";

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConversionReview {
    pub api_version: String,
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<ConversionRequest>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ConversionResponse>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConversionRequest {
    pub uid: String,

    #[serde(rename = "desiredAPIVersion")]
    pub desired_api_version: String,

    #[serde(default)]
    pub objects: Vec<Value>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResponse {
    pub uid: String,

    #[serde(default)]
    pub converted_objects: Vec<Value>,

    pub result: ConversionResult,
}

/// Subset of `metav1.Status` the API server reads back
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    pub status: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl ConversionResponse {
    pub fn success(uid: impl Into<String>, converted_objects: Vec<Value>) -> Self {
        Self {
            uid: uid.into(),
            converted_objects,
            result: ConversionResult {
                status: "Success".to_string(),
                message: String::new(),
            },
        }
    }

    /// A failed batch converts nothing
    pub fn failure(uid: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            converted_objects: Vec::new(),
            result: ConversionResult {
                status: "Failure".to_string(),
                message: message.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.status == "Success"
    }

    pub fn into_review(self) -> ConversionReview {
        ConversionReview {
            api_version: CONVERSION_REVIEW_API_VERSION.to_string(),
            kind: CONVERSION_REVIEW_KIND.to_string(),
            request: None,
            response: Some(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_uses_api_server_field_names() {
        let review: ConversionReview = serde_json::from_value(json!({
            "apiVersion": "apiextensions.k8s.io/v1",
            "kind": "ConversionReview",
            "request": {
                "uid": "705ab4f5",
                "desiredAPIVersion": "vertica.com/v1",
                "objects": [{"kind": "VerticaDB"}]
            }
        }))
        .unwrap();
        let request = review.request.unwrap();
        assert_eq!(request.desired_api_version, "vertica.com/v1");
        assert_eq!(request.objects.len(), 1);
    }

    #[test]
    fn failure_response_shape() {
        let review = ConversionResponse::failure("abc", "boom").into_review();
        let value = serde_json::to_value(&review).unwrap();
        assert_eq!(value["response"]["uid"], json!("abc"));
        assert_eq!(value["response"]["result"]["status"], json!("Failure"));
        assert_eq!(value["response"]["convertedObjects"], json!([]));
        assert!(value.get("request").is_none());
    }
}
