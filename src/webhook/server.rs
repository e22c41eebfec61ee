//! Admission and conversion webhook server
//!
//! Routes:
//! - `POST /mutate/{kind}` defaults the object and answers with a JSON patch
//! - `POST /validate/{kind}` runs the admission pipeline
//! - `POST /convert` answers CRD `ConversionReview`s
//! - `GET /healthz`, `GET /readyz`, `GET /metrics`

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use axum_server::tls_rustls::RustlsConfig;
use kube::core::admission::{
    AdmissionRequest as KubeAdmissionRequest, AdmissionResponse, AdmissionReview,
    Operation as KubeOperation,
};
use kube::core::DynamicObject;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, instrument, warn};

use super::mutation::default_patch;
use super::types::{ConversionResponse, ConversionReview};
use crate::admission::{AdmissionPipeline, AdmissionRequest, Operation};
use crate::crd::ResourceKind;
use crate::error::{Error, Result};
use crate::metrics;

/// PEM files for serving over TLS
#[derive(Clone, Debug)]
pub struct TlsConfig {
    pub cert_path: String,
    pub key_path: String,
}

pub struct WebhookServer {
    pipeline: AdmissionPipeline,
    tls_config: Option<TlsConfig>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub kinds: usize,
}

impl WebhookServer {
    pub fn new(pipeline: AdmissionPipeline) -> Self {
        Self {
            pipeline,
            tls_config: None,
        }
    }

    pub fn with_tls(mut self, cert_path: String, key_path: String) -> Self {
        self.tls_config = Some(TlsConfig {
            cert_path,
            key_path,
        });
        self
    }

    pub fn router(self: Arc<Self>) -> Router {
        Router::new()
            .route("/healthz", get(health_handler))
            .route("/readyz", get(ready_handler))
            .route("/metrics", get(metrics_handler))
            .route("/mutate/{kind}", post(mutate_handler))
            .route("/validate/{kind}", post(validate_handler))
            .route("/convert", post(convert_handler))
            .layer(tower_http::trace::TraceLayer::new_for_http())
            .with_state(self)
    }

    pub async fn start(self, addr: SocketAddr) -> Result<()> {
        let tls = self.tls_config.clone();
        let app = Arc::new(self).router();

        match tls {
            Some(tls) => {
                info!("Starting webhook server on {} with TLS", addr);
                let config = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
                    .await
                    .map_err(|e| {
                        Error::Config(format!(
                            "loading TLS material from {} and {}: {e}",
                            tls.cert_path, tls.key_path
                        ))
                    })?;
                axum_server::bind_rustls(addr, config)
                    .serve(app.into_make_service())
                    .await
                    .map_err(|e| Error::Webhook(format!("Server error: {e}")))?;
            }
            None => {
                warn!("No TLS material configured, serving plain HTTP on {}", addr);
                let listener = tokio::net::TcpListener::bind(addr)
                    .await
                    .map_err(|e| Error::Webhook(format!("Failed to bind to {addr}: {e}")))?;
                axum::serve(listener, app)
                    .await
                    .map_err(|e| Error::Webhook(format!("Server error: {e}")))?;
            }
        }
        Ok(())
    }
}

// HTTP Handlers

async fn health_handler(State(state): State<Arc<WebhookServer>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        kinds: state.pipeline.registry().kinds().count(),
    })
}

async fn ready_handler(State(state): State<Arc<WebhookServer>>) -> impl IntoResponse {
    let kinds = state.pipeline.registry().kinds().count();
    if kinds == 0 {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "no kinds registered".to_string(),
                kinds,
            }),
        )
    } else {
        (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ready".to_string(),
                kinds,
            }),
        )
    }
}

async fn metrics_handler() -> impl IntoResponse {
    match metrics::render() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, String::new())
        }
    }
}

type Review = AdmissionReview<DynamicObject>;

/// Parses the review and the kind from the path. Errors are already
/// rendered as responses.
fn parse_review(
    kind: &str,
    review: Review,
) -> std::result::Result<(ResourceKind, KubeAdmissionRequest<DynamicObject>), (StatusCode, Json<Review>)> {
    let req: KubeAdmissionRequest<DynamicObject> = review.try_into().map_err(|e| {
        error!("Failed to parse admission request: {}", e);
        (
            StatusCode::BAD_REQUEST,
            Json(AdmissionResponse::invalid(format!("Invalid admission request: {e}")).into_review()),
        )
    })?;
    let kind = kind.parse::<ResourceKind>().map_err(|e| {
        warn!("Admission request for unknown kind: {}", e);
        (
            StatusCode::OK,
            Json(AdmissionResponse::from(&req).deny(e.to_string()).into_review()),
        )
    })?;
    Ok((kind, req))
}

fn operation_of(req: &KubeAdmissionRequest<DynamicObject>) -> Option<Operation> {
    match req.operation {
        KubeOperation::Create => Some(Operation::Create),
        KubeOperation::Update => Some(Operation::Update),
        KubeOperation::Delete => Some(Operation::Delete),
        KubeOperation::Connect => None,
    }
}

fn to_value(object: Option<&DynamicObject>) -> Result<Option<Value>> {
    Ok(object.map(serde_json::to_value).transpose()?)
}

#[instrument(skip(state, review))]
async fn validate_handler(
    State(state): State<Arc<WebhookServer>>,
    Path(kind): Path<String>,
    Json(review): Json<Review>,
) -> impl IntoResponse {
    let (kind, req) = match parse_review(&kind, review) {
        Ok(parsed) => parsed,
        Err(rejection) => return rejection,
    };
    let Some(operation) = operation_of(&req) else {
        return (StatusCode::OK, Json(AdmissionResponse::from(&req).into_review()));
    };

    let verdict = to_value(req.object.as_ref())
        .and_then(|object| Ok((object, to_value(req.old_object.as_ref())?)))
        .and_then(|(object, old_object)| {
            state.pipeline.admit(AdmissionRequest {
                kind,
                operation,
                object,
                old_object,
            })
        });

    let verdict = match verdict {
        Ok(verdict) => verdict,
        Err(e) => {
            error!(%kind, name = %req.name, "Admission failed: {}", e);
            metrics::inc_admission_request(kind.as_str(), operation.as_str(), false);
            let response = AdmissionResponse::from(&req).deny(format!("Admission failed: {e}"));
            return (StatusCode::OK, Json(response.into_review()));
        }
    };

    metrics::inc_admission_request(kind.as_str(), operation.as_str(), verdict.is_allowed());
    let mut response = match verdict.message() {
        None => AdmissionResponse::from(&req),
        Some(message) => AdmissionResponse::from(&req).deny(message),
    };
    if !verdict.warnings.is_empty() {
        response.warnings = Some(verdict.warnings);
    }
    (StatusCode::OK, Json(response.into_review()))
}

#[instrument(skip(state, review))]
async fn mutate_handler(
    State(state): State<Arc<WebhookServer>>,
    Path(kind): Path<String>,
    Json(review): Json<Review>,
) -> impl IntoResponse {
    let (kind, req) = match parse_review(&kind, review) {
        Ok(parsed) => parsed,
        Err(rejection) => return rejection,
    };
    let response = AdmissionResponse::from(&req);
    let object = match to_value(req.object.as_ref()) {
        Ok(Some(object)) => object,
        Ok(None) => return (StatusCode::OK, Json(response.into_review())),
        Err(e) => {
            error!("Failed to read object: {}", e);
            return (StatusCode::OK, Json(response.deny(format!("Mutation failed: {e}")).into_review()));
        }
    };

    let response = match default_patch(&state.pipeline, kind, &object) {
        Ok(Some(patch)) => match response.clone().with_patch(patch) {
            Ok(patched) => {
                info!(%kind, name = %req.name, "Applied defaults");
                patched
            }
            Err(e) => {
                error!("Failed to serialize patch: {}", e);
                response.deny(format!("Failed to serialize patch: {e}"))
            }
        },
        Ok(None) => response,
        Err(e) => {
            error!("Failed to apply defaults: {}", e);
            response.deny(format!("Mutation failed: {e}"))
        }
    };
    (StatusCode::OK, Json(response.into_review()))
}

#[instrument(skip(state, review))]
async fn convert_handler(
    State(state): State<Arc<WebhookServer>>,
    Json(review): Json<ConversionReview>,
) -> impl IntoResponse {
    let Some(request) = review.request else {
        error!("ConversionReview without a request");
        return (
            StatusCode::BAD_REQUEST,
            Json(ConversionResponse::failure("", "missing request").into_review()),
        );
    };

    let mut converted = Vec::with_capacity(request.objects.len());
    for object in request.objects {
        let kind = object
            .get("kind")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        match state.pipeline.convert(object, &request.desired_api_version) {
            Ok(object) => {
                metrics::inc_conversion_request(&kind, "success");
                converted.push(object);
            }
            Err(e) => {
                metrics::inc_conversion_request(&kind, e.reason());
                error!(%kind, desired = %request.desired_api_version, "Conversion failed: {}", e);
                let response = ConversionResponse::failure(request.uid, e.to_string());
                return (StatusCode::OK, Json(response.into_review()));
            }
        }
    }

    info!(objects = converted.len(), desired = %request.desired_api_version, "Converted objects");
    let response = ConversionResponse::success(request.uid, converted);
    (StatusCode::OK, Json(response.into_review()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::SchemeRegistry;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::json;
    use tower::ServiceExt;

    fn app() -> Router {
        let pipeline = AdmissionPipeline::new(Arc::new(SchemeRegistry::new()));
        Arc::new(WebhookServer::new(pipeline)).router()
    }

    async fn post(uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn database(api_version: &str, sizes: &[i32]) -> Value {
        let subclusters: Vec<Value> = sizes
            .iter()
            .enumerate()
            .map(|(i, size)| json!({"name": format!("sc{i}"), "size": size, "type": "primary"}))
            .collect();
        json!({
            "apiVersion": api_version,
            "kind": "VerticaDB",
            "metadata": {"name": "vertdb", "namespace": "default"},
            "spec": {
                "communal": {"path": "s3://bucket/db", "endpoint": "https://s3.amazonaws.com"},
                "subclusters": subclusters
            }
        })
    }

    fn review(operation: &str, object: Option<Value>, old: Option<Value>) -> Value {
        json!({
            "apiVersion": "admission.k8s.io/v1",
            "kind": "AdmissionReview",
            "request": {
                "uid": "0df28fbd-5f5f-11e8-bc74-36e6bb280816",
                "kind": {"group": "vertica.com", "version": "v1", "kind": "VerticaDB"},
                "resource": {"group": "vertica.com", "version": "v1", "resource": "verticadbs"},
                "name": "vertdb",
                "namespace": "default",
                "operation": operation,
                "userInfo": {"username": "admin"},
                "object": object,
                "oldObject": old,
                "dryRun": false
            }
        })
    }

    #[tokio::test]
    async fn valid_database_is_allowed() {
        let body = review("CREATE", Some(database("vertica.com/v1", &[3])), None);
        let (status, value) = post("/validate/verticadbs", body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["response"]["allowed"], json!(true), "{value}");
        assert_eq!(value["response"]["uid"], json!("0df28fbd-5f5f-11e8-bc74-36e6bb280816"));
    }

    #[tokio::test]
    async fn k_safety_violation_is_denied_with_every_path() {
        let mut object = database("vertica.com/v1", &[2, 2]);
        object["metadata"]["annotations"] = json!({"vertica.com/k-safety": "0"});
        object["spec"]["subclusters"][1]["type"] = json!("bogus");
        let (_, value) = post("/validate/VerticaDB", review("CREATE", Some(object), None)).await;
        assert_eq!(value["response"]["allowed"], json!(false));
        let message = value["response"]["status"]["message"].as_str().unwrap();
        assert!(message.contains("k-safety"), "{message}");
        assert!(message.contains("spec.subclusters[1].type"), "{message}");
    }

    #[tokio::test]
    async fn legacy_object_is_admitted_with_deprecation_warning() {
        let mut object = database("vertica.com/v1beta1", &[3]);
        object["spec"]["subclusters"][0] = json!({"name": "sc0", "size": 3, "isPrimary": true});
        let (_, value) = post("/validate/verticadbs", review("CREATE", Some(object), None)).await;
        assert_eq!(value["response"]["allowed"], json!(true), "{value}");
        let warnings = value["response"]["warnings"].as_array().unwrap();
        assert!(warnings
            .iter()
            .any(|w| w.as_str().unwrap().contains("v1beta1 VerticaDB is deprecated")));
    }

    #[tokio::test]
    async fn unknown_kind_is_denied() {
        let body = review("CREATE", Some(database("vertica.com/v1", &[3])), None);
        let (_, value) = post("/validate/widgets", body).await;
        assert_eq!(value["response"]["allowed"], json!(false));
    }

    #[tokio::test]
    async fn delete_is_always_allowed() {
        let body = review("DELETE", None, Some(database("vertica.com/v1", &[9])));
        let (_, value) = post("/validate/verticadbs", body).await;
        assert_eq!(value["response"]["allowed"], json!(true));
    }

    #[tokio::test]
    async fn mutate_returns_a_json_patch() {
        let body = review("CREATE", Some(database("vertica.com/v1", &[3])), None);
        let (_, value) = post("/mutate/verticadbs", body).await;
        assert_eq!(value["response"]["allowed"], json!(true));
        assert_eq!(value["response"]["patchType"], json!("JSONPatch"));
    }

    #[tokio::test]
    async fn convert_batches_legacy_autoscalers() {
        let body = json!({
            "apiVersion": "apiextensions.k8s.io/v1",
            "kind": "ConversionReview",
            "request": {
                "uid": "conv-1",
                "desiredAPIVersion": "vertica.com/v1",
                "objects": [{
                    "apiVersion": "vertica.com/v1beta1",
                    "kind": "VerticaAutoscaler",
                    "metadata": {"name": "vas"},
                    "spec": {"verticaDBName": "vertdb", "scalingGranularity": "Pod", "serviceName": "sc0"}
                }]
            }
        });
        let (_, value) = post("/convert", body).await;
        assert_eq!(value["response"]["result"]["status"], json!("Success"), "{value}");
        assert_eq!(
            value["response"]["convertedObjects"][0]["apiVersion"],
            json!("vertica.com/v1")
        );
    }

    #[tokio::test]
    async fn convert_database_down_fails() {
        let body = json!({
            "apiVersion": "apiextensions.k8s.io/v1",
            "kind": "ConversionReview",
            "request": {
                "uid": "conv-2",
                "desiredAPIVersion": "vertica.com/v1beta1",
                "objects": [database("vertica.com/v1", &[3])]
            }
        });
        let (_, value) = post("/convert", body).await;
        assert_eq!(value["response"]["result"]["status"], json!("Failure"));
        assert_eq!(value["response"]["uid"], json!("conv-2"));
    }

    #[tokio::test]
    async fn readiness_reports_registered_kinds() {
        let request = Request::builder().uri("/readyz").body(Body::empty()).unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
