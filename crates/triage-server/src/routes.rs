//! `/api/ml/*` handlers.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use tracing::warn;
use triage_ai::{ClassifyError, InferenceService};
use triage_core::PatientRequest;

use crate::state::{AppState, Readiness};

pub const NO_BODY: &str = "No JSON body provided";

/// Classification failure as seen by an HTTP client.
#[derive(Debug)]
pub enum ApiError {
    NoBody,
    NotReady,
    Classify(ClassifyError),
}

impl From<ClassifyError> for ApiError {
    fn from(err: ClassifyError) -> Self {
        Self::Classify(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NoBody => (StatusCode::BAD_REQUEST, NO_BODY.to_string()),
            Self::NotReady => (
                StatusCode::SERVICE_UNAVAILABLE,
                "model bundle not loaded".to_string(),
            ),
            Self::Classify(err) => {
                let status = match &err {
                    ClassifyError::Field(_) => StatusCode::BAD_REQUEST,
                    ClassifyError::UnknownCategory(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    ClassifyError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.to_string())
            }
        };
        if status.is_server_error() {
            warn!(%status, error = %message, "classification failed");
        }
        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}

fn ready_service(state: &AppState) -> Result<&InferenceService, ApiError> {
    match state.readiness() {
        Readiness::Ready(service) => Ok(service),
        Readiness::Loading | Readiness::Fatal(_) => Err(ApiError::NotReady),
    }
}

/// `POST /api/ml/classify`
pub async fn classify(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>, ApiError> {
    let service = ready_service(&state)?;

    let value: Value = match serde_json::from_slice(&body) {
        Ok(value @ Value::Object(_)) => value,
        _ => return Err(ApiError::NoBody),
    };
    let request: PatientRequest = serde_json::from_value(value).map_err(|_| ApiError::NoBody)?;

    let result = service.classify_request(&request)?;
    let mut doc = serde_json::to_value(&result).map_err(ClassifyError::from)?;
    if let Value::Object(map) = &mut doc {
        map.insert("success".into(), Value::Bool(true));
    }
    Ok(Json(doc))
}

/// `GET /api/ml/health`
pub async fn health(State(state): State<AppState>) -> Response {
    match state.readiness() {
        Readiness::Ready(service) => Json(json!({
            "status": "healthy",
            "model_info": service.health(),
            "loaded_at": service.bundle().loaded_at().to_rfc3339(),
        }))
        .into_response(),
        Readiness::Loading => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "loading" })),
        )
            .into_response(),
        Readiness::Fatal(error) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "fatal", "error": error })),
        )
            .into_response(),
    }
}

/// `GET /api/ml/metadata`
pub async fn metadata(State(state): State<AppState>) -> Result<Response, ApiError> {
    let service = ready_service(&state)?;
    Ok(Json(service.metadata().clone()).into_response())
}
