mod geocode;

use std::sync::Arc;

use axum::{
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use geocoder_core::{EngineRecord, QueryError};
use geocoder_engine::{EngineError, FailureKind, Resolve};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::request_id;

/// Response header naming the failure kind on non-2xx `/geocode` responses.
pub const ERROR_KIND_HEADER: &str = "x-geocode-error-kind";

#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<dyn Resolve>,
}

impl AppState {
    pub fn new(resolver: Arc<dyn Resolve>) -> Self {
        Self { resolver }
    }
}

/// Everything that can go wrong in one `/geocode` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidRequest,
    ResolutionTimeout,
    ResolutionEngineFailure,
    MalformedEngineOutput,
}

impl ErrorKind {
    #[must_use]
    pub fn status(self) -> StatusCode {
        match self {
            Self::InvalidRequest => StatusCode::BAD_REQUEST,
            Self::ResolutionTimeout
            | Self::ResolutionEngineFailure
            | Self::MalformedEngineOutput => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidRequest => "InvalidRequest",
            Self::ResolutionTimeout => FailureKind::ResolutionTimeout.as_str(),
            Self::ResolutionEngineFailure => FailureKind::ResolutionEngineFailure.as_str(),
            Self::MalformedEngineOutput => FailureKind::MalformedEngineOutput.as_str(),
        }
    }
}

impl From<FailureKind> for ErrorKind {
    fn from(kind: FailureKind) -> Self {
        match kind {
            FailureKind::ResolutionTimeout => Self::ResolutionTimeout,
            FailureKind::ResolutionEngineFailure => Self::ResolutionEngineFailure,
            FailureKind::MalformedEngineOutput => Self::MalformedEngineOutput,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SuccessEnvelope {
    success: bool,
    result: Option<EngineRecord>,
}

#[derive(Debug, Serialize)]
pub struct FailureEnvelope {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip)]
    kind: ErrorKind,
}

/// Body of every `/geocode` response: exactly one of success or failure.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ResponseEnvelope {
    Success(SuccessEnvelope),
    Failure(FailureEnvelope),
}

impl ResponseEnvelope {
    pub fn success(result: Option<EngineRecord>) -> Self {
        Self::Success(SuccessEnvelope {
            success: true,
            result,
        })
    }

    pub fn invalid_request(error: &QueryError) -> Self {
        Self::Failure(FailureEnvelope {
            success: false,
            error: error.to_string(),
            message: None,
            kind: ErrorKind::InvalidRequest,
        })
    }

    pub fn engine_failure(error: &EngineError) -> Self {
        Self::Failure(FailureEnvelope {
            success: false,
            error: "Geocoding failed".to_string(),
            message: Some(error.diagnostic()),
            kind: error.kind().into(),
        })
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Success(_) => StatusCode::OK,
            Self::Failure(f) => f.kind.status(),
        }
    }
}

impl IntoResponse for ResponseEnvelope {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let kind = match &self {
            Self::Success(_) => None,
            Self::Failure(f) => Some(f.kind),
        };
        let mut response = (status, Json(self)).into_response();
        if let Some(kind) = kind {
            response.headers_mut().insert(
                ERROR_KIND_HEADER,
                HeaderValue::from_static(kind.as_str()),
            );
        }
        response
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-request-id")])
        .expose_headers([
            HeaderName::from_static("x-request-id"),
            HeaderName::from_static(ERROR_KIND_HEADER),
        ])
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/geocode", post(geocode::geocode))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

/// Liveness only; never touches the engine.
async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthData { status: "ok" }))
}

#[cfg(test)]
#[path = "../api_test.rs"]
mod tests;
