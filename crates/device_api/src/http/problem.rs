use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::domain::{ErrorCategory, OutcomeError};
use serde::Serialize;
use tracing::{debug, error};

const PROBLEM_CONTENT_TYPE: &str = "application/problem+json";
const STATUS_REFERENCE: &str = "https://developer.mozilla.org/en-US/docs/Web/HTTP/Reference/Status";

/// Map a failure category to the HTTP status it is reported with
pub fn category_to_status(category: ErrorCategory) -> StatusCode {
    match category {
        ErrorCategory::Validation => StatusCode::BAD_REQUEST,
        ErrorCategory::NotFound => StatusCode::NOT_FOUND,
        ErrorCategory::Conflict => StatusCode::CONFLICT,
        ErrorCategory::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCategory::Forbidden => StatusCode::FORBIDDEN,
        ErrorCategory::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Problem details body returned for every failed request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    pub problem_type: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
}

impl From<&OutcomeError> for ProblemDetails {
    fn from(error: &OutcomeError) -> Self {
        let status = category_to_status(error.category).as_u16();
        Self {
            problem_type: format!("{}/{}", STATUS_REFERENCE, status),
            title: error.code.clone(),
            status,
            detail: error.message.clone(),
        }
    }
}

/// Failed outcome on its way out of a handler
#[derive(Debug)]
pub struct ApiError(pub OutcomeError);

impl From<OutcomeError> for ApiError {
    fn from(error: OutcomeError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let problem = ProblemDetails::from(&self.0);
        let status = category_to_status(self.0.category);

        if status.is_server_error() {
            error!(code = %self.0.code, status = status.as_u16(), "request failed");
        } else {
            debug!(code = %self.0.code, status = status.as_u16(), "request rejected");
        }

        (
            status,
            [(header::CONTENT_TYPE, PROBLEM_CONTENT_TYPE)],
            Json(problem),
        )
            .into_response()
    }
}
