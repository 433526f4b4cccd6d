//! Error responses for the HTTP API.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use crucible::ExecuteError;

/// Error returned by the synchronous execution endpoint.
///
/// Every variant serializes as `{"error": text}` with a non-2xx status.
#[derive(Debug)]
pub enum ApiError {
    /// The request itself was malformed: empty code, empty or unknown
    /// language. Rejected before any side effect.
    BadRequest(String),

    /// The program was started but did not succeed: non-zero exit,
    /// standard-error output, or a deadline kill. Carries the captured
    /// stderr text where available.
    ExecutionFailed(String),

    /// The server could not run the program at all: workspace write or
    /// process spawn failure.
    Internal(String),
}

impl From<ExecuteError> for ApiError {
    fn from(e: ExecuteError) -> Self {
        match e {
            ExecuteError::EmptyCode
            | ExecuteError::EmptyLanguage
            | ExecuteError::UnsupportedLanguage(_) => Self::BadRequest(e.to_string()),
            ExecuteError::Workspace(_) | ExecuteError::Process(_) => {
                Self::Internal(e.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::ExecutionFailed(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
            Self::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
