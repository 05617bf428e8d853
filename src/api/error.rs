use crate::{auth::AuthError, context};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

/// Body of every error response.
#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status_code: u16,
    /// `[<transaction uuid>] - <reason>`
    pub message: String,
    pub error: String,
}

impl AuthError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Conflict => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials | Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Directory(_) | Self::Hashing(_) | Self::Signing(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let reason = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("[{}] - {:?}", context::current_or_none(), self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        error_response(status, &reason)
    }
}

/// Build the JSON error response tagged with the current transaction uuid.
pub fn error_response(status: StatusCode, reason: &str) -> Response {
    let body = ErrorBody {
        status_code: status.as_u16(),
        message: format!("[{}] - {}", context::current_or_none(), reason),
        error: status.canonical_reason().unwrap_or("Error").to_string(),
    };

    (status, Json(body)).into_response()
}
