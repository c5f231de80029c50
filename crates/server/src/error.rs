//! Application error handling

use axum::{
    Json,
    extract::{
        FromRequest, FromRequestParts,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use emr_core::{EmrError, Envelope};
use thiserror::Error;

/// Application error type.
///
/// Every variant renders as `{"success": false, "error": "..."}`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    /// The upstream FHIR server answered with a failure status
    #[error("{message}")]
    Upstream { status: StatusCode, message: String },

    /// The upstream could not be reached or answered garbage
    #[error("{0}")]
    BadGateway(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Upstream { status, .. } => *status,
            AppError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = %status.as_u16(), error = %self, "Request failed");
        } else {
            tracing::warn!(status = %status.as_u16(), error = %self, "Request rejected");
        }

        (status, Json(Envelope::error(self.to_string()))).into_response()
    }
}

impl From<EmrError> for AppError {
    fn from(err: EmrError) -> Self {
        match err {
            EmrError::NotFound(msg) => AppError::NotFound(msg),
            EmrError::Invalid(msg) => AppError::BadRequest(msg),
            EmrError::UnsupportedResource(name) => {
                AppError::NotFound(format!("Unsupported resource type: {name}"))
            }
            EmrError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<deadpool_postgres::PoolError> for AppError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        AppError::Internal(format!("Database pool error: {}", err))
    }
}

impl From<tokio_postgres::Error> for AppError {
    fn from(err: tokio_postgres::Error) -> Self {
        AppError::Internal(format!("Database error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("Serialization error: {}", err))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(format!("Invalid JSON body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(format!("Invalid query string: {}", rejection.body_text()))
    }
}

/// `Json` extractor whose rejection renders as the error envelope
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// `Query` extractor whose rejection renders as the error envelope
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_status_is_mirrored() {
        let err = AppError::Upstream {
            status: StatusCode::GONE,
            message: "deleted".into(),
        };
        assert_eq!(err.status(), StatusCode::GONE);
        assert_eq!(err.to_string(), "deleted");
    }

    #[test]
    fn unsupported_resource_is_not_found() {
        let err: AppError = EmrError::UnsupportedResource("Binary".into()).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        let err: AppError = EmrError::Invalid("bad".into()).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
