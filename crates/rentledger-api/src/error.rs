//! Error types for rentledger-api

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rentledger_core::error::{ErrorCategory, ErrorCode};
use rentledger_core::{CoreError, ErrorDetails};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {message}")]
    BadRequest { message: String },

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            message: message.into(),
        }
    }

    /// Body returned to the client
    pub fn details(&self) -> ErrorDetails {
        match self {
            ApiError::BadRequest { message } => ErrorDetails::new(
                ErrorCode::InvalidFormat,
                ErrorCategory::Validation,
                message.clone(),
            ),
            ApiError::Core(e) => e.to_details(),
        }
    }

    pub fn status(&self) -> StatusCode {
        status_for(self.details().code)
    }
}

/// HTTP status for an error code
pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::ValidationError
        | ErrorCode::InvalidDateRange
        | ErrorCode::DurationTooShort
        | ErrorCode::NonPositiveAmount
        | ErrorCode::InvalidFormat => StatusCode::BAD_REQUEST,
        ErrorCode::DuplicateEntry | ErrorCode::PeriodOverlap | ErrorCode::InvalidTransition => {
            StatusCode::CONFLICT
        }
        ErrorCode::AmountExceedsOutstanding => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorCode::IntegrationError => StatusCode::BAD_GATEWAY,
        ErrorCode::IoError | ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let details = self.details();
        let status = status_for(details.code);
        if status.is_server_error() {
            log::error!("{}", details);
        } else {
            log::debug!("Request rejected: {}", details);
        }
        (status, Json(details)).into_response()
    }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rentledger_core::ErrorSeverity;

    #[test]
    fn test_status_mapping() {
        let overlap = ApiError::from(CoreError::PeriodOverlap {
            unit: "UNIT-00001".into(),
            conflicting: "RC-00001".into(),
        });
        assert_eq!(overlap.status(), StatusCode::CONFLICT);

        let missing = ApiError::from(CoreError::not_found("Contract", "RC-00009"));
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        assert_eq!(ApiError::bad_request("bad date").status(), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorCode::IntegrationError), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_details_include_severity() {
        let missing = ApiError::from(CoreError::not_found("Payment", "PAY-00009")).details();
        assert_eq!(missing.severity, ErrorSeverity::Info);

        let bad = ApiError::bad_request("unknown range").details();
        assert_eq!(bad.code, ErrorCode::InvalidFormat);
        assert_eq!(bad.severity, ErrorSeverity::Warning);
    }
}
