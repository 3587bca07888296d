//! HTTP mapping for [`DomainError`].
//!
//! Every error renders as `{"error": message}`. Internal messages are
//! replaced with a generic one before they leave the process.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

use crate::domain::{DomainError, ErrorCode, TraceId};

/// JSON envelope for failed requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Human-readable failure description.
    #[schema(example = "specify exactly one username")]
    pub error: String,
}

const fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ResponseError for DomainError {
    fn status_code(&self) -> StatusCode {
        status_for(self.code())
    }

    fn error_response(&self) -> HttpResponse {
        let message = if self.code() == ErrorCode::InternalError {
            if let Some(trace_id) = TraceId::current() {
                error!(%trace_id, error = %self, "request failed");
            } else {
                error!(error = %self, "request failed");
            }
            "Internal server error".to_owned()
        } else {
            self.message().to_owned()
        };
        HttpResponse::build(self.status_code()).json(ErrorBody { error: message })
    }
}
