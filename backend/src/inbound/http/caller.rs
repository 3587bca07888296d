//! Caller identification shared by the authenticated routes.
//!
//! The fronting proxy authenticates callers and forwards their id in
//! [`CALLER_ID_HEADER`]. Requests without it never reach a handler body.

use actix_web::HttpRequest;

use crate::domain::{ApiResult, DomainError};

/// Header the fronting proxy sets to the authenticated caller's id.
pub const CALLER_ID_HEADER: &str = "X-Caller-User-Id";

/// Reject requests that carry no caller id.
///
/// A blank or non-UTF-8 header counts as missing.
///
/// # Errors
///
/// Returns an unauthorized [`DomainError`] when the header is absent.
pub fn require_caller(request: &HttpRequest) -> ApiResult<()> {
    let present = request
        .headers()
        .get(CALLER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| !value.trim().is_empty());
    if present {
        Ok(())
    } else {
        Err(DomainError::unauthorized("Not authorized"))
    }
}
