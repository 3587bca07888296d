//! Notifications pushed by the local identity service.
//!
//! ```text
//! POST /hooks/identity-created {"user_agent":"Mozilla/5.0"}
//! X-Caller-User-Id: <id injected by the fronting proxy>
//! ```

use actix_web::{HttpRequest, HttpResponse, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::caller::require_caller;
use super::{ErrorBody, HttpState};
use crate::domain::{ApiResult, IdentityCreatedEvent};

/// Body of an identity-created notification.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct IdentityCreatedRequest {
    /// User agent of the request that created the identity. Empty or absent
    /// for system-originated creations, which do not trigger a refresh.
    #[serde(default)]
    pub user_agent: String,
}

/// Whether the notification triggered a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
pub struct HookAccepted {
    /// `false` when filtered out or a refresh was already pending.
    pub triggered: bool,
}

/// Report that a local identity was created.
#[utoipa::path(
    post,
    path = "/hooks/identity-created",
    request_body = IdentityCreatedRequest,
    params(
        ("X-Caller-User-Id" = String, Header, description = "Authenticated caller id")
    ),
    responses(
        (status = 202, description = "Notification accepted", body = HookAccepted),
        (status = 401, description = "Caller identity header missing", body = ErrorBody)
    ),
    tags = ["hooks"],
    operation_id = "identityCreated"
)]
#[post("/hooks/identity-created")]
pub async fn identity_created(
    request: HttpRequest,
    state: web::Data<HttpState>,
    payload: web::Json<IdentityCreatedRequest>,
) -> ApiResult<HttpResponse> {
    require_caller(&request)?;
    let event = IdentityCreatedEvent {
        user_agent: payload.into_inner().user_agent,
    };
    let triggered = state.refresh.identity_created(&event);
    Ok(HttpResponse::Accepted().json(HookAccepted { triggered }))
}
