//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every HTTP endpoint of the inbound layer together
//! with the response schemas they reference. The document is served at
//! `/api-docs/openapi.json`.

use utoipa::OpenApi;

use crate::domain::ResolvedUser;
use crate::inbound::http::ErrorBody;
use crate::inbound::http::directory::{LookupResponse, NoMatch, UserResponse};
use crate::inbound::http::health::{HealthReport, Phase};
use crate::inbound::http::hooks::{HookAccepted, IdentityCreatedRequest};

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Org directory API",
        description = "Lookup of HR directory records joined to local identities."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::directory::get_user,
        crate::inbound::http::hooks::identity_created,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        ResolvedUser,
        UserResponse,
        NoMatch,
        LookupResponse,
        ErrorBody,
        IdentityCreatedRequest,
        HookAccepted,
        Phase,
        HealthReport
    )),
    tags(
        (name = "directory", description = "Directory lookups"),
        (name = "hooks", description = "Notifications from the identity service"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
