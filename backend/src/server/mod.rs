//! Server construction and middleware wiring.

mod config;

pub use config::ServerConfig;

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpResponse, HttpServer, web};
use utoipa::OpenApi;

use crate::doc::ApiDoc;
use crate::domain::{ApiResult, DomainError};
use crate::inbound::http::directory::get_user;
use crate::inbound::http::health::{HealthState, live, ready};
use crate::inbound::http::hooks::identity_created;
use crate::inbound::http::state::HttpState;
use crate::middleware::Trace;

/// Path the OpenAPI document is served under.
pub const OPENAPI_PATH: &str = "/api-docs/openapi.json";

/// Shared state handed to every worker's [`App`].
#[derive(Clone)]
pub struct AppDependencies {
    /// Lifecycle phase served by the health endpoints.
    pub health_state: web::Data<HealthState>,
    /// Handler dependencies.
    pub http_state: web::Data<HttpState>,
}

/// Assemble the application: routes, shared state, and tracing.
///
/// Unknown paths answer 404 with the usual error envelope.
pub fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        http_state,
    } = deps;

    App::new()
        .app_data(health_state)
        .app_data(http_state)
        .wrap(Trace)
        .service(get_user)
        .service(identity_created)
        .service(ready)
        .service(live)
        .route(OPENAPI_PATH, web::get().to(openapi_document))
        .default_service(web::to(unknown_route))
}

async fn openapi_document() -> HttpResponse {
    HttpResponse::Ok().json(ApiDoc::openapi())
}

async fn unknown_route() -> ApiResult<HttpResponse> {
    Err(DomainError::not_found("no such endpoint"))
}

/// Construct an Actix HTTP server using the provided state and configuration.
///
/// Marks `health_state` ready once the listener is bound.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let deps = AppDependencies {
        health_state: health_state.clone(),
        http_state,
    };
    let mut server = HttpServer::new(move || build_app(deps.clone()));
    if let Some(workers) = config.workers() {
        server = server.workers(workers);
    }
    let server = server.bind(config.bind_addr())?.run();

    health_state.mark_ready();
    Ok(server)
}
