//! Organization directory service.
//!
//! Mirrors member records from an HR directory, joins them to local
//! identities by normalized email, and serves the result over HTTP. A
//! background scheduler keeps the published snapshot fresh.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod server;
pub mod settings;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Public OpenAPI surface used by tooling.
pub use doc::ApiDoc;
pub use middleware::Trace;
