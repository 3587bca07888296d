//! Local identity service outbound adapter.

mod dto;
mod http_source;

pub use http_source::IdentityHttpSource;
