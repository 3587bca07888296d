//! HR directory outbound adapter.
//!
//! Implements the `DirectorySource` port against the Pingboard REST API.

mod dto;
mod http_source;

pub use http_source::DirectoryHttpSource;
