//! HTTP inbound adapter: the directory query endpoint, the identity hook,
//! and health endpoints.

pub mod caller;
pub mod directory;
pub mod error;
pub mod health;
pub mod hooks;
pub mod state;

pub use caller::{CALLER_ID_HEADER, require_caller};
pub use error::ErrorBody;
pub use state::HttpState;
