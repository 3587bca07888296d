//! HTTP server configuration object.

use std::net::SocketAddr;

/// Settings for creating the HTTP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    bind_addr: SocketAddr,
    workers: Option<usize>,
}

impl ServerConfig {
    /// Bind to `bind_addr` with actix's default worker count.
    #[must_use]
    pub const fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            workers: None,
        }
    }

    /// Override the number of HTTP worker threads.
    #[must_use]
    pub const fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Worker thread override, if any.
    #[must_use]
    pub const fn workers(&self) -> Option<usize> {
        self.workers
    }

    /// Socket address the server will bind to.
    #[must_use]
    pub const fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}
