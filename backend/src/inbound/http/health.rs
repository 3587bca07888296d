//! Liveness and readiness endpoints for the orchestrator.
//!
//! The service moves through three phases: [`Phase::Starting`] until the
//! listener is bound, [`Phase::Serving`] while traffic is accepted, and
//! [`Phase::Draining`] once shutdown begins. Draining is terminal.

use std::sync::atomic::{AtomicU8, Ordering};

use actix_web::{HttpResponse, get, http::header, web};
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;

/// Lifecycle phase reported by the health endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Listener not bound yet.
    Starting,
    /// Accepting traffic.
    Serving,
    /// Shutting down.
    Draining,
}

impl Phase {
    const fn to_bits(self) -> u8 {
        match self {
            Self::Starting => 0,
            Self::Serving => 1,
            Self::Draining => 2,
        }
    }

    const fn from_bits(bits: u8) -> Self {
        match bits {
            0 => Self::Starting,
            1 => Self::Serving,
            _ => Self::Draining,
        }
    }
}

/// Body of both health endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
pub struct HealthReport {
    /// Current lifecycle phase.
    pub phase: Phase,
}

/// Lifecycle shared between `main`, the server, and the health handlers.
#[derive(Debug)]
pub struct HealthState {
    phase: AtomicU8,
}

impl Default for HealthState {
    fn default() -> Self {
        Self {
            phase: AtomicU8::new(Phase::Starting.to_bits()),
        }
    }
}

impl HealthState {
    /// State in [`Phase::Starting`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        Phase::from_bits(self.phase.load(Ordering::Acquire))
    }

    /// Move from starting to serving. Has no effect once draining.
    pub fn mark_ready(&self) {
        if let Err(current) = self.phase.compare_exchange(
            Phase::Starting.to_bits(),
            Phase::Serving.to_bits(),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            debug!(phase = ?Phase::from_bits(current), "readiness change ignored");
        }
    }

    /// Enter the terminal draining phase.
    pub fn mark_unhealthy(&self) {
        self.phase.store(Phase::Draining.to_bits(), Ordering::Release);
    }

    /// Whether traffic should be routed here.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.phase() == Phase::Serving
    }

    /// Whether the process should be left running.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.phase() != Phase::Draining
    }
}

fn report(phase: Phase, healthy: bool) -> HttpResponse {
    let mut response = if healthy {
        HttpResponse::Ok()
    } else {
        HttpResponse::ServiceUnavailable()
    };
    response
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .json(HealthReport { phase })
}

/// Readiness: 200 while serving, 503 when starting or draining.
///
/// Readiness does not wait for the first directory snapshot; lookups before
/// it simply miss.
#[utoipa::path(
    get,
    path = "/health/ready",
    tags = ["health"],
    responses(
        (status = 200, description = "Accepting traffic", body = HealthReport),
        (status = 503, description = "Starting or draining", body = HealthReport)
    )
)]
#[get("/health/ready")]
pub async fn ready(state: web::Data<HealthState>) -> HttpResponse {
    let phase = state.phase();
    report(phase, phase == Phase::Serving)
}

/// Liveness: 200 until draining starts.
#[utoipa::path(
    get,
    path = "/health/live",
    tags = ["health"],
    responses(
        (status = 200, description = "Process is running", body = HealthReport),
        (status = 503, description = "Draining", body = HealthReport)
    )
)]
#[get("/health/live")]
pub async fn live(state: web::Data<HealthState>) -> HttpResponse {
    let phase = state.phase();
    report(phase, phase != Phase::Draining)
}
