//! Service entry-point: loads settings, starts the refresh scheduler, and
//! serves the directory API until interrupted.

use std::io;
use std::sync::Arc;

use actix_web::web;
use mockable::{Clock, DefaultClock, DefaultEnv};
use ortho_config::OrthoConfig;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use org_directory::domain::{
    CredentialsStore, RefreshHandle, RefreshScheduler, RefreshTrigger, SnapshotStore,
    Synchronizer, SynchronizerPorts, TokioRefreshTimer,
};
use org_directory::inbound::http::HttpState;
use org_directory::inbound::http::health::HealthState;
use org_directory::outbound::directory::DirectoryHttpSource;
use org_directory::outbound::identity::IdentityHttpSource;
use org_directory::server::{ServerConfig, create_server};
use org_directory::settings::DirectorySettings;

/// Application bootstrap.
#[actix_web::main]
async fn main() -> io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = DirectorySettings::load()
        .map_err(|e| io::Error::other(format!("failed to load configuration: {e}")))?;
    let timeout = settings.request_timeout().map_err(io::Error::other)?;
    let directory = DirectoryHttpSource::new(
        settings.directory_base_url().map_err(io::Error::other)?,
        timeout,
    )
    .map_err(io::Error::other)?;
    let identities = IdentityHttpSource::new(
        settings.identity_base_url().map_err(io::Error::other)?,
        settings.identity_token(),
        timeout,
    )
    .map_err(io::Error::other)?;

    let snapshots = Arc::new(SnapshotStore::new());
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let timer = TokioRefreshTimer::new();
    let synchronizer = Arc::new(Synchronizer::new(
        SynchronizerPorts {
            directory: Arc::new(directory),
            identities: Arc::new(identities),
            snapshots: Arc::clone(&snapshots),
            credentials: Arc::new(CredentialsStore::default()),
            timer: Arc::new(timer.clone()),
            clock: Arc::clone(&clock),
        },
        settings.synchronizer_config().map_err(io::Error::other)?,
    ));

    let cancel = CancellationToken::new();
    let (handle, scheduler) = RefreshScheduler::spawn(synchronizer, timer, cancel.clone());
    handle.configuration_changed(settings.credentials(&DefaultEnv::new()));
    #[cfg(unix)]
    spawn_reload_listener(handle.clone(), cancel)?;

    let health_state = web::Data::new(HealthState::new());
    let http_state = web::Data::new(HttpState::new(
        snapshots,
        Arc::new(handle.clone()),
        clock,
    ));
    let server = create_server(
        health_state.clone(),
        http_state,
        ServerConfig::new(settings.bind_addr().map_err(io::Error::other)?),
    )?;
    info!("directory service listening");

    let result = server.await;
    health_state.mark_unhealthy();
    handle.shutdown();
    if let Err(error) = scheduler.await {
        warn!(%error, "refresh scheduler ended abnormally");
    }
    result
}

/// Re-read configuration on `SIGHUP` and report credential changes.
#[cfg(unix)]
fn spawn_reload_listener(handle: RefreshHandle, cancel: CancellationToken) -> io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangup = signal(SignalKind::hangup())?;
    tokio::spawn(async move {
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                received = hangup.recv() => {
                    if received.is_none() {
                        break;
                    }
                    reload_credentials(&handle);
                }
            }
        }
    });
    Ok(())
}

#[cfg(unix)]
fn reload_credentials(handle: &RefreshHandle) {
    match DirectorySettings::load() {
        Ok(settings) => {
            let credentials = settings.credentials(&DefaultEnv::new());
            let triggered = handle.configuration_changed(credentials);
            info!(triggered, "configuration reloaded");
        }
        Err(error) => {
            warn!(%error, "configuration reload failed; keeping current credentials");
        }
    }
}
