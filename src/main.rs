mod auth;
mod classify;
mod config;
mod error;
mod handlers;
mod junos;
mod models;
mod netbox;
mod reconcile;
mod router;
mod scheduler;
mod sync;
#[cfg(test)]
mod testing;
mod utils;

use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;
use junos::JunosSource;
use models::SyncRequest;
use netbox::NetBoxClient;
use scheduler::SyncScheduler;
use sync::{SyncOptions, Syncer};

/// Application state shared across handlers
pub struct AppState {
    pub config: Config,
    pub syncer: Arc<Syncer>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "junos_netbox_sync=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let cfg = Config::load();
    cfg.validate()?;
    if cfg.api_token.is_empty() {
        tracing::warn!("API_TOKEN not set - the sync API is unauthenticated");
    }
    tracing::info!("Starting junos-netbox-sync");
    tracing::info!("NetBox: {}", cfg.netbox_url);
    tracing::info!("Sites: {}", if cfg.sites.is_empty() { "(none)".to_string() } else { cfg.sites.join(", ") });
    tracing::info!("Listen: {}", cfg.listen_addr);

    // Collaborators
    let netbox = NetBoxClient::new(cfg.netbox_url.clone(), cfg.netbox_token.clone(), cfg.netbox_timeout_secs)?;
    if !netbox.test_connection().await {
        tracing::warn!("NetBox at {} is not reachable yet", cfg.netbox_url);
    }
    let device = JunosSource::new(
        cfg.device_user.clone(),
        cfg.device_pass.clone(),
        cfg.netconf_port,
        cfg.netconf_timeout_secs,
        cfg.internet_instance.clone(),
    );

    let syncer = Arc::new(Syncer::new(
        Arc::new(device),
        Arc::new(netbox),
        SyncOptions::from_config(&cfg)?,
    ));

    // Initial run
    if cfg.sync_on_start && !cfg.sites.is_empty() {
        let syncer = syncer.clone();
        let sites = cfg.sites.clone();
        tokio::spawn(async move {
            syncer.run_all(&sites, &SyncRequest::default(), "startup").await;
        });
    }

    // Start scheduler
    let mut scheduler = match &cfg.sync_schedule {
        Some(schedule) => {
            let mut scheduler = SyncScheduler::new(syncer.clone(), cfg.sites.clone(), schedule.clone());
            scheduler.start()?;
            Some(scheduler)
        }
        None => {
            tracing::info!("SYNC_SCHEDULE not set - scheduled sync disabled");
            None
        }
    };

    // Create app state
    let state = Arc::new(AppState {
        config: cfg.clone(),
        syncer,
    });

    // Build router
    let app = router::build(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&cfg.listen_addr).await?;
    tracing::info!("junos-netbox-sync listening on {}", cfg.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(scheduler) = scheduler.as_mut() {
        scheduler.stop();
    }
    tracing::info!("junos-netbox-sync shutting down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
