pub mod api;
pub mod config;
pub mod forms;
pub mod models;
pub mod notify;
pub mod patient_store;
pub mod queue;
pub mod storage;

use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

use api::{ApiError, HttpQueueService};
use config::{keys, ClientConfig, ConfigError, ConfigOverrides};
use notify::Notifier;
use patient_store::PatientStore;
use queue::{NurseDashboard, QueueController};
use storage::{LocalStorage, SqliteStorage, StorageError};

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub fn run() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("CareQueue starting v{}", config::APP_VERSION);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start async runtime");
            return;
        }
    };
    if let Err(e) = runtime.block_on(run_station()) {
        tracing::error!(error = %e, "CareQueue stopped");
    }
}

/// Mount the nurse dashboard against the configured backend and keep it
/// live until Ctrl-C.
async fn run_station() -> Result<(), RunError> {
    let path = config::storage_path().ok_or(ConfigError::NoHomeDir)?;
    let storage: Arc<dyn LocalStorage> = Arc::new(SqliteStorage::open(&path)?);
    tracing::debug!(path = %path.display(), "Local storage open");

    let config = ClientConfig::resolve(&ConfigOverrides::from_env(), storage.as_ref())?;
    let token = storage.get(keys::ACCESS_TOKEN)?;

    let notifier = Notifier::new();
    tokio::spawn(log_toasts(notifier.clone()));

    let service = Arc::new(HttpQueueService::new(&config.api_base_url, token.clone())?);
    if !service.has_token() {
        tracing::warn!("No access token stored, requests will be anonymous");
    }
    tracing::info!(base_url = service.base_url(), "Staff API client ready");
    let store = Arc::new(Mutex::new(PatientStore::new(storage.clone())));
    let controller = Arc::new(QueueController::new(service, store, notifier));

    let dashboard = NurseDashboard::mount(controller, &config, token.as_deref()).await;
    let state = dashboard.controller().snapshot();
    tracing::info!(
        department = %state.department,
        waiting = state.queue.waiting_count(),
        open = state.queue_status.is_open,
        live_updates = dashboard.has_push(),
        "Dashboard ready"
    );
    if let Some(profile) = &state.profile {
        match serde_json::to_string(profile) {
            Ok(json) => storage.set(keys::USER, &json)?,
            Err(e) => tracing::warn!(error = %e, "Failed to cache staff profile"),
        }
    }
    if let Some(patient) = dashboard.controller().current_patient() {
        tracing::info!(patient_id = patient.id, patient = %patient.full_name, "Currently serving");
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    dashboard.unmount().await;
    Ok(())
}

async fn log_toasts(notifier: Notifier) {
    let mut toasts = notifier.subscribe();
    loop {
        match toasts.recv().await {
            Ok(toast) => tracing::info!(kind = ?toast.kind, "{}", toast.message),
            Err(RecvError::Lagged(skipped)) => tracing::warn!(skipped, "Toast log lagging"),
            Err(RecvError::Closed) => break,
        }
    }
}
