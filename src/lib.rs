pub mod clock;
pub mod notifications;
pub mod schedule;
pub mod settings;
pub mod storage;
pub mod timer;
mod utils;

use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use log::info;

use clock::SystemClock;
use notifications::{LogNotifier, Notifier, Permission, RememberedPermission};
use settings::SettingsStore;
use storage::SqliteStore;
use timer::TimerController;

pub use utils::logging::init_logging;

pub const DATABASE_FILE: &str = "taskpact.sqlite3";
pub const SETTINGS_FILE: &str = "settings.json";

/// Everything the UI layer holds on to for the lifetime of the client.
pub struct AppState {
    pub timer: TimerController,
    pub settings: Arc<SettingsStore>,
    pub store: Arc<SqliteStore>,
}

impl AppState {
    /// Opens (or creates) the data directory and restores the last session.
    pub async fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let settings = Arc::new(SettingsStore::new(data_dir.join(SETTINGS_FILE))?);
        let current = settings.current();

        let store = Arc::new(
            SqliteStore::open(data_dir.join(DATABASE_FILE))
                .context("failed to open key/value store")?,
        );

        let notifier: Arc<dyn Notifier> = if current.notifications.enabled {
            Arc::new(RememberedPermission::new(
                LogNotifier::new(current.notifications.permission, Permission::Granted),
                settings.clone(),
            ))
        } else {
            Arc::new(LogNotifier::new(Permission::Denied, Permission::Denied))
        };

        let timer = TimerController::restore(
            Arc::new(SystemClock),
            store.clone(),
            notifier,
            &current.timer,
        )
        .await;

        info!("taskpact state ready in {}", data_dir.display());

        Ok(Self {
            timer,
            settings,
            store,
        })
    }
}
