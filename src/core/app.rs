//! Wiring of store, remote, probe and the services built on them.

use crate::config::Config;
use crate::core::connectivity::{Connectivity, HttpProbe, LinkState};
use crate::core::engine::{SyncEngine, SyncSettings};
use crate::core::hybrid::HybridWriter;
use crate::core::palms::PalmCache;
use crate::core::retry::RetryPolicy;
use crate::core::status::{SyncCoordinator, TriggerTiming};
use crate::db::LocalStore;
use crate::errors::AppResult;
use crate::remote::{HttpRemote, RemoteService};
use std::sync::Arc;
use std::time::Duration;

pub struct Settings {
    pub sync: SyncSettings,
    pub timing: TriggerTiming,
    pub palm_page_size: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sync: SyncSettings::default(),
            timing: TriggerTiming::default(),
            palm_page_size: 1000,
        }
    }
}

impl From<&Config> for Settings {
    fn from(cfg: &Config) -> Self {
        Self {
            sync: SyncSettings {
                batch_size: cfg.batch_size,
                retry: RetryPolicy {
                    max_attempts: cfg.max_attempts,
                    base_delay: Duration::from_millis(cfg.base_delay_ms),
                },
            },
            timing: TriggerTiming {
                interval: Duration::from_secs(cfg.sync_interval_secs.max(1)),
                online_settle: Duration::from_millis(cfg.online_settle_ms),
                visibility_settle: Duration::from_millis(cfg.visibility_settle_ms),
            },
            palm_page_size: cfg.palm_page_size,
        }
    }
}

pub struct FieldSync {
    pub store: Arc<LocalStore>,
    pub coordinator: Arc<SyncCoordinator>,
    pub writer: HybridWriter,
    pub palms: PalmCache,
}

impl FieldSync {
    pub fn new(
        store: Arc<LocalStore>,
        remote: Arc<dyn RemoteService>,
        probe: Arc<dyn Connectivity>,
        link: LinkState,
        settings: Settings,
    ) -> Self {
        let engine = SyncEngine::new(Arc::clone(&store), Arc::clone(&remote), settings.sync);
        let coordinator = Arc::new(SyncCoordinator::new(
            Arc::clone(&store),
            engine,
            Arc::clone(&probe),
            link,
            settings.timing,
        ));
        let writer = HybridWriter::new(
            Arc::clone(&store),
            Arc::clone(&remote),
            Arc::clone(&probe),
            Arc::clone(&coordinator),
        );
        let palms = PalmCache::new(Arc::clone(&store), remote, probe, settings.palm_page_size);

        Self {
            store,
            coordinator,
            writer,
            palms,
        }
    }

    /// Production wiring from the configuration file.
    pub fn from_config(cfg: &Config) -> AppResult<Self> {
        let store = Arc::new(LocalStore::open(cfg.database_path())?);
        let remote = HttpRemote::new(
            &cfg.api_base_url,
            Duration::from_secs(cfg.request_timeout_secs),
            cfg.auth_token.clone(),
        )?;
        let link = LinkState::default();
        let probe = HttpProbe::from_config(cfg, link.clone())?;

        Ok(Self::new(
            store,
            Arc::new(remote),
            Arc::new(probe),
            link,
            Settings::from(cfg),
        ))
    }
}
