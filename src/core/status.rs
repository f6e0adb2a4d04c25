//! Sync status state machine and background triggers.
//!
//! `SyncCoordinator` owns the single `Idle → Syncing → Idle` phase. Status
//! snapshots are published on a `watch` channel, phase transitions on a
//! `broadcast` channel. `run` drives the periodic and event triggers.

use crate::core::connectivity::{Connectivity, LinkState};
use crate::core::engine::{SyncEngine, SyncReport};
use crate::db::LocalStore;
use crate::errors::AppResult;
use crate::models::RecordKind;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncPhase {
    Idle,
    Syncing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub phase: SyncPhase,
    pub is_online: bool,
    pub pending_count: u64,
    pub failed_count: u64,
    pub last_sync_time: Option<i64>,
}

impl SyncStatus {
    pub fn is_syncing(&self) -> bool {
        self.phase == SyncPhase::Syncing
    }
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self {
            phase: SyncPhase::Idle,
            is_online: false,
            pending_count: 0,
            failed_count: 0,
            last_sync_time: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: SyncPhase,
    pub to: SyncPhase,
}

/// External signals the coordinator reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEvent {
    Online,
    Offline,
    VisibilityRegained,
    Tick,
}

#[derive(Debug, Clone, Copy)]
pub struct TriggerTiming {
    pub interval: Duration,
    pub online_settle: Duration,
    pub visibility_settle: Duration,
}

impl Default for TriggerTiming {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            online_settle: Duration::from_millis(500),
            visibility_settle: Duration::from_millis(300),
        }
    }
}

pub struct SyncCoordinator {
    store: Arc<LocalStore>,
    engine: SyncEngine,
    probe: Arc<dyn Connectivity>,
    link: LinkState,
    timing: TriggerTiming,
    syncing: AtomicBool,
    status: watch::Sender<SyncStatus>,
    transitions: broadcast::Sender<Transition>,
}

/// Holds the `Syncing` phase; dropping it returns to `Idle` on every path.
struct SyncingGuard<'a> {
    owner: &'a SyncCoordinator,
}

impl Drop for SyncingGuard<'_> {
    fn drop(&mut self) {
        self.owner.syncing.store(false, Ordering::SeqCst);
        self.owner.set_phase(SyncPhase::Syncing, SyncPhase::Idle);
    }
}

impl SyncCoordinator {
    pub fn new(
        store: Arc<LocalStore>,
        engine: SyncEngine,
        probe: Arc<dyn Connectivity>,
        link: LinkState,
        timing: TriggerTiming,
    ) -> Self {
        let (status, _) = watch::channel(SyncStatus::default());
        let (transitions, _) = broadcast::channel(32);
        Self {
            store,
            engine,
            probe,
            link,
            timing,
            syncing: AtomicBool::new(false),
            status,
            transitions,
        }
    }

    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    pub fn on_transition(&self) -> broadcast::Receiver<Transition> {
        self.transitions.subscribe()
    }

    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::SeqCst)
    }

    pub fn link(&self) -> &LinkState {
        &self.link
    }

    fn set_phase(&self, from: SyncPhase, to: SyncPhase) {
        self.status.send_modify(|s| s.phase = to);
        // No receivers is fine.
        let _ = self.transitions.send(Transition { from, to });
        debug!(?from, ?to, "sync phase changed");
    }

    fn try_begin(&self) -> Option<SyncingGuard<'_>> {
        self.syncing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()?;
        self.set_phase(SyncPhase::Idle, SyncPhase::Syncing);
        Some(SyncingGuard { owner: self })
    }

    /// Probe connectivity and re-read pending counts and metadata. Never
    /// writes to the store.
    pub async fn update_status(&self) -> AppResult<SyncStatus> {
        let is_online = self.probe.is_reachable().await;

        let (pending, meta) = self.store.read(|tx| {
            let mut pending = 0;
            for kind in RecordKind::ALL {
                pending += tx.count(kind, crate::models::SyncState::Pending)?;
            }
            Ok((pending, tx.metadata()?))
        })?;

        self.status.send_modify(|s| {
            s.is_online = is_online;
            s.pending_count = pending;
            s.failed_count = meta.as_ref().map(|m| m.failed_count).unwrap_or(0);
            s.last_sync_time = meta.as_ref().and_then(|m| m.last_sync_time);
        });
        Ok(self.status())
    }

    /// One sync pass. Returns an empty report when a pass is already running
    /// or the remote is unreachable.
    pub async fn sync(&self) -> AppResult<SyncReport> {
        if self.is_syncing() {
            debug!("sync already in progress");
            return Ok(SyncReport::default());
        }

        if !self.probe.is_reachable().await {
            self.status.send_modify(|s| s.is_online = false);
            info!("remote unreachable, sync skipped");
            return Ok(SyncReport::default());
        }

        let Some(_guard) = self.try_begin() else {
            debug!("sync already in progress");
            return Ok(SyncReport::default());
        };

        let report = self.engine.sync_all().await;
        if let Err(e) = self.update_status().await {
            warn!(error = %e, "status refresh after sync failed");
        }
        report
    }

    /// Refresh status, then sync when online with pending work. Errors are
    /// logged, not returned.
    pub async fn try_silent_sync(&self) {
        if self.is_syncing() {
            return;
        }
        match self.update_status().await {
            Ok(status) if status.is_online && status.pending_count > 0 => {
                info!(pending = status.pending_count, "background sync");
                if let Err(e) = self.sync().await {
                    error!(error = %e, "background sync failed");
                }
            }
            Ok(_) => {}
            Err(e) => error!(error = %e, "status refresh failed"),
        }
    }

    /// Fire-and-forget background pass.
    pub fn spawn_background_sync(self: &Arc<Self>) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = this.sync().await {
                error!(error = %e, "background sync failed");
            }
        });
    }

    pub async fn handle_event(&self, event: SyncEvent) {
        debug!(?event, "sync trigger");
        match event {
            SyncEvent::Online => {
                self.link.set_up(true);
                tokio::time::sleep(self.timing.online_settle).await;
                self.try_silent_sync().await;
            }
            SyncEvent::Offline => {
                self.link.set_up(false);
                if let Err(e) = self.update_status().await {
                    warn!(error = %e, "status refresh failed");
                }
            }
            SyncEvent::VisibilityRegained => {
                tokio::time::sleep(self.timing.visibility_settle).await;
                self.try_silent_sync().await;
            }
            SyncEvent::Tick => self.try_silent_sync().await,
        }
    }

    /// Drive triggers until `events` closes.
    pub async fn run(self: Arc<Self>, mut events: mpsc::Receiver<SyncEvent>) {
        let mut ticker = tokio::time::interval(self.timing.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        if let Err(e) = self.update_status().await {
            warn!(error = %e, "initial status refresh failed");
        }

        loop {
            tokio::select! {
                _ = ticker.tick() => self.handle_event(SyncEvent::Tick).await,
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => break,
                },
            }
        }
        debug!("sync trigger loop stopped");
    }
}
