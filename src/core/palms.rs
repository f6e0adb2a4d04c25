//! Local cache of palm reference data for scanning in the field.

use crate::core::connectivity::Connectivity;
use crate::db::LocalStore;
use crate::errors::AppResult;
use crate::models::{CachedPalm, Palm};
use crate::remote::RemoteService;
use crate::utils::time::now_millis;
use std::sync::Arc;
use tracing::{info, warn};

pub struct PalmCache {
    store: Arc<LocalStore>,
    remote: Arc<dyn RemoteService>,
    probe: Arc<dyn Connectivity>,
    page_size: u32,
}

impl PalmCache {
    pub fn new(
        store: Arc<LocalStore>,
        remote: Arc<dyn RemoteService>,
        probe: Arc<dyn Connectivity>,
        page_size: u32,
    ) -> Self {
        Self {
            store,
            remote,
            probe,
            page_size: page_size.max(1),
        }
    }

    /// Download every palm page and upsert it. `on_page` receives
    /// `(loaded, total)` after each page. Returns the number of palms stored.
    pub async fn refresh<F>(&self, mut on_page: F) -> AppResult<u64>
    where
        F: FnMut(u64, u64),
    {
        let mut page = 1;
        let mut loaded = 0u64;

        loop {
            let batch = self.remote.fetch_palms(page, self.page_size).await?;
            let now = now_millis();
            let count = batch.items.len() as u64;

            self.store.write(|tx| {
                for palm in &batch.items {
                    tx.put_palm(palm, now)?;
                }
                Ok(())
            })?;

            loaded += count;
            on_page(loaded, batch.total.max(loaded));

            if !batch.has_more || count < u64::from(self.page_size) {
                break;
            }
            page += 1;
        }

        self.store
            .write(|tx| tx.log("palms_refresh", "", &format!("{} palms cached", loaded)))?;
        info!(loaded, "palm cache refreshed");
        Ok(loaded)
    }

    pub fn lookup(&self, qr_code: &str) -> AppResult<Option<CachedPalm>> {
        self.store.read(|tx| tx.palm(qr_code))
    }

    /// Cache first; on a miss ask the remote when reachable and cache the
    /// answer. Remote failures read as "not found".
    pub async fn lookup_or_fetch(&self, qr_code: &str) -> AppResult<Option<Palm>> {
        if let Some(hit) = self.lookup(qr_code)? {
            return Ok(Some(hit.palm));
        }
        if !self.probe.is_reachable().await {
            return Ok(None);
        }

        match self.remote.fetch_palm(qr_code).await {
            Ok(palm) => {
                self.cache_one(&palm)?;
                Ok(Some(palm))
            }
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => {
                warn!(qr_code, error = %e, "palm lookup failed");
                Ok(None)
            }
        }
    }

    pub fn cache_one(&self, palm: &Palm) -> AppResult<()> {
        let now = now_millis();
        self.store.write(|tx| tx.put_palm(palm, now))
    }

    pub fn clear(&self) -> AppResult<usize> {
        self.store.write(|tx| {
            let removed = tx.clear_palms()?;
            tx.log("palms_clear", "", &format!("{} palms removed", removed))?;
            Ok(removed)
        })
    }

    pub fn count(&self) -> AppResult<u64> {
        self.store.read(|tx| tx.palm_count())
    }
}
