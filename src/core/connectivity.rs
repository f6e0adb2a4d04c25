//! Reachability probing.
//!
//! A cheap local link flag short-circuits the probe when the device is known
//! to be offline; otherwise a cache-busted `HEAD` against a static asset on
//! the API origin decides. Any HTTP response counts as reachable.

use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::utils::time::now_millis;
use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use reqwest::{Client, Url};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::debug;

#[async_trait]
pub trait Connectivity: Send + Sync {
    async fn is_reachable(&self) -> bool;
}

/// Shared "link is up" flag, toggled by `online` / `offline` events.
#[derive(Debug, Clone)]
pub struct LinkState(Arc<AtomicBool>);

impl LinkState {
    pub fn new(up: bool) -> Self {
        Self(Arc::new(AtomicBool::new(up)))
    }

    pub fn set_up(&self, up: bool) {
        self.0.store(up, Ordering::SeqCst);
    }

    pub fn is_up(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl Default for LinkState {
    fn default() -> Self {
        Self::new(true)
    }
}

pub struct HttpProbe {
    client: Client,
    url: Url,
    timeout: Duration,
    link: LinkState,
}

impl HttpProbe {
    pub fn new(url: Url, timeout: Duration, link: LinkState) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("cannot build probe client: {}", e)))?;

        Ok(Self {
            client,
            url,
            timeout,
            link,
        })
    }

    pub fn from_config(cfg: &Config, link: LinkState) -> AppResult<Self> {
        let url = cfg.probe_url()?;
        Self::new(url, Duration::from_millis(cfg.probe_timeout_ms), link)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl Connectivity for HttpProbe {
    async fn is_reachable(&self) -> bool {
        if !self.link.is_up() {
            return false;
        }

        let mut url = self.url.clone();
        url.query_pairs_mut()
            .append_pair("_", &now_millis().to_string());

        let request = self
            .client
            .head(url)
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache")
            .send();

        match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok(resp)) => {
                debug!(status = %resp.status(), "probe answered");
                true
            }
            Ok(Err(e)) => {
                debug!(error = %e, "probe failed");
                false
            }
            Err(_) => {
                debug!("probe timed out");
                false
            }
        }
    }
}
