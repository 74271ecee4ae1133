//! Stale-while-revalidate cache for the ordering configuration.
//!
//! A fresh entry is served as-is. A stale entry is served immediately while a
//! single background task refreshes it. Without an entry the caller waits for
//! the fetch. Every stored value is also published to subscribers.

use std::{sync::Arc, time::Duration};

use tatami::config::OrderingConfig;
use tokio::{
    sync::{Mutex, watch},
    task::JoinHandle,
    time::Instant,
};
use tracing::{debug, warn};

use crate::remote_config::{ConfigFetchError, ConfigSource, StaticConfigSource};

/// How long a fetched configuration is served without refreshing.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone)]
struct CachedConfig {
    config: Option<OrderingConfig>,
    fetched_at: Instant,
}

#[derive(Debug, Default)]
struct CacheState {
    entry: Option<CachedConfig>,
    refresh: Option<JoinHandle<()>>,
}

struct Inner {
    source: Arc<dyn ConfigSource>,
    stale_after: Option<Duration>,
    state: Mutex<CacheState>,
    updates: watch::Sender<Option<OrderingConfig>>,
}

impl Inner {
    fn store(&self, state: &mut CacheState, config: Option<OrderingConfig>) {
        state.entry = Some(CachedConfig {
            config: config.clone(),
            fetched_at: Instant::now(),
        });

        self.updates.send_replace(config);
    }
}

/// Shared, cloneable configuration cache.
#[derive(Clone)]
pub struct ConfigCache {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ConfigCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigCache")
            .field("stale_after", &self.inner.stale_after)
            .finish_non_exhaustive()
    }
}

impl ConfigCache {
    /// Cache values from `source`, refreshing them once older than `stale_after`.
    pub fn new(source: impl ConfigSource + 'static, stale_after: Duration) -> Self {
        Self::from_parts(Arc::new(source), Some(stale_after), None)
    }

    /// Serve a fixed configuration that never goes stale and is never fetched.
    pub fn seeded(config: Option<OrderingConfig>) -> Self {
        let entry = CachedConfig {
            config: config.clone(),
            fetched_at: Instant::now(),
        };

        Self::from_parts(
            Arc::new(StaticConfigSource::new(config)),
            None,
            Some(entry),
        )
    }

    fn from_parts(
        source: Arc<dyn ConfigSource>,
        stale_after: Option<Duration>,
        entry: Option<CachedConfig>,
    ) -> Self {
        let (updates, _) = watch::channel(entry.as_ref().and_then(|entry| entry.config.clone()));

        Self {
            inner: Arc::new(Inner {
                source,
                stale_after,
                state: Mutex::new(CacheState {
                    entry,
                    refresh: None,
                }),
                updates,
            }),
        }
    }

    /// Freshness window, or `None` for a seeded cache.
    pub fn stale_after(&self) -> Option<Duration> {
        self.inner.stale_after
    }

    /// Watch values stored after this call, from first fetches and refreshes alike.
    pub fn subscribe(&self) -> watch::Receiver<Option<OrderingConfig>> {
        self.inner.updates.subscribe()
    }

    /// Current configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigFetchError`] only when nothing is cached yet and the
    /// fetch fails. Failed background refreshes keep serving the stale value.
    pub async fn get(&self) -> Result<Option<OrderingConfig>, ConfigFetchError> {
        let mut state = self.inner.state.lock().await;

        if let Some(entry) = state.entry.clone() {
            if self.is_stale(&entry) && !is_running(state.refresh.as_ref()) {
                debug!("ordering config is stale, refreshing in background");

                state.refresh = Some(self.spawn_refresh());
            }

            return Ok(entry.config);
        }

        // Holding the lock across the fetch makes concurrent first callers share it.
        let config = self.inner.source.fetch().await?;

        self.inner.store(&mut state, config.clone());

        Ok(config)
    }

    /// Fetch now, replacing any cached value.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigFetchError`] if the fetch fails. The cached value is
    /// kept in that case.
    pub async fn refresh(&self) -> Result<Option<OrderingConfig>, ConfigFetchError> {
        let config = self.inner.source.fetch().await?;
        let mut state = self.inner.state.lock().await;

        self.inner.store(&mut state, config.clone());

        Ok(config)
    }

    /// Check whether a background refresh is in flight.
    pub async fn is_refreshing(&self) -> bool {
        is_running(self.inner.state.lock().await.refresh.as_ref())
    }

    fn is_stale(&self, entry: &CachedConfig) -> bool {
        self.inner
            .stale_after
            .is_some_and(|stale_after| entry.fetched_at.elapsed() >= stale_after)
    }

    fn spawn_refresh(&self) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);

        tokio::spawn(async move {
            match inner.source.fetch().await {
                Ok(config) => {
                    let mut state = inner.state.lock().await;

                    inner.store(&mut state, config);

                    debug!("ordering config refreshed");
                }
                Err(error) => {
                    warn!(error = %error, "failed to refresh ordering config, serving stale value");
                }
            }
        })
    }
}

fn is_running(handle: Option<&JoinHandle<()>>) -> bool {
    handle.is_some_and(|handle| !handle.is_finished())
}
