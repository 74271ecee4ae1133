//! Checkout controller
//!
//! Owns the configuration load for a mounted checkout page and routes
//! submissions through a [`CheckoutSession`]. While mounted, the status
//! follows every value the [`ConfigCache`] stores.

use std::{fmt, future, time::Duration};

use tatami::{
    config::OrderingConfig,
    dispatch::Dispatch,
    order::{CheckoutForm, CheckoutSession, OrderComposer, OrderError, PlacedOrder},
    storage::CartStorage,
    store::CartStore,
};
use thiserror::Error;
use tokio::{sync::watch, task::JoinHandle, time::sleep};
use tracing::{debug, warn};

use crate::config_cache::ConfigCache;

/// Delay before a failed configuration load is retried.
pub const RETRY_FAILED_LOAD_AFTER: Duration = Duration::from_secs(30);

/// State of the ordering configuration as seen by the checkout page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigStatus {
    /// The configuration is being fetched.
    Loading,

    /// Ordering is configured.
    Ready(OrderingConfig),

    /// The shop has no ordering destination configured.
    Missing,

    /// The fetch failed; the message is for display.
    Failed(String),
}

impl ConfigStatus {
    /// Configuration to order with, once ready.
    pub fn config(&self) -> Option<&OrderingConfig> {
        match self {
            ConfigStatus::Ready(config) => Some(config),
            _ => None,
        }
    }
}

/// Errors returned by [`CheckoutController::submit`].
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The controller was unmounted; nothing is dispatched.
    #[error("checkout is not mounted")]
    Unmounted,

    /// The order was rejected.
    #[error(transparent)]
    Order(#[from] OrderError),
}

/// Drives one checkout page from mount to unmount.
pub struct CheckoutController<D> {
    cache: ConfigCache,
    dispatcher: D,
    session: CheckoutSession,
    status: watch::Sender<ConfigStatus>,
    load: Option<JoinHandle<()>>,
    mounted: bool,
}

impl<D> fmt::Debug for CheckoutController<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckoutController")
            .field("status", &*self.status.borrow())
            .field("session", &self.session)
            .field("mounted", &self.mounted)
            .finish_non_exhaustive()
    }
}

impl<D: Dispatch> CheckoutController<D> {
    /// Create an unmounted controller.
    pub fn new(cache: ConfigCache, composer: OrderComposer, dispatcher: D) -> Self {
        let (status, _) = watch::channel(ConfigStatus::Loading);

        Self {
            cache,
            dispatcher,
            session: CheckoutSession::new(composer),
            status,
            load: None,
            mounted: false,
        }
    }

    /// Start loading the configuration in the background.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn mount(&mut self) {
        if self.mounted {
            return;
        }

        self.abort_load();
        self.status.send_replace(ConfigStatus::Loading);

        self.load = Some(tokio::spawn(follow_config(
            self.cache.clone(),
            self.status.clone(),
        )));

        self.mounted = true;
    }

    /// Stop the configuration load. A fetch still in flight never updates the status.
    pub fn unmount(&mut self) {
        self.abort_load();
        self.mounted = false;
    }

    /// Check whether the controller is mounted.
    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Current configuration status.
    pub fn status(&self) -> ConfigStatus {
        self.status.borrow().clone()
    }

    /// Watch configuration status changes.
    pub fn subscribe(&self) -> watch::Receiver<ConfigStatus> {
        self.status.subscribe()
    }

    /// Wait until the configuration has loaded, or return the current status
    /// straight away when unmounted.
    pub async fn config_loaded(&self) -> ConfigStatus {
        if !self.mounted {
            return self.status();
        }

        let mut receiver = self.subscribe();

        match receiver
            .wait_for(|status| *status != ConfigStatus::Loading)
            .await
        {
            Ok(status) => status.clone(),
            Err(_) => self.status(),
        }
    }

    /// Check whether the submit action should be enabled.
    pub fn can_submit(&self) -> bool {
        self.mounted && self.status.borrow().config().is_some() && self.session.can_submit()
    }

    /// Checkout session state.
    pub fn session(&self) -> &CheckoutSession {
        &self.session
    }

    /// Start a fresh checkout after an order was dispatched.
    pub fn reset(&mut self) {
        self.session.reset();
    }

    /// Submit the checkout form against the current cart.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::Unmounted`]: the controller is not mounted.
    /// - [`CheckoutError::Order`]: the order was rejected; see
    ///   [`CheckoutSession::submit`].
    pub fn submit<S: CartStorage>(
        &mut self,
        form: &CheckoutForm,
        store: &mut CartStore<S>,
    ) -> Result<PlacedOrder, CheckoutError> {
        if !self.mounted {
            return Err(CheckoutError::Unmounted);
        }

        let config = self.status.borrow().config().cloned();

        Ok(self
            .session
            .submit(config.as_ref(), form, store, &self.dispatcher)?)
    }

    fn abort_load(&mut self) {
        if let Some(load) = self.load.take() {
            load.abort();
        }
    }
}

/// Keep `status` in step with the cache until the task is aborted.
///
/// The cache is read again whenever it stores a value, once the entry is due
/// for revalidation, and after [`RETRY_FAILED_LOAD_AFTER`] when a load failed.
async fn follow_config(cache: ConfigCache, status: watch::Sender<ConfigStatus>) {
    let mut updates = cache.subscribe();

    loop {
        let next = match cache.get().await {
            Ok(Some(config)) => ConfigStatus::Ready(config),
            Ok(None) => ConfigStatus::Missing,
            Err(error) => {
                warn!(error = %error, "failed to load ordering config");

                ConfigStatus::Failed(error.to_string())
            }
        };

        let recheck_after = match next {
            ConfigStatus::Failed(_) => Some(RETRY_FAILED_LOAD_AFTER),
            _ => cache.stale_after(),
        };

        status.send_if_modified(|current| {
            if *current == next {
                return false;
            }

            debug!(status = ?next, "ordering config status changed");

            *current = next;
            true
        });

        let recheck = async {
            match recheck_after {
                Some(delay) => sleep(delay).await,
                None => future::pending().await,
            }
        };

        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    return;
                }
            }
            () = recheck => {}
        }
    }
}

impl<D> Drop for CheckoutController<D> {
    fn drop(&mut self) {
        if let Some(load) = self.load.take() {
            load.abort();
        }
    }
}
