//! Shop settings
//!
//! Read from command-line flags with environment fallbacks, after loading a
//! `.env` file if one is present.

use std::{ffi::OsString, path::PathBuf, time::Duration};

use clap::{Args, Parser, ValueEnum};
use rusty_money::iso::{self, Currency};
use tatami::{
    config::OrderingConfig,
    order::{DEFAULT_ORDER_ID_PREFIX, OrderComposer},
    storage::FileStorage,
    store::CartStore,
};
use thiserror::Error;

use crate::{config_cache::ConfigCache, remote_config::HttpConfigSource};

/// Errors raised while loading settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Flags or environment variables could not be parsed.
    #[error("invalid settings: {0}")]
    Parse(#[from] clap::Error),
}

/// Tatami shop settings
#[derive(Debug, Parser)]
#[command(name = "tatami", about = "Tatami shop checkout", long_about = None)]
pub struct ShopSettings {
    /// Shop API settings.
    #[command(flatten)]
    pub api: ApiSettings,

    /// Cart and checkout settings.
    #[command(flatten)]
    pub checkout: CheckoutSettings,

    /// Logging output settings.
    #[command(flatten)]
    pub logging: LoggingSettings,
}

/// Where the ordering configuration comes from.
#[derive(Debug, Args)]
pub struct ApiSettings {
    /// Base URL of the shop API
    #[arg(long, env = "TATAMI_API_BASE", default_value = "http://localhost:3001")]
    pub api_base: String,

    /// Seconds a fetched ordering config is served before refreshing
    #[arg(long, env = "TATAMI_CONFIG_STALE_AFTER_SECS", default_value_t = 600_u64)]
    pub config_stale_after_secs: u64,

    /// Static WhatsApp number; skips the shop API when set
    #[arg(long, env = "TATAMI_WHATSAPP_PHONE")]
    pub whatsapp_phone: Option<String>,

    /// Static message template, used with `--whatsapp-phone`
    #[arg(long, env = "TATAMI_WHATSAPP_TEMPLATE")]
    pub whatsapp_template: Option<String>,
}

/// Cart persistence and order composition.
#[derive(Debug, Args)]
pub struct CheckoutSettings {
    /// Directory the cart is persisted in
    #[arg(long, env = "TATAMI_CART_STORAGE_DIR", default_value = ".tatami")]
    pub cart_storage_dir: PathBuf,

    /// ISO 4217 currency code prices are in
    #[arg(long, env = "TATAMI_CURRENCY", default_value = "USD", value_parser = parse_currency)]
    pub currency: &'static Currency,

    /// Prefix for generated order references
    #[arg(long, env = "TATAMI_ORDER_ID_PREFIX", default_value = DEFAULT_ORDER_ID_PREFIX)]
    pub order_id_prefix: String,
}

/// Log output format.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogFormat {
    /// Compact, human-readable logs.
    Compact,

    /// Structured JSON logs.
    Json,
}

/// Logging settings.
#[derive(Debug, Args)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    /// Log format (compact, json)
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

impl ShopSettings {
    /// Load settings from the environment and command-line arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if settings cannot be parsed.
    pub fn load() -> Result<Self, SettingsError> {
        Self::load_from(std::env::args_os())
    }

    /// Load settings from the environment and the given arguments, program
    /// name first.
    ///
    /// # Errors
    ///
    /// Returns an error if settings cannot be parsed.
    pub fn load_from<I, T>(args: I) -> Result<Self, SettingsError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        // Load .env file if present (ignore if missing)
        _ = dotenvy::dotenv();

        Ok(Self::try_parse_from(args)?)
    }

    /// Statically configured ordering destination, if any.
    pub fn static_config(&self) -> Option<OrderingConfig> {
        let phone = self.api.whatsapp_phone.as_deref()?.trim();

        if phone.is_empty() {
            return None;
        }

        let config = OrderingConfig::new(phone);

        Some(match self.api.whatsapp_template.as_deref() {
            Some(template) => config.with_template(template),
            None => config,
        })
    }

    /// Freshness window for fetched ordering configuration.
    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.api.config_stale_after_secs)
    }

    /// Configuration cache: seeded from the static config when there is one,
    /// otherwise backed by the shop API.
    pub fn config_cache(&self) -> ConfigCache {
        match self.static_config() {
            Some(config) => ConfigCache::seeded(Some(config)),
            None => ConfigCache::new(HttpConfigSource::new(&self.api.api_base), self.stale_after()),
        }
    }

    /// Cart restored from the storage directory.
    pub fn cart_store(&self) -> CartStore<FileStorage> {
        CartStore::load(
            FileStorage::new(&self.checkout.cart_storage_dir),
            self.checkout.currency,
        )
    }

    /// Order composer for the configured currency and prefix.
    pub fn order_composer(&self) -> OrderComposer {
        OrderComposer::new(self.checkout.currency)
            .with_order_id_prefix(self.checkout.order_id_prefix.clone())
    }
}

fn parse_currency(code: &str) -> Result<&'static Currency, String> {
    iso::find(&code.trim().to_ascii_uppercase())
        .ok_or_else(|| format!("unknown currency code `{code}`"))
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn defaults() -> TestResult {
        let settings = ShopSettings::try_parse_from(["tatami"])?;

        assert_eq!(settings.checkout.order_id_prefix, "TEMP-");
        assert_eq!(settings.stale_after(), Duration::from_secs(600));
        assert_eq!(settings.checkout.currency, iso::USD);

        Ok(())
    }

    #[test]
    fn currency_codes_are_validated() -> TestResult {
        let settings = ShopSettings::try_parse_from(["tatami", "--currency", "eur"])?;

        assert_eq!(settings.checkout.currency, iso::EUR);
        assert!(ShopSettings::try_parse_from(["tatami", "--currency", "XYZ1"]).is_err());

        Ok(())
    }

    #[test]
    fn static_config_needs_a_phone() -> TestResult {
        let settings = ShopSettings::try_parse_from([
            "tatami",
            "--whatsapp-phone",
            "+96176061065",
            "--whatsapp-template",
            "Order {orderId}",
        ])?;

        assert_eq!(
            settings.static_config(),
            Some(OrderingConfig::new("+96176061065").with_template("Order {orderId}"))
        );

        let settings = ShopSettings::try_parse_from(["tatami", "--whatsapp-phone", " "])?;

        assert_eq!(settings.static_config(), None);

        Ok(())
    }

    #[test]
    fn load_reports_bad_flags() {
        assert!(matches!(
            ShopSettings::load_from(["tatami", "--config-stale-after-secs", "soon"]),
            Err(SettingsError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn static_phone_seeds_the_config_cache() -> TestResult {
        let settings = ShopSettings::load_from(["tatami", "--whatsapp-phone", "+96176061065"])?;

        let cache = settings.config_cache();

        assert_eq!(cache.stale_after(), None);
        assert_eq!(cache.get().await?, Some(OrderingConfig::new("+96176061065")));
        assert!(!cache.is_refreshing().await);

        Ok(())
    }

    #[test]
    fn api_backed_cache_uses_stale_window() -> TestResult {
        let settings =
            ShopSettings::load_from(["tatami", "--config-stale-after-secs", "30"])?;

        assert_eq!(
            settings.config_cache().stale_after(),
            Some(Duration::from_secs(30))
        );

        Ok(())
    }

    #[test]
    fn composer_uses_prefix_and_currency() -> TestResult {
        let settings = ShopSettings::load_from([
            "tatami",
            "--order-id-prefix",
            "ORD-",
            "--currency",
            "eur",
        ])?;

        let composer = settings.order_composer();

        assert!(composer.generate_order_id().starts_with("ORD-"));
        assert_eq!(composer.currency(), iso::EUR);

        Ok(())
    }

    #[test]
    fn cart_store_uses_storage_dir() -> TestResult {
        let dir = tempfile::tempdir()?;
        let dir_arg = dir.path().to_string_lossy().into_owned();
        let settings =
            ShopSettings::try_parse_from(["tatami", "--cart-storage-dir", dir_arg.as_str()])?;

        let store = settings.cart_store();

        assert_eq!(store.storage().dir(), dir.path());
        assert!(store.cart().is_empty());

        Ok(())
    }
}
