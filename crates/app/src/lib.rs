//! Tatami application layer.
//!
//! Settings, logging, remote ordering configuration and the checkout
//! controller that ties them to the cart.

pub mod checkout;
pub mod config_cache;
pub mod observability;
pub mod remote_config;
pub mod settings;
