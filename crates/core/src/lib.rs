//! Tatami
//!
//! Cart and order composition for a gym storefront. Carts persist to a
//! key-value store, and checkouts are sent as a prefilled WhatsApp message.

pub mod booking;
pub mod cart;
pub mod config;
pub mod dispatch;
pub mod order;
pub mod prelude;
pub mod storage;
pub mod store;
