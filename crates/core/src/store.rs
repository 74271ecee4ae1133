//! Cart store
//!
//! [`CartStore`] owns the authoritative [`Cart`] and its storage backend.
//! Every mutation writes the whole cart back to storage. Storage failures
//! never fail a mutation: the in-memory cart stays the source of truth, and
//! the failure is kept as a [`PersistenceWarning`] and sent to subscribers.

use std::fmt;

use rusty_money::{Money, iso::Currency};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    cart::{Cart, CartError, CartLineItem, CartProduct},
    storage::{CART_STORAGE_KEY, CartStorage, PersistedCart, StorageError},
};

/// Which storage operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceOperation {
    /// Restoring the cart on startup
    Load,

    /// Writing the cart after a mutation
    Save,
}

impl fmt::Display for PersistenceOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceOperation::Load => f.write_str("load"),
            PersistenceOperation::Save => f.write_str("save"),
        }
    }
}

/// Non-fatal storage failure. The cart keeps working in memory.
#[derive(Debug, Error)]
#[error("could not {operation} the cart: {source}")]
pub struct PersistenceWarning {
    /// Operation that failed
    pub operation: PersistenceOperation,

    /// Underlying storage error
    #[source]
    pub source: StorageError,
}

/// Notification sent to store subscribers.
#[derive(Debug)]
pub enum CartEvent<'a> {
    /// The cart contents changed.
    Changed(&'a Cart),

    /// The latest change could not be persisted.
    PersistenceFailed(&'a PersistenceWarning),
}

type Listener = Box<dyn Fn(&CartEvent<'_>) + Send + Sync>;

/// Explicit state container for the cart.
pub struct CartStore<S> {
    cart: Cart,
    storage: S,
    key: String,
    warning: Option<PersistenceWarning>,
    listeners: Vec<Listener>,
}

impl<S: fmt::Debug> fmt::Debug for CartStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartStore")
            .field("cart", &self.cart)
            .field("storage", &self.storage)
            .field("key", &self.key)
            .field("warning", &self.warning)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<S: CartStorage> CartStore<S> {
    /// Create a store with an empty cart. Nothing is read from storage.
    pub fn new(storage: S, currency: &'static Currency) -> Self {
        Self {
            cart: Cart::new(currency),
            storage,
            key: CART_STORAGE_KEY.to_string(),
            warning: None,
            listeners: Vec::new(),
        }
    }

    /// Restore the cart stored under [`CART_STORAGE_KEY`].
    ///
    /// A missing record gives an empty cart. An unreadable record also gives
    /// an empty cart, with a load warning set.
    pub fn load(storage: S, currency: &'static Currency) -> Self {
        Self::load_from(storage, CART_STORAGE_KEY, currency)
    }

    /// Restore the cart stored under a custom key.
    pub fn load_from(
        storage: S,
        key: impl Into<String>,
        currency: &'static Currency,
    ) -> Self {
        let key = key.into();

        let (cart, warning) = match PersistedCart::load(&storage, &key) {
            Ok(record) => {
                let products = record.map(|record| record.products).unwrap_or_default();

                (Cart::from_items(products, currency), None)
            }
            Err(source) => {
                warn!(key = %key, error = %source, "discarding unreadable stored cart");

                (
                    Cart::new(currency),
                    Some(PersistenceWarning {
                        operation: PersistenceOperation::Load,
                        source,
                    }),
                )
            }
        };

        debug!(key = %key, items = cart.len(), "cart restored");

        Self {
            cart,
            storage,
            key,
            warning,
            listeners: Vec::new(),
        }
    }

    /// Register a listener called after every change and persistence failure.
    pub fn subscribe(&mut self, listener: impl Fn(&CartEvent<'_>) + Send + Sync + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Add `quantity` units of a product, merging with an existing row.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if the quantity or price is invalid. The cart is
    /// unchanged and nothing is written in that case.
    pub fn add_item(&mut self, product: CartProduct, quantity: u32) -> Result<(), CartError> {
        let id = product.id.clone();

        self.cart.add_item(product, quantity)?;

        debug!(id = %id, quantity, "added to cart");

        self.commit();

        Ok(())
    }

    /// Remove the row for `id`. Absent ids are a no-op.
    pub fn remove_item(&mut self, id: &str) -> Option<CartLineItem> {
        let removed = self.cart.remove_item(id);

        if removed.is_some() {
            debug!(id, "removed from cart");
            self.commit();
        }

        removed
    }

    /// Set the quantity of a row atomically; zero removes it.
    ///
    /// Returns `Ok(false)` when there is no row for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::TotalOverflow`] if the cart total would overflow.
    /// The cart is unchanged and nothing is written in that case.
    pub fn set_quantity(&mut self, id: &str, quantity: u32) -> Result<bool, CartError> {
        let found = self.cart.set_quantity(id, quantity)?;

        if found {
            debug!(id, quantity, "cart quantity set");
            self.commit();
        }

        Ok(found)
    }

    /// Add one unit to an existing row.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if the row or the cart total would overflow.
    pub fn increment(&mut self, id: &str) -> Result<bool, CartError> {
        let found = self.cart.increment(id)?;

        if found {
            self.commit();
        }

        Ok(found)
    }

    /// Take one unit away from an existing row, removing it at zero.
    pub fn decrement(&mut self, id: &str) -> bool {
        let found = self.cart.decrement(id);

        if found {
            self.commit();
        }

        found
    }

    /// Empty the cart and persist the empty state.
    pub fn clear(&mut self) {
        self.cart.clear();

        debug!("cart cleared");

        self.commit();
    }

    /// Sum of price × quantity.
    pub fn total(&self) -> Money<'static, Currency> {
        self.cart.total()
    }

    /// Sum of quantities.
    pub fn count(&self) -> u64 {
        self.cart.count()
    }

    /// Current cart.
    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    /// Current rows in insertion order.
    pub fn items(&self) -> &[CartLineItem] {
        self.cart.items()
    }

    /// Latest persistence failure, cleared by the next successful write.
    pub fn warning(&self) -> Option<&PersistenceWarning> {
        self.warning.as_ref()
    }

    /// Storage backend.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Mutable storage backend.
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    fn commit(&mut self) {
        let record = PersistedCart {
            products: self.cart.items().to_vec(),
        };

        self.warning = match record.save(&mut self.storage, &self.key) {
            Ok(()) => None,
            Err(source) => {
                warn!(key = %self.key, error = %source, "cart kept in memory only");

                Some(PersistenceWarning {
                    operation: PersistenceOperation::Save,
                    source,
                })
            }
        };

        for listener in &self.listeners {
            listener(&CartEvent::Changed(&self.cart));
        }

        if let Some(warning) = &self.warning {
            for listener in &self.listeners {
                listener(&CartEvent::PersistenceFailed(warning));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use rust_decimal::Decimal;
    use rusty_money::iso;
    use testresult::TestResult;

    use crate::storage::MemoryStorage;

    use super::*;

    fn gi() -> CartProduct {
        CartProduct::new("gi", "Premium BJJ Gi", Decimal::from(149))
    }

    #[test]
    fn every_mutation_is_persisted() -> TestResult {
        let mut store = CartStore::new(MemoryStorage::new(), iso::USD);

        store.add_item(gi(), 2)?;

        let stored = PersistedCart::load(store.storage(), CART_STORAGE_KEY)?;

        assert_eq!(stored.map(|record| record.products.len()), Some(1));

        store.clear();

        let stored = PersistedCart::load(store.storage(), CART_STORAGE_KEY)?;

        assert_eq!(stored, Some(PersistedCart::default()));

        Ok(())
    }

    #[test]
    fn storage_failure_keeps_cart_in_memory() -> TestResult {
        let mut store = CartStore::new(MemoryStorage::with_quota(8), iso::USD);

        store.add_item(gi(), 1)?;

        assert_eq!(store.count(), 1);

        let warning = store.warning().ok_or("expected a persistence warning")?;

        assert_eq!(warning.operation, PersistenceOperation::Save);
        assert!(
            matches!(warning.source, StorageError::QuotaExceeded { .. }),
            "expected QuotaExceeded, got {:?}",
            warning.source
        );

        Ok(())
    }

    #[test]
    fn successful_write_clears_warning() -> TestResult {
        let mut store = CartStore::new(MemoryStorage::with_quota(8), iso::USD);

        store.add_item(gi(), 1)?;
        assert!(store.warning().is_some());

        store.storage_mut().set_quota(None);
        store.add_item(gi(), 1)?;

        assert!(store.warning().is_none());
        assert_eq!(store.count(), 2);

        Ok(())
    }

    #[test]
    fn invalid_add_does_not_notify() -> TestResult {
        let notified = Arc::new(AtomicUsize::new(0));
        let mut store = CartStore::new(MemoryStorage::new(), iso::USD);

        let counter = Arc::clone(&notified);
        store.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(store.add_item(gi(), 0), Err(CartError::InvalidQuantity));
        assert!(store.remove_item("missing").is_none());
        assert_eq!(notified.load(Ordering::SeqCst), 0);

        store.add_item(gi(), 1)?;
        assert_eq!(notified.load(Ordering::SeqCst), 1);

        Ok(())
    }

    #[test]
    fn subscribers_hear_about_persistence_failures() -> TestResult {
        let failures = Arc::new(AtomicUsize::new(0));
        let mut store = CartStore::new(MemoryStorage::with_quota(8), iso::USD);

        let counter = Arc::clone(&failures);
        store.subscribe(move |event| {
            if matches!(event, CartEvent::PersistenceFailed(_)) {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        store.add_item(gi(), 1)?;

        assert_eq!(failures.load(Ordering::SeqCst), 1);

        Ok(())
    }

    #[test]
    fn load_merges_duplicate_rows() -> TestResult {
        let mut storage = MemoryStorage::new();
        storage.write(
            CART_STORAGE_KEY,
            r#"{"products":[
                {"id":"gi","name":"Gi","price":149,"quantity":1},
                {"id":"gi","name":"Gi","price":149,"quantity":2}
            ]}"#,
        )?;

        let store = CartStore::load(storage, iso::USD);

        assert_eq!(store.items().len(), 1);
        assert_eq!(store.count(), 3);
        assert!(store.warning().is_none());

        Ok(())
    }

    #[test]
    fn corrupt_record_loads_empty_with_warning() -> TestResult {
        let mut storage = MemoryStorage::new();
        storage.write(CART_STORAGE_KEY, "[]oops")?;

        let store = CartStore::load(storage, iso::USD);

        assert!(store.cart().is_empty());
        assert_eq!(
            store.warning().map(|warning| warning.operation),
            Some(PersistenceOperation::Load)
        );

        Ok(())
    }

    #[test]
    fn decrement_is_atomic() -> TestResult {
        let mut store = CartStore::new(MemoryStorage::new(), iso::USD);

        store.add_item(gi(), 2)?;

        assert!(store.decrement("gi"));
        assert!(store.decrement("gi"));
        assert!(!store.decrement("gi"));
        assert_eq!(store.count(), 0);

        Ok(())
    }
}
