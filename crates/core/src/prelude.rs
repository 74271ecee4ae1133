//! Tatami prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    booking::{BookingRequest, ComposedBooking, book_private_session, compose_booking},
    cart::{Cart, CartError, CartLineItem, CartProduct},
    config::{ConfigurationError, OrderingConfig},
    dispatch::{Dispatch, TracingDispatcher, deep_link},
    order::{
        CheckoutForm, CheckoutSession, ComposedOrder, Customer, Field, FieldErrors, OrderComposer,
        OrderError, OrderRequest, PaymentMethod, PlacedOrder, SubmissionState, ValidationError,
    },
    storage::{CART_STORAGE_KEY, CartStorage, FileStorage, MemoryStorage, StorageError},
    store::{CartEvent, CartStore, PersistenceWarning},
};

#[cfg(target_arch = "wasm32")]
pub use crate::{dispatch::WindowDispatcher, storage::LocalStorage};
