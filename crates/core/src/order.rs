//! Orders
//!
//! Checkout validation, message composition and the per-submission state
//! machine.

pub mod composer;
pub mod message;
pub mod session;
pub mod template;
pub mod validation;

pub use composer::{
    ClearCartError, ComposedOrder, DEFAULT_ORDER_ID_PREFIX, OrderComposer, OrderError,
    OrderRequest, PlacedOrder,
};
pub use session::{CheckoutSession, SubmissionState};
pub use template::{OrderVars, Placeholder, render_template};
pub use validation::{
    CheckoutForm, Customer, Field, FieldErrors, PaymentMethod, ValidationError, validate,
};
