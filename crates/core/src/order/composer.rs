//! Order composition
//!
//! Turns contact details and a cart snapshot into a message and deep link,
//! then hands the link to a [`Dispatch`] implementation.

use std::error::Error as StdError;

use jiff::Timestamp;
use rusty_money::{
    Money,
    iso::{self, Currency},
};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    cart::{CartLineItem, checked_subtotal},
    config::{ConfigurationError, OrderingConfig},
    dispatch::{Dispatch, deep_link},
    order::{
        message::{compose_message, format_amount, items_text},
        template::OrderVars,
        validation::{Customer, FieldErrors, PaymentMethod},
    },
};

/// Prefix for generated order references.
pub const DEFAULT_ORDER_ID_PREFIX: &str = "TEMP-";

/// Error returned by a clear-cart callback.
pub type ClearCartError = Box<dyn StdError + Send + Sync>;

/// Reasons an order cannot be placed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OrderError {
    /// No ordering destination is configured.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// There is nothing to order.
    #[error("cart is empty")]
    EmptyCart,

    /// The selected payment method cannot be used yet.
    #[error("payment method {0:?} is not available")]
    PaymentMethodUnavailable(PaymentMethod),

    /// One or more checkout fields are invalid.
    #[error("checkout form is invalid: {0}")]
    Invalid(FieldErrors),

    /// The session already dispatched its order.
    #[error("order was already dispatched")]
    AlreadyDispatched,

    /// The order total does not fit in a decimal.
    #[error("order total exceeds the supported maximum")]
    TotalOverflow,
}

impl OrderError {
    /// Text shown to the customer for this error.
    pub fn user_message(&self) -> String {
        match self {
            OrderError::Configuration(_) => "WhatsApp number not configured in backend.".to_string(),
            OrderError::EmptyCart => "Your cart is empty.".to_string(),
            OrderError::PaymentMethodUnavailable(_) => "Card payment coming soon!".to_string(),
            OrderError::Invalid(errors) => errors.to_string(),
            OrderError::AlreadyDispatched => "Your order has already been sent.".to_string(),
            OrderError::TotalOverflow => "Your order total is too large.".to_string(),
        }
    }
}

/// Input for a single order.
#[derive(Debug, Clone, Copy)]
pub struct OrderRequest<'a> {
    /// Trimmed contact details
    pub customer: &'a Customer,

    /// Cart snapshot at submit time
    pub items: &'a [CartLineItem],

    /// Explicit order reference; generated when absent
    pub order_id: Option<&'a str>,
}

/// A composed order, ready to dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedOrder {
    /// Order reference
    pub order_id: String,

    /// Message body
    pub message: String,

    /// Deep link carrying the message
    pub url: String,

    /// Sum of price × quantity
    pub total: Money<'static, Currency>,
}

/// Result of a dispatched order.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedOrder {
    /// What was dispatched
    pub order: ComposedOrder,

    /// Whether the clear-cart callback ran and succeeded
    pub cart_cleared: bool,
}

/// Composes and dispatches orders in one currency.
#[derive(Debug, Clone)]
pub struct OrderComposer {
    currency: &'static Currency,
    order_id_prefix: String,
}

impl Default for OrderComposer {
    fn default() -> Self {
        Self::new(iso::USD)
    }
}

impl OrderComposer {
    /// Create a composer for `currency` using [`DEFAULT_ORDER_ID_PREFIX`].
    pub fn new(currency: &'static Currency) -> Self {
        Self {
            currency,
            order_id_prefix: DEFAULT_ORDER_ID_PREFIX.to_string(),
        }
    }

    /// Use a different prefix for generated order references.
    #[must_use]
    pub fn with_order_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.order_id_prefix = prefix.into();
        self
    }

    /// Currency orders are priced in.
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }

    /// Generate a reference from the prefix and the current Unix time in milliseconds.
    ///
    /// References are not durable and may collide across processes.
    pub fn generate_order_id(&self) -> String {
        format!("{}{}", self.order_id_prefix, Timestamp::now().as_millisecond())
    }

    /// Build the message and deep link for an order.
    ///
    /// # Errors
    ///
    /// - [`OrderError::Configuration`]: `config` is absent or has no usable phone number.
    /// - [`OrderError::EmptyCart`]: `request.items` is empty.
    /// - [`OrderError::TotalOverflow`]: the items' total does not fit in a decimal.
    pub fn compose(
        &self,
        config: Option<&OrderingConfig>,
        request: &OrderRequest<'_>,
    ) -> Result<ComposedOrder, OrderError> {
        let Some(config) = config else {
            return Err(ConfigurationError::MissingPhone.into());
        };

        let phone_digits = config.phone_digits()?;

        if request.items.is_empty() {
            return Err(OrderError::EmptyCart);
        }

        let amount = checked_subtotal(request.items).ok_or(OrderError::TotalOverflow)?;

        let order_id = request
            .order_id
            .map_or_else(|| self.generate_order_id(), str::to_string);

        let currency_code = self.currency.iso_alpha_code;
        let customer = request.customer;

        let vars = OrderVars {
            order_id: order_id.clone(),
            name: customer.name.clone(),
            email: customer.email.clone(),
            phone: customer.phone.clone(),
            address: customer.address.clone(),
            note: customer.note.clone(),
            items_text: items_text(request.items, currency_code),
            total: format_amount(amount),
            currency: currency_code.to_string(),
        };

        let message = compose_message(config, &vars);
        let url = deep_link(&phone_digits, &message);

        Ok(ComposedOrder {
            order_id,
            message,
            url,
            total: Money::from_decimal(amount, self.currency),
        })
    }

    /// Compose an order, dispatch it, then run the optional clear-cart callback.
    ///
    /// Clearing is best-effort cleanup: a failing callback is logged and
    /// reported through [`PlacedOrder::cart_cleared`], and never undoes the
    /// dispatch.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`OrderComposer::compose`]. Nothing is
    /// dispatched in that case.
    pub fn place_order<D, F>(
        &self,
        config: Option<&OrderingConfig>,
        request: &OrderRequest<'_>,
        dispatcher: &D,
        clear_cart: Option<F>,
    ) -> Result<PlacedOrder, OrderError>
    where
        D: Dispatch + ?Sized,
        F: FnOnce() -> Result<(), ClearCartError>,
    {
        let order = self.compose(config, request)?;

        dispatcher.dispatch(&order.url);

        info!(order_id = %order.order_id, items = request.items.len(), "order dispatched");

        let cart_cleared = match clear_cart.map(|clear| clear()) {
            Some(Ok(())) => true,
            Some(Err(error)) => {
                warn!(order_id = %order.order_id, error = %error, "failed to clear cart after order");
                false
            }
            None => false,
        };

        Ok(PlacedOrder {
            order,
            cart_cleared,
        })
    }
}
