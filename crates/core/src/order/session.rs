//! Checkout session
//!
//! Tracks a single checkout through
//! `Idle → Validating → {Invalid | ConfigMissing | Composing → Dispatched}`.
//! A failed attempt leaves the session idle with the error attached, so the
//! customer can fix the form and submit again.

use std::fmt;

use tracing::debug;

use crate::{
    config::{OrderingConfig, require_phone_digits},
    dispatch::Dispatch,
    order::{
        composer::{ClearCartError, OrderComposer, OrderError, OrderRequest, PlacedOrder},
        validation::{CheckoutForm, FieldErrors, PaymentMethod},
    },
    storage::CartStorage,
    store::CartStore,
};

/// Where a submission currently is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SubmissionState {
    /// Waiting for a submit
    #[default]
    Idle,

    /// Checking configuration, fields and cart
    Validating,

    /// A field, the payment method or the cart was rejected
    Invalid,

    /// No ordering destination is configured
    ConfigMissing,

    /// Building the message and link
    Composing,

    /// The link was handed to the dispatcher
    Dispatched,
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SubmissionState::Idle => "idle",
            SubmissionState::Validating => "validating",
            SubmissionState::Invalid => "invalid",
            SubmissionState::ConfigMissing => "config-missing",
            SubmissionState::Composing => "composing",
            SubmissionState::Dispatched => "dispatched",
        };

        f.write_str(name)
    }
}

/// State for one checkout page.
#[derive(Debug, Default)]
pub struct CheckoutSession {
    composer: OrderComposer,
    state: SubmissionState,
    last_attempt: Vec<SubmissionState>,
    last_error: Option<OrderError>,
    placed: Option<PlacedOrder>,
}

impl CheckoutSession {
    /// Create an idle session.
    pub fn new(composer: OrderComposer) -> Self {
        Self {
            composer,
            ..Self::default()
        }
    }

    /// Current state.
    pub fn state(&self) -> SubmissionState {
        self.state
    }

    /// States visited by the most recent attempt, in order.
    pub fn last_attempt(&self) -> &[SubmissionState] {
        &self.last_attempt
    }

    /// Error from the most recent failed attempt.
    pub fn last_error(&self) -> Option<&OrderError> {
        self.last_error.as_ref()
    }

    /// Field errors from the most recent attempt, if it failed validation.
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match &self.last_error {
            Some(OrderError::Invalid(errors)) => Some(errors),
            _ => None,
        }
    }

    /// The dispatched order, once there is one.
    pub fn placed_order(&self) -> Option<&PlacedOrder> {
        self.placed.as_ref()
    }

    /// Check whether a submit would be attempted.
    pub fn can_submit(&self) -> bool {
        self.state == SubmissionState::Idle
    }

    /// Return to idle, forgetting any previous attempt or order.
    pub fn reset(&mut self) {
        self.state = SubmissionState::Idle;
        self.last_attempt.clear();
        self.last_error = None;
        self.placed = None;
    }

    /// Validate the form and cart, then compose and dispatch the order.
    ///
    /// Checks run in order: configuration, form fields and payment method,
    /// then the cart. On success the cart is cleared and the session stays
    /// [`SubmissionState::Dispatched`] until [`CheckoutSession::reset`].
    ///
    /// # Errors
    ///
    /// - [`OrderError::AlreadyDispatched`]: this session already placed its order.
    /// - [`OrderError::Configuration`]: `config` has no usable phone number.
    /// - [`OrderError::Invalid`]: one or more fields are invalid.
    /// - [`OrderError::PaymentMethodUnavailable`]: card payment was selected.
    /// - [`OrderError::EmptyCart`]: the cart has no items.
    pub fn submit<S, D>(
        &mut self,
        config: Option<&OrderingConfig>,
        form: &CheckoutForm,
        store: &mut CartStore<S>,
        dispatcher: &D,
    ) -> Result<PlacedOrder, OrderError>
    where
        S: CartStorage,
        D: Dispatch + ?Sized,
    {
        if self.state == SubmissionState::Dispatched {
            return Err(OrderError::AlreadyDispatched);
        }

        self.last_attempt.clear();
        self.last_error = None;
        self.transition(SubmissionState::Validating);

        if let Err(error) = require_phone_digits(config) {
            return Err(self.fail(SubmissionState::ConfigMissing, error.into()));
        }

        let errors = form.validate();

        if !errors.is_empty() {
            return Err(self.fail(SubmissionState::Invalid, OrderError::Invalid(errors)));
        }

        if form.payment_method == PaymentMethod::Card {
            return Err(self.fail(
                SubmissionState::Invalid,
                OrderError::PaymentMethodUnavailable(PaymentMethod::Card),
            ));
        }

        if store.cart().is_empty() {
            return Err(self.fail(SubmissionState::Invalid, OrderError::EmptyCart));
        }

        self.transition(SubmissionState::Composing);

        let customer = form.customer();
        let items = store.items().to_vec();
        let request = OrderRequest {
            customer: &customer,
            items: &items,
            order_id: None,
        };

        let clear_cart = || -> Result<(), ClearCartError> {
            store.clear();

            match store.warning() {
                Some(warning) => Err(warning.to_string().into()),
                None => Ok(()),
            }
        };

        match self
            .composer
            .place_order(config, &request, dispatcher, Some(clear_cart))
        {
            Ok(placed) => {
                self.transition(SubmissionState::Dispatched);
                self.placed = Some(placed.clone());

                Ok(placed)
            }
            Err(error) => Err(self.fail(SubmissionState::Invalid, error)),
        }
    }

    fn transition(&mut self, next: SubmissionState) {
        debug!(from = %self.state, to = %next, "checkout state transition");

        self.state = next;
        self.last_attempt.push(next);
    }

    fn fail(&mut self, outcome: SubmissionState, error: OrderError) -> OrderError {
        self.transition(outcome);

        debug!(error = %error, "checkout attempt failed");

        self.state = SubmissionState::Idle;
        self.last_error = Some(error.clone());

        error
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use rust_decimal::Decimal;
    use rusty_money::iso;
    use testresult::TestResult;

    use crate::{
        cart::CartProduct,
        config::ConfigurationError,
        order::validation::{Field, ValidationError},
        storage::MemoryStorage,
    };

    use super::*;

    fn form() -> CheckoutForm {
        CheckoutForm {
            name: "Jane Doe".to_string(),
            email: "jane@example.com".to_string(),
            phone: "+961 70 000 000".to_string(),
            address: "Beirut".to_string(),
            note: String::new(),
            payment_method: PaymentMethod::Cash,
        }
    }

    fn config() -> OrderingConfig {
        OrderingConfig::new("+96176061065")
    }

    fn stocked_store() -> TestResult<CartStore<MemoryStorage>> {
        let mut store = CartStore::new(MemoryStorage::new(), iso::USD);

        store.add_item(CartProduct::new("gi", "Gi", Decimal::from(149)), 1)?;

        Ok(store)
    }

    #[test]
    fn successful_submit_dispatches_and_clears() -> TestResult {
        let mut store = stocked_store()?;
        let mut session = CheckoutSession::default();
        let sent = RefCell::new(Vec::new());
        let dispatcher = |url: &str| sent.borrow_mut().push(url.to_string());

        let placed = session.submit(Some(&config()), &form(), &mut store, &dispatcher)?;

        assert!(placed.cart_cleared);
        assert!(store.cart().is_empty());
        assert_eq!(session.state(), SubmissionState::Dispatched);
        assert_eq!(
            session.last_attempt(),
            [
                SubmissionState::Validating,
                SubmissionState::Composing,
                SubmissionState::Dispatched
            ]
        );
        assert_eq!(sent.into_inner(), [placed.order.url]);

        Ok(())
    }

    #[test]
    fn missing_config_is_checked_first() {
        let mut store = CartStore::new(MemoryStorage::new(), iso::USD);
        let mut session = CheckoutSession::default();
        let sent = RefCell::new(Vec::<String>::new());
        let dispatcher = |url: &str| sent.borrow_mut().push(url.to_string());

        let result = session.submit(None, &CheckoutForm::default(), &mut store, &dispatcher);

        assert_eq!(
            result,
            Err(OrderError::Configuration(ConfigurationError::MissingPhone))
        );
        assert_eq!(session.state(), SubmissionState::Idle);
        assert_eq!(
            session.last_attempt(),
            [SubmissionState::Validating, SubmissionState::ConfigMissing]
        );
        assert!(sent.into_inner().is_empty());
    }

    #[test]
    fn invalid_fields_leave_cart_untouched() -> TestResult {
        let mut store = stocked_store()?;
        let mut session = CheckoutSession::default();
        let sent = RefCell::new(Vec::<String>::new());
        let dispatcher = |url: &str| sent.borrow_mut().push(url.to_string());
        let form = CheckoutForm {
            email: "nope".to_string(),
            ..form()
        };

        let result = session.submit(Some(&config()), &form, &mut store, &dispatcher);

        assert!(matches!(result, Err(OrderError::Invalid(_))));
        assert_eq!(
            session
                .field_errors()
                .and_then(|errors| errors.get(Field::Email)),
            Some(ValidationError::InvalidEmail)
        );
        assert_eq!(store.count(), 1);
        assert!(session.can_submit());
        assert!(sent.into_inner().is_empty());

        Ok(())
    }

    #[test]
    fn fields_are_checked_before_cart() {
        let mut store = CartStore::new(MemoryStorage::new(), iso::USD);
        let mut session = CheckoutSession::default();
        let dispatcher = |_: &str| {};

        let result = session.submit(
            Some(&config()),
            &CheckoutForm::default(),
            &mut store,
            &dispatcher,
        );

        assert!(matches!(result, Err(OrderError::Invalid(_))));

        let result = session.submit(Some(&config()), &form(), &mut store, &dispatcher);

        assert_eq!(result, Err(OrderError::EmptyCart));
        assert_eq!(
            session.last_error().map(OrderError::user_message),
            Some("Your cart is empty.".to_string())
        );
    }

    #[test]
    fn card_payment_is_unavailable() -> TestResult {
        let mut store = stocked_store()?;
        let mut session = CheckoutSession::default();
        let dispatcher = |_: &str| {};
        let form = CheckoutForm {
            payment_method: PaymentMethod::Card,
            ..form()
        };

        let result = session.submit(Some(&config()), &form, &mut store, &dispatcher);

        assert_eq!(
            result,
            Err(OrderError::PaymentMethodUnavailable(PaymentMethod::Card))
        );
        assert_eq!(store.count(), 1);

        Ok(())
    }

    #[test]
    fn dispatched_session_refuses_resubmit_until_reset() -> TestResult {
        let mut store = stocked_store()?;
        let mut session = CheckoutSession::default();
        let dispatcher = |_: &str| {};

        session.submit(Some(&config()), &form(), &mut store, &dispatcher)?;

        store.add_item(CartProduct::new("belt", "Belt", Decimal::from(25)), 1)?;

        assert_eq!(
            session.submit(Some(&config()), &form(), &mut store, &dispatcher),
            Err(OrderError::AlreadyDispatched)
        );
        assert!(!session.can_submit());

        session.reset();

        assert!(session.placed_order().is_none());
        assert!(
            session
                .submit(Some(&config()), &form(), &mut store, &dispatcher)
                .is_ok()
        );

        Ok(())
    }

    #[test]
    fn clear_failure_still_dispatches() -> TestResult {
        let mut store = stocked_store()?;

        // Any write fails once the quota is below the key length.
        store.storage_mut().set_quota(Some(8));

        let mut session = CheckoutSession::default();
        let sent = RefCell::new(Vec::new());
        let dispatcher = |url: &str| sent.borrow_mut().push(url.to_string());

        let placed = session.submit(Some(&config()), &form(), &mut store, &dispatcher)?;

        assert!(!placed.cart_cleared);
        assert!(store.cart().is_empty());
        assert!(store.warning().is_some());
        assert_eq!(session.state(), SubmissionState::Dispatched);
        assert_eq!(sent.into_inner().len(), 1);

        Ok(())
    }
}
