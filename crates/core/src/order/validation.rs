//! Checkout form validation
//!
//! Validation is a pure function from a form to a map of field errors. It
//! never short-circuits, so every invalid field is reported at once.

use std::{collections::BTreeMap, fmt, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum number of digits accepted in a contact phone number.
pub const MIN_PHONE_DIGITS: usize = 8;

#[expect(clippy::expect_used, reason = "the pattern is a compile-time literal")]
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern should compile")
});

/// Checkout form fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    /// Full name
    Name,

    /// Email address
    Email,

    /// Contact phone number
    Phone,

    /// Delivery address
    Address,

    /// Free-text note
    Note,
}

/// A single invalid field, worded for display next to the input.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Name is blank.
    #[error("Please enter your full name.")]
    MissingName,

    /// Email does not look like `local@domain.tld`.
    #[error("Please enter a valid email.")]
    InvalidEmail,

    /// Phone has fewer than [`MIN_PHONE_DIGITS`] digits.
    #[error("Please enter a valid phone number.")]
    InvalidPhone,

    /// Address is blank.
    #[error("Please enter your delivery address.")]
    MissingAddress,
}

impl ValidationError {
    /// Field this error belongs to.
    pub fn field(self) -> Field {
        match self {
            ValidationError::MissingName => Field::Name,
            ValidationError::InvalidEmail => Field::Email,
            ValidationError::InvalidPhone => Field::Phone,
            ValidationError::MissingAddress => Field::Address,
        }
    }
}

/// Field errors keyed by field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<Field, ValidationError>);

impl FieldErrors {
    /// Record an error against its field.
    pub fn insert(&mut self, error: ValidationError) {
        self.0.insert(error.field(), error);
    }

    /// Error for `field`, if it is invalid.
    pub fn get(&self, field: Field) -> Option<ValidationError> {
        self.0.get(&field).copied()
    }

    /// Check whether `field` is invalid.
    pub fn contains(&self, field: Field) -> bool {
        self.0.contains_key(&field)
    }

    /// Check if every field is valid.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of invalid fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Invalid fields in form order.
    pub fn entries(&self) -> impl Iterator<Item = (Field, ValidationError)> + '_ {
        self.0.iter().map(|(field, error)| (*field, *error))
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;

        for error in self.0.values() {
            if !first {
                f.write_str(" ")?;
            }

            write!(f, "{error}")?;
            first = false;
        }

        Ok(())
    }
}

/// How the customer intends to pay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Cash on delivery, ordered through the messaging deep link
    #[default]
    Cash,

    /// Card payment, not offered yet
    Card,
}

/// Raw checkout form input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutForm {
    /// Full name
    pub name: String,

    /// Email address
    pub email: String,

    /// Contact phone number, any formatting
    pub phone: String,

    /// Delivery address
    pub address: String,

    /// Optional note
    #[serde(default)]
    pub note: String,

    /// Payment method
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

impl CheckoutForm {
    /// Validate every field.
    pub fn validate(&self) -> FieldErrors {
        validate(self)
    }

    /// Trimmed contact details for the order message.
    pub fn customer(&self) -> Customer {
        let note = self.note.trim();

        Customer {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: self.phone.trim().to_string(),
            address: self.address.trim().to_string(),
            note: (!note.is_empty()).then(|| note.to_string()),
        }
    }
}

/// Contact details carried into the order message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Customer {
    /// Full name
    pub name: String,

    /// Email address
    pub email: String,

    /// Contact phone number
    pub phone: String,

    /// Delivery address
    pub address: String,

    /// Optional note
    pub note: Option<String>,
}

/// Validate a checkout form.
pub fn validate(form: &CheckoutForm) -> FieldErrors {
    let mut errors = FieldErrors::default();

    if form.name.trim().is_empty() {
        errors.insert(ValidationError::MissingName);
    }

    if !is_valid_email(form.email.trim()) {
        errors.insert(ValidationError::InvalidEmail);
    }

    if digit_count(&form.phone) < MIN_PHONE_DIGITS {
        errors.insert(ValidationError::InvalidPhone);
    }

    if form.address.trim().is_empty() {
        errors.insert(ValidationError::MissingAddress);
    }

    errors
}

/// Check the basic `local@domain.tld` shape.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

fn digit_count(value: &str) -> usize {
    value.chars().filter(char::is_ascii_digit).count()
}
