//! Ordering configuration
//!
//! The destination phone number and optional message template, as served by
//! the shop API's `whatsapp-config` endpoint.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The ordering destination is not configured, so orders cannot be placed.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    /// No config has been loaded, or it has no phone number.
    #[error("WhatsApp phone number is not configured")]
    MissingPhone,

    /// The configured phone number contains no digits.
    #[error("WhatsApp phone number contains no digits")]
    InvalidPhone,
}

/// Destination phone number and optional message template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderingConfig {
    /// Phone number in E.164 form, e.g. `+96176061065`
    #[serde(rename = "phoneE164", default)]
    pub phone_e164: String,

    /// Message template with `{placeholder}` tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

impl OrderingConfig {
    /// Create a config with no template.
    pub fn new(phone_e164: impl Into<String>) -> Self {
        Self {
            phone_e164: phone_e164.into(),
            template: None,
        }
    }

    /// Set the message template.
    #[must_use]
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Parse a config from YAML.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_norway::Error`] if the document is malformed.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_norway::Error> {
        serde_norway::from_str(yaml)
    }

    /// Template to render, ignoring an empty one.
    pub fn template(&self) -> Option<&str> {
        self.template.as_deref().filter(|template| !template.is_empty())
    }

    /// Digits of the phone number, in the form the deep link expects.
    ///
    /// # Errors
    ///
    /// - [`ConfigurationError::MissingPhone`]: the phone number is blank.
    /// - [`ConfigurationError::InvalidPhone`]: the phone number has no digits.
    pub fn phone_digits(&self) -> Result<String, ConfigurationError> {
        if self.phone_e164.trim().is_empty() {
            return Err(ConfigurationError::MissingPhone);
        }

        let digits: String = self
            .phone_e164
            .chars()
            .filter(char::is_ascii_digit)
            .collect();

        if digits.is_empty() {
            return Err(ConfigurationError::InvalidPhone);
        }

        Ok(digits)
    }
}

/// Digits of the phone number from an optional config.
///
/// # Errors
///
/// Returns [`ConfigurationError::MissingPhone`] if there is no config.
pub fn require_phone_digits(
    config: Option<&OrderingConfig>,
) -> Result<String, ConfigurationError> {
    config
        .ok_or(ConfigurationError::MissingPhone)?
        .phone_digits()
}
