//! Private session booking
//!
//! Booking requests go out through the same deep link as shop orders, but
//! carry a fixed message and never touch the cart.

use std::fmt::Write as _;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    config::{ConfigurationError, OrderingConfig, require_phone_digits},
    dispatch::{Dispatch, deep_link},
};

/// A request for a private session with a coach.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    /// Coach being booked
    pub coach_name: String,

    /// Customer name
    pub name: String,

    /// Customer email
    pub email: String,

    /// Customer phone
    pub phone: String,

    /// Requested date, as entered
    pub preferred_date: String,

    /// Requested time, as entered
    pub preferred_time: String,

    /// Free-text notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// Coach's hourly rate, shown in dollars
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub hourly_rate: Option<Decimal>,

    /// Discipline the customer is most interested in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_interest: Option<String>,

    /// Training goal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,

    /// Injuries or conditions the coach should know about
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medical_information: Option<String>,

    /// Typical day, for scheduling around
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_routine: Option<String>,

    /// Current training load
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_activity: Option<String>,

    /// Diet habits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutrition: Option<String>,
}

impl BookingRequest {
    /// Render the booking message. Blank optional fields are left out.
    pub fn message(&self) -> String {
        let mut message = String::from("Hello! I'd like to book a private training session.\n\n");

        _ = writeln!(message, "📋 *Booking Details:*");
        _ = writeln!(message, "Coach: {}", self.coach_name);
        _ = writeln!(message, "Date: {}", self.preferred_date);
        _ = writeln!(message, "Time: {}", self.preferred_time);

        // No rate means no line at all, not a blank one.
        if let Some(rate) = self.hourly_rate.filter(|rate| !rate.is_zero()) {
            _ = writeln!(message, "Rate: ${}/hour", rate.normalize());
        }

        _ = writeln!(message, "\n👤 *Contact Information:*");
        _ = writeln!(message, "Name: {}", self.name);
        _ = writeln!(message, "Email: {}", self.email);
        _ = writeln!(message, "Phone: {}", self.phone);

        message.push_str("\n💰 *Payment Method:* Cash (pay at gym)\n\n");

        if let Some(interest) = present(self.main_interest.as_deref()) {
            _ = write!(message, "🥊 *Main Interest:* {interest}\n\n");
        }

        if let Some(goal) = present(self.goal.as_deref()) {
            _ = write!(message, "🎯 *Main Goal:* {goal}\n\n");
        }

        let sections = [
            ("🏥 *Medical Information:*", &self.medical_information),
            ("📅 *Daily Routine:*", &self.daily_routine),
            ("💪 *Physical Activity:*", &self.physical_activity),
            ("🥗 *Diet Habits:*", &self.nutrition),
            ("📝 *Additional Notes:*", &self.notes),
        ];

        for (heading, body) in sections {
            if let Some(body) = present(body.as_deref()) {
                _ = write!(message, "{heading}\n{body}\n\n");
            }
        }

        message.push_str("Please confirm availability and let me know the next steps.");
        message
    }
}

/// A booking message and the link carrying it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedBooking {
    /// Message body
    pub message: String,

    /// Deep link carrying the message
    pub url: String,
}

/// Build the booking message and deep link.
///
/// # Errors
///
/// Returns a [`ConfigurationError`] if `config` has no usable phone number.
pub fn compose_booking(
    config: Option<&OrderingConfig>,
    request: &BookingRequest,
) -> Result<ComposedBooking, ConfigurationError> {
    let phone_digits = require_phone_digits(config)?;
    let message = request.message();
    let url = deep_link(&phone_digits, &message);

    Ok(ComposedBooking { message, url })
}

/// Compose a booking and hand it to `dispatcher`.
///
/// # Errors
///
/// Returns a [`ConfigurationError`] if `config` has no usable phone number.
/// Nothing is dispatched in that case.
pub fn book_private_session<D: Dispatch + ?Sized>(
    config: Option<&OrderingConfig>,
    request: &BookingRequest,
    dispatcher: &D,
) -> Result<ComposedBooking, ConfigurationError> {
    let booking = compose_booking(config, request)?;

    dispatcher.dispatch(&booking.url);

    info!(coach = %request.coach_name, "private session request dispatched");

    Ok(booking)
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
