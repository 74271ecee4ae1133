//! Deep-link construction and dispatch

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use tracing::info;

/// Base of the messaging deep link.
pub const WHATSAPP_BASE_URL: &str = "https://wa.me";

/// Characters left alone by JavaScript's `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode `value` the same way `encodeURIComponent` does.
pub fn encode_uri_component(value: &str) -> String {
    utf8_percent_encode(value, URI_COMPONENT).to_string()
}

/// Build `https://wa.me/<digits>?text=<message>`.
///
/// `phone_digits` is expected to already be stripped to digits.
pub fn deep_link(phone_digits: &str, message: &str) -> String {
    format!(
        "{WHATSAPP_BASE_URL}/{phone_digits}?text={}",
        encode_uri_component(message)
    )
}

/// Side effect that hands a composed URL to the runtime.
///
/// Dispatch is fire-and-forget: it cannot fail from the caller's point of view.
pub trait Dispatch {
    /// Open or otherwise hand off `url`.
    fn dispatch(&self, url: &str);
}

impl<F> Dispatch for F
where
    F: Fn(&str),
{
    fn dispatch(&self, url: &str) {
        self(url);
    }
}

/// Dispatcher that only records the URL in the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDispatcher;

impl Dispatch for TracingDispatcher {
    fn dispatch(&self, url: &str) {
        info!(url, "order link dispatched");
    }
}

/// Opens the URL in a new browsing context.
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowDispatcher;

#[cfg(target_arch = "wasm32")]
impl Dispatch for WindowDispatcher {
    fn dispatch(&self, url: &str) {
        let Some(window) = web_sys::window() else {
            tracing::warn!(url, "no window to open order link in");
            return;
        };

        if let Err(error) =
            window.open_with_url_and_target_and_features(url, "_blank", "noopener,noreferrer")
        {
            tracing::warn!(url, error = ?error, "failed to open order link");
        }
    }
}
