//! Order message text

use std::fmt::Write as _;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::{
    cart::CartLineItem,
    config::OrderingConfig,
    order::template::{OrderVars, render_template},
};

/// Format an amount to two decimal places, rounding half away from zero.
pub fn format_amount(amount: Decimal) -> String {
    format!(
        "{:.2}",
        amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    )
}

/// One line per item: `• {name} × {quantity} — {line total} {currency}`.
pub fn items_text(items: &[CartLineItem], currency: &str) -> String {
    items
        .iter()
        .map(|item| {
            format!(
                "• {} × {} — {} {currency}",
                item.name,
                item.quantity,
                format_amount(item.line_total())
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Message used when no template is configured.
pub fn default_message(vars: &OrderVars) -> String {
    let mut message = String::from("Hello, I'd like to place an order.\n\n");

    // Writing to a String cannot fail.
    _ = writeln!(message, "Order: {}", vars.order_id);
    _ = writeln!(message, "Name: {}", vars.name);
    _ = writeln!(message, "Phone: {}", vars.phone);
    _ = writeln!(message, "Email: {}", vars.email);
    _ = writeln!(message, "Address: {}", vars.address);

    if let Some(note) = vars.note.as_deref().filter(|note| !note.is_empty()) {
        _ = writeln!(message, "Note: {note}");
    }

    _ = write!(
        message,
        "\nItems:\n{}\n\nTotal: *{} {}*",
        vars.items_text, vars.total, vars.currency
    );

    message
}

/// Render the configured template, or the default layout when there is none.
pub fn compose_message(config: &OrderingConfig, vars: &OrderVars) -> String {
    match config.template() {
        Some(template) => render_template(template, vars),
        None => default_message(vars),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gi() -> CartLineItem {
        CartLineItem {
            id: "1".to_string(),
            name: "Gi".to_string(),
            price: Decimal::from(149),
            quantity: 1,
            image: None,
        }
    }

    fn vars() -> OrderVars {
        OrderVars {
            order_id: "TEMP-1".to_string(),
            name: "Jane".to_string(),
            email: "jane@example.com".to_string(),
            phone: "+96170000000".to_string(),
            address: "Beirut".to_string(),
            note: None,
            items_text: items_text(&[gi()], "USD"),
            total: "149.00".to_string(),
            currency: "USD".to_string(),
        }
    }

    #[test]
    fn amounts_have_two_decimals() {
        assert_eq!(format_amount(Decimal::from(149)), "149.00");
        assert_eq!(format_amount(Decimal::new(1_005, 3)), "1.01");
        assert_eq!(format_amount(Decimal::new(89_5, 1)), "89.50");
    }

    #[test]
    fn item_lines() {
        let gloves = CartLineItem {
            id: "2".to_string(),
            name: "Gloves".to_string(),
            price: Decimal::new(89_50, 2),
            quantity: 2,
            image: None,
        };

        assert_eq!(
            items_text(&[gi(), gloves], "USD"),
            "• Gi × 1 — 149.00 USD\n• Gloves × 2 — 179.00 USD"
        );
    }

    #[test]
    fn default_message_layout() {
        assert_eq!(
            default_message(&vars()),
            "Hello, I'd like to place an order.\n\n\
             Order: TEMP-1\n\
             Name: Jane\n\
             Phone: +96170000000\n\
             Email: jane@example.com\n\
             Address: Beirut\n\
             \nItems:\n• Gi × 1 — 149.00 USD\n\n\
             Total: *149.00 USD*"
        );
    }

    #[test]
    fn default_message_includes_note_when_present() {
        let vars = OrderVars {
            note: Some("Size A2 please".to_string()),
            ..vars()
        };

        assert!(default_message(&vars).contains("Address: Beirut\nNote: Size A2 please\n"));
    }

    #[test]
    fn no_template_uses_default_layout() {
        let message = compose_message(&OrderingConfig::new("+96170000000"), &vars());

        assert!(message.contains("Total: *149.00 USD*"));
    }

    #[test]
    fn template_overrides_default_layout() {
        let config = OrderingConfig::new("+96170000000").with_template("{orderId}: {total}");

        assert_eq!(compose_message(&config, &vars()), "TEMP-1: 149.00");
    }
}
