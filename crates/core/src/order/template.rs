//! Message templates
//!
//! Templates contain `{token}` placeholders, where a token is one or more
//! ASCII letters, digits or underscores. Known tokens are replaced with the
//! order's values and unknown tokens with nothing. Anything else, including
//! unbalanced braces, is copied through unchanged.

/// Placeholders a template may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// `{orderId}`
    OrderId,

    /// `{name}`
    Name,

    /// `{email}`
    Email,

    /// `{phone}`
    Phone,

    /// `{address}`
    Address,

    /// `{note}`, empty when there is no note
    Note,

    /// `{items}` (also accepted as `{itemsText}`)
    Items,

    /// `{total}`, formatted to two decimal places
    Total,

    /// `{currency}`
    Currency,
}

impl Placeholder {
    /// Every placeholder, in the order the default message uses them.
    pub const ALL: [Placeholder; 9] = [
        Placeholder::OrderId,
        Placeholder::Name,
        Placeholder::Phone,
        Placeholder::Email,
        Placeholder::Address,
        Placeholder::Note,
        Placeholder::Items,
        Placeholder::Total,
        Placeholder::Currency,
    ];

    /// Canonical token name, without braces.
    pub fn token(self) -> &'static str {
        match self {
            Placeholder::OrderId => "orderId",
            Placeholder::Name => "name",
            Placeholder::Email => "email",
            Placeholder::Phone => "phone",
            Placeholder::Address => "address",
            Placeholder::Note => "note",
            Placeholder::Items => "items",
            Placeholder::Total => "total",
            Placeholder::Currency => "currency",
        }
    }

    /// Look up a token name.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "itemsText" => Some(Placeholder::Items),
            _ => Self::ALL
                .into_iter()
                .find(|placeholder| placeholder.token() == token),
        }
    }
}

/// Values substituted into an order message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderVars {
    /// Order reference
    pub order_id: String,

    /// Customer name
    pub name: String,

    /// Customer email
    pub email: String,

    /// Customer phone
    pub phone: String,

    /// Delivery address
    pub address: String,

    /// Optional note
    pub note: Option<String>,

    /// Itemised list, one line per item
    pub items_text: String,

    /// Order total, already formatted
    pub total: String,

    /// Currency code
    pub currency: String,
}

impl OrderVars {
    /// Value for a placeholder.
    pub fn value(&self, placeholder: Placeholder) -> &str {
        match placeholder {
            Placeholder::OrderId => &self.order_id,
            Placeholder::Name => &self.name,
            Placeholder::Email => &self.email,
            Placeholder::Phone => &self.phone,
            Placeholder::Address => &self.address,
            Placeholder::Note => self.note.as_deref().unwrap_or_default(),
            Placeholder::Items => &self.items_text,
            Placeholder::Total => &self.total,
            Placeholder::Currency => &self.currency,
        }
    }
}

/// Substitute `{token}` placeholders in `template`.
pub fn render_template(template: &str, vars: &OrderVars) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        let (literal, from_brace) = rest.split_at(open);
        rendered.push_str(literal);

        let after_brace = from_brace.strip_prefix('{').unwrap_or(from_brace);

        match after_brace.split_once('}') {
            Some((token, tail)) if is_token(token) => {
                if let Some(placeholder) = Placeholder::from_token(token) {
                    rendered.push_str(vars.value(placeholder));
                }

                rest = tail;
            }
            _ => {
                rendered.push('{');
                rest = after_brace;
            }
        }
    }

    rendered.push_str(rest);
    rendered
}

fn is_token(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate
            .bytes()
            .all(|byte| byte.is_ascii_alphanumeric() || byte == b'_')
}
