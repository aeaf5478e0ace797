//! Parsing of free-text expense messages.
//!
//! An inbound message looks like `"lugar monto [moneda]"`, e.g. `"super 23.50 USD"`,
//! but the pieces can arrive in any order and any of them may be missing. This module
//! turns one line of that text into a [`ParsedExpense`] without ever failing: whether
//! the result is storable (are both a label and an amount present?) is the caller's
//! decision, not the parser's.

use serde::{Deserialize, Serialize};

/// The result of parsing one inbound message.
///
/// Constructed once per message and never mutated. `currency` is always present and
/// always matches `[A-Z]{3}`; `label` and `amount` are `None` when the text did not
/// contain a qualifying token.
///
/// # Examples
///
/// ```
/// # use wa_gastos::model::parse;
/// let parsed = parse("super 23.50 USD", "PAB");
/// assert_eq!(parsed.label(), Some("super"));
/// assert_eq!(parsed.amount(), Some(23.5));
/// assert_eq!(parsed.currency(), "USD");
/// ```
///
/// A decimal comma works the same as a decimal point, and the configured default
/// currency fills in when the message names none:
///
/// ```
/// # use wa_gastos::model::parse;
/// let parsed = parse("farmacia 12,30", "PAB");
/// assert_eq!(parsed.amount(), Some(12.3));
/// assert_eq!(parsed.currency(), "PAB");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ParsedExpense {
    raw: String,
    label: Option<String>,
    amount: Option<f64>,
    currency: String,
}

impl ParsedExpense {
    /// The original message text with surrounding whitespace removed.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The free-text description, or `None` if no token was left over for it.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// The amount, or `None` if no token matched the numeric grammar.
    pub fn amount(&self) -> Option<f64> {
        self.amount
    }

    /// The 3-letter uppercase currency code, from the message or the default.
    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// True when both `label` and `amount` are present, i.e. the message can be
    /// recorded as an expense.
    pub fn is_storable(&self) -> bool {
        self.label.is_some() && self.amount.is_some()
    }
}

/// Parses one message into a [`ParsedExpense`].
///
/// The text is trimmed, every comma is replaced with a period (a comma is always a
/// decimal point here, never a thousands separator, so `"1,234"` parses as `1.234`),
/// the whole string is lowercased and then split on whitespace. Tokens are scanned
/// left to right:
///
/// - the first token matching `-?\d+(\.\d+)?` fills the amount slot,
/// - the first remaining token of exactly three ASCII letters fills the currency
///   slot (uppercased),
/// - everything else, including later numeric or 3-letter tokens, becomes part of
///   the label, joined with single spaces.
///
/// `default_currency` is used verbatim (uppercased) when the message names no
/// currency; it is the caller's job to supply a sensible 3-letter code.
///
/// This function never fails. An amount that does not come out as a finite number
/// is reported as absent, not as zero or NaN.
pub fn parse(text: &str, default_currency: &str) -> ParsedExpense {
    let raw = text.trim();
    if raw.is_empty() {
        return ParsedExpense {
            raw: raw.to_string(),
            label: None,
            amount: None,
            currency: default_currency.to_uppercase(),
        };
    }

    let normalized = raw.replace(',', ".").to_lowercase();
    let mut amount: Option<f64> = None;
    let mut currency: Option<String> = None;
    let mut label_tokens: Vec<&str> = Vec::new();

    for token in normalized.split_whitespace() {
        if amount.is_none() && is_amount_token(token) {
            if let Ok(value) = token.parse::<f64>() {
                amount = Some(value);
                continue;
            }
        }
        if currency.is_none() && is_currency_token(token) {
            currency = Some(token.to_uppercase());
            continue;
        }
        label_tokens.push(token);
    }

    let label = if label_tokens.is_empty() {
        None
    } else {
        Some(label_tokens.join(" "))
    };

    ParsedExpense {
        raw: raw.to_string(),
        label,
        // An overlong digit run can overflow to infinity; treat that as no amount.
        amount: amount.filter(|a| a.is_finite()),
        currency: currency.unwrap_or_else(|| default_currency.to_uppercase()),
    }
}

/// True iff `token` is an optional leading minus, one or more digits, and optionally
/// a period followed by one or more digits. No exponents, no thousands separators,
/// no currency symbols.
fn is_amount_token(token: &str) -> bool {
    let unsigned = token.strip_prefix('-').unwrap_or(token);
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (unsigned, None),
    };
    if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    match frac_part {
        Some(frac) => !frac.is_empty() && frac.bytes().all(|b| b.is_ascii_digit()),
        None => true,
    }
}

/// True iff `token` is exactly three ASCII letters. The input is already lowercased,
/// so this accepts things like `"usd"` and rejects `"us$"` or `"café"`.
fn is_currency_token(token: &str) -> bool {
    token.len() == 3 && token.bytes().all(|b| b.is_ascii_alphabetic())
}
