//! Parsing of raw record lines.
//!
//! A record line has four comma-separated fields:
//!
//! ```text
//! staffId,YYYY-MM-DDTHH:MM:SS,[productId:quantity|productId:quantity],totalAmount
//! ```
//!
//! The product list is wrapped in one leading and one trailing delimiter
//! character which are stripped positionally, so any single character works.
//! Fields are taken literally apart from the numeric ones, which are trimmed
//! before parsing. Under [`MalformedPolicy::Poison`] numeric fields are read
//! leniently from their longest leading numeric prefix, so `"2.5"` is a
//! quantity of 2 and `"30.0abc"` an amount of 30.0.

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::MalformedLine;
use crate::types::{Amount, LineItem, MalformedPolicy, ParsedTransaction, Quantity, Tally};

/// A successfully parsed line together with the numeric defects that were
/// recovered from under [`MalformedPolicy::Zero`] or [`MalformedPolicy::Poison`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    pub transaction: ParsedTransaction,
    pub defects: Vec<MalformedLine>,
}

/// Parses one record line according to `policy`.
///
/// # Errors
///
/// Returns the first defect found if the line is structurally broken (field
/// count, timestamp or product list), or if a numeric field is invalid and the
/// policy does not allow recovering from it.
///
/// # Examples
///
/// ```
/// use sales_digest::parser::parse_line;
/// use sales_digest::types::{MalformedPolicy, Tally};
///
/// let parsed = parse_line("S1,2023-01-01T09:15:00,[A:2|B:1],30.0", MalformedPolicy::Skip).unwrap();
/// assert_eq!(parsed.transaction.date, "2023-01-01");
/// assert_eq!(parsed.transaction.hour, "09");
/// assert_eq!(parsed.transaction.total_quantity, Tally::Value(3));
/// ```
pub fn parse_line(line: &str, policy: MalformedPolicy) -> Result<ParsedLine, MalformedLine> {
    let fields: Vec<&str> = line.split(',').collect();
    match fields.len() {
        4 => {}
        3 | 5.. if policy == MalformedPolicy::Poison => {}
        n => return Err(MalformedLine::FieldCount(n)),
    }

    let staff_id = fields[0];
    let (date, hour) = split_timestamp(fields[1])?;
    let entries = match strip_delimiters(fields[2]) {
        Some(entries) => entries,
        None if policy == MalformedPolicy::Poison => "",
        None => return Err(MalformedLine::ProductList(fields[2].to_string())),
    };

    let mut defects = Vec::new();
    let mut line_items = Vec::new();
    let mut total_quantity: Tally<Quantity> = Tally::Value(0);

    for entry in entries.split('|') {
        let mut parts = entry.split(':');
        let product_id = parts.next().unwrap_or_default();
        let raw_quantity = parts.next().unwrap_or_default();

        let quantity = match parse_quantity(raw_quantity, policy) {
            Some(quantity) => Tally::Value(quantity),
            None => recover(
                policy,
                MalformedLine::Quantity {
                    product_id: product_id.to_string(),
                    quantity: raw_quantity.to_string(),
                },
                &mut defects,
            )?,
        };

        total_quantity = total_quantity.add(quantity);
        line_items.push(LineItem {
            product_id: product_id.to_string(),
            quantity,
        });
    }

    let raw_amount = fields.get(3).copied().unwrap_or_default();
    let amount = match parse_amount(raw_amount, policy) {
        Some(amount) => Tally::Value(amount),
        None => recover(
            policy,
            MalformedLine::Amount(raw_amount.to_string()),
            &mut defects,
        )?,
    };

    Ok(ParsedLine {
        transaction: ParsedTransaction {
            staff_id: staff_id.to_string(),
            date: date.to_string(),
            hour: hour.to_string(),
            line_items,
            total_quantity,
            amount,
        },
        defects,
    })
}

/// Splits `YYYY-MM-DDTHH:...` into its date and hour parts.
fn split_timestamp(timestamp: &str) -> Result<(&str, &str), MalformedLine> {
    let mut halves = timestamp.split('T');
    let date = halves.next().unwrap_or_default();
    let time = halves
        .next()
        .ok_or_else(|| MalformedLine::Timestamp(timestamp.to_string()))?;
    let hour = time.split(':').next().unwrap_or_default();
    Ok((date, hour))
}

/// Removes the first and last character, or returns `None` if there are fewer than two.
fn strip_delimiters(list: &str) -> Option<&str> {
    let mut chars = list.chars();
    chars.next()?;
    chars.next_back()?;
    Some(chars.as_str())
}

fn parse_quantity(raw: &str, policy: MalformedPolicy) -> Option<Quantity> {
    let strict = raw.trim().parse().ok();
    if strict.is_some() || policy != MalformedPolicy::Poison {
        return strict;
    }
    numeric_prefix(raw, false).parse().ok()
}

fn parse_amount(raw: &str, policy: MalformedPolicy) -> Option<Amount> {
    let strict = parse_decimal(raw.trim());
    if strict.is_some() || policy != MalformedPolicy::Poison {
        return strict;
    }
    let prefix = numeric_prefix(raw, true);
    let (negative, magnitude) = match prefix.as_bytes().first() {
        Some(b'-') => (true, &prefix[1..]),
        Some(b'+') => (false, &prefix[1..]),
        _ => (false, prefix),
    };
    let magnitude = if magnitude.starts_with('.') {
        parse_decimal(&format!("0{}", magnitude))
    } else {
        parse_decimal(magnitude)
    };
    magnitude.map(|value| if negative { -value } else { value })
}

fn parse_decimal(raw: &str) -> Option<Amount> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

/// Returns the longest leading number in `raw` after leading whitespace, or
/// `""` if it does not start with one.
///
/// Accepts an optional sign and digits; with `fractional` also a `.fraction`
/// and an `e` exponent. A trailing `.` or `e` without digits is left out.
fn numeric_prefix(raw: &str, fractional: bool) -> &str {
    let text = raw.trim_start();
    let bytes = text.as_bytes();
    let digits_from = |start: usize| {
        let mut end = start;
        while bytes.get(end).is_some_and(u8::is_ascii_digit) {
            end += 1;
        }
        end
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let integer_end = digits_from(end);
    let mut has_digits = integer_end > end;
    end = integer_end;

    if fractional {
        if bytes.get(end) == Some(&b'.') {
            let fraction_end = digits_from(end + 1);
            if fraction_end > end + 1 {
                has_digits = true;
                end = fraction_end;
            }
        }
        if has_digits && matches!(bytes.get(end), Some(b'e' | b'E')) {
            let mut exponent = end + 1;
            if matches!(bytes.get(exponent), Some(b'+' | b'-')) {
                exponent += 1;
            }
            let exponent_end = digits_from(exponent);
            if exponent_end > exponent {
                end = exponent_end;
            }
        }
    }

    if has_digits { &text[..end] } else { "" }
}

/// Applies `policy` to a numeric defect: either reject the line or substitute a fallback tally.
fn recover<T: Default>(
    policy: MalformedPolicy,
    defect: MalformedLine,
    defects: &mut Vec<MalformedLine>,
) -> Result<Tally<T>, MalformedLine> {
    debug_assert!(defect.is_numeric());
    let fallback = match policy {
        MalformedPolicy::Skip | MalformedPolicy::FailFast => return Err(defect),
        MalformedPolicy::Zero => Tally::Value(T::default()),
        MalformedPolicy::Poison => Tally::Poisoned,
    };
    defects.push(defect);
    Ok(fallback)
}
