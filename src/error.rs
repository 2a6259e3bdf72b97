//! Error types for record parsing and aggregation.
//!
//! `thiserror` covers the library-level failures; the binary and the
//! record source propagate them through `anyhow` with file context attached.

use thiserror::Error;

/// Why a single record line could not be parsed cleanly.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MalformedLine {
    #[error("expected 4 comma-separated fields, found {0}")]
    FieldCount(usize),

    #[error("timestamp '{0}' has no 'T' separator between date and time")]
    Timestamp(String),

    #[error("product list '{0}' is missing its enclosing delimiters")]
    ProductList(String),

    #[error("quantity '{quantity}' for product '{product_id}' is not an integer")]
    Quantity { product_id: String, quantity: String },

    #[error("amount '{0}' is not a number")]
    Amount(String),
}

impl MalformedLine {
    /// True for defects in a numeric field, which [`crate::types::MalformedPolicy::Zero`]
    /// and [`crate::types::MalformedPolicy::Poison`] can recover from.
    pub fn is_numeric(&self) -> bool {
        matches!(self, MalformedLine::Quantity { .. } | MalformedLine::Amount(_))
    }
}

/// Errors that abort an aggregation run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AggregateError {
    #[error("malformed record at line {line}: {reason}")]
    Malformed {
        line: usize,
        #[source]
        reason: MalformedLine,
    },
}
