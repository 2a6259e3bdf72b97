//! Core data types for sales record analysis.
//!
//! This module defines the fundamental types shared by the parser, the
//! aggregation engine and the reporters: identifiers, the per-line
//! [`ParsedTransaction`], the poison-aware [`Tally`] used by every
//! accumulator bucket, and the final [`Report`].
//!
//! # Type Aliases
//!
//! - [`StaffId`]: Identifier of the staff member who made the sale
//! - [`ProductId`]: Identifier of a sold product
//! - [`Date`]: Calendar day, `YYYY-MM-DD`, taken literally from the timestamp
//! - [`Hour`]: Hour-of-day as found in the timestamp (usually two digits)
//! - [`Quantity`]: Unit count (i64)
//! - [`Amount`]: Monetary amount (Decimal)
//!
//! # Examples
//!
//! Building a line item by hand:
//! ```
//! use sales_digest::types::{LineItem, Tally};
//!
//! let item = LineItem {
//!     product_id: "A".to_string(),
//!     quantity: Tally::Value(2),
//! };
//! assert!(!item.quantity.is_poisoned());
//! ```

use clap::ValueEnum;
use rust_decimal::Decimal;
use serde::Serialize;

pub type StaffId = String;
pub type ProductId = String;
pub type Date = String;
pub type Hour = String;
pub type Quantity = i64;
pub type Amount = Decimal;

/// A running value that is either a real number or poisoned.
///
/// A bucket becomes poisoned when a non-numeric quantity or amount is folded
/// into it under [`MalformedPolicy::Poison`], or when an addition overflows.
/// Poison is sticky: anything added to a poisoned tally stays poisoned.
/// A poisoned tally never compares greater than anything, so it can never
/// win an arg-max scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tally<T> {
    Value(T),
    Poisoned,
}

impl<T: Default> Default for Tally<T> {
    fn default() -> Self {
        Tally::Value(T::default())
    }
}

impl<T> Tally<T> {
    /// True if the tally no longer holds a usable number.
    pub fn is_poisoned(&self) -> bool {
        matches!(self, Tally::Poisoned)
    }

    /// The held number, or `None` if poisoned.
    pub fn value(self) -> Option<T> {
        match self {
            Tally::Value(value) => Some(value),
            Tally::Poisoned => None,
        }
    }
}

impl<T: Summable> Tally<T> {
    /// Adds two tallies, poisoning the result on overflow or if either side is poisoned.
    pub fn add(self, other: Tally<T>) -> Tally<T> {
        match (self, other) {
            (Tally::Value(a), Tally::Value(b)) => {
                a.checked_sum(b).map_or(Tally::Poisoned, Tally::Value)
            }
            _ => Tally::Poisoned,
        }
    }
}

/// Numeric types that can be accumulated in a [`Tally`].
pub trait Summable: Copy + Default + PartialOrd {
    fn checked_sum(self, other: Self) -> Option<Self>;
}

impl Summable for Quantity {
    fn checked_sum(self, other: Self) -> Option<Self> {
        self.checked_add(other)
    }
}

impl Summable for Amount {
    fn checked_sum(self, other: Self) -> Option<Self> {
        self.checked_add(other)
    }
}

/// How records that cannot be parsed cleanly are treated.
///
/// - **Poison**: Best-effort parsing that matches the historical reports.
///   Numeric fields are read from their longest leading numeric prefix
///   (`"2.5"` counts as 2 units, `"30.0abc"` as 30.0); a field with no numeric
///   prefix poisons every bucket it flows into. Extra fields are ignored, a
///   missing amount is poisoned and a product list too short to carry its
///   delimiters is read as empty. This is the default.
///
/// - **Skip**: Hardened mode. Drop the whole line from every accumulator and
///   count it.
///
/// - **Zero**: Treat a non-numeric quantity or amount as zero and count the
///   line as repaired. Structurally broken lines are still skipped.
///
/// - **FailFast**: Abort the run on the first malformed line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum MalformedPolicy {
    #[default]
    Poison,
    Skip,
    Zero,
    FailFast,
}

/// One `productId:quantity` entry of a record's product list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    pub product_id: ProductId,
    pub quantity: Tally<Quantity>,
}

/// A single record after parsing.
///
/// # Fields
///
/// - `staff_id`: The staff member credited with the sale, taken verbatim
/// - `date`: The part of the timestamp before the first `T`
/// - `hour`: The part of the timestamp between `T` and the next `:`
/// - `line_items`: Product entries in the order they appear on the line
/// - `total_quantity`: Sum of all line item quantities
/// - `amount`: Total monetary amount of the sale
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTransaction {
    pub staff_id: StaffId,
    pub date: Date,
    pub hour: Hour,
    pub line_items: Vec<LineItem>,
    pub total_quantity: Tally<Quantity>,
    pub amount: Tally<Amount>,
}

/// The day with the highest number of units sold.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SalesVolume {
    pub date: Date,
    pub volume: Quantity,
}

/// The day with the highest monetary sales value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SalesValue {
    pub date: Date,
    pub value: Amount,
}

/// The five derived metrics of one analysis run.
///
/// Every field falls back to its sentinel default (empty string or zero) when
/// no bucket holds a value strictly greater than zero.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub max_sales_volume: SalesVolume,
    pub max_sales_value: SalesValue,
    pub best_sold_product_id: ProductId,
    pub best_selling_staff_id: StaffId,
    pub peak_sales_hour_date: Date,
}

/// Per-run counters describing how input lines were treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineStats {
    /// Lines folded into the accumulators, including repaired and poisoned ones.
    pub accepted: usize,
    pub skipped: usize,
    pub repaired: usize,
    pub poisoned: usize,
}

impl LineStats {
    /// Adds another run's counters into these.
    pub fn merge(&mut self, other: LineStats) {
        self.accepted += other.accepted;
        self.skipped += other.skipped;
        self.repaired += other.repaired;
        self.poisoned += other.poisoned;
    }
}

/// The outcome of an aggregation run: the report plus line counters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Analysis {
    pub report: Report,
    pub stats: LineStats,
}
