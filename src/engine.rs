//! Sales aggregation engine.
//!
//! This module folds parsed records into five insertion-ordered accumulators
//! and derives the report metrics from them. Every derived metric is an
//! arg-max scan with strict greater-than comparison, so among equal totals
//! the key that was seen first wins.

use indexmap::IndexMap;
use log::{debug, info, warn};
use rust_decimal::Decimal;
use std::hash::Hash;

use crate::error::AggregateError;
use crate::parser::{self, ParsedLine};
use crate::types::{
    Amount, Analysis, Date, Hour, LineStats, MalformedPolicy, ParsedTransaction, ProductId,
    Quantity, Report, SalesValue, SalesVolume, StaffId, Summable, Tally,
};

/// Running per-key sums for one aggregation run.
///
/// Keys keep the order in which they were first seen; that order decides ties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Accumulators {
    volume_by_date: IndexMap<Date, Tally<Quantity>>,
    value_by_date: IndexMap<Date, Tally<Amount>>,
    quantity_by_product: IndexMap<ProductId, Tally<Quantity>>,
    amount_by_staff: IndexMap<StaffId, Tally<Amount>>,
    volume_by_date_hour: IndexMap<(Date, Hour), Tally<Quantity>>,
}

impl Accumulators {
    /// Folds one transaction into every accumulator.
    pub fn add(&mut self, tx: ParsedTransaction) {
        bump(&mut self.volume_by_date, tx.date.clone(), tx.total_quantity);
        bump(&mut self.value_by_date, tx.date.clone(), tx.amount);
        for item in tx.line_items {
            bump(&mut self.quantity_by_product, item.product_id, item.quantity);
        }
        bump(&mut self.amount_by_staff, tx.staff_id, tx.amount);
        bump(
            &mut self.volume_by_date_hour,
            (tx.date, tx.hour),
            tx.total_quantity,
        );
    }

    /// Adds another set of partial sums into this one.
    ///
    /// Keys that are new to `self` are appended in `other`'s order, so merging
    /// partials in input order keeps first-seen tie-breaking intact.
    pub fn merge(&mut self, other: Accumulators) {
        merge_into(&mut self.volume_by_date, other.volume_by_date);
        merge_into(&mut self.value_by_date, other.value_by_date);
        merge_into(&mut self.quantity_by_product, other.quantity_by_product);
        merge_into(&mut self.amount_by_staff, other.amount_by_staff);
        merge_into(&mut self.volume_by_date_hour, other.volume_by_date_hour);
    }

    /// True if no record has been folded in yet.
    pub fn is_empty(&self) -> bool {
        self.volume_by_date.is_empty()
    }

    /// Derives the five report metrics without modifying the accumulators.
    pub fn derive(&self) -> Report {
        let (volume_date, volume) = arg_max(&self.volume_by_date);
        let (value_date, value) = arg_max(&self.value_by_date);
        let (product_id, _) = arg_max(&self.quantity_by_product);
        let (staff_id, _) = arg_max(&self.amount_by_staff);
        let averages = self.hourly_average_by_date();
        let (peak_date, _) = arg_max(&averages);

        Report {
            max_sales_volume: SalesVolume {
                date: volume_date.cloned().unwrap_or_default(),
                volume,
            },
            max_sales_value: SalesValue {
                date: value_date.cloned().unwrap_or_default(),
                value,
            },
            best_sold_product_id: product_id.cloned().unwrap_or_default(),
            best_selling_staff_id: staff_id.cloned().unwrap_or_default(),
            peak_sales_hour_date: peak_date.copied().cloned().unwrap_or_default(),
        }
    }

    /// Average volume per date over the hours that actually have sales.
    ///
    /// The divisor is the number of distinct hours seen for the date, not 24.
    fn hourly_average_by_date(&self) -> IndexMap<&Date, Tally<Decimal>> {
        let mut per_date: IndexMap<&Date, (Tally<Quantity>, u32)> = IndexMap::new();
        for ((date, _hour), volume) in &self.volume_by_date_hour {
            let (total, hours) = per_date.entry(date).or_default();
            *total = total.add(*volume);
            *hours += 1;
        }

        per_date
            .into_iter()
            .map(|(date, (total, hours))| {
                let average = total
                    .value()
                    .and_then(|total| Decimal::from(total).checked_div(Decimal::from(hours)))
                    .map_or(Tally::Poisoned, Tally::Value);
                (date, average)
            })
            .collect()
    }
}

/// Adds `delta` to the bucket for `key`, starting from zero.
fn bump<K, T>(map: &mut IndexMap<K, Tally<T>>, key: K, delta: Tally<T>)
where
    K: Hash + Eq,
    T: Summable,
{
    let slot = map.entry(key).or_default();
    let before = *slot;
    *slot = before.add(delta);
    if slot.is_poisoned() && !before.is_poisoned() && !delta.is_poisoned() {
        warn!("Overflow while accumulating, bucket is now poisoned");
    }
}

fn merge_into<K, T>(target: &mut IndexMap<K, Tally<T>>, source: IndexMap<K, Tally<T>>)
where
    K: Hash + Eq,
    T: Summable,
{
    for (key, tally) in source {
        bump(target, key, tally);
    }
}

/// Returns the first key whose value is strictly greater than every earlier one.
///
/// The running best starts at zero, so if nothing is positive the result is
/// `(None, 0)`. Poisoned buckets never win.
fn arg_max<'a, K, T>(map: &'a IndexMap<K, Tally<T>>) -> (Option<&'a K>, T)
where
    T: Summable,
{
    map.iter()
        .fold((None, T::default()), |(best_key, best), (key, tally)| match tally {
            Tally::Value(value) if *value > best => (Some(key), *value),
            _ => (best_key, best),
        })
}

/// Stateful driver that parses and accumulates lines one at a time.
///
/// Line numbers in errors are 1-based and count every line pushed into this
/// aggregator.
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    policy: MalformedPolicy,
    accumulators: Accumulators,
    stats: LineStats,
    line: usize,
}

impl Aggregator {
    /// Creates an empty aggregator that treats malformed lines according to `policy`.
    pub fn new(policy: MalformedPolicy) -> Self {
        Aggregator {
            policy,
            ..Default::default()
        }
    }

    /// Parses `raw` and folds it into the accumulators.
    ///
    /// # Errors
    ///
    /// Only under [`MalformedPolicy::FailFast`], when the line is malformed.
    pub fn push(&mut self, raw: &str) -> Result<(), AggregateError> {
        self.line += 1;
        match parser::parse_line(raw, self.policy) {
            Ok(ParsedLine {
                transaction,
                defects,
            }) => {
                for defect in &defects {
                    warn!("Line {}: {} ({:?} policy)", self.line, defect, self.policy);
                }
                if !defects.is_empty() {
                    match self.policy {
                        MalformedPolicy::Zero => self.stats.repaired += 1,
                        MalformedPolicy::Poison => self.stats.poisoned += 1,
                        MalformedPolicy::Skip | MalformedPolicy::FailFast => {}
                    }
                }
                self.accumulators.add(transaction);
                self.stats.accepted += 1;
                Ok(())
            }
            Err(reason) if self.policy == MalformedPolicy::FailFast => {
                Err(AggregateError::Malformed {
                    line: self.line,
                    reason,
                })
            }
            Err(reason) => {
                warn!("Skipping line {}: {}", self.line, reason);
                self.stats.skipped += 1;
                Ok(())
            }
        }
    }

    /// Absorbs a partial aggregation, e.g. one built from a separate input file.
    pub fn merge(&mut self, other: Aggregator) {
        self.accumulators.merge(other.accumulators);
        self.stats.merge(other.stats);
    }

    /// Line counters accumulated so far.
    pub fn stats(&self) -> LineStats {
        self.stats
    }

    /// Derives the report and consumes the accumulators.
    pub fn finish(self) -> Analysis {
        if self.accumulators.is_empty() {
            info!("No records accumulated, report holds sentinel defaults");
        }
        debug!(
            "Deriving metrics from {} accepted lines ({} skipped)",
            self.stats.accepted, self.stats.skipped
        );
        Analysis {
            report: self.accumulators.derive(),
            stats: self.stats,
        }
    }
}

/// Aggregates a sequence of raw record lines into the five report metrics.
///
/// An empty sequence is valid and yields the sentinel [`Report::default`].
///
/// # Errors
///
/// Only under [`MalformedPolicy::FailFast`], on the first malformed line.
///
/// # Examples
///
/// ```
/// use sales_digest::engine::aggregate;
/// use sales_digest::types::MalformedPolicy;
///
/// let lines = ["S1,2023-01-01T09:15:00,[A:2|B:1],30.0"];
/// let analysis = aggregate(lines, MalformedPolicy::Skip).unwrap();
/// assert_eq!(analysis.report.best_sold_product_id, "A");
/// ```
pub fn aggregate<I, S>(lines: I, policy: MalformedPolicy) -> Result<Analysis, AggregateError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut aggregator = Aggregator::new(policy);
    for line in lines {
        aggregator.push(line.as_ref())?;
    }
    Ok(aggregator.finish())
}
