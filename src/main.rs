//! Sales analysis application.
//!
//! This program reads every transaction file in a directory, aggregates the
//! records, and prints a report of the five headline sales metrics to stdout.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- transactionFiles
//! ```
//!
//! # Input Format
//!
//! Each non-blank line of a `.txt` file is one transaction with four
//! comma-separated fields:
//! - `staffId`: Staff member who made the sale
//! - `timestamp`: ISO timestamp, e.g. `2023-01-01T09:15:00`
//! - `products`: Bracketed, pipe-separated `productId:quantity` entries
//! - `amount`: Total amount of the sale
//!
//! # Output Format
//!
//! A text report by default, a single CSV row with `--format csv`, or JSON
//! with camelCase field names (`maxSalesVolume`, ...) with `--format json`:
//! - `max_sales_volume_date`, `max_sales_volume`: Day with the most units sold
//! - `max_sales_value_date`, `max_sales_value`: Day with the highest sales value
//! - `best_sold_product_id`: Product with the highest total quantity
//! - `best_selling_staff_id`: Staff member with the highest total amount
//! - `peak_sales_hour_date`: Day with the highest average hourly volume
//!
//! # Examples
//!
//! Drop malformed records instead of poisoning their totals, and print CSV:
//! ```bash
//! cargo run -- transactionFiles --policy skip --format csv
//! ```
//!
//! Stop at the first malformed record:
//! ```bash
//! cargo run -- transactionFiles --policy fail-fast
//! ```
use anyhow::Result;
use clap::Parser;
use env_logger::Env;
use std::io;

use sales_digest::config::Config;
use sales_digest::io::{RecordSource, write_report};

/// Main entry point for the sales analysis application.
///
/// # Errors
///
/// This function will return an error if:
/// - The source directory or a transaction file cannot be read
/// - A record is malformed and the policy is `fail-fast`
/// - Writing the report to stdout fails
fn main() -> Result<()> {
    let config = Config::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(config.log_filter())).init();

    let source = RecordSource::new(&config.source_dir, &config.extension);
    let analysis = source.analyze(config.policy)?;

    write_report(&analysis.report, config.format, io::stdout().lock())?;

    Ok(())
}
