//! Input/Output operations for sales analysis.
//!
//! This module discovers transaction files in a source directory, reads their
//! non-blank lines, and writes the finished report to any writer as a
//! human-readable block, a CSV row, or JSON.

use anyhow::{Context, Result};
use clap::ValueEnum;
use log::{debug, info};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::engine::Aggregator;
use crate::types::{Amount, Analysis, MalformedPolicy, Quantity, Report};

/// A directory of transaction files.
///
/// Only regular files whose extension matches are read. Files are visited in
/// file-name order so that tie-breaking between files is reproducible.
#[derive(Debug, Clone)]
pub struct RecordSource {
    dir: PathBuf,
    extension: String,
}

impl RecordSource {
    /// Creates a source reading `*.{extension}` files from `dir`.
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        RecordSource {
            dir: dir.into(),
            extension: extension.into(),
        }
    }

    /// Lists the matching files in the source directory, sorted by file name.
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - The directory does not exist or cannot be read
    /// - A directory entry cannot be inspected
    pub fn files(&self) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read directory: {}", self.dir.display()))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry
                .with_context(|| format!("Failed to list directory: {}", self.dir.display()))?;
            let path = entry.path();
            let matches = path
                .extension()
                .is_some_and(|ext| ext == self.extension.as_str());
            if matches && path.is_file() {
                files.push(path);
            }
        }
        files.sort();

        debug!(
            "Found {} .{} file(s) in {}",
            files.len(),
            self.extension,
            self.dir.display()
        );
        Ok(files)
    }

    /// Aggregates every file in the source and derives the report.
    ///
    /// Each file is aggregated on its own and the partial results are merged
    /// in file order, so line numbers in errors are relative to their file.
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - The directory or any matching file cannot be read
    /// - A line is malformed and `policy` is [`MalformedPolicy::FailFast`]
    pub fn analyze(&self, policy: MalformedPolicy) -> Result<Analysis> {
        let mut total = Aggregator::new(policy);

        for path in self.files()? {
            let mut partial = Aggregator::new(policy);
            for line in read_lines(&path)? {
                partial
                    .push(&line)
                    .with_context(|| format!("Failed to aggregate: {}", path.display()))?;
            }
            debug!("{}: {:?}", path.display(), partial.stats());
            total.merge(partial);
        }

        let analysis = total.finish();
        let stats = analysis.stats;
        info!(
            "Aggregated {} line(s): {} skipped, {} repaired, {} poisoned",
            stats.accepted + stats.skipped,
            stats.skipped,
            stats.repaired,
            stats.poisoned
        );
        Ok(analysis)
    }
}

/// Reads a UTF-8 file and returns its lines, dropping blank ones.
///
/// Both `\n` and `\r\n` line endings are accepted.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or is not valid UTF-8.
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

    Ok(content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect())
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ReportFormat {
    #[default]
    Text,
    Csv,
    /// Nested camelCase fields: `maxSalesVolume: {date, volume}` and so on.
    Json,
}

/// Flat view of a [`Report`] for CSV output.
#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    max_sales_volume_date: &'a str,
    max_sales_volume: Quantity,
    max_sales_value_date: &'a str,
    max_sales_value: Amount,
    best_sold_product_id: &'a str,
    best_selling_staff_id: &'a str,
    peak_sales_hour_date: &'a str,
}

impl<'a> From<&'a Report> for ReportRow<'a> {
    fn from(report: &'a Report) -> Self {
        ReportRow {
            max_sales_volume_date: &report.max_sales_volume.date,
            max_sales_volume: report.max_sales_volume.volume,
            max_sales_value_date: &report.max_sales_value.date,
            max_sales_value: report.max_sales_value.value,
            best_sold_product_id: &report.best_sold_product_id,
            best_selling_staff_id: &report.best_selling_staff_id,
            peak_sales_hour_date: &report.peak_sales_hour_date,
        }
    }
}

/// Writes `report` to `writer` in the requested format.
///
/// # Errors
///
/// This function will return an error if:
/// - Serialization of the report fails
/// - Writing or flushing the output fails
pub fn write_report<W: Write>(report: &Report, format: ReportFormat, writer: W) -> Result<()> {
    match format {
        ReportFormat::Text => write_report_as_text(report, writer),
        ReportFormat::Csv => write_report_as_csv(report, writer),
        ReportFormat::Json => write_report_as_json(report, writer),
    }
}

fn write_report_as_text<W: Write>(report: &Report, mut writer: W) -> Result<()> {
    writeln!(writer, "Analytic Report:")?;
    writeln!(
        writer,
        "Highest Sales Volume in a Day: {} ({} units)",
        report.max_sales_volume.date, report.max_sales_volume.volume
    )?;
    writeln!(
        writer,
        "Highest Sales Value in a Day: {} ({})",
        report.max_sales_value.date, report.max_sales_value.value
    )?;
    writeln!(
        writer,
        "Most Sold Product ID by Quantity: {}",
        report.best_sold_product_id
    )?;
    writeln!(
        writer,
        "Highest Selling Staff ID: {}",
        report.best_selling_staff_id
    )?;
    writeln!(
        writer,
        "Day with the Highest Average Hourly Sales Volume: {}",
        report.peak_sales_hour_date
    )?;
    writer.flush().context("Failed to flush report output")?;
    Ok(())
}

fn write_report_as_csv<W: Write>(report: &Report, writer: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer
        .serialize(ReportRow::from(report))
        .context("Failed to write report record")?;
    writer.flush().context("Failed to flush report output")?;
    Ok(())
}

fn write_report_as_json<W: Write>(report: &Report, mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, report).context("Failed to serialize report")?;
    writeln!(writer)?;
    writer.flush().context("Failed to flush report output")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SalesValue, SalesVolume};
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn sample_report() -> Report {
        Report {
            max_sales_volume: SalesVolume {
                date: "2023-01-02".into(),
                volume: 5,
            },
            max_sales_value: SalesValue {
                date: "2023-01-02".into(),
                value: Decimal::from_str("50.0").unwrap(),
            },
            best_sold_product_id: "B".into(),
            best_selling_staff_id: "S1".into(),
            peak_sales_hour_date: "2023-01-02".into(),
        }
    }

    fn write_file(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn read_lines_drops_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "day.txt",
            "S1,2023-01-01T09:15:00,[A:2|B:1],30.0\r\n\n   \nS2,2023-01-01T10:05:00,[A:1],15.0\n",
        );

        let lines = read_lines(&dir.path().join("day.txt")).unwrap();

        assert_eq!(
            lines,
            vec![
                "S1,2023-01-01T09:15:00,[A:2|B:1],30.0".to_string(),
                "S2,2023-01-01T10:05:00,[A:1],15.0".to_string(),
            ]
        );
    }

    #[test]
    fn files_are_filtered_by_extension_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "b.txt", "");
        write_file(dir.path(), "a.txt", "");
        write_file(dir.path(), "notes.md", "");
        fs::create_dir(dir.path().join("nested.txt")).unwrap();

        let files = RecordSource::new(dir.path(), "txt").files().unwrap();

        assert_eq!(
            files,
            vec![dir.path().join("a.txt"), dir.path().join("b.txt")]
        );
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = RecordSource::new(dir.path().join("absent"), "txt");

        let err = source.analyze(MalformedPolicy::Skip).unwrap_err();

        assert!(err.to_string().starts_with("Failed to read directory"));
    }

    #[test]
    fn empty_directory_yields_sentinel_report() {
        let dir = tempfile::tempdir().unwrap();

        let analysis = RecordSource::new(dir.path(), "txt")
            .analyze(MalformedPolicy::Skip)
            .unwrap();

        assert_eq!(analysis.report, Report::default());
    }

    #[test]
    fn analyze_merges_files_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "01.txt",
            "S1,2023-01-01T09:15:00,[A:2|B:1],30.0\nS2,2023-01-01T10:05:00,[A:1],15.0\n",
        );
        write_file(
            dir.path(),
            "02.txt",
            "S1,2023-01-02T09:00:00,[B:5],50.0\nnot a record\n",
        );

        let analysis = RecordSource::new(dir.path(), "txt")
            .analyze(MalformedPolicy::Skip)
            .unwrap();

        assert_eq!(analysis.report, sample_report());
        assert_eq!(analysis.stats.accepted, 3);
        assert_eq!(analysis.stats.skipped, 1);
    }

    #[test]
    fn fail_fast_error_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "bad.txt", "S1,2023-01-01T09:00:00,[A:x],1\n");

        let err = RecordSource::new(dir.path(), "txt")
            .analyze(MalformedPolicy::FailFast)
            .unwrap_err();

        assert!(err.to_string().contains("bad.txt"));
        assert!(format!("{:#}", err).contains("malformed record at line 1"));
    }

    #[test]
    fn writes_report_as_csv() {
        let mut output = Vec::new();
        write_report(&sample_report(), ReportFormat::Csv, &mut output).unwrap();

        let expected = "\
max_sales_volume_date,max_sales_volume,max_sales_value_date,max_sales_value,best_sold_product_id,best_selling_staff_id,peak_sales_hour_date
2023-01-02,5,2023-01-02,50.0,B,S1,2023-01-02
";
        assert_eq!(std::str::from_utf8(&output).unwrap(), expected);
    }

    #[test]
    fn writes_report_as_text() {
        let mut output = Vec::new();
        write_report(&sample_report(), ReportFormat::Text, &mut output).unwrap();

        let expected = "\
Analytic Report:
Highest Sales Volume in a Day: 2023-01-02 (5 units)
Highest Sales Value in a Day: 2023-01-02 (50.0)
Most Sold Product ID by Quantity: B
Highest Selling Staff ID: S1
Day with the Highest Average Hourly Sales Volume: 2023-01-02
";
        assert_eq!(std::str::from_utf8(&output).unwrap(), expected);
    }

    #[test]
    fn writes_report_as_json_with_contract_field_names() {
        let mut output = Vec::new();
        write_report(&sample_report(), ReportFormat::Json, &mut output).unwrap();

        let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "maxSalesVolume": { "date": "2023-01-02", "volume": 5 },
                "maxSalesValue": { "date": "2023-01-02", "value": "50.0" },
                "bestSoldProductId": "B",
                "bestSellingStaffId": "S1",
                "peakSalesHourDate": "2023-01-02"
            })
        );
    }

    #[test]
    fn sentinel_report_renders_empty_fields() {
        let mut output = Vec::new();
        write_report(&Report::default(), ReportFormat::Csv, &mut output).unwrap();

        let rendered = std::str::from_utf8(&output).unwrap();
        assert!(rendered.ends_with("\n,0,,0,,,\n"));
    }
}
