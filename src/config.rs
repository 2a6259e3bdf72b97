//! Command-line configuration.

use clap::Parser;
use std::path::PathBuf;

use crate::io::ReportFormat;
use crate::types::MalformedPolicy;

/// Summarise daily sales from a directory of transaction files
#[derive(Parser, Debug, Clone)]
#[command(name = "sales-digest")]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Directory containing the transaction files
    #[arg(env = "SALES_DIGEST_DIR")]
    pub source_dir: PathBuf,

    /// Extension of the files to read, without the leading dot
    #[arg(short, long, default_value = "txt")]
    pub extension: String,

    /// How to treat malformed records
    #[arg(short, long, value_enum, default_value_t = MalformedPolicy::Poison)]
    pub policy: MalformedPolicy,

    /// Report output format
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Default `env_logger` filter when `RUST_LOG` is not set.
    pub fn log_filter(&self) -> &'static str {
        if self.verbose { "debug" } else { "warn" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_only_directory_is_given() {
        let config = Config::try_parse_from(["sales-digest", "data"]).unwrap();

        assert_eq!(config.source_dir, PathBuf::from("data"));
        assert_eq!(config.extension, "txt");
        assert_eq!(config.policy, MalformedPolicy::Poison);
        assert_eq!(config.format, ReportFormat::Text);
        assert_eq!(config.log_filter(), "warn");
    }

    #[test]
    fn options_are_parsed() {
        let config = Config::try_parse_from([
            "sales-digest",
            "data",
            "--extension",
            "log",
            "--policy",
            "fail-fast",
            "--format",
            "csv",
            "-v",
        ])
        .unwrap();

        assert_eq!(config.extension, "log");
        assert_eq!(config.policy, MalformedPolicy::FailFast);
        assert_eq!(config.format, ReportFormat::Csv);
        assert_eq!(config.log_filter(), "debug");
    }

    #[test]
    fn json_format_and_skip_policy_are_selectable() {
        let config =
            Config::try_parse_from(["sales-digest", "data", "-p", "skip", "-f", "json"]).unwrap();

        assert_eq!(config.policy, MalformedPolicy::Skip);
        assert_eq!(config.format, ReportFormat::Json);
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let result = Config::try_parse_from(["sales-digest", "data", "--policy", "ignore"]);
        assert!(result.is_err());
    }
}
