//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Campaign Diagnostic - quadrant reports for contact-center campaigns
///
/// Reads an exported performance base (CSV or spreadsheet JSON), aggregates
/// CSAT and adherence per business and campaign, flags campaigns below the
/// global baselines and renders one diagnostic per configured audience.
///
/// Examples:
///   campaign-diagnostic --input base.csv
///   campaign-diagnostic --input base.csv --business Retail
///   campaign-diagnostic --input values.json --target slack
///   campaign-diagnostic --input base.csv --dry-run
///   campaign-diagnostic --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Performance table to analyze (.csv, or .json in spreadsheet values shape)
    #[arg(short, long, value_name = "FILE", required_unless_present = "init_config")]
    pub input: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .diagnostic.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Only render these configured audiences (repeatable)
    #[arg(short, long = "audience", value_name = "ID")]
    pub audiences: Vec<String>,

    /// Render a single ad-hoc report for this business
    ///
    /// Replaces the configured audience list.
    #[arg(short, long, value_name = "NAME")]
    pub business: Option<String>,

    /// Where to deliver the rendered reports
    #[arg(short, long, value_name = "TARGET")]
    pub target: Option<DeliveryTarget>,

    /// Directory for the `directory` target
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output format for stdout and directory targets
    #[arg(long, default_value = "text", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// CSV field delimiter
    #[arg(long, value_name = "CHAR")]
    pub delimiter: Option<char>,

    /// Cut-off date printed in the report (YYYY-MM-DD, defaults to today)
    #[arg(long, value_name = "DATE")]
    pub date: Option<chrono::NaiveDate>,

    /// Minimum records a campaign needs before it can be flagged
    #[arg(long, value_name = "COUNT")]
    pub min_campaign_records: Option<usize>,

    /// Q1+Q2 share (percent) at which the report adds its marker
    #[arg(long, value_name = "PCT")]
    pub healthy_share: Option<f64>,

    /// Cover image URL attached to every message
    #[arg(long, value_name = "URL")]
    pub image_url: Option<String>,

    /// Slack bot token for the `slack` target
    #[arg(long, env = "SLACK_BOT_TOKEN", hide_env_values = true)]
    pub slack_token: Option<String>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Dry run: load the table and show the column mapping, render nothing
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .diagnostic.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for rendered messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Plain text (default)
    #[default]
    Text,
    /// JSON with the message and the underlying result
    Json,
}

/// Destination of rendered messages.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryTarget {
    /// Print to standard output (default)
    #[default]
    Stdout,
    /// One file per audience in the output directory
    Directory,
    /// Slack chat.postMessage, channel = audience id
    Slack,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(ref input) = self.input {
            if !input.is_file() {
                return Err(format!("Input file does not exist: {}", input.display()));
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.business.is_some() && !self.audiences.is_empty() {
            return Err("Cannot use both --business and --audience".to_string());
        }

        if let Some(ref business) = self.business {
            if business.trim().is_empty() {
                return Err("Business name must not be blank".to_string());
            }
        }

        if let Some(share) = self.healthy_share {
            if !(0.0..=100.0).contains(&share) {
                return Err("Healthy share must be between 0 and 100".to_string());
            }
        }

        if self.min_campaign_records == Some(0) {
            return Err("Minimum campaign records must be at least 1".to_string());
        }

        if let Some(delimiter) = self.delimiter {
            if !delimiter.is_ascii() {
                return Err("Delimiter must be an ASCII character".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            input: None,
            config: None,
            audiences: Vec::new(),
            business: None,
            target: None,
            output_dir: None,
            format: OutputFormat::Text,
            delimiter: None,
            date: None,
            min_campaign_records: None,
            healthy_share: None,
            image_url: None,
            slack_token: None,
            verbose: false,
            quiet: false,
            dry_run: false,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_from_command_line() {
        let args = Args::try_parse_from([
            "campaign-diagnostic",
            "--input",
            "base.csv",
            "--audience",
            "C1",
            "--audience",
            "C2",
            "--target",
            "directory",
            "--date",
            "2025-04-30",
        ])
        .unwrap();

        assert_eq!(args.input, Some(PathBuf::from("base.csv")));
        assert_eq!(args.audiences, vec!["C1", "C2"]);
        assert_eq!(args.target, Some(DeliveryTarget::Directory));
        assert_eq!(args.date, chrono::NaiveDate::from_ymd_opt(2025, 4, 30));
        assert_eq!(args.format, OutputFormat::Text);
    }

    #[test]
    fn test_input_required_unless_init_config() {
        assert!(Args::try_parse_from(["campaign-diagnostic"]).is_err());
        assert!(Args::try_parse_from(["campaign-diagnostic", "--init-config"]).is_ok());
    }

    #[test]
    fn test_validation_missing_input() {
        let mut args = make_args();
        args.input = Some(PathBuf::from("/nonexistent/base.csv"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.business = Some("Retail".to_string());
        args.audiences = vec!["C1".to_string()];
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_ranges() {
        let mut args = make_args();
        args.healthy_share = Some(120.0);
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.min_campaign_records = Some(0);
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.min_campaign_records = Some(2);
        args.healthy_share = Some(25.0);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
