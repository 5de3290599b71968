//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::analysis::Selection;
use crate::config::OutputFormat;
use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;

/// Saude Dashboard - goal tracking for health-unit production
///
/// Reads a CSV of production per unit and indicator, compares it with the
/// monthly targets at the expected pace, and writes a Markdown/JSON dashboard.
///
/// Examples:
///   saude-dashboard --data dados_saude.csv
///   saude-dashboard --units "UBS Centro,UBS Bacaxa" --export
///   saude-dashboard --reference-date 2025-09-12 --days-elapsed 12 --days-in-month 30
///   saude-dashboard --format json --output dashboard.json
///   saude-dashboard --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Production data file (CSV with Unidade, Indicador, Meta, Producao)
    ///
    /// Default: from config or dados_saude.csv
    #[arg(short, long, value_name = "FILE", env = "SAUDE_DATA_FILE")]
    pub data: Option<PathBuf>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .saude-dashboard.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Units to include (comma-separated, default: all)
    #[arg(long, value_name = "UNITS", value_delimiter = ',')]
    pub units: Option<Vec<String>>,

    /// Indicators to include (comma-separated, default: all)
    #[arg(long, value_name = "INDICATORS", value_delimiter = ',')]
    pub indicators: Option<Vec<String>>,

    /// Extraction date of the data (YYYY-MM-DD)
    #[arg(long, value_name = "DATE", env = "SAUDE_REFERENCE_DATE")]
    pub reference_date: Option<NaiveDate>,

    /// Days of the month already elapsed
    #[arg(long, value_name = "DAYS")]
    pub days_elapsed: Option<u32>,

    /// Total days in the month
    #[arg(long, value_name = "DAYS")]
    pub days_in_month: Option<u32>,

    /// Number of units listed as positive and attention points
    #[arg(long, value_name = "COUNT")]
    pub top: Option<usize>,

    /// Export the filtered records to CSV
    #[arg(long)]
    pub export: bool,

    /// Directory for the CSV export (implies --export)
    #[arg(long, value_name = "DIR")]
    pub export_dir: Option<PathBuf>,

    /// Exit with code 2 if any unit/indicator is below the expected pace
    ///
    /// Useful for scheduled checks.
    #[arg(long)]
    pub fail_on_below: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .saude-dashboard.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.top == Some(0) {
            return Err("--top must be at least 1".to_string());
        }

        if self.days_in_month == Some(0) {
            return Err("--days-in-month must be at least 1".to_string());
        }

        if let (Some(elapsed), Some(total)) = (self.days_elapsed, self.days_in_month) {
            if elapsed > total {
                return Err(format!(
                    "--days-elapsed ({}) cannot exceed --days-in-month ({})",
                    elapsed, total
                ));
            }
        }

        if let Some(ref dir) = self.export_dir {
            if dir.exists() && !dir.is_dir() {
                return Err(format!(
                    "Export path is not a directory: {}",
                    dir.display()
                ));
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

    /// Unit selection from `--units`.
    pub fn unit_selection(&self) -> Selection {
        Selection::from_list(self.units.as_deref())
    }

    /// Indicator selection from `--indicators`.
    pub fn indicator_selection(&self) -> Selection {
        Selection::from_list(self.indicators.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            data: Some(PathBuf::from("dados_saude.csv")),
            output: None,
            config: None,
            format: None,
            units: None,
            indicators: None,
            reference_date: None,
            days_elapsed: None,
            days_in_month: None,
            top: None,
            export: false,
            export_dir: None,
            fail_on_below: false,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_filters() {
        let args = Args::try_parse_from([
            "saude-dashboard",
            "--units",
            "UBS Centro,UBS Bacaxa",
            "--reference-date",
            "2025-09-12",
            "--format",
            "json",
        ])
        .unwrap();

        assert_eq!(
            args.units,
            Some(vec!["UBS Centro".to_string(), "UBS Bacaxa".to_string()])
        );
        assert_eq!(args.reference_date, NaiveDate::from_ymd_opt(2025, 9, 12));
        assert_eq!(args.format, Some(OutputFormat::Json));
        assert!(args.unit_selection().contains("UBS Centro"));
        assert!(!args.unit_selection().contains("ESF Jacone"));
        assert!(args.indicator_selection().contains("anything"));
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_calendar() {
        let mut args = make_args();
        args.days_in_month = Some(0);
        assert!(args.validate().is_err());

        args.days_in_month = Some(30);
        args.days_elapsed = Some(31);
        assert!(args.validate().is_err());

        args.days_elapsed = Some(30);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_top() {
        let mut args = make_args();
        args.top = Some(0);
        assert!(args.validate().is_err());
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
