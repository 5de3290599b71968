//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.saude-dashboard.toml` files.

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the current directory.
pub const CONFIG_FILE_NAME: &str = ".saude-dashboard.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Calendar used to compute the expected progress.
    #[serde(default)]
    pub calendar: CalendarConfig,

    /// Status classification thresholds.
    #[serde(default)]
    pub thresholds: StatusThresholds,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,

    /// CSV export settings.
    #[serde(default)]
    pub export: ExportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Production data file (CSV with Unidade, Indicador, Meta, Producao).
    #[serde(default = "default_data_file")]
    pub data_file: String,

    /// Default report output path.
    #[serde(default = "default_output")]
    pub output: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            output: default_output(),
        }
    }
}

fn default_data_file() -> String {
    "dados_saude.csv".to_string()
}

fn default_output() -> String {
    "dashboard_report.md".to_string()
}

/// Calendar assumptions behind the expected percentage.
///
/// `days_elapsed` and `days_in_month` are explicit inputs and are NOT
/// derived from `reference_date`. See [`CalendarConfig::date_mismatch`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// Extraction date of the data.
    #[serde(default = "default_reference_date")]
    pub reference_date: NaiveDate,

    /// Days of the month already elapsed.
    #[serde(default = "default_days_elapsed")]
    pub days_elapsed: u32,

    /// Total days in the month.
    #[serde(default = "default_days_in_month")]
    pub days_in_month: u32,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            reference_date: default_reference_date(),
            days_elapsed: default_days_elapsed(),
            days_in_month: default_days_in_month(),
        }
    }
}

fn default_reference_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 8, 5).unwrap_or(NaiveDate::MIN)
}

fn default_days_elapsed() -> u32 {
    5
}

fn default_days_in_month() -> u32 {
    30
}

impl CalendarConfig {
    /// Percentage of the month elapsed; 0 when the month length is 0.
    pub fn expected_percent(&self) -> f64 {
        if self.days_in_month == 0 {
            return 0.0;
        }
        f64::from(self.days_elapsed) / f64::from(self.days_in_month) * 100.0
    }

    /// Calendar facts of the reference date as `(day_of_month, days_in_month)`.
    pub fn reference_calendar(&self) -> (u32, u32) {
        let date = self.reference_date;
        let first_of_next = if date.month() == 12 {
            NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
        };
        let month_len = first_of_next
            .and_then(|d| d.pred_opt())
            .map(|d| d.day())
            .unwrap_or(self.days_in_month);
        (date.day(), month_len)
    }

    /// Returns the calendar of the reference date when it disagrees with the
    /// configured constants.
    pub fn date_mismatch(&self) -> Option<(u32, u32)> {
        let (day, month_len) = self.reference_calendar();
        if day != self.days_elapsed || month_len != self.days_in_month {
            Some((day, month_len))
        } else {
            None
        }
    }
}

/// Threshold boundaries on the proportional status (inclusive lower bounds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusThresholds {
    /// At or above this value the status is ABOVE_EXPECTED.
    #[serde(default = "default_above_expected")]
    pub above_expected: f64,

    /// At or above this value (and below `above_expected`) the status is ON_TRACK.
    #[serde(default = "default_on_track")]
    pub on_track: f64,
}

impl Default for StatusThresholds {
    fn default() -> Self {
        Self {
            above_expected: default_above_expected(),
            on_track: default_on_track(),
        }
    }
}

fn default_above_expected() -> f64 {
    100.0
}

fn default_on_track() -> f64 {
    85.0
}

/// Output format of the rendered report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Number of units listed as positive and attention points.
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Report format.
    #[serde(default)]
    pub format: OutputFormat,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            format: OutputFormat::Markdown,
        }
    }
}

fn default_top_n() -> usize {
    3
}

/// CSV export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Write the filtered records to a CSV file.
    #[serde(default)]
    pub enabled: bool,

    /// Directory the export file is written to.
    #[serde(default = "default_export_dir")]
    pub directory: String,

    /// File name prefix; the reference date is appended as YYYYMMDD.
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            directory: default_export_dir(),
            file_prefix: default_file_prefix(),
        }
    }
}

fn default_export_dir() -> String {
    ".".to_string()
}

fn default_file_prefix() -> String {
    "dashboard_saude_saquarema".to_string()
}

impl ExportConfig {
    /// Full path of the export file for the given reference date.
    pub fn export_path(&self, reference_date: NaiveDate) -> PathBuf {
        Path::new(&self.directory).join(crate::report::export_file_name(
            &self.file_prefix,
            reference_date,
        ))
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref data) = args.data {
            self.general.data_file = data.display().to_string();
        }
        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }

        if let Some(date) = args.reference_date {
            self.calendar.reference_date = date;
        }
        if let Some(days) = args.days_elapsed {
            self.calendar.days_elapsed = days;
        }
        if let Some(days) = args.days_in_month {
            self.calendar.days_in_month = days;
        }

        if let Some(top) = args.top {
            self.report.top_n = top;
        }
        if let Some(format) = args.format {
            self.report.format = format;
        }

        if args.export {
            self.export.enabled = true;
        }
        if let Some(ref dir) = args.export_dir {
            self.export.enabled = true;
            self.export.directory = dir.display().to_string();
        }
    }

    /// Check the merged settings. Run after [`Config::merge_with_args`] so
    /// values from the file and the command line are checked together.
    pub fn validate(&self) -> Result<()> {
        let calendar = &self.calendar;
        if calendar.days_in_month == 0 {
            anyhow::bail!("days_in_month must be at least 1");
        }
        if calendar.days_elapsed > calendar.days_in_month {
            anyhow::bail!(
                "days_elapsed ({}) cannot exceed days_in_month ({})",
                calendar.days_elapsed,
                calendar.days_in_month
            );
        }

        if self.report.top_n == 0 {
            anyhow::bail!("top_n must be at least 1");
        }

        let thresholds = &self.thresholds;
        if thresholds.on_track.is_nan()
            || thresholds.above_expected.is_nan()
            || thresholds.on_track > thresholds.above_expected
        {
            anyhow::bail!(
                "thresholds.on_track ({}) cannot exceed thresholds.above_expected ({})",
                thresholds.on_track,
                thresholds.above_expected
            );
        }

        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.data_file, "dados_saude.csv");
        assert_eq!(config.calendar.days_elapsed, 5);
        assert_eq!(config.calendar.days_in_month, 30);
        assert_eq!(config.thresholds.above_expected, 100.0);
        assert_eq!(config.thresholds.on_track, 85.0);
        assert_eq!(config.report.top_n, 3);
        assert!(!config.export.enabled);
    }

    #[test]
    fn test_expected_percent() {
        let calendar = CalendarConfig::default();
        assert!((calendar.expected_percent() - 16.6667).abs() < 1e-3);

        let empty_month = CalendarConfig {
            days_in_month: 0,
            ..CalendarConfig::default()
        };
        assert_eq!(empty_month.expected_percent(), 0.0);
    }

    #[test]
    fn test_date_mismatch_is_flagged() {
        // August has 31 days, the default constants assume 30.
        let calendar = CalendarConfig::default();
        assert_eq!(calendar.reference_calendar(), (5, 31));
        assert_eq!(calendar.date_mismatch(), Some((5, 31)));

        let consistent = CalendarConfig {
            reference_date: NaiveDate::from_ymd_opt(2025, 9, 5).unwrap(),
            days_elapsed: 5,
            days_in_month: 30,
        };
        assert_eq!(consistent.date_mismatch(), None);
    }

    #[test]
    fn test_reference_calendar_december() {
        let calendar = CalendarConfig {
            reference_date: NaiveDate::from_ymd_opt(2024, 12, 20).unwrap(),
            days_elapsed: 20,
            days_in_month: 31,
        };
        assert_eq!(calendar.reference_calendar(), (20, 31));
        assert_eq!(calendar.date_mismatch(), None);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
data_file = "producao.csv"

[calendar]
reference_date = "2025-09-10"
days_elapsed = 10

[thresholds]
on_track = 90.0

[report]
top_n = 5
format = "json"

[export]
enabled = true
directory = "out"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.data_file, "producao.csv");
        assert_eq!(
            config.calendar.reference_date,
            NaiveDate::from_ymd_opt(2025, 9, 10).unwrap()
        );
        assert_eq!(config.calendar.days_elapsed, 10);
        assert_eq!(config.calendar.days_in_month, 30);
        assert_eq!(config.thresholds.on_track, 90.0);
        assert_eq!(config.thresholds.above_expected, 100.0);
        assert_eq!(config.report.top_n, 5);
        assert_eq!(config.report.format, OutputFormat::Json);
        assert!(config.export.enabled);
        assert_eq!(config.export.file_prefix, "dashboard_saude_saquarema");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[report]\ntop_n = 2\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.report.top_n, 2);
        assert_eq!(config.general.output, "dashboard_report.md");
    }

    #[test]
    fn test_validate_merged_values() {
        assert!(Config::default().validate().is_ok());

        let config: Config = toml::from_str("[calendar]\ndays_in_month = 0\n").unwrap();
        assert!(config.validate().is_err());

        let config: Config = toml::from_str("[calendar]\ndays_elapsed = 40\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("days_elapsed (40)"));

        let config: Config = toml::from_str("[report]\ntop_n = 0\n").unwrap();
        assert!(config.validate().is_err());

        let config: Config =
            toml::from_str("[thresholds]\non_track = 110.0\nabove_expected = 100.0\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_after_merge() {
        use clap::Parser;

        // 40 elapsed days are only rejected against the file's month length.
        let args =
            crate::cli::Args::try_parse_from(["saude-dashboard", "--days-elapsed", "40"]).unwrap();
        assert!(args.validate().is_ok());

        let mut config = Config::default();
        config.merge_with_args(&args);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_export_path() {
        let export = ExportConfig {
            enabled: true,
            directory: "out".to_string(),
            file_prefix: "dashboard".to_string(),
        };
        let path = export.export_path(NaiveDate::from_ymd_opt(2025, 8, 5).unwrap());
        assert_eq!(path, Path::new("out").join("dashboard_20250805.csv"));
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[calendar]"));
        assert!(toml_str.contains("[thresholds]"));
        assert!(toml_str.contains("reference_date = \"2025-08-05\""));

        let reparsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(reparsed.calendar, CalendarConfig::default());
    }
}
