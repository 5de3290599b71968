//! Saude Dashboard - goal tracking for health-unit production
//!
//! A CLI tool that aggregates production per unit and indicator,
//! compares it against monthly targets at the expected pace, and
//! writes a Markdown or JSON dashboard plus an optional CSV export.
//!
//! Exit codes:
//!   0 - Success (also when the data file is missing; a notice is shown)
//!   1 - Runtime error (config, malformed data, write failure, etc.)
//!   2 - Records below the expected pace and --fail-on-below set

mod analysis;
mod cli;
mod config;
mod models;
mod report;
mod source;

use anyhow::{Context, Result};
use cli::Args;
use config::{Config, OutputFormat, CONFIG_FILE_NAME};
use models::StatusLabel;
use source::SourceError;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("Saude Dashboard v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run_dashboard(args) {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Dashboard failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .saude-dashboard.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to set the data file, calendar, thresholds and export.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the complete dashboard workflow. Returns exit code (0 or 2).
fn run_dashboard(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate().context("Invalid configuration")?;
    debug!("Effective configuration: {:?}", config);

    if let Some((day, month_len)) = config.calendar.date_mismatch() {
        warn!(
            "Calendar constants ({} of {} days) do not match reference date {} (day {} of {})",
            config.calendar.days_elapsed,
            config.calendar.days_in_month,
            config.calendar.reference_date,
            day,
            month_len
        );
    }

    // Step 1: Load the production rows
    let data_path = Path::new(&config.general.data_file).to_path_buf();
    println!("📥 Loading data: {}", data_path.display());

    let raw_records = match source::load_records(&data_path) {
        Ok(records) => records,
        Err(e @ SourceError::NotFound(_)) => {
            warn!("{}", e);
            println!("\n⚠️  {}", e);
            return Ok(0);
        }
        Err(e) => {
            return Err(e)
                .with_context(|| format!("Failed to load data from {}", data_path.display()));
        }
    };
    info!("Loaded {} rows", raw_records.len());

    // Step 2: Aggregate and classify
    let aggregated = analysis::aggregate(&raw_records, &config.calendar, &config.thresholds);
    info!(
        "Aggregated into {} unit/indicator groups (expected progress {:.1}%)",
        aggregated.len(),
        config.calendar.expected_percent()
    );

    // Step 3: Apply filters and build the dashboard
    let units = args.unit_selection();
    let indicators = args.indicator_selection();
    for unit in unknown_values(args.units.as_deref(), &analysis::distinct_units(&aggregated)) {
        warn!("Unit not found in data: {}", unit);
    }
    for indicator in unknown_values(
        args.indicators.as_deref(),
        &analysis::distinct_indicators(&aggregated),
    ) {
        warn!("Indicator not found in data: {}", indicator);
    }

    let dashboard = report::build_dashboard(
        &aggregated,
        &units,
        &indicators,
        &config,
        &config.general.data_file,
        raw_records.len(),
    );

    // Step 4: Render and save the report
    println!("\n📝 Generating report...");
    let output = match config.report.format {
        OutputFormat::Json => report::generate_json_report(&dashboard)?,
        OutputFormat::Markdown => report::generate_markdown_report(&dashboard),
    };

    let output_path = Path::new(&config.general.output);
    std::fs::write(output_path, &output)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    // Step 5: Optional CSV export of the filtered records
    if config.export.enabled {
        let export_path = config.export.export_path(config.calendar.reference_date);
        report::write_export(&dashboard.records, &export_path)?;
        println!("📊 Exported {} records to {}", dashboard.records.len(), export_path.display());
    }

    let (above, on_track, below) = dashboard.status_counts();
    let duration = start_time.elapsed().as_secs_f64();

    println!("\n📊 Dashboard Summary:");
    println!(
        "   Reference date: {} | Month progress: {}",
        dashboard.metadata.reference_date.format("%d/%m/%Y"),
        dashboard.metadata.month_progress()
    );
    println!("   Units monitored: {}", dashboard.metadata.units_monitored);
    println!("   Unit/indicator records: {}", dashboard.records.len());
    println!(
        "   - {} Above: {} | {} On track: {} | {} Below: {}",
        StatusLabel::AboveExpected.emoji(),
        above,
        StatusLabel::OnTrack.emoji(),
        on_track,
        StatusLabel::BelowExpected.emoji(),
        below
    );
    println!("   Duration: {:.2}s", duration);
    println!(
        "\n✅ Dashboard complete! Report saved to: {}",
        output_path.display()
    );

    if args.fail_on_below && below > 0 {
        eprintln!(
            "\n⛔ {} records below the expected pace. Failing (exit code 2).",
            below
        );
        return Ok(2);
    }

    Ok(0)
}

/// Requested filter values that do not appear in the data.
fn unknown_values<'a>(requested: Option<&'a [String]>, known: &[String]) -> Vec<&'a str> {
    requested
        .unwrap_or_default()
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty() && !known.iter().any(|k| k.as_str() == *v))
        .collect()
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis::Selection;
    use clap::Parser;
    use std::path::PathBuf;

    fn fixture_path() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/dados_saude.csv")
    }

    fn parse(args: &[&str]) -> Args {
        let mut argv = vec!["saude-dashboard"];
        argv.extend_from_slice(args);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_fixture_pipeline() {
        let config = Config::default();
        let path = fixture_path();
        let records = source::load_records(&path).unwrap();

        let aggregated = analysis::aggregate(&records, &config.calendar, &config.thresholds);
        assert_eq!(aggregated.len(), 12);

        let centro = aggregated
            .iter()
            .find(|r| r.unit == "UBS Centro" && r.indicator == "Consultas Medicas")
            .unwrap();
        assert_eq!(centro.production_total, 77.0);
        // 77 / 400 = 19.25% achieved against 16.67% expected
        assert!((centro.proportional_status - 115.5).abs() < 1e-9);
        assert_eq!(centro.status_label, StatusLabel::AboveExpected);

        let dashboard = report::build_dashboard(
            &aggregated,
            &Selection::All,
            &Selection::All,
            &config,
            "dados_saude.csv",
            records.len(),
        );
        assert_eq!(dashboard.metadata.units_monitored, 4);
        assert_eq!(dashboard.highlights.positive.len(), 3);
        assert_eq!(dashboard.highlights.attention.len(), 3);

        let markdown = report::generate_markdown_report(&dashboard);
        assert!(markdown.contains("ESF Sampaio Correia"));
    }

    #[test]
    fn test_unknown_values() {
        let known = vec!["UBS Centro".to_string(), "ESF Jacone".to_string()];
        let requested = vec![
            "UBS Centro".to_string(),
            " ESF Jacone ".to_string(),
            "UBS Inexistente".to_string(),
        ];

        assert_eq!(
            unknown_values(Some(requested.as_slice()), &known),
            vec!["UBS Inexistente"]
        );
        assert!(unknown_values(None, &known).is_empty());
    }

    #[test]
    fn test_missing_data_file_exits_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("dados_saude.csv");
        let output = dir.path().join("dashboard_report.md");

        let args = parse(&[
            "--data",
            data.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
        ]);

        assert_eq!(run_dashboard(args).unwrap(), 0);
        assert!(!output.exists());
    }

    #[test]
    fn test_fail_on_below_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("dashboard_report.md");
        let fixture = fixture_path();

        let args = parse(&[
            "--data",
            fixture.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
            "--fail-on-below",
        ]);

        // The fixture has a zero-target row, which is always below the pace.
        assert_eq!(run_dashboard(args).unwrap(), 2);
        assert!(output.exists());
    }

    #[test]
    fn test_run_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("dashboard.json");
        let fixture = fixture_path();

        let args = parse(&[
            "--data",
            fixture.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
            "--format",
            "json",
        ]);

        assert_eq!(run_dashboard(args).unwrap(), 0);
        let report = std::fs::read_to_string(&output).unwrap();
        assert!(report.contains("\"units_monitored\": 4"));
    }

    #[test]
    fn test_invalid_merged_calendar_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("dashboard_report.md");
        let fixture = fixture_path();

        let args = parse(&[
            "--data",
            fixture.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
            "--days-elapsed",
            "40",
        ]);

        assert!(run_dashboard(args).is_err());
        assert!(!output.exists());
    }
}
