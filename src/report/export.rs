//! CSV export of the filtered records.

use crate::models::AggregatedRecord;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::path::Path;

/// One exported line. Column names match the source file so an export can
/// be loaded again as input.
#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    #[serde(rename = "Unidade")]
    unit: &'a str,
    #[serde(rename = "Indicador")]
    indicator: &'a str,
    #[serde(rename = "Meta")]
    target: f64,
    #[serde(rename = "Producao")]
    production: f64,
    #[serde(rename = "Percentual_Atingido")]
    percent_achieved: f64,
    #[serde(rename = "Meta_Esperada")]
    expected_target: f64,
    #[serde(rename = "Status_Proporcional")]
    proportional_status: f64,
    #[serde(rename = "Status")]
    status: String,
}

impl<'a> From<&'a AggregatedRecord> for ExportRow<'a> {
    fn from(record: &'a AggregatedRecord) -> Self {
        Self {
            unit: &record.unit,
            indicator: &record.indicator,
            target: record.target,
            production: record.production_total,
            percent_achieved: record.percent_achieved,
            expected_target: record.expected_target,
            proportional_status: record.proportional_status,
            status: record.status_label.badge(),
        }
    }
}

/// Export file name, e.g. `dashboard_saude_saquarema_20250805.csv`.
pub fn export_file_name(prefix: &str, reference_date: NaiveDate) -> String {
    format!("{}_{}.csv", prefix, reference_date.format("%Y%m%d"))
}

/// Render the records as comma-separated text with a header row.
pub fn export_csv(records: &[AggregatedRecord]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    for record in records {
        writer
            .serialize(ExportRow::from(record))
            .with_context(|| format!("Failed to export {} / {}", record.unit, record.indicator))?;
    }

    // An empty export still carries the header.
    if records.is_empty() {
        writer.write_record([
            "Unidade",
            "Indicador",
            "Meta",
            "Producao",
            "Percentual_Atingido",
            "Meta_Esperada",
            "Status_Proporcional",
            "Status",
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| e.into_error())
        .context("Failed to flush CSV export")?;
    String::from_utf8(bytes).context("CSV export is not valid UTF-8")
}

/// Write the CSV export to a file, creating the parent directory if needed.
pub fn write_export(records: &[AggregatedRecord], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create export directory {}", parent.display())
            })?;
        }
    }

    let content = export_csv(records)?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write export to {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::aggregate;
    use crate::config::{CalendarConfig, StatusThresholds};
    use crate::models::RawRecord;
    use crate::source::read_records;

    fn sample_aggregated() -> Vec<AggregatedRecord> {
        let records = vec![
            RawRecord::new("UBS Centro", "Consultas", 100.0, 20.0),
            RawRecord::new("UBS Centro", "Consultas", 100.0, 10.0),
            RawRecord::new("UBS Centro, Anexo", "Visitas \"domiciliares\"", 250.5, 12.25),
            RawRecord::new("ESF Jacone", "Visitas", 0.0, 7.0),
        ];
        aggregate(
            &records,
            &CalendarConfig::default(),
            &StatusThresholds::default(),
        )
    }

    #[test]
    fn test_export_file_name() {
        let date = NaiveDate::from_ymd_opt(2025, 8, 5).unwrap();
        assert_eq!(
            export_file_name("dashboard_saude_saquarema", date),
            "dashboard_saude_saquarema_20250805.csv"
        );
    }

    #[test]
    fn test_export_header_and_status() {
        let csv_text = export_csv(&sample_aggregated()).unwrap();
        let mut lines = csv_text.lines();

        assert_eq!(
            lines.next(),
            Some("Unidade,Indicador,Meta,Producao,Percentual_Atingido,Meta_Esperada,Status_Proporcional,Status")
        );
        assert!(csv_text.contains("🔵 Acima do esperado"));
        assert!(csv_text.contains("🔴 Abaixo do esperado"));
    }

    #[test]
    fn test_export_reloads_as_source() {
        let aggregated = sample_aggregated();
        let csv_text = export_csv(&aggregated).unwrap();

        let reloaded = read_records(csv_text.as_bytes()).unwrap();

        assert_eq!(reloaded.len(), aggregated.len());
        for (raw, agg) in reloaded.iter().zip(&aggregated) {
            assert_eq!(raw.unit, agg.unit);
            assert_eq!(raw.indicator, agg.indicator);
            assert_eq!(raw.target, agg.target);
            assert_eq!(raw.production, agg.production_total);
        }
    }

    #[test]
    fn test_empty_export_keeps_header() {
        let csv_text = export_csv(&[]).unwrap();
        assert!(csv_text.starts_with("Unidade,Indicador,Meta,Producao"));
        assert!(read_records(csv_text.as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn test_write_export_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exports").join("dashboard_20250805.csv");

        write_export(&sample_aggregated(), &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 4);
    }
}
