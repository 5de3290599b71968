//! Data models for the goal-tracking dashboard.
//!
//! This module contains the core data structures used throughout
//! the application for representing production rows, aggregated
//! results, and the rendered dashboard.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pacing status of a unit/indicator relative to the expected progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusLabel {
    /// Production is lagging behind the expected pace
    BelowExpected,
    /// Production is close to the expected pace
    OnTrack,
    /// Production is at or ahead of the expected pace
    AboveExpected,
}

impl fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusLabel::BelowExpected => write!(f, "Abaixo do esperado"),
            StatusLabel::OnTrack => write!(f, "No prazo"),
            StatusLabel::AboveExpected => write!(f, "Acima do esperado"),
        }
    }
}

impl StatusLabel {
    /// Returns an emoji representation of the status.
    pub fn emoji(&self) -> &'static str {
        match self {
            StatusLabel::BelowExpected => "🔴",
            StatusLabel::OnTrack => "🟢",
            StatusLabel::AboveExpected => "🔵",
        }
    }

    /// Emoji followed by the display text, as shown in tables and exports.
    pub fn badge(&self) -> String {
        format!("{} {}", self.emoji(), self)
    }
}

/// One row of the production source file.
///
/// Several rows may share the same unit and indicator; they are summed
/// during aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Health unit the row belongs to.
    #[serde(rename = "Unidade")]
    pub unit: String,
    /// Name of the tracked indicator.
    #[serde(rename = "Indicador")]
    pub indicator: String,
    /// Monthly goal.
    #[serde(rename = "Meta")]
    pub target: f64,
    /// Production achieved so far.
    #[serde(rename = "Producao")]
    pub production: f64,
}

#[cfg(test)]
impl RawRecord {
    pub fn new(unit: &str, indicator: &str, target: f64, production: f64) -> Self {
        Self {
            unit: unit.to_string(),
            indicator: indicator.to_string(),
            target,
            production,
        }
    }
}

/// Result of aggregating all rows sharing a (unit, indicator, target) key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedRecord {
    pub unit: String,
    pub indicator: String,
    pub target: f64,
    /// Sum of production over the group.
    pub production_total: f64,
    /// `production_total / target * 100`, or 0 when the target is 0.
    pub percent_achieved: f64,
    /// Share of the month elapsed, in percent.
    pub expected_percent: f64,
    /// Portion of the target that should have been reached by now.
    pub expected_target: f64,
    /// `percent_achieved / expected_percent * 100`, or 0 when nothing is expected yet.
    pub proportional_status: f64,
    pub status_label: StatusLabel,
}

/// Per-indicator roll-up of the aggregated records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSummary {
    pub indicator: String,
    /// Sum of targets over all units.
    pub target: f64,
    /// Sum of production over all units.
    pub production: f64,
    /// Mean of the per-unit achieved percentages.
    pub percent_achieved_avg: f64,
    pub status_vs_expected: f64,
    pub status_label: StatusLabel,
}

/// Mean proportional status of a single unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitPerformance {
    pub unit: String,
    pub proportional_status: f64,
}

/// One slice of the status donut chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSlice {
    pub label: String,
    pub value: f64,
    /// Percentage of the whole donut taken by this slice.
    pub share: f64,
}

/// Units singled out for praise and for follow-up.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Highlights {
    pub positive: Vec<UnitPerformance>,
    pub attention: Vec<UnitPerformance>,
}

/// Metadata shown in the information tiles of the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardMetadata {
    /// Path of the data source that was loaded.
    pub data_source: String,
    /// Reference (extraction) date of the data.
    pub reference_date: NaiveDate,
    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
    pub days_elapsed: u32,
    pub days_in_month: u32,
    pub expected_percent: f64,
    /// Number of distinct units in the filtered view.
    pub units_monitored: usize,
    /// Number of raw rows read from the source.
    pub raw_rows: usize,
    /// Every unit present in the source, for the unit filter.
    pub available_units: Vec<String>,
    /// Every indicator present in the source, for the indicator filter.
    pub available_indicators: Vec<String>,
}

impl DashboardMetadata {
    /// Month progress line, e.g. `16.7% (5 de 30 dias)`.
    pub fn month_progress(&self) -> String {
        format!(
            "{:.1}% ({} de {} dias)",
            self.expected_percent, self.days_elapsed, self.days_in_month
        )
    }
}

/// The complete dashboard, ready to be rendered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dashboard {
    pub metadata: DashboardMetadata,
    /// Indicator tiles, best status first.
    pub indicators: Vec<IndicatorSummary>,
    pub donut: Vec<ChartSlice>,
    /// Bar chart series, worst unit first.
    pub unit_performance: Vec<UnitPerformance>,
    /// Filtered records sorted by unit and indicator.
    pub records: Vec<AggregatedRecord>,
    pub highlights: Highlights,
}

impl Dashboard {
    /// Count of records per status label.
    pub fn status_counts(&self) -> (usize, usize, usize) {
        self.records
            .iter()
            .fold((0, 0, 0), |(above, on_track, below), r| match r.status_label {
                StatusLabel::AboveExpected => (above + 1, on_track, below),
                StatusLabel::OnTrack => (above, on_track + 1, below),
                StatusLabel::BelowExpected => (above, on_track, below + 1),
            })
    }
}
