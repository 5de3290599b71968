//! Production aggregation and status classification.
//!
//! This module groups raw production rows, computes the achieved and
//! expected percentages, and classifies each group against the expected
//! pace. Every function here is a pure transformation of its input.

use crate::config::{CalendarConfig, StatusThresholds};
use crate::models::{AggregatedRecord, IndicatorSummary, RawRecord, StatusLabel, UnitPerformance};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// `numerator / denominator * 100`, or 0 when the denominator is 0.
pub fn percent_of(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator * 100.0
    }
}

/// Classify a proportional status. Lower bounds are inclusive.
pub fn classify(proportional_status: f64, thresholds: &StatusThresholds) -> StatusLabel {
    if proportional_status >= thresholds.above_expected {
        StatusLabel::AboveExpected
    } else if proportional_status >= thresholds.on_track {
        StatusLabel::OnTrack
    } else {
        StatusLabel::BelowExpected
    }
}

#[derive(Debug, PartialEq, Eq, Hash)]
struct GroupKey {
    unit: String,
    indicator: String,
    target_bits: u64,
}

impl GroupKey {
    fn new(record: &RawRecord) -> Self {
        // -0.0 and 0.0 must land in the same group.
        let target = if record.target == 0.0 { 0.0 } else { record.target };
        Self {
            unit: record.unit.clone(),
            indicator: record.indicator.clone(),
            target_bits: target.to_bits(),
        }
    }
}

/// Group rows by (unit, indicator, target), sum their production, and
/// derive the pacing figures for every group.
///
/// The result is sorted by unit, indicator, then target.
pub fn aggregate(
    records: &[RawRecord],
    calendar: &CalendarConfig,
    thresholds: &StatusThresholds,
) -> Vec<AggregatedRecord> {
    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    let mut groups: Vec<(String, String, f64, f64)> = Vec::new();

    for record in records {
        let slot = *index.entry(GroupKey::new(record)).or_insert_with(|| {
            groups.push((
                record.unit.clone(),
                record.indicator.clone(),
                if record.target == 0.0 { 0.0 } else { record.target },
                0.0,
            ));
            groups.len() - 1
        });
        groups[slot].3 += record.production;
    }

    let expected_percent = calendar.expected_percent();

    let mut aggregated: Vec<AggregatedRecord> = groups
        .into_iter()
        .map(|(unit, indicator, target, production_total)| {
            let percent_achieved = percent_of(production_total, target);
            let proportional_status = percent_of(percent_achieved, expected_percent);
            AggregatedRecord {
                unit,
                indicator,
                target,
                production_total,
                percent_achieved,
                expected_percent,
                expected_target: target * expected_percent / 100.0,
                proportional_status,
                status_label: classify(proportional_status, thresholds),
            }
        })
        .collect();

    aggregated.sort_by(|a, b| {
        a.unit
            .cmp(&b.unit)
            .then_with(|| a.indicator.cmp(&b.indicator))
            .then_with(|| a.target.total_cmp(&b.target))
    });

    aggregated
}

/// Roll the aggregated records up per indicator, sorted by indicator name.
///
/// Targets and production are summed, the achieved percentage is averaged
/// over the units, and the status is recomputed from that average.
pub fn summarize_by_indicator(
    aggregated: &[AggregatedRecord],
    thresholds: &StatusThresholds,
) -> Vec<IndicatorSummary> {
    #[derive(Default)]
    struct Acc {
        target: f64,
        production: f64,
        percent_sum: f64,
        count: usize,
        expected_percent: f64,
    }

    let mut grouped: BTreeMap<&str, Acc> = BTreeMap::new();

    for record in aggregated {
        let acc = grouped.entry(record.indicator.as_str()).or_default();
        acc.target += record.target;
        acc.production += record.production_total;
        acc.percent_sum += record.percent_achieved;
        acc.count += 1;
        acc.expected_percent = record.expected_percent;
    }

    grouped
        .into_iter()
        .map(|(indicator, acc)| {
            let percent_achieved_avg = acc.percent_sum / acc.count as f64;
            let status_vs_expected = percent_of(percent_achieved_avg, acc.expected_percent);
            IndicatorSummary {
                indicator: indicator.to_string(),
                target: acc.target,
                production: acc.production,
                percent_achieved_avg,
                status_vs_expected,
                status_label: classify(status_vs_expected, thresholds),
            }
        })
        .collect()
}

/// Mean proportional status per unit, sorted by unit name.
pub fn unit_performance(aggregated: &[AggregatedRecord]) -> Vec<UnitPerformance> {
    let mut grouped: BTreeMap<&str, (f64, usize)> = BTreeMap::new();

    for record in aggregated {
        let entry = grouped.entry(record.unit.as_str()).or_insert((0.0, 0));
        entry.0 += record.proportional_status;
        entry.1 += 1;
    }

    grouped
        .into_iter()
        .map(|(unit, (sum, count))| UnitPerformance {
            unit: unit.to_string(),
            proportional_status: sum / count as f64,
        })
        .collect()
}

/// The `n` best performers, highest first. Ties keep input order.
pub fn top_n(performance: &[UnitPerformance], n: usize) -> Vec<UnitPerformance> {
    let mut sorted = performance.to_vec();
    sorted.sort_by(|a, b| b.proportional_status.total_cmp(&a.proportional_status));
    sorted.truncate(n);
    sorted
}

/// The `n` worst performers, lowest first. Ties keep input order.
pub fn bottom_n(performance: &[UnitPerformance], n: usize) -> Vec<UnitPerformance> {
    let mut sorted = performance.to_vec();
    sorted.sort_by(|a, b| a.proportional_status.total_cmp(&b.proportional_status));
    sorted.truncate(n);
    sorted
}

/// A filter over units or indicators.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    /// Everything is selected.
    #[default]
    All,
    /// Only the listed values are selected. An empty set selects nothing.
    Only(BTreeSet<String>),
}

impl Selection {
    /// `None` selects everything.
    pub fn from_list(values: Option<&[String]>) -> Self {
        match values {
            None => Selection::All,
            Some(values) => Selection::Only(
                values
                    .iter()
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
                    .collect(),
            ),
        }
    }

    pub fn contains(&self, value: &str) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(set) => set.contains(value),
        }
    }
}

/// Keep the records whose unit and indicator are both selected.
pub fn filter_view(
    aggregated: &[AggregatedRecord],
    units: &Selection,
    indicators: &Selection,
) -> Vec<AggregatedRecord> {
    aggregated
        .iter()
        .filter(|r| units.contains(&r.unit) && indicators.contains(&r.indicator))
        .cloned()
        .collect()
}

/// Sorted, deduplicated unit names.
pub fn distinct_units(aggregated: &[AggregatedRecord]) -> Vec<String> {
    aggregated
        .iter()
        .map(|r| r.unit.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Sorted, deduplicated indicator names.
pub fn distinct_indicators(aggregated: &[AggregatedRecord]) -> Vec<String> {
    aggregated
        .iter()
        .map(|r| r.indicator.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
