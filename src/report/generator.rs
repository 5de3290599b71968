//! Dashboard assembly and report generation.
//!
//! This module turns the aggregated records into a [`Dashboard`] and
//! renders it as Markdown or JSON.

use crate::analysis::{
    bottom_n, distinct_indicators, distinct_units, filter_view, summarize_by_indicator, top_n,
    unit_performance, Selection,
};
use crate::config::Config;
use crate::models::{
    AggregatedRecord, ChartSlice, Dashboard, DashboardMetadata, Highlights, IndicatorSummary,
    UnitPerformance,
};
use anyhow::Result;
use chrono::Utc;

/// Width of the bar chart, in characters.
const BAR_WIDTH: usize = 40;

/// Reference line of the bar chart, in percent of the expected pace.
const REFERENCE_LINE: f64 = 100.0;

/// Build the dashboard for the current filter selection.
///
/// `aggregated` is the full aggregated set; filter options are taken from it
/// and every other section from the filtered view.
pub fn build_dashboard(
    aggregated: &[AggregatedRecord],
    units: &Selection,
    indicators: &Selection,
    config: &Config,
    data_source: &str,
    raw_rows: usize,
) -> Dashboard {
    let mut records = filter_view(aggregated, units, indicators);
    records.sort_by(|a, b| {
        a.unit
            .cmp(&b.unit)
            .then_with(|| a.indicator.cmp(&b.indicator))
    });

    let mut summaries = summarize_by_indicator(&records, &config.thresholds);
    summaries.sort_by(|a, b| b.status_vs_expected.total_cmp(&a.status_vs_expected));

    let performance = unit_performance(&records);
    let highlights = Highlights {
        positive: top_n(&performance, config.report.top_n),
        attention: bottom_n(&performance, config.report.top_n),
    };

    let mut bars = performance;
    bars.sort_by(|a, b| a.proportional_status.total_cmp(&b.proportional_status));

    let metadata = DashboardMetadata {
        data_source: data_source.to_string(),
        reference_date: config.calendar.reference_date,
        generated_at: Utc::now(),
        days_elapsed: config.calendar.days_elapsed,
        days_in_month: config.calendar.days_in_month,
        expected_percent: config.calendar.expected_percent(),
        units_monitored: distinct_units(&records).len(),
        raw_rows,
        available_units: distinct_units(aggregated),
        available_indicators: distinct_indicators(aggregated),
    };

    Dashboard {
        metadata,
        donut: donut_slices(&summaries),
        indicators: summaries,
        unit_performance: bars,
        records,
        highlights,
    }
}

/// One donut slice per indicator; shares are 0 when all values are 0.
pub fn donut_slices(summaries: &[IndicatorSummary]) -> Vec<ChartSlice> {
    let total: f64 = summaries.iter().map(|s| s.status_vs_expected).sum();

    summaries
        .iter()
        .map(|s| ChartSlice {
            label: s.indicator.clone(),
            value: s.status_vs_expected,
            share: if total == 0.0 {
                0.0
            } else {
                s.status_vs_expected / total * 100.0
            },
        })
        .collect()
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(dashboard: &Dashboard) -> String {
    let mut output = String::new();

    output.push_str("# 📊 Dashboard de Acompanhamento de Metas\n\n");

    output.push_str(&generate_info_section(&dashboard.metadata));
    output.push_str(&generate_summary_section(
        &dashboard.indicators,
        dashboard.metadata.expected_percent,
    ));
    output.push_str(&generate_charts_section(
        &dashboard.donut,
        &dashboard.unit_performance,
    ));
    output.push_str(&generate_detail_section(&dashboard.records));
    output.push_str(&generate_insights_section(&dashboard.highlights));
    output.push_str(&generate_footer());

    output
}

/// Generate the information tiles.
fn generate_info_section(metadata: &DashboardMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Informações\n\n");
    section.push_str(&format!(
        "- 📅 **Data da Extração:** {}\n",
        metadata.reference_date.format("%d/%m/%Y")
    ));
    section.push_str(&format!(
        "- 📈 **Progresso do Mês:** {}\n",
        metadata.month_progress()
    ));
    section.push_str(&format!(
        "- 🏥 **Unidades Monitoradas:** {}\n",
        metadata.units_monitored
    ));
    section.push_str(&format!("- **Fonte:** `{}`\n", metadata.data_source));
    section.push_str(&format!(
        "- **Gerado em:** {}\n\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    section
}

/// Generate the per-indicator summary tiles.
fn generate_summary_section(summaries: &[IndicatorSummary], expected_percent: f64) -> String {
    let mut section = String::new();

    section.push_str("## 🎯 Resumo Geral de Performance\n\n");

    if summaries.is_empty() {
        section.push_str("Nenhum dado para os filtros selecionados.\n\n");
        return section;
    }

    section.push_str("| Indicador | Produção | Meta | % Atingido | % Esperado | Status |\n");
    section.push_str("|:---|---:|---:|---:|---:|:---:|\n");

    for summary in summaries {
        section.push_str(&format!(
            "| 📋 {} | {:.0} | {:.0} | {:.1}% | {:.1}% | {} {:.0}% |\n",
            table_cell(&summary.indicator),
            summary.production,
            summary.target,
            summary.percent_achieved_avg,
            expected_percent,
            summary.status_label.emoji(),
            summary.status_vs_expected
        ));
    }
    section.push('\n');

    section
}

/// Generate the chart section: donut shares and the per-unit bar chart.
fn generate_charts_section(donut: &[ChartSlice], bars: &[UnitPerformance]) -> String {
    let mut section = String::new();

    section.push_str("## 📊 Visualizações\n\n");

    section.push_str("### Status Proporcional por Indicador\n\n");
    if donut.is_empty() {
        section.push_str("Sem indicadores.\n\n");
    } else {
        section.push_str("| Indicador | Status vs Meta Esperada | Participação |\n");
        section.push_str("|:---|---:|---:|\n");
        for slice in donut {
            section.push_str(&format!(
                "| {} | {:.0}% | {:.1}% |\n",
                table_cell(&slice.label),
                slice.value,
                slice.share
            ));
        }
        section.push('\n');
    }

    section.push_str("### Performance por Unidade\n\n");
    if bars.is_empty() {
        section.push_str("Sem unidades.\n\n");
    } else {
        section.push_str("```\n");
        section.push_str(&render_bar_chart(bars));
        section.push_str("```\n\n");
    }

    section
}

/// Text bar chart of the unit performance with a `┆` marker at the
/// expected pace.
pub fn render_bar_chart(bars: &[UnitPerformance]) -> String {
    let scale = bars
        .iter()
        .map(|b| b.proportional_status)
        .fold(REFERENCE_LINE, f64::max);
    let label_width = bars
        .iter()
        .map(|b| b.unit.chars().count())
        .max()
        .unwrap_or(0);
    let marker = scaled_width(REFERENCE_LINE, scale);

    let mut chart = String::new();
    for bar in bars {
        let filled = scaled_width(bar.proportional_status, scale);
        let line: String = (0..=BAR_WIDTH)
            .map(|i| {
                if i == marker {
                    '┆'
                } else if i < filled {
                    '█'
                } else {
                    ' '
                }
            })
            .collect();
        let padding = label_width - bar.unit.chars().count();
        chart.push_str(&format!(
            "{}{} {} {:.0}%\n",
            bar.unit,
            " ".repeat(padding),
            line,
            bar.proportional_status
        ));
    }
    chart.push_str(&format!(
        "{} {}┆ Meta Esperada ({:.0}%)\n",
        " ".repeat(label_width),
        " ".repeat(marker),
        REFERENCE_LINE
    ));

    chart
}

fn scaled_width(value: f64, scale: f64) -> usize {
    if value.is_nan() || value <= 0.0 || scale <= 0.0 {
        return 0;
    }
    ((value / scale) * BAR_WIDTH as f64).round() as usize
}

/// Escape a value for use inside a Markdown table cell.
fn table_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

/// Generate the detail table.
fn generate_detail_section(records: &[AggregatedRecord]) -> String {
    let mut section = String::new();

    section.push_str("## 📋 Detalhamento por Unidade e Indicador\n\n");

    if records.is_empty() {
        section.push_str("Nenhum registro para os filtros selecionados.\n\n");
        return section;
    }

    section.push_str(
        "| Unidade | Indicador | Meta | Producao | % Atingido | Meta Esperada | Performance | Status |\n",
    );
    section.push_str("|:---|:---|---:|---:|---:|---:|---:|:---|\n");

    for record in records {
        section.push_str(&format!(
            "| {} | {} | {} | {} | {:.1}% | {:.0} | {:.0}% | {} |\n",
            table_cell(&record.unit),
            table_cell(&record.indicator),
            record.target,
            record.production_total,
            record.percent_achieved,
            record.expected_target,
            record.proportional_status,
            record.status_label.badge()
        ));
    }
    section.push('\n');

    section
}

/// Generate the positive and attention points.
fn generate_insights_section(highlights: &Highlights) -> String {
    let mut section = String::new();

    section.push_str("## 💡 Principais Insights\n\n");

    section.push_str("### ✅ Pontos Positivos\n\n");
    for unit in &highlights.positive {
        section.push_str(&format!(
            "- {}: {:.0}% de performance\n",
            unit.unit, unit.proportional_status
        ));
    }
    section.push('\n');

    section.push_str("### ⚠️ Pontos de Atenção\n\n");
    for unit in &highlights.attention {
        section.push_str(&format!(
            "- {}: {:.0}% de performance\n",
            unit.unit, unit.proportional_status
        ));
    }
    section.push('\n');

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Relatório gerado por saude-dashboard v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(dashboard: &Dashboard) -> Result<String> {
    serde_json::to_string_pretty(dashboard).map_err(Into::into)
}
