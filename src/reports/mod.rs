// 📑 Report Composers - sustainability reports over one metrics bundle
//
// ESR, GRI, NIS and GHG reports all read the same `MetricsBundle`. They differ
// only in which figures they pick, how they label them and how they group
// them, so each standard is one `ReportComposer` implementation.

mod esr;
mod ghg;
mod gri;
mod nis;

pub use esr::EsrComposer;
pub use ghg::GhgComposer;
pub use gri::GriComposer;
pub use nis::NisComposer;

use crate::aggregation::{
    all_cycles, emissions_totals, exhibitor_totals, safe_percentage, total_cycles,
    total_emissions_avoided, total_recycled_plastic,
};
use crate::corrections::AppliedCorrection;
use crate::error::TraceError;
use crate::model::{Exhibitor, Lot};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// METRICS BUNDLE
// ============================================================================

/// Emissions figures in kgCO2e
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmissionsFigures {
    pub transport_kg: f64,
    pub processing_kg: f64,
    pub generated_kg: f64,
    pub avoided_kg: f64,
    pub net_balance_kg: f64,
}

/// Waste by destination stream, in kg
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WasteFigures {
    pub organic_kg: f64,
    pub inorganic_kg: f64,
    pub recyclable_kg: f64,
}

impl WasteFigures {
    pub fn total_kg(&self) -> f64 {
        self.organic_kg + self.inorganic_kg + self.recyclable_kg
    }

    /// Waste that still ends up in landfill
    pub fn landfill_kg(&self) -> f64 {
        self.organic_kg + self.inorganic_kg
    }

    /// Recyclable waste as a percentage of landfill-bound waste.
    ///
    /// 0 when there is no landfill-bound waste at all.
    pub fn landfill_diversion_rate(&self) -> f64 {
        safe_percentage(self.recyclable_kg, self.landfill_kg())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialShare {
    pub material: String,
    pub kg: f64,
}

/// Pre-aggregated figures every composer reads
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsBundle {
    pub lot_count: usize,
    pub exhibitor_count: usize,
    pub cycle_count: u64,
    pub recycled_kg: f64,
    pub material_kg: f64,
    pub emissions: EmissionsFigures,
    pub material_composition: Vec<MaterialShare>,
    pub waste: WasteFigures,
    /// Corrections applied before composition, shown in every report
    #[serde(default)]
    pub corrections: Vec<AppliedCorrection>,
}

impl MetricsBundle {
    /// Aggregate lots and exhibitors into a bundle
    pub fn from_records(
        lots: &[Lot],
        exhibitors: &[Exhibitor],
        waste: WasteFigures,
        material_composition: Vec<MaterialShare>,
    ) -> Self {
        let lot_emissions = emissions_totals(all_cycles(lots));
        let exhibitor_emissions = emissions_totals(exhibitors.iter().flat_map(|e| e.cycles.iter()));
        let exhibitors_total = exhibitor_totals(exhibitors);

        let generated = lot_emissions.total + exhibitor_emissions.total;
        let avoided = total_emissions_avoided(lots) + exhibitors_total.emissions_avoided_kg;
        let exhibitor_cycles: usize = exhibitors.iter().map(|e| e.cycles.len()).sum();

        MetricsBundle {
            lot_count: lots.len(),
            exhibitor_count: exhibitors.len(),
            cycle_count: total_cycles(lots) + exhibitor_cycles as u64,
            recycled_kg: total_recycled_plastic(lots),
            material_kg: lots.iter().map(|l| l.weight_kg).sum::<f64>()
                + exhibitors.iter().map(|e| e.weight_kg).sum::<f64>(),
            emissions: EmissionsFigures {
                transport_kg: lot_emissions.transport + exhibitor_emissions.transport,
                processing_kg: lot_emissions.processing + exhibitor_emissions.processing,
                generated_kg: generated,
                avoided_kg: avoided,
                net_balance_kg: avoided - generated,
            },
            material_composition,
            waste,
            corrections: Vec::new(),
        }
    }

    /// Share of material that comes from recycled sources, in percent
    pub fn recycled_input_rate(&self) -> f64 {
        safe_percentage(self.recycled_kg, self.material_kg)
    }

    pub fn composition_total_kg(&self) -> f64 {
        self.material_composition.iter().map(|m| m.kg).sum()
    }

    /// Material rows as (material, kg, share %)
    pub fn composition_rows(&self) -> Vec<(String, f64, f64)> {
        let total = self.composition_total_kg();
        self.material_composition
            .iter()
            .map(|m| (m.material.clone(), m.kg, safe_percentage(m.kg, total)))
            .collect()
    }
}

// ============================================================================
// DOCUMENT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PeriodBounds")]
pub struct ReportPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Unchecked wire shape of a period
#[derive(Deserialize)]
struct PeriodBounds {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<PeriodBounds> for ReportPeriod {
    type Error = TraceError;

    fn try_from(bounds: PeriodBounds) -> Result<Self, Self::Error> {
        ReportPeriod::new(bounds.start, bounds.end)
    }
}

impl ReportPeriod {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, TraceError> {
        if end < start {
            return Err(TraceError::InvalidField {
                entity: "period",
                id: format!("{}..{}", start, end),
                field: "end".to_string(),
                message: "period ends before it starts".to_string(),
            });
        }
        Ok(ReportPeriod { start, end })
    }

    pub fn label(&self) -> String {
        format!("{} to {}", self.start.format("%Y-%m-%d"), self.end.format("%Y-%m-%d"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportTable {
    pub caption: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ReportTable {
    pub fn new(caption: &str, headers: &[&str]) -> Self {
        ReportTable {
            caption: caption.to_string(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn row(mut self, cells: Vec<String>) -> Self {
        self.rows.push(cells);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    pub narrative: Vec<String>,
    pub tables: Vec<ReportTable>,
}

impl Section {
    pub fn new(title: impl Into<String>) -> Self {
        Section {
            title: title.into(),
            narrative: Vec::new(),
            tables: Vec::new(),
        }
    }

    pub fn text(mut self, paragraph: impl Into<String>) -> Self {
        self.narrative.push(paragraph.into());
        self
    }

    pub fn table(mut self, table: ReportTable) -> Self {
        self.tables.push(table);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDocument {
    pub standard: ReportStandard,
    pub title: String,
    pub company: String,
    pub period: ReportPeriod,
    pub sections: Vec<Section>,
}

impl ReportDocument {
    pub fn section(&self, title_prefix: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.title.starts_with(title_prefix))
    }

    /// Printable plain-text rendering
    pub fn render_text(&self) -> String {
        let rule = "=".repeat(72);
        let mut out = String::new();

        out.push_str(&format!("{}\n{}\n", rule, self.title));
        out.push_str(&format!("Company: {}\nPeriod: {}\n", self.company, self.period.label()));
        out.push_str(&format!("{}\n", rule));

        for (i, section) in self.sections.iter().enumerate() {
            let heading = format!("{}. {}", i + 1, section.title);
            out.push_str(&format!("\n{}\n{}\n", heading, "-".repeat(heading.chars().count())));
            for paragraph in &section.narrative {
                out.push_str(paragraph);
                out.push('\n');
            }
            for table in &section.tables {
                out.push('\n');
                out.push_str(&render_table(table));
            }
        }

        out
    }
}

fn render_table(table: &ReportTable) -> String {
    let mut widths: Vec<usize> = table.headers.iter().map(|h| h.chars().count()).collect();
    for row in &table.rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
    }

    let line = |cells: &[String]| -> String {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<width$}", c, width = *w))
            .collect();
        format!("  {}\n", padded.join(" | ").trim_end())
    };

    let mut out = format!("  {}\n", table.caption);
    out.push_str(&line(&table.headers[..]));
    let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&format!("  {}\n", separator.join("-+-")));
    for row in &table.rows {
        out.push_str(&line(&row[..]));
    }
    out
}

// ============================================================================
// FORMATTING HELPERS
// ============================================================================

pub(crate) fn kg(value: f64) -> String {
    format!("{:.1}", value)
}

pub(crate) fn tonnes(value_kg: f64) -> String {
    format!("{:.3}", value_kg / 1000.0)
}

pub(crate) fn pct(value: f64) -> String {
    format!("{:.1}%", value)
}

/// Section listing the corrections applied to the bundle, if any
pub(crate) fn corrections_section(metrics: &MetricsBundle) -> Option<Section> {
    if metrics.corrections.is_empty() {
        return None;
    }

    let mut table = ReportTable::new("Corrected figures", &["Figure", "Source value", "Reported value", "Reason"]);
    for c in &metrics.corrections {
        table = table.row(vec![
            c.field.clone(),
            kg(c.original),
            kg(c.corrected),
            c.reason.clone(),
        ]);
    }

    Some(
        Section::new("Data corrections")
            .text(format!(
                "{} figure(s) in this report were replaced by a manual data correction and do not match the tracked records.",
                metrics.corrections.len()
            ))
            .table(table),
    )
}

// ============================================================================
// COMPOSER TRAIT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStandard {
    Esr,
    Gri,
    Nis,
    Ghg,
}

impl ReportStandard {
    pub const ALL: [ReportStandard; 4] = [
        ReportStandard::Esr,
        ReportStandard::Gri,
        ReportStandard::Nis,
        ReportStandard::Ghg,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            ReportStandard::Esr => "ESR",
            ReportStandard::Gri => "GRI",
            ReportStandard::Nis => "NIS",
            ReportStandard::Ghg => "GHG",
        }
    }

    /// Composer for this standard
    pub fn composer(&self) -> Box<dyn ReportComposer> {
        match self {
            ReportStandard::Esr => Box::new(EsrComposer),
            ReportStandard::Gri => Box::new(GriComposer),
            ReportStandard::Nis => Box::new(NisComposer),
            ReportStandard::Ghg => Box::new(GhgComposer),
        }
    }
}

impl fmt::Display for ReportStandard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for ReportStandard {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReportStandard::ALL
            .into_iter()
            .find(|standard| standard.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown report standard: {} (expected esr, gri, nis or ghg)", s))
    }
}

/// One reporting standard's view over a metrics bundle
///
/// Implementations are pure: the same inputs always produce the same document.
pub trait ReportComposer: Send + Sync {
    fn standard(&self) -> ReportStandard;

    /// Sections specific to this standard, in document order
    fn sections(&self, company: &str, period: &ReportPeriod, metrics: &MetricsBundle) -> Vec<Section>;

    fn title(&self) -> String;

    /// Assemble the full document, correction notes included
    fn compose(&self, company: &str, period: &ReportPeriod, metrics: &MetricsBundle) -> ReportDocument {
        let mut sections = self.sections(company, period, metrics);
        sections.extend(corrections_section(metrics));

        ReportDocument {
            standard: self.standard(),
            title: self.title(),
            company: company.to_string(),
            period: *period,
            sections,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
