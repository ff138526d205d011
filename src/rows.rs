// Flat export rows for lots, cycles and exhibitors
//
// Column headers are the serde names below, in field order.

use crate::error::TraceError;
use crate::export::{to_csv, to_xlsx, ExportFormat, TableStyle};
use crate::model::{Exhibitor, Lot};
use serde::Serialize;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize)]
pub struct LotRow {
    #[serde(rename = "Lot ID")]
    pub id: String,
    #[serde(rename = "Client")]
    pub client: String,
    #[serde(rename = "Flow Type")]
    pub flow_type: String,
    #[serde(rename = "Product Type")]
    pub product_type: String,
    #[serde(rename = "Weight (kg)")]
    pub weight_kg: f64,
    #[serde(rename = "Recycled Content (%)")]
    pub recycled_content_pct: f64,
    #[serde(rename = "Origin Date")]
    pub origin_date: String,
    #[serde(rename = "Current Cycle")]
    pub current_cycle: u32,
    #[serde(rename = "Total Cycles")]
    pub total_cycles: u32,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Emissions Avoided (kgCO2e)")]
    pub emissions_avoided_kg: f64,
    #[serde(rename = "Recycled Plastic (kg)")]
    pub recycled_plastic_kg: f64,
}

impl From<&Lot> for LotRow {
    fn from(lot: &Lot) -> Self {
        LotRow {
            id: lot.id.clone(),
            client: lot.client.clone(),
            flow_type: lot.flow_type.label().to_string(),
            product_type: lot.product_type.clone(),
            weight_kg: lot.weight_kg,
            recycled_content_pct: lot.recycled_content_pct,
            origin_date: lot.origin_date.format("%Y-%m-%d").to_string(),
            current_cycle: lot.current_cycle,
            total_cycles: lot.total_cycles,
            status: lot.status.as_str().to_string(),
            emissions_avoided_kg: lot.emissions_avoided_kg,
            recycled_plastic_kg: lot.recycled_plastic_kg,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleRow {
    #[serde(rename = "Lot ID")]
    pub lot_id: String,
    #[serde(rename = "Cycle")]
    pub number: u32,
    #[serde(rename = "Start Date")]
    pub start_date: String,
    /// Empty while the cycle is open
    #[serde(rename = "End Date")]
    pub end_date: Option<String>,
    #[serde(rename = "Client")]
    pub client: String,
    #[serde(rename = "Brand")]
    pub brand: String,
    #[serde(rename = "Campaign")]
    pub campaign: String,
    #[serde(rename = "Store")]
    pub store: String,
    #[serde(rename = "Address")]
    pub address: String,
    #[serde(rename = "City")]
    pub city: String,
    #[serde(rename = "Returned To Origin")]
    pub returned_to_origin: bool,
    #[serde(rename = "Transport (kgCO2e)")]
    pub transport: f64,
    #[serde(rename = "Processing (kgCO2e)")]
    pub processing: f64,
    #[serde(rename = "Total (kgCO2e)")]
    pub total: f64,
    #[serde(rename = "Distance (km)")]
    pub distance_km: f64,
    #[serde(rename = "Weight (kg)")]
    pub weight_kg: f64,
}

/// One row per cycle, lots in input order and cycles by number
pub fn cycle_rows(lots: &[Lot]) -> Vec<CycleRow> {
    lots.iter()
        .flat_map(|lot| {
            lot.sorted_cycles().into_iter().map(move |c| CycleRow {
                lot_id: lot.id.clone(),
                number: c.number,
                start_date: c.start_date.format("%Y-%m-%d").to_string(),
                end_date: c.end_date.map(|d| d.format("%Y-%m-%d").to_string()),
                client: c.client.clone(),
                brand: c.brand.clone(),
                campaign: c.campaign.clone(),
                store: c.location.store.clone(),
                address: c.location.address.clone(),
                city: c.location.city.clone(),
                returned_to_origin: c.returned_to_origin,
                transport: c.emissions.transport,
                processing: c.emissions.processing,
                total: c.emissions.total,
                distance_km: c.distance_km,
                weight_kg: c.weight_kg,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct ExhibitorRow {
    #[serde(rename = "Exhibitor ID")]
    pub id: String,
    #[serde(rename = "Client")]
    pub client: String,
    #[serde(rename = "Model")]
    pub model_ref: String,
    #[serde(rename = "Store")]
    pub store: String,
    #[serde(rename = "City")]
    pub city: String,
    #[serde(rename = "Years In Operation")]
    pub years_in_operation: u32,
    #[serde(rename = "Graphic Changes")]
    pub graphic_changes: u32,
    #[serde(rename = "Current Graphic")]
    pub current_graphic: String,
    #[serde(rename = "Condition")]
    pub condition: String,
    #[serde(rename = "Emissions Avoided (kgCO2e)")]
    pub emissions_avoided_kg: f64,
    #[serde(rename = "Net Balance (kgCO2e)")]
    pub net_balance_kg: f64,
    #[serde(rename = "Total Weight (kg)")]
    pub total_weight_kg: f64,
    #[serde(rename = "Total Distance (km)")]
    pub total_distance_km: f64,
}

impl From<&Exhibitor> for ExhibitorRow {
    fn from(e: &Exhibitor) -> Self {
        // Always derived from the history, never from the cached copy
        let stats = e.stats();
        ExhibitorRow {
            id: e.id.clone(),
            client: e.client.clone(),
            model_ref: e.model_ref.clone(),
            store: e.location.store.clone(),
            city: e.location.city.clone(),
            years_in_operation: e.years_in_operation,
            graphic_changes: e.graphic_changes,
            current_graphic: e.current_graphic.clone(),
            condition: e.condition.as_str().to_string(),
            emissions_avoided_kg: stats.emissions_avoided_kg,
            net_balance_kg: stats.net_balance_kg,
            total_weight_kg: stats.total_weight_kg,
            total_distance_km: stats.total_distance_km,
        }
    }
}

/// Row of the per-client report (`Reporte_<client>_<date>.csv`)
#[derive(Debug, Clone, Serialize)]
pub struct ClientReportRow {
    #[serde(rename = "Lot ID")]
    pub lot_id: String,
    #[serde(rename = "Product Type")]
    pub product_type: String,
    #[serde(rename = "Flow Type")]
    pub flow_type: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Cycles")]
    pub cycles: String,
    #[serde(rename = "Current Location")]
    pub current_location: String,
    #[serde(rename = "Emissions Generated (kgCO2e)")]
    pub emissions_generated_kg: f64,
    #[serde(rename = "Emissions Avoided (kgCO2e)")]
    pub emissions_avoided_kg: f64,
    #[serde(rename = "Net Balance (kgCO2e)")]
    pub net_balance_kg: f64,
}

pub fn client_report_rows(lots: &[Lot]) -> Vec<ClientReportRow> {
    lots.iter()
        .map(|lot| {
            let generated: f64 = lot.cycles.iter().map(|c| c.emissions.total).sum();
            let location = lot
                .sorted_cycles()
                .last()
                .map(|c| format!("{}, {}", c.location.store, c.location.city))
                .unwrap_or_default();

            ClientReportRow {
                lot_id: lot.id.clone(),
                product_type: lot.product_type.clone(),
                flow_type: lot.flow_type.label().to_string(),
                status: lot.status.as_str().to_string(),
                cycles: format!("{}/{}", lot.current_cycle, lot.total_cycles),
                current_location: location,
                emissions_generated_kg: generated,
                emissions_avoided_kg: lot.emissions_avoided_kg,
                net_balance_kg: lot.emissions_avoided_kg - generated,
            }
        })
        .collect()
}

// ============================================================================
// DATASET EXPORT
// ============================================================================

/// Which collection an export covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportDataset {
    Lots,
    Cycles,
    Exhibitors,
}

impl ExportDataset {
    pub fn name(&self) -> &'static str {
        match self {
            ExportDataset::Lots => "lots",
            ExportDataset::Cycles => "cycles",
            ExportDataset::Exhibitors => "exhibitors",
        }
    }

    fn sheet_name(&self) -> &'static str {
        match self {
            ExportDataset::Lots => "Lots",
            ExportDataset::Cycles => "Cycles",
            ExportDataset::Exhibitors => "Exhibitors",
        }
    }

    /// Serialize the chosen collection; XLSX output gets the default styling
    pub fn render(&self, format: ExportFormat, lots: &[Lot], exhibitors: &[Exhibitor]) -> Result<Vec<u8>, TraceError> {
        match self {
            ExportDataset::Lots => {
                let rows: Vec<LotRow> = lots.iter().map(LotRow::from).collect();
                encode(&rows, format, self.sheet_name())
            }
            ExportDataset::Cycles => encode(&cycle_rows(lots), format, self.sheet_name()),
            ExportDataset::Exhibitors => {
                let rows: Vec<ExhibitorRow> = exhibitors.iter().map(ExhibitorRow::from).collect();
                encode(&rows, format, self.sheet_name())
            }
        }
    }
}

fn encode<T: Serialize>(rows: &[T], format: ExportFormat, sheet_name: &str) -> Result<Vec<u8>, TraceError> {
    match format {
        ExportFormat::Csv => Ok(to_csv(rows)?.into_bytes()),
        ExportFormat::Xlsx => to_xlsx(rows, sheet_name, Some(&TableStyle::default())),
    }
}

impl FromStr for ExportDataset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lots" => Ok(ExportDataset::Lots),
            "cycles" => Ok(ExportDataset::Cycles),
            "exhibitors" => Ok(ExportDataset::Exhibitors),
            other => Err(format!("unknown dataset: {} (expected lots, cycles or exhibitors)", other)),
        }
    }
}
