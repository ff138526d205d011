// 📊 Aggregation Functions - portfolio rollups and chart series
//
// Every function here accepts an empty collection and answers with zeros.
// Dashboards render placeholders for a client with no data yet, they never
// see an error or a NaN from this module.

use crate::error::TraceError;
use crate::model::{Cycle, Exhibitor, FlowType, Lot, LotStatus};
use crate::validation::{ensure_valid, validate_lots};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Divide, answering 0 when the denominator is zero or the result is not finite
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    let ratio = numerator / denominator;
    if ratio.is_finite() {
        ratio
    } else {
        0.0
    }
}

/// `safe_ratio` scaled to a percentage
pub fn safe_percentage(part: f64, whole: f64) -> f64 {
    safe_ratio(part, whole) * 100.0
}

// ============================================================================
// SCALAR ROLLUPS
// ============================================================================

/// Sum of each lot's avoided emissions. Callers filter beforehand.
pub fn total_emissions_avoided(lots: &[Lot]) -> f64 {
    lots.iter().map(|l| l.emissions_avoided_kg).sum()
}

pub fn total_recycled_plastic(lots: &[Lot]) -> f64 {
    lots.iter().map(|l| l.recycled_plastic_kg).sum()
}

/// Completed plus active cycles across lots (not their planned capacity)
pub fn total_cycles(lots: &[Lot]) -> u64 {
    lots.iter().map(|l| u64::from(l.current_cycle)).sum()
}

pub fn avg_cycles_per_lot(lots: &[Lot]) -> f64 {
    safe_ratio(total_cycles(lots) as f64, lots.len() as f64)
}

/// Share of finished cycles whose material came back to its origin site
pub fn return_to_origin_rate(lots: &[Lot]) -> f64 {
    let finished: Vec<&Cycle> = lots
        .iter()
        .flat_map(|l| l.cycles.iter())
        .filter(|c| !c.is_open())
        .collect();
    let returned = finished.iter().filter(|c| c.returned_to_origin).count();

    safe_percentage(returned as f64, finished.len() as f64)
}

/// Summed emissions breakdown across cycles
///
/// Totals are summed independently of their parts, so the additive invariant
/// of every input cycle carries over to the result.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmissionsTotals {
    pub transport: f64,
    pub processing: f64,
    pub total: f64,
    pub distance_km: f64,
}

pub fn emissions_totals<'a, I>(cycles: I) -> EmissionsTotals
where
    I: IntoIterator<Item = &'a Cycle>,
{
    cycles.into_iter().fold(EmissionsTotals::default(), |acc, c| EmissionsTotals {
        transport: acc.transport + c.emissions.transport,
        processing: acc.processing + c.emissions.processing,
        total: acc.total + c.emissions.total,
        distance_km: acc.distance_km + c.distance_km,
    })
}

/// Every cycle of every lot, in lot order
pub fn all_cycles(lots: &[Lot]) -> Vec<&Cycle> {
    lots.iter().flat_map(|l| l.cycles.iter()).collect()
}

// ============================================================================
// CHART SERIES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPoint {
    pub cycle_number: u32,
    pub cumulative_generated: f64,
    pub cumulative_avoided: f64,
    pub net_balance: f64,
}

/// Running emissions balance, one point per cycle in cycle-number order.
///
/// Generated emissions are the cycle totals; avoided emissions are the moved
/// weight times `VIRGIN_MATERIAL_EMISSION_FACTOR`.
pub fn cumulative_emissions_series(cycles: &[Cycle]) -> Vec<SeriesPoint> {
    let mut ordered: Vec<&Cycle> = cycles.iter().collect();
    // sort_by_key is stable, ties keep their input order
    ordered.sort_by_key(|c| c.number);

    let mut generated = 0.0;
    let mut avoided = 0.0;
    ordered
        .into_iter()
        .map(|cycle| {
            generated += cycle.emissions.total;
            avoided += cycle.avoided_emissions();
            SeriesPoint {
                cycle_number: cycle.number,
                cumulative_generated: generated,
                cumulative_avoided: avoided,
                net_balance: avoided - generated,
            }
        })
        .collect()
}

/// Lot count per flow type, with every flow type present
pub fn flow_type_distribution(lots: &[Lot]) -> BTreeMap<FlowType, usize> {
    let mut distribution: BTreeMap<FlowType, usize> =
        FlowType::ALL.iter().map(|f| (*f, 0)).collect();

    for lot in lots {
        *distribution.entry(lot.flow_type).or_insert(0) += 1;
    }

    distribution
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientTotals {
    pub client: String,
    pub lots: usize,
    pub cycles: u64,
    pub emissions_avoided_kg: f64,
    pub recycled_plastic_kg: f64,
}

/// Per-client rollup, sorted by client name
pub fn client_breakdown(lots: &[Lot]) -> Vec<ClientTotals> {
    let mut by_client: BTreeMap<&str, ClientTotals> = BTreeMap::new();

    for lot in lots {
        let entry = by_client.entry(lot.client.as_str()).or_insert_with(|| ClientTotals {
            client: lot.client.clone(),
            lots: 0,
            cycles: 0,
            emissions_avoided_kg: 0.0,
            recycled_plastic_kg: 0.0,
        });
        entry.lots += 1;
        entry.cycles += u64::from(lot.current_cycle);
        entry.emissions_avoided_kg += lot.emissions_avoided_kg;
        entry.recycled_plastic_kg += lot.recycled_plastic_kg;
    }

    by_client.into_values().collect()
}

// ============================================================================
// EXHIBITORS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExhibitorTotals {
    pub exhibitors: usize,
    pub graphic_changes: u64,
    pub emissions_generated_kg: f64,
    pub emissions_avoided_kg: f64,
    pub net_balance_kg: f64,
    pub total_weight_kg: f64,
    pub total_distance_km: f64,
}

pub fn exhibitor_totals(exhibitors: &[Exhibitor]) -> ExhibitorTotals {
    exhibitors.iter().fold(ExhibitorTotals::default(), |acc, e| {
        let stats = e.stats();
        ExhibitorTotals {
            exhibitors: acc.exhibitors + 1,
            graphic_changes: acc.graphic_changes + u64::from(e.graphic_changes),
            emissions_generated_kg: acc.emissions_generated_kg + stats.emissions_generated_kg,
            emissions_avoided_kg: acc.emissions_avoided_kg + stats.emissions_avoided_kg,
            net_balance_kg: acc.net_balance_kg + stats.net_balance_kg,
            total_weight_kg: acc.total_weight_kg + stats.total_weight_kg,
            total_distance_km: acc.total_distance_km + stats.total_distance_km,
        }
    })
}

// ============================================================================
// DASHBOARD SUMMARY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_lots: usize,
    pub active_lots: usize,
    pub total_emissions_avoided_kg: f64,
    pub total_recycled_plastic_kg: f64,
    pub total_cycles: u64,
    pub avg_cycles_per_lot: f64,
    pub return_to_origin_rate: f64,
    pub flow_types: BTreeMap<FlowType, usize>,
    pub emissions: EmissionsTotals,
}

impl DashboardSummary {
    pub fn summary(&self) -> String {
        format!(
            "{} lots ({} active), {} cycles (avg {:.1}/lot), {:.1} kgCO2e avoided, {:.1} kg recycled plastic",
            self.total_lots,
            self.active_lots,
            self.total_cycles,
            self.avg_cycles_per_lot,
            self.total_emissions_avoided_kg,
            self.total_recycled_plastic_kg
        )
    }
}

/// Build the dashboard header figures.
///
/// Malformed numbers are reported as a validation error instead of being
/// folded into the totals.
pub fn dashboard_summary(lots: &[Lot]) -> Result<DashboardSummary, TraceError> {
    ensure_valid(validate_lots(lots))?;

    let summary = DashboardSummary {
        total_lots: lots.len(),
        active_lots: lots.iter().filter(|l| l.status == LotStatus::Active).count(),
        total_emissions_avoided_kg: total_emissions_avoided(lots),
        total_recycled_plastic_kg: total_recycled_plastic(lots),
        total_cycles: total_cycles(lots),
        avg_cycles_per_lot: avg_cycles_per_lot(lots),
        return_to_origin_rate: return_to_origin_rate(lots),
        flow_types: flow_type_distribution(lots),
        emissions: emissions_totals(all_cycles(lots)),
    };
    log::debug!("dashboard summary: {}", summary.summary());

    Ok(summary)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::{create_test_cycle, create_test_lot};
    use crate::model::Emissions;

    #[test]
    fn test_empty_inputs_yield_zero() {
        assert_eq!(total_emissions_avoided(&[]), 0.0);
        assert_eq!(total_cycles(&[]), 0);
        assert_eq!(avg_cycles_per_lot(&[]), 0.0);
        assert_eq!(return_to_origin_rate(&[]), 0.0);
        assert!(cumulative_emissions_series(&[]).is_empty());
        assert!(client_breakdown(&[]).is_empty());
        assert_eq!(exhibitor_totals(&[]), ExhibitorTotals::default());
    }

    #[test]
    fn test_flow_type_distribution_zero_filled() {
        let distribution = flow_type_distribution(&[]);
        assert_eq!(distribution.len(), 3);
        assert!(distribution.values().all(|count| *count == 0));

        let lots = vec![
            create_test_lot("L-1", FlowType::ClosedLoop, "Acme", 1),
            create_test_lot("L-2", FlowType::ClosedLoop, "Acme", 2),
        ];
        let distribution = flow_type_distribution(&lots);
        assert_eq!(distribution[&FlowType::ClosedLoop], 2);
        assert_eq!(distribution[&FlowType::OpenLoop], 0);
        assert_eq!(distribution[&FlowType::Recycling], 0);
    }

    #[test]
    fn test_totals_and_average() {
        let lots = vec![
            create_test_lot("L-1", FlowType::ClosedLoop, "Acme", 1),
            create_test_lot("L-2", FlowType::OpenLoop, "Acme", 2),
        ];

        assert_eq!(total_cycles(&lots), 3);
        assert_eq!(avg_cycles_per_lot(&lots), 1.5);
        assert_eq!(total_emissions_avoided(&lots), 105.0);
        assert_eq!(total_recycled_plastic(&lots), 16.0);
    }

    #[test]
    fn test_cumulative_series_scenario() {
        let cycles = vec![
            create_test_cycle(1, 10.0, 2.0, 1.0),
            create_test_cycle(2, 20.0, 4.0, 2.0),
        ];

        let series = cumulative_emissions_series(&cycles);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].cumulative_generated, 3.0);
        assert_eq!(series[0].cumulative_avoided, 35.0);

        let point = series[1];
        assert_eq!(point.cycle_number, 2);
        assert_eq!(point.cumulative_generated, 9.0);
        assert_eq!(point.cumulative_avoided, 105.0);
        assert_eq!(point.net_balance, 96.0);
    }

    #[test]
    fn test_cumulative_series_sorts_by_number() {
        let cycles = vec![
            create_test_cycle(3, 1.0, 1.0, 0.0),
            create_test_cycle(1, 1.0, 1.0, 0.0),
            create_test_cycle(2, 1.0, 1.0, 0.0),
        ];

        let numbers: Vec<u32> = cumulative_emissions_series(&cycles)
            .iter()
            .map(|p| p.cycle_number)
            .collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn test_emissions_totals_stay_additive() {
        let cycles = vec![
            create_test_cycle(1, 10.0, 2.5, 1.25),
            create_test_cycle(2, 10.0, 4.0, 0.5),
            create_test_cycle(3, 10.0, 0.75, 3.0),
        ];

        let totals = emissions_totals(&cycles);
        assert!((totals.transport + totals.processing - totals.total).abs() < 1e-9);
        assert_eq!(totals.distance_km, 300.0);
    }

    #[test]
    fn test_return_to_origin_ignores_open_cycles() {
        // create_test_cycle marks even-numbered cycles as returned
        let mut lot = create_test_lot("L-1", FlowType::ClosedLoop, "Acme", 4);
        lot.cycles[3].end_date = None;

        // finished: 1, 2, 3 -> one returned
        let rate = return_to_origin_rate(&[lot]);
        assert!((rate - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_client_breakdown_groups_and_sorts() {
        let lots = vec![
            create_test_lot("L-1", FlowType::ClosedLoop, "Zeta", 1),
            create_test_lot("L-2", FlowType::OpenLoop, "Acme", 2),
            create_test_lot("L-3", FlowType::Recycling, "Acme", 1),
        ];

        let breakdown = client_breakdown(&lots);
        assert_eq!(breakdown.len(), 2);
        assert_eq!(breakdown[0].client, "Acme");
        assert_eq!(breakdown[0].lots, 2);
        assert_eq!(breakdown[0].cycles, 3);
        assert_eq!(breakdown[1].client, "Zeta");
    }

    #[test]
    fn test_dashboard_summary_rejects_malformed_numbers() {
        let mut lot = create_test_lot("L-1", FlowType::ClosedLoop, "Acme", 1);
        lot.cycles[0].emissions = Emissions { transport: f64::INFINITY, processing: 0.0, total: 0.0 };

        assert!(matches!(dashboard_summary(&[lot]), Err(TraceError::Validation(_))));
    }

    #[test]
    fn test_cycle_totals_do_not_overflow() {
        let mut big = create_test_lot("L-1", FlowType::ClosedLoop, "Acme", 0);
        big.current_cycle = u32::MAX;
        big.total_cycles = u32::MAX;
        let small = create_test_lot("L-2", FlowType::ClosedLoop, "Acme", 1);
        let lots = vec![big, small];

        assert_eq!(total_cycles(&lots), u64::from(u32::MAX) + 1);
        assert_eq!(client_breakdown(&lots)[0].cycles, u64::from(u32::MAX) + 1);
        assert!(matches!(dashboard_summary(&lots), Err(TraceError::Validation(_))));
    }

    #[test]
    fn test_dashboard_summary_empty() {
        let summary = dashboard_summary(&[]).unwrap();
        assert_eq!(summary.total_lots, 0);
        assert_eq!(summary.avg_cycles_per_lot, 0.0);
        assert_eq!(summary.flow_types.len(), 3);
    }

    #[test]
    fn test_safe_ratio_guards() {
        assert_eq!(safe_ratio(5.0, 0.0), 0.0);
        assert_eq!(safe_ratio(0.0, 0.0), 0.0);
        assert_eq!(safe_ratio(1.0, 4.0), 0.25);
        assert_eq!(safe_percentage(1.0, 4.0), 25.0);
    }
}
