// 🔗 Service Layer - repository -> metrics -> corrections -> composer
//
// Shared by the CLI and the HTTP server so both produce identical output.

use crate::aggregation::{cumulative_emissions_series, SeriesPoint};
use crate::corrections::CorrectionSet;
use crate::repository::{LotFilter, LotRepository};
use crate::reports::{MetricsBundle, ReportDocument, ReportPeriod, ReportStandard};
use crate::validation::{ensure_valid, validate_exhibitors, validate_lot, validate_lots};
use anyhow::{anyhow, Result};

/// Metrics for one client's lots that started on or before the period end.
///
/// Lots and exhibitors are validated first; critical issues surface as
/// `TraceError::Validation` instead of reaching the report.
pub fn client_metrics(repo: &dyn LotRepository, client: &str, period: &ReportPeriod) -> Result<MetricsBundle> {
    let lots: Vec<_> = repo
        .fetch_lots(&LotFilter::for_client(client))?
        .into_iter()
        .filter(|l| l.origin_date <= period.end)
        .collect();
    let exhibitors = repo.fetch_exhibitors(Some(client))?;

    let mut issues = validate_lots(&lots);
    issues.extend(validate_exhibitors(&exhibitors));
    ensure_valid(issues)?;

    let waste = repo.fetch_waste(client)?;
    let composition = repo.fetch_material_composition(client)?;

    log::debug!(
        "metrics for {}: {} lots, {} exhibitors",
        client,
        lots.len(),
        exhibitors.len()
    );
    Ok(MetricsBundle::from_records(&lots, &exhibitors, waste, composition))
}

/// Compose a sustainability report with the client's corrections applied
pub fn compose_report(
    repo: &dyn LotRepository,
    corrections: &CorrectionSet,
    standard: ReportStandard,
    client: &str,
    company: &str,
    period: &ReportPeriod,
) -> Result<ReportDocument> {
    let metrics = client_metrics(repo, client, period)?;
    let metrics = corrections.apply(client, &metrics);

    let document = standard.composer().compose(company, period, &metrics);
    log::info!(
        "composed {} report for {} ({} sections)",
        standard,
        company,
        document.sections.len()
    );
    Ok(document)
}

/// Cumulative emissions chart data for one lot
pub fn lot_series(repo: &dyn LotRepository, lot_id: &str) -> Result<Vec<SeriesPoint>> {
    let lot = repo
        .find_lot(lot_id)?
        .ok_or_else(|| anyhow!("lot not found: {}", lot_id))?;
    ensure_valid(validate_lot(&lot))?;
    Ok(cumulative_emissions_series(&lot.cycles))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corrections::MetricsCorrection;
    use crate::error::TraceError;
    use crate::model::tests::{create_test_lot, date};
    use crate::model::{Emissions, FlowType};
    use crate::repository::{Dataset, InMemoryRepository};
    use crate::sample::{sample_dataset, sample_repository};

    fn year_2024() -> ReportPeriod {
        ReportPeriod::new(date(2024, 1, 1), date(2024, 12, 31)).unwrap()
    }

    #[test]
    fn test_client_metrics_scoped_to_client() {
        let repo = sample_repository();
        let metrics = client_metrics(&repo, "Grupo Norte Retail", &year_2024()).unwrap();

        assert_eq!(metrics.lot_count, 2);
        assert_eq!(metrics.exhibitor_count, 2);
        assert_eq!(metrics.waste.recyclable_kg, 640.0);
    }

    #[test]
    fn test_period_end_excludes_later_lots() {
        let repo = sample_repository();
        let period = ReportPeriod::new(date(2024, 1, 1), date(2024, 1, 31)).unwrap();
        let metrics = client_metrics(&repo, "Grupo Norte Retail", &period).unwrap();

        assert_eq!(metrics.lot_count, 1);
    }

    #[test]
    fn test_compose_report_flags_corrections() {
        let repo = sample_repository();
        let corrections = CorrectionSet::from_corrections(vec![MetricsCorrection {
            client: "Farmacias del Valle".to_string(),
            reason: "scale recalibration".to_string(),
            cycle_count: None,
            recycled_kg: Some(1.0),
            emissions_transport_kg: None,
            emissions_processing_kg: None,
            emissions_avoided_kg: None,
        }]);

        let doc = compose_report(
            &repo,
            &corrections,
            ReportStandard::Gri,
            "Farmacias del Valle",
            "Farmacias del Valle S.A.",
            &year_2024(),
        )
        .unwrap();

        assert_eq!(doc.standard, ReportStandard::Gri);
        assert!(doc.render_text().contains("scale recalibration"));
    }

    #[test]
    fn test_lot_series() {
        let repo = sample_repository();
        let series = lot_series(&repo, "LOT-2024-001").unwrap();
        assert_eq!(series.len(), 4);
        assert!(lot_series(&repo, "LOT-0000").is_err());
    }

    fn assert_validation_error(err: anyhow::Error) {
        assert!(
            matches!(err.downcast_ref::<TraceError>(), Some(TraceError::Validation(_))),
            "expected validation error, got {:?}",
            err
        );
    }

    fn repository_with_negative_transport() -> InMemoryRepository {
        let mut lot = create_test_lot("L-1", FlowType::ClosedLoop, "Acme", 1);
        lot.cycles[0].emissions = Emissions::new(-500.0, 1.0);
        InMemoryRepository::new(Dataset {
            lots: vec![lot],
            ..Dataset::default()
        })
    }

    #[test]
    fn test_report_rejects_malformed_lot() {
        let repo = repository_with_negative_transport();
        let err = compose_report(&repo, &CorrectionSet::new(), ReportStandard::Ghg, "Acme", "Acme", &year_2024())
            .unwrap_err();
        assert_validation_error(err);
    }

    #[test]
    fn test_report_rejects_malformed_exhibitor() {
        let mut dataset = sample_dataset();
        dataset.exhibitors[0].weight_kg = f64::NAN;
        let client = dataset.exhibitors[0].client.clone();
        let repo = InMemoryRepository::new(dataset);

        let err = client_metrics(&repo, &client, &year_2024()).unwrap_err();
        assert_validation_error(err);
    }

    #[test]
    fn test_series_rejects_malformed_lot() {
        let repo = repository_with_negative_transport();
        assert_validation_error(lot_series(&repo, "L-1").unwrap_err());
    }
}
