// NIS B-1 basic sustainability indicators (Mexican sustainability
// information standards), figures in tonnes

use super::{pct, tonnes, MetricsBundle, ReportComposer, ReportPeriod, ReportStandard, ReportTable, Section};

pub struct NisComposer;

impl ReportComposer for NisComposer {
    fn standard(&self) -> ReportStandard {
        ReportStandard::Nis
    }

    fn title(&self) -> String {
        "NIS B-1 Basic Sustainability Indicators".to_string()
    }

    fn sections(&self, company: &str, period: &ReportPeriod, m: &MetricsBundle) -> Vec<Section> {
        let entity = Section::new("Entity information")
            .text(format!("Entity: {}", company))
            .text(format!("Period: {}", period.label()));

        let indicators = Section::new("Environmental indicators")
            .text(format!(
                "{} circular cycles recorded across {} lots and {} exhibitors.",
                m.cycle_count, m.lot_count, m.exhibitor_count
            ))
            .table(
                ReportTable::new("Basic indicators", &["Indicator", "Value", "Unit"])
                    .row(vec!["GHG emissions generated".to_string(), tonnes(m.emissions.generated_kg), "tCO2e".to_string()])
                    .row(vec!["GHG emissions avoided".to_string(), tonnes(m.emissions.avoided_kg), "tCO2e".to_string()])
                    .row(vec!["Net emissions balance".to_string(), tonnes(m.emissions.net_balance_kg), "tCO2e".to_string()])
                    .row(vec!["Materials used".to_string(), tonnes(m.material_kg), "t".to_string()])
                    .row(vec!["Recycled materials".to_string(), pct(m.recycled_input_rate()), "%".to_string()])
                    .row(vec!["Waste generated".to_string(), tonnes(m.waste.total_kg()), "t".to_string()])
                    .row(vec!["Waste diverted from landfill".to_string(), pct(m.waste.landfill_diversion_rate()), "%".to_string()]),
            );

        vec![entity, indicators]
    }
}
