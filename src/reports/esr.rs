// European Sustainability Reporting Standards (ESRS): climate (E1) and
// resource use / circular economy (E5)

use super::{kg, pct, tonnes, MetricsBundle, ReportComposer, ReportPeriod, ReportStandard, ReportTable, Section};

pub struct EsrComposer;

impl ReportComposer for EsrComposer {
    fn standard(&self) -> ReportStandard {
        ReportStandard::Esr
    }

    fn title(&self) -> String {
        "ESRS Sustainability Statement - Climate and Circular Economy".to_string()
    }

    fn sections(&self, company: &str, period: &ReportPeriod, m: &MetricsBundle) -> Vec<Section> {
        let general = Section::new("ESRS 2 General information").text(format!(
            "{} reports on {} tracked lots and {} exhibitors in circulation from {} to {}, covering {} completed or active reuse cycles.",
            company,
            m.lot_count,
            m.exhibitor_count,
            period.start,
            period.end,
            m.cycle_count
        ));

        let climate = Section::new("E1 Climate change")
            .text(format!(
                "Circular operations generated {} tCO2e and avoided {} tCO2e against virgin material, a net benefit of {} tCO2e.",
                tonnes(m.emissions.generated_kg),
                tonnes(m.emissions.avoided_kg),
                tonnes(m.emissions.net_balance_kg)
            ))
            .table(
                ReportTable::new("E1-6 Gross GHG emissions", &["Source", "kgCO2e", "tCO2e"])
                    .row(vec!["Transport".to_string(), kg(m.emissions.transport_kg), tonnes(m.emissions.transport_kg)])
                    .row(vec!["Processing".to_string(), kg(m.emissions.processing_kg), tonnes(m.emissions.processing_kg)])
                    .row(vec!["Total".to_string(), kg(m.emissions.generated_kg), tonnes(m.emissions.generated_kg)]),
            );

        let mut composition = ReportTable::new("Material composition", &["Material", "kg", "Share"]);
        for (material, weight, share) in m.composition_rows() {
            composition = composition.row(vec![material, kg(weight), pct(share)]);
        }

        let resources = Section::new("E5 Resource use and circular economy")
            .text(format!(
                "Resource inflows weighed {} kg, of which {} kg ({}) came from recycled plastic.",
                kg(m.material_kg),
                kg(m.recycled_kg),
                pct(m.recycled_input_rate())
            ))
            .table(composition);

        let waste = Section::new("E5-5 Resource outflows")
            .text(format!(
                "{} kg of recyclable waste was diverted, a landfill diversion rate of {}.",
                kg(m.waste.recyclable_kg),
                pct(m.waste.landfill_diversion_rate())
            ))
            .table(
                ReportTable::new("Waste by stream", &["Stream", "kg"])
                    .row(vec!["Organic".to_string(), kg(m.waste.organic_kg)])
                    .row(vec!["Inorganic".to_string(), kg(m.waste.inorganic_kg)])
                    .row(vec!["Recyclable".to_string(), kg(m.waste.recyclable_kg)]),
            );

        vec![general, climate, resources, waste]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::tests::{sample_metrics, sample_period};

    #[test]
    fn test_esr_sections_in_order() {
        let doc = EsrComposer.compose("Acme", &sample_period(), &sample_metrics());
        let titles: Vec<&str> = doc.sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "ESRS 2 General information",
                "E1 Climate change",
                "E5 Resource use and circular economy",
                "E5-5 Resource outflows"
            ]
        );
    }

    #[test]
    fn test_esr_interpolates_figures() {
        let doc = EsrComposer.compose("Acme", &sample_period(), &sample_metrics());

        let general = doc.section("ESRS 2").unwrap();
        assert!(general.narrative[0].contains("in circulation from 2025-01-01 to 2025-06-30,"));

        let climate = doc.section("E1").unwrap();
        assert!(climate.narrative[0].contains("generated 0.200 tCO2e"));
        assert!(climate.narrative[0].contains("net benefit of 2.775 tCO2e"));
        assert_eq!(climate.tables[0].rows[2], vec!["Total", "200.0", "0.200"]);

        let resources = doc.section("E5 Resource").unwrap();
        assert!(resources.narrative[0].contains("850.0 kg (85.0%)"));
        assert_eq!(resources.tables[0].rows[0], vec!["HDPE", "600.0", "60.0%"]);

        let waste = doc.section("E5-5").unwrap();
        assert!(waste.narrative[0].contains("150.0%"));
    }
}
