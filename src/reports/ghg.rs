// GHG Protocol corporate inventory: scope breakdown, avoided emissions kept
// outside the inventory totals

use super::{kg, tonnes, MetricsBundle, ReportComposer, ReportPeriod, ReportStandard, ReportTable, Section};

pub struct GhgComposer;

impl ReportComposer for GhgComposer {
    fn standard(&self) -> ReportStandard {
        ReportStandard::Ghg
    }

    fn title(&self) -> String {
        "GHG Protocol Emissions Inventory".to_string()
    }

    fn sections(&self, company: &str, period: &ReportPeriod, m: &MetricsBundle) -> Vec<Section> {
        let boundary = Section::new("Organizational boundary").text(format!(
            "Operational control approach for {} for the period {}. Processing energy is reported under Scope 2 and material transport under Scope 3 category 4.",
            company,
            period.label()
        ));

        let inventory = Section::new("Scope breakdown").table(
            ReportTable::new("Inventory", &["Scope", "Category", "kgCO2e", "tCO2e"])
                .row(vec!["Scope 1".to_string(), "Direct emissions".to_string(), kg(0.0), tonnes(0.0)])
                .row(vec![
                    "Scope 2".to_string(),
                    "Processing energy".to_string(),
                    kg(m.emissions.processing_kg),
                    tonnes(m.emissions.processing_kg),
                ])
                .row(vec![
                    "Scope 3".to_string(),
                    "Cat. 4 Upstream transportation".to_string(),
                    kg(m.emissions.transport_kg),
                    tonnes(m.emissions.transport_kg),
                ])
                .row(vec![
                    "Total".to_string(),
                    String::new(),
                    kg(m.emissions.generated_kg),
                    tonnes(m.emissions.generated_kg),
                ]),
        );

        let avoided = Section::new("Avoided emissions").text(format!(
            "Reported separately from the inventory: {} kgCO2e avoided by replacing virgin material over {} reuse cycles, net balance {} kgCO2e.",
            kg(m.emissions.avoided_kg),
            m.cycle_count,
            kg(m.emissions.net_balance_kg)
        ));

        vec![boundary, inventory, avoided]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::tests::{sample_metrics, sample_period};

    #[test]
    fn test_ghg_scopes() {
        let doc = GhgComposer.compose("Acme", &sample_period(), &sample_metrics());
        let rows = &doc.section("Scope breakdown").unwrap().tables[0].rows;

        assert_eq!(rows[0][2], "0.0");
        assert_eq!(rows[1][2], "80.0");
        assert_eq!(rows[2][2], "120.0");
        assert_eq!(rows[3][3], "0.200");
    }

    #[test]
    fn test_ghg_avoided_outside_inventory() {
        let doc = GhgComposer.compose("Acme", &sample_period(), &sample_metrics());
        let avoided = doc.section("Avoided emissions").unwrap();
        assert!(avoided.narrative[0].contains("2975.0 kgCO2e avoided"));
        assert!(avoided.tables.is_empty());
    }
}
