// GRI Standards: 301 Materials, 305 Emissions, 306 Waste

use super::{kg, pct, MetricsBundle, ReportComposer, ReportPeriod, ReportStandard, ReportTable, Section};

pub struct GriComposer;

impl ReportComposer for GriComposer {
    fn standard(&self) -> ReportStandard {
        ReportStandard::Gri
    }

    fn title(&self) -> String {
        "GRI Standards Report".to_string()
    }

    fn sections(&self, company: &str, period: &ReportPeriod, m: &MetricsBundle) -> Vec<Section> {
        let general = Section::new("GRI 2 General disclosures")
            .text(format!("Reporting organization: {}. Reporting period: {}.", company, period.label()))
            .text(format!(
                "Scope: {} lots, {} exhibitors, {} reuse cycles.",
                m.lot_count, m.exhibitor_count, m.cycle_count
            ));

        let mut materials_table = ReportTable::new("301-1 Materials used by weight", &["Material", "kg", "Share"]);
        for (material, weight, share) in m.composition_rows() {
            materials_table = materials_table.row(vec![material, kg(weight), pct(share)]);
        }
        let materials = Section::new("GRI 301 Materials")
            .text(format!(
                "301-2 Recycled input materials used: {} kg of {} kg ({}).",
                kg(m.recycled_kg),
                kg(m.material_kg),
                pct(m.recycled_input_rate())
            ))
            .table(materials_table);

        let emissions = Section::new("GRI 305 Emissions").table(
            ReportTable::new("Emissions (kgCO2e)", &["Disclosure", "Description", "kgCO2e"])
                .row(vec!["305-3".to_string(), "Other indirect (transport)".to_string(), kg(m.emissions.transport_kg)])
                .row(vec!["305-3".to_string(), "Other indirect (processing)".to_string(), kg(m.emissions.processing_kg)])
                .row(vec!["305-5".to_string(), "Reduction of GHG emissions".to_string(), kg(m.emissions.avoided_kg)]),
        );

        let waste = Section::new("GRI 306 Waste")
            .text(format!("Landfill diversion rate: {}.", pct(m.waste.landfill_diversion_rate())))
            .table(
                ReportTable::new("Waste (kg)", &["Disclosure", "Description", "kg"])
                    .row(vec!["306-3".to_string(), "Waste generated".to_string(), kg(m.waste.total_kg())])
                    .row(vec!["306-4".to_string(), "Diverted from disposal".to_string(), kg(m.waste.recyclable_kg)])
                    .row(vec!["306-5".to_string(), "Directed to disposal".to_string(), kg(m.waste.landfill_kg())]),
            );

        vec![general, materials, emissions, waste]
    }
}
