// Built-in demo dataset
//
// Used when no dataset file is configured, so the CLI and the server have
// something to show out of the box.

use crate::model::{
    Condition, Cycle, Emissions, Exhibitor, FlowType, Location, Lot, LotStatus,
    VIRGIN_MATERIAL_EMISSION_FACTOR,
};
use crate::repository::{Dataset, InMemoryRepository};
use crate::reports::{MaterialShare, WasteFigures};
use chrono::{Duration, NaiveDate};

struct Stop {
    client: &'static str,
    brand: &'static str,
    campaign: &'static str,
    store: &'static str,
    address: &'static str,
    city: &'static str,
    distance_km: f64,
    returned: bool,
}

static STOPS: [Stop; 4] = [
    Stop {
        client: "Grupo Norte Retail",
        brand: "Norte Market",
        campaign: "Back to school",
        store: "Norte Market Cumbres",
        address: "Av. Paseo de los Leones 1200",
        city: "Monterrey",
        distance_km: 42.0,
        returned: true,
    },
    Stop {
        client: "Grupo Norte Retail",
        brand: "Norte Express",
        campaign: "Summer deals",
        store: "Norte Express Centro",
        address: "Calle Morelos 310",
        city: "Monterrey",
        distance_km: 18.5,
        returned: false,
    },
    Stop {
        client: "Farmacias del Valle",
        brand: "Del Valle",
        campaign: "Cold season",
        store: "Del Valle Chapultepec",
        address: "Av. Chapultepec 455",
        city: "Guadalajara",
        distance_km: 65.0,
        returned: true,
    },
    Stop {
        client: "Bebidas Azteca",
        brand: "Azteca Cola",
        campaign: "Football cup",
        store: "Distribution center Tlalnepantla",
        address: "Blvd. Manuel Avila Camacho 80",
        city: "Mexico City",
        distance_km: 120.0,
        returned: false,
    },
];

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("sample dates are valid")
}

/// Cycles of 60 days each, the last one still open when `open_last` is set
fn cycles(start: NaiveDate, count: u32, weight_kg: f64, stop_offset: usize, open_last: bool) -> Vec<Cycle> {
    (1..=count)
        .map(|number| {
            let stop = &STOPS[(stop_offset + number as usize - 1) % STOPS.len()];
            let start_date = start + Duration::days(60 * (number as i64 - 1));
            let end_date = if open_last && number == count {
                None
            } else {
                Some(start_date + Duration::days(55))
            };
            // 0.1 kgCO2e per tonne-km of road freight, plus 0.05 kgCO2e/kg washing
            let transport = (stop.distance_km * weight_kg / 1000.0 * 0.1 * 100.0).round() / 100.0;
            let processing = (weight_kg * 0.05 * 100.0).round() / 100.0;

            Cycle {
                number,
                start_date,
                end_date,
                client: stop.client.to_string(),
                brand: stop.brand.to_string(),
                campaign: stop.campaign.to_string(),
                location: Location {
                    store: stop.store.to_string(),
                    address: stop.address.to_string(),
                    city: stop.city.to_string(),
                },
                returned_to_origin: stop.returned,
                emissions: Emissions::new(transport, processing),
                distance_km: stop.distance_km,
                weight_kg,
            }
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn lot(
    id: &str,
    client: &str,
    flow_type: FlowType,
    product_type: &str,
    weight_kg: f64,
    recycled_content_pct: f64,
    origin: NaiveDate,
    current_cycle: u32,
    total_cycles: u32,
    status: LotStatus,
    stop_offset: usize,
) -> Lot {
    let open = status == LotStatus::Active;
    let cycles = cycles(origin, current_cycle, weight_kg, stop_offset, open);
    let avoided: f64 = cycles.iter().map(|c| c.weight_kg * VIRGIN_MATERIAL_EMISSION_FACTOR).sum();

    Lot {
        id: id.to_string(),
        flow_type,
        product_type: product_type.to_string(),
        weight_kg,
        recycled_content_pct,
        origin_date: origin,
        current_cycle,
        total_cycles,
        cycles,
        emissions_avoided_kg: avoided,
        recycled_plastic_kg: weight_kg * recycled_content_pct / 100.0,
        status,
        client: client.to_string(),
    }
}

fn exhibitor(id: &str, client: &str, model_ref: &str, graphic: &str, changes: u32, condition: Condition, stop_offset: usize) -> Exhibitor {
    let stop = &STOPS[stop_offset % STOPS.len()];
    Exhibitor {
        id: id.to_string(),
        client: client.to_string(),
        model_ref: model_ref.to_string(),
        location: Location {
            store: stop.store.to_string(),
            address: stop.address.to_string(),
            city: stop.city.to_string(),
        },
        years_in_operation: changes.div_ceil(2),
        graphic_changes: changes,
        current_graphic: graphic.to_string(),
        condition,
        weight_kg: 18.0,
        cycles: cycles(day(2023, 9, 1), changes, 18.0, stop_offset, true),
        cached_stats: None,
    }
}

/// The demo dataset: three clients, every flow type, a few exhibitors
pub fn sample_dataset() -> Dataset {
    let lots = vec![
        lot("LOT-2024-001", "Grupo Norte Retail", FlowType::ClosedLoop, "Returnable crate", 240.0, 85.0, day(2024, 1, 8), 4, 12, LotStatus::Active, 0),
        lot("LOT-2024-002", "Grupo Norte Retail", FlowType::OpenLoop, "Display pallet", 410.0, 70.0, day(2024, 2, 12), 3, 8, LotStatus::Collected, 1),
        lot("LOT-2024-003", "Farmacias del Valle", FlowType::ClosedLoop, "Shelf tray", 95.0, 100.0, day(2024, 3, 4), 2, 10, LotStatus::Active, 2),
        lot("LOT-2024-004", "Farmacias del Valle", FlowType::Recycling, "Shrink film bale", 520.0, 45.0, day(2024, 4, 15), 1, 1, LotStatus::Processing, 2),
        lot("LOT-2024-005", "Bebidas Azteca", FlowType::OpenLoop, "Beverage crate", 330.0, 90.0, day(2024, 5, 20), 2, 15, LotStatus::Active, 3),
    ];

    let exhibitors = vec![
        exhibitor("EXH-0101", "Grupo Norte Retail", "Gondola end cap M2", "Back to school", 3, Condition::Good, 0),
        exhibitor("EXH-0102", "Grupo Norte Retail", "Checkout stand S1", "Summer deals", 2, Condition::Excellent, 1),
        exhibitor("EXH-0201", "Farmacias del Valle", "Counter display C4", "Cold season", 4, Condition::Fair, 2),
    ];

    let mut dataset = Dataset {
        lots,
        exhibitors,
        ..Dataset::default()
    };

    dataset.waste.insert(
        "Grupo Norte Retail".to_string(),
        WasteFigures { organic_kg: 320.0, inorganic_kg: 180.0, recyclable_kg: 640.0 },
    );
    dataset.waste.insert(
        "Farmacias del Valle".to_string(),
        WasteFigures { organic_kg: 40.0, inorganic_kg: 95.0, recyclable_kg: 210.0 },
    );
    // Bebidas Azteca has not reported waste yet

    dataset.materials.insert(
        "Grupo Norte Retail".to_string(),
        vec![
            MaterialShare { material: "HDPE".to_string(), kg: 380.0 },
            MaterialShare { material: "PP".to_string(), kg: 270.0 },
        ],
    );
    dataset.materials.insert(
        "Farmacias del Valle".to_string(),
        vec![
            MaterialShare { material: "PET".to_string(), kg: 95.0 },
            MaterialShare { material: "LDPE".to_string(), kg: 520.0 },
        ],
    );

    dataset
}

pub fn sample_repository() -> InMemoryRepository {
    InMemoryRepository::new(sample_dataset())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::{dashboard_summary, flow_type_distribution};
    use crate::repository::{LotFilter, LotRepository};
    use crate::validation::{validate_exhibitor, validate_lots};

    #[test]
    fn test_sample_dataset_is_valid() {
        let dataset = sample_dataset();
        assert!(validate_lots(&dataset.lots).is_empty());
        for e in &dataset.exhibitors {
            assert!(validate_exhibitor(e).is_empty(), "{:?}", validate_exhibitor(e));
        }
    }

    #[test]
    fn test_sample_covers_every_flow_type() {
        let dataset = sample_dataset();
        let distribution = flow_type_distribution(&dataset.lots);
        assert!(distribution.values().all(|count| *count > 0));
    }

    #[test]
    fn test_sample_repository_summary() {
        let repo = sample_repository();
        let lots = repo.fetch_lots(&LotFilter::for_client("Grupo Norte Retail")).unwrap();
        let summary = dashboard_summary(&lots).unwrap();

        assert_eq!(summary.total_lots, 2);
        assert_eq!(summary.total_cycles, 7);
        assert_eq!(summary.active_lots, 1);
        assert_eq!(repo.clients().unwrap().len(), 3);
    }
}
