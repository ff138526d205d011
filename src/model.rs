// ♻️ Record Model - Lots, cycles and exhibitors
//
// Every record is an immutable value. Aggregations read these and build new
// values; nothing in the crate writes back into a lot or an exhibitor.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Emission factor of virgin plastic, in kgCO2e per kg of material.
///
/// Every kilogram of circulating material that stands in for new plastic is
/// credited with this much avoided emissions.
pub const VIRGIN_MATERIAL_EMISSION_FACTOR: f64 = 3.5;

// ============================================================================
// FLOW TYPE
// ============================================================================

/// Circular-flow category of a lot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowType {
    /// Material comes back to the brand that shipped it
    ClosedLoop,
    /// Material moves on to a different brand or campaign
    OpenLoop,
    /// Material is reprocessed into recycled raw material
    Recycling,
}

impl FlowType {
    pub const ALL: [FlowType; 3] = [FlowType::ClosedLoop, FlowType::OpenLoop, FlowType::Recycling];

    pub fn code(&self) -> &'static str {
        match self {
            FlowType::ClosedLoop => "closed_loop",
            FlowType::OpenLoop => "open_loop",
            FlowType::Recycling => "recycling",
        }
    }

    /// Human-readable name for display
    pub fn label(&self) -> &'static str {
        match self {
            FlowType::ClosedLoop => "Closed loop",
            FlowType::OpenLoop => "Open loop",
            FlowType::Recycling => "Recycling",
        }
    }
}

impl fmt::Display for FlowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for FlowType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        FlowType::ALL
            .into_iter()
            .find(|f| f.code() == normalized)
            .ok_or_else(|| format!("unknown flow type: {}", s))
    }
}

// ============================================================================
// LOT STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LotStatus {
    Active,
    Collected,
    Processing,
}

impl LotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LotStatus::Active => "active",
            LotStatus::Collected => "collected",
            LotStatus::Processing => "processing",
        }
    }
}

impl FromStr for LotStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(LotStatus::Active),
            "collected" => Ok(LotStatus::Collected),
            "processing" => Ok(LotStatus::Processing),
            other => Err(format!("unknown lot status: {}", other)),
        }
    }
}

// ============================================================================
// CYCLE
// ============================================================================

/// Emissions generated by one cycle, in kgCO2e.
///
/// `total` is always `transport + processing`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Emissions {
    pub transport: f64,
    pub processing: f64,
    pub total: f64,
}

impl Emissions {
    /// Build a breakdown whose total is derived from its parts
    pub fn new(transport: f64, processing: f64) -> Self {
        Emissions {
            transport,
            processing,
            total: transport + processing,
        }
    }

    /// Whether `total` matches its parts within `tolerance`
    pub fn is_additive(&self, tolerance: f64) -> bool {
        (self.transport + self.processing - self.total).abs() <= tolerance
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    pub store: String,
    pub address: String,
    pub city: String,
}

/// One reuse / transport / processing interval of a lot or an exhibitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cycle {
    /// 1-based, unique within its lot
    pub number: u32,
    pub start_date: NaiveDate,
    /// None while the cycle is still running
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    pub client: String,
    pub brand: String,
    pub campaign: String,
    pub location: Location,
    pub returned_to_origin: bool,
    pub emissions: Emissions,
    pub distance_km: f64,
    /// Material moved during this cycle
    pub weight_kg: f64,
}

impl Cycle {
    pub fn is_open(&self) -> bool {
        self.end_date.is_none()
    }

    /// Emissions credited to this cycle for replacing virgin material
    pub fn avoided_emissions(&self) -> f64 {
        self.weight_kg * VIRGIN_MATERIAL_EMISSION_FACTOR
    }

    /// Length of the cycle in days, counting up to `today` while open
    pub fn duration_days(&self, today: NaiveDate) -> i64 {
        let end = self.end_date.unwrap_or(today);
        (end - self.start_date).num_days().max(0)
    }
}

// ============================================================================
// LOT
// ============================================================================

/// A tracked batch of circulating material with its cycle history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lot {
    pub id: String,
    pub flow_type: FlowType,
    pub product_type: String,
    pub weight_kg: f64,
    pub recycled_content_pct: f64,
    pub origin_date: NaiveDate,
    pub current_cycle: u32,
    pub total_cycles: u32,
    #[serde(default)]
    pub cycles: Vec<Cycle>,
    pub emissions_avoided_kg: f64,
    pub recycled_plastic_kg: f64,
    pub status: LotStatus,
    pub client: String,
}

impl Lot {
    /// The cycle still in progress, if any
    pub fn active_cycle(&self) -> Option<&Cycle> {
        self.cycles.iter().find(|c| c.is_open())
    }

    /// Cycles ordered by number
    pub fn sorted_cycles(&self) -> Vec<&Cycle> {
        let mut cycles: Vec<&Cycle> = self.cycles.iter().collect();
        cycles.sort_by_key(|c| c.number);
        cycles
    }

    /// Cycles left before the lot reaches its planned capacity
    pub fn remaining_cycles(&self) -> u32 {
        self.total_cycles.saturating_sub(self.current_cycle)
    }

    pub fn belongs_to(&self, client: &str) -> bool {
        self.client.eq_ignore_ascii_case(client.trim())
    }
}

// ============================================================================
// EXHIBITOR
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Excellent => "excellent",
            Condition::Good => "good",
            Condition::Fair => "fair",
            Condition::Poor => "poor",
        }
    }
}

/// Figures derived from an exhibitor's cycle history
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExhibitorStats {
    pub emissions_generated_kg: f64,
    pub emissions_avoided_kg: f64,
    pub net_balance_kg: f64,
    pub total_weight_kg: f64,
    pub total_distance_km: f64,
}

/// A point-of-sale exhibitor reused across graphic campaigns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exhibitor {
    pub id: String,
    pub client: String,
    pub model_ref: String,
    pub location: Location,
    pub years_in_operation: u32,
    /// Roughly the number of reuse cycles
    pub graphic_changes: u32,
    pub current_graphic: String,
    pub condition: Condition,
    pub weight_kg: f64,
    #[serde(default)]
    pub cycles: Vec<Cycle>,
    /// Display copy only; `stats()` is the source of truth
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_stats: Option<ExhibitorStats>,
}

impl Exhibitor {
    /// Recompute the derived figures from the cycle history
    pub fn stats(&self) -> ExhibitorStats {
        let generated: f64 = self.cycles.iter().map(|c| c.emissions.total).sum();
        let avoided: f64 = self.cycles.iter().map(Cycle::avoided_emissions).sum();

        ExhibitorStats {
            emissions_generated_kg: generated,
            emissions_avoided_kg: avoided,
            net_balance_kg: avoided - generated,
            total_weight_kg: self.cycles.iter().map(|c| c.weight_kg).sum(),
            total_distance_km: self.cycles.iter().map(|c| c.distance_km).sum(),
        }
    }

    pub fn belongs_to(&self, client: &str) -> bool {
        self.client.eq_ignore_ascii_case(client.trim())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Helper to build a cycle with the fields the aggregations care about
    pub(crate) fn create_test_cycle(number: u32, weight_kg: f64, transport: f64, processing: f64) -> Cycle {
        let start = date(2024, 1, 1) + chrono::Duration::days(30 * (number as i64 - 1));
        Cycle {
            number,
            start_date: start,
            end_date: Some(start + chrono::Duration::days(29)),
            client: "Test Client".to_string(),
            brand: "Test Brand".to_string(),
            campaign: format!("Campaign {}", number),
            location: Location {
                store: "Store 1".to_string(),
                address: "Main St 1".to_string(),
                city: "Monterrey".to_string(),
            },
            returned_to_origin: number % 2 == 0,
            emissions: Emissions::new(transport, processing),
            distance_km: 100.0,
            weight_kg,
        }
    }

    pub(crate) fn create_test_lot(id: &str, flow_type: FlowType, client: &str, cycles: u32) -> Lot {
        let cycles: Vec<Cycle> = (1..=cycles)
            .map(|n| create_test_cycle(n, 10.0, 2.0, 1.0))
            .collect();
        Lot {
            id: id.to_string(),
            flow_type,
            product_type: "Pallet".to_string(),
            weight_kg: 10.0,
            recycled_content_pct: 80.0,
            origin_date: date(2024, 1, 1),
            current_cycle: cycles.len() as u32,
            total_cycles: 10,
            emissions_avoided_kg: 35.0 * cycles.len() as f64,
            recycled_plastic_kg: 8.0,
            cycles,
            status: LotStatus::Active,
            client: client.to_string(),
        }
    }

    #[test]
    fn test_emissions_new_is_additive() {
        let e = Emissions::new(2.5, 1.25);
        assert_eq!(e.total, 3.75);
        assert!(e.is_additive(1e-9));

        let broken = Emissions { transport: 1.0, processing: 1.0, total: 5.0 };
        assert!(!broken.is_additive(0.01));
    }

    #[test]
    fn test_flow_type_parse() {
        assert_eq!("closed_loop".parse::<FlowType>().unwrap(), FlowType::ClosedLoop);
        assert_eq!("Open Loop".parse::<FlowType>().unwrap(), FlowType::OpenLoop);
        assert_eq!("recycling".parse::<FlowType>().unwrap(), FlowType::Recycling);
        assert!("landfill".parse::<FlowType>().is_err());
    }

    #[test]
    fn test_lot_deserializes_from_camel_case_json() {
        let json = r#"{
            "id": "L-100",
            "flowType": "open_loop",
            "productType": "Crate",
            "weightKg": 12.5,
            "recycledContentPct": 60,
            "originDate": "2024-03-01",
            "currentCycle": 1,
            "totalCycles": 5,
            "cycles": [{
                "number": 1,
                "startDate": "2024-03-01",
                "endDate": null,
                "client": "Acme",
                "brand": "Acme Foods",
                "campaign": "Spring",
                "location": {"store": "S1", "address": "A1", "city": "Puebla"},
                "returnedToOrigin": false,
                "emissions": {"transport": 1.5, "processing": 0.5, "total": 2.0},
                "distanceKm": 40,
                "weightKg": 12.5
            }],
            "emissionsAvoidedKg": 43.75,
            "recycledPlasticKg": 7.5,
            "status": "active",
            "client": "Acme"
        }"#;

        let lot: Lot = serde_json::from_str(json).unwrap();
        assert_eq!(lot.flow_type, FlowType::OpenLoop);
        assert_eq!(lot.cycles.len(), 1);
        assert!(lot.active_cycle().is_some());
        assert_eq!(lot.remaining_cycles(), 4);
    }

    #[test]
    fn test_cycle_avoided_emissions_uses_factor() {
        let cycle = create_test_cycle(1, 20.0, 4.0, 2.0);
        assert_eq!(cycle.avoided_emissions(), 70.0);
    }

    #[test]
    fn test_cycle_duration_open_counts_to_today() {
        let mut cycle = create_test_cycle(1, 1.0, 0.0, 0.0);
        cycle.end_date = None;
        assert_eq!(cycle.duration_days(date(2024, 1, 11)), 10);
    }

    #[test]
    fn test_exhibitor_stats_derived_from_cycles() {
        let exhibitor = Exhibitor {
            id: "EX-1".to_string(),
            client: "Acme".to_string(),
            model_ref: "M-200".to_string(),
            location: Location::default(),
            years_in_operation: 2,
            graphic_changes: 2,
            current_graphic: "Summer".to_string(),
            condition: Condition::Good,
            weight_kg: 15.0,
            cycles: vec![create_test_cycle(1, 10.0, 2.0, 1.0), create_test_cycle(2, 20.0, 4.0, 2.0)],
            cached_stats: None,
        };

        let stats = exhibitor.stats();
        assert_eq!(stats.emissions_generated_kg, 9.0);
        assert_eq!(stats.emissions_avoided_kg, 105.0);
        assert_eq!(stats.net_balance_kg, 96.0);
        assert_eq!(stats.total_weight_kg, 30.0);
        assert_eq!(stats.total_distance_km, 200.0);
    }
}
