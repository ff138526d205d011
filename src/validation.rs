// ✅ Record Validation - lot and exhibitor invariants
//
// Records arrive already typed, so dates are parseable by construction. What
// can still be wrong is numeric content (NaN, infinities, negatives) and the
// structural invariants of a lot's cycle history.

use crate::error::TraceError;
use crate::model::{Cycle, Exhibitor, Lot};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Allowed drift between `total` and `transport + processing`
pub const EMISSIONS_TOLERANCE: f64 = 0.01;

/// Upper bound for cycle counters; a reusable unit never sees more trips
pub const MAX_CYCLES: u32 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Critical, // Malformed value, aggregating it would produce garbage
    Warning,  // Unusual shape the dashboards can still render
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub entity: String,
    pub id: String,
    pub field: String,
    pub message: String,
    pub severity: Severity,
}

impl ValidationIssue {
    fn critical(entity: &str, id: &str, field: &str, message: impl Into<String>) -> Self {
        ValidationIssue {
            entity: entity.to_string(),
            id: id.to_string(),
            field: field.to_string(),
            message: message.into(),
            severity: Severity::Critical,
        }
    }

    fn warning(entity: &str, id: &str, field: &str, message: impl Into<String>) -> Self {
        ValidationIssue {
            severity: Severity::Warning,
            ..Self::critical(entity, id, field, message)
        }
    }

    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {}] {}: {}", self.entity, self.id, self.field, self.message)
    }
}

// ============================================================================
// NUMERIC CHECKS
// ============================================================================

fn check_amount(issues: &mut Vec<ValidationIssue>, entity: &str, id: &str, field: &str, value: f64) {
    if !value.is_finite() {
        issues.push(ValidationIssue::critical(entity, id, field, format!("not a finite number ({})", value)));
    } else if value < 0.0 {
        issues.push(ValidationIssue::critical(entity, id, field, format!("negative value ({})", value)));
    }
}

fn check_cycle(issues: &mut Vec<ValidationIssue>, entity: &str, owner: &str, cycle: &Cycle) {
    let id = format!("{}#{}", owner, cycle.number);

    if cycle.number == 0 {
        issues.push(ValidationIssue::critical(entity, &id, "number", "cycle numbers are 1-based"));
    }

    check_amount(issues, entity, &id, "emissions.transport", cycle.emissions.transport);
    check_amount(issues, entity, &id, "emissions.processing", cycle.emissions.processing);
    check_amount(issues, entity, &id, "emissions.total", cycle.emissions.total);
    check_amount(issues, entity, &id, "distance_km", cycle.distance_km);
    check_amount(issues, entity, &id, "weight_kg", cycle.weight_kg);

    if cycle.emissions.total.is_finite() && !cycle.emissions.is_additive(EMISSIONS_TOLERANCE) {
        issues.push(ValidationIssue::critical(
            entity,
            &id,
            "emissions.total",
            format!(
                "total {} != transport {} + processing {}",
                cycle.emissions.total, cycle.emissions.transport, cycle.emissions.processing
            ),
        ));
    }

    if let Some(end) = cycle.end_date {
        if end < cycle.start_date {
            issues.push(ValidationIssue::critical(
                entity,
                &id,
                "end_date",
                format!("ends {} before it starts {}", end, cycle.start_date),
            ));
        }
    }
}

/// Check the ordering rules of a cycle history: unique increasing numbers,
/// at most one open cycle, and the open cycle is the last one.
fn check_history(issues: &mut Vec<ValidationIssue>, entity: &str, owner: &str, cycles: &[Cycle]) {
    let mut seen = HashSet::new();
    for cycle in cycles {
        if !seen.insert(cycle.number) {
            issues.push(ValidationIssue::critical(
                entity,
                owner,
                "cycles",
                format!("cycle number {} appears more than once", cycle.number),
            ));
        }
    }

    let mut sorted: Vec<&Cycle> = cycles.iter().collect();
    sorted.sort_by_key(|c| c.number);
    for pair in sorted.windows(2) {
        if pair[1].start_date < pair[0].start_date {
            issues.push(ValidationIssue::warning(
                entity,
                owner,
                "cycles",
                format!("cycle {} starts before cycle {}", pair[1].number, pair[0].number),
            ));
        }
    }

    let open: Vec<&Cycle> = cycles.iter().filter(|c| c.is_open()).collect();
    if open.len() > 1 {
        issues.push(ValidationIssue::critical(
            entity,
            owner,
            "cycles",
            format!("{} cycles are open, at most one may be", open.len()),
        ));
    }
    if let (Some(active), Some(last)) = (open.first(), sorted.last()) {
        if active.number != last.number {
            issues.push(ValidationIssue::critical(
                entity,
                owner,
                "cycles",
                format!("open cycle {} is not the latest cycle {}", active.number, last.number),
            ));
        }
    }
}

// ============================================================================
// ENTITY CHECKS
// ============================================================================

/// Validate a single lot and return every issue found
pub fn validate_lot(lot: &Lot) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let id = lot.id.as_str();

    check_amount(&mut issues, "lot", id, "weight_kg", lot.weight_kg);
    check_amount(&mut issues, "lot", id, "emissions_avoided_kg", lot.emissions_avoided_kg);
    check_amount(&mut issues, "lot", id, "recycled_plastic_kg", lot.recycled_plastic_kg);

    if !lot.recycled_content_pct.is_finite() || !(0.0..=100.0).contains(&lot.recycled_content_pct) {
        issues.push(ValidationIssue::critical(
            "lot",
            id,
            "recycled_content_pct",
            format!("{} is outside 0..=100", lot.recycled_content_pct),
        ));
    }

    for (field, value) in [("current_cycle", lot.current_cycle), ("total_cycles", lot.total_cycles)] {
        if value > MAX_CYCLES {
            issues.push(ValidationIssue::critical(
                "lot",
                id,
                field,
                format!("{} is above the limit of {} cycles", value, MAX_CYCLES),
            ));
        }
    }

    if lot.current_cycle > lot.total_cycles {
        issues.push(ValidationIssue::critical(
            "lot",
            id,
            "current_cycle",
            format!("current cycle {} exceeds total cycles {}", lot.current_cycle, lot.total_cycles),
        ));
    }

    if lot.cycles.len() != lot.current_cycle as usize {
        issues.push(ValidationIssue::warning(
            "lot",
            id,
            "cycles",
            format!("{} cycle records for current cycle {}", lot.cycles.len(), lot.current_cycle),
        ));
    }

    for cycle in &lot.cycles {
        check_cycle(&mut issues, "lot", id, cycle);
    }
    check_history(&mut issues, "lot", id, &lot.cycles);

    issues
}

pub fn validate_exhibitor(exhibitor: &Exhibitor) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let id = exhibitor.id.as_str();

    check_amount(&mut issues, "exhibitor", id, "weight_kg", exhibitor.weight_kg);
    if exhibitor.graphic_changes > MAX_CYCLES {
        issues.push(ValidationIssue::critical(
            "exhibitor",
            id,
            "graphic_changes",
            format!("{} is above the limit of {} cycles", exhibitor.graphic_changes, MAX_CYCLES),
        ));
    }
    for cycle in &exhibitor.cycles {
        check_cycle(&mut issues, "exhibitor", id, cycle);
    }
    check_history(&mut issues, "exhibitor", id, &exhibitor.cycles);

    issues
}

pub fn validate_lots(lots: &[Lot]) -> Vec<ValidationIssue> {
    lots.iter().flat_map(validate_lot).collect()
}

pub fn validate_exhibitors(exhibitors: &[Exhibitor]) -> Vec<ValidationIssue> {
    exhibitors.iter().flat_map(validate_exhibitor).collect()
}

/// Fail on critical issues, log the warnings and let the rest through
pub fn ensure_valid(issues: Vec<ValidationIssue>) -> Result<(), TraceError> {
    let (critical, warnings): (Vec<_>, Vec<_>) = issues.into_iter().partition(|i| i.is_critical());

    for warning in &warnings {
        log::warn!("validation warning: {}", warning);
    }

    if critical.is_empty() {
        Ok(())
    } else {
        Err(TraceError::Validation(critical))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::{create_test_cycle, create_test_lot};
    use crate::model::{Emissions, FlowType};

    #[test]
    fn test_valid_lot_has_no_issues() {
        let lot = create_test_lot("L-1", FlowType::ClosedLoop, "Acme", 3);
        assert!(validate_lot(&lot).is_empty());
    }

    #[test]
    fn test_current_cycle_above_total() {
        let mut lot = create_test_lot("L-1", FlowType::ClosedLoop, "Acme", 3);
        lot.total_cycles = 2;

        let issues = validate_lot(&lot);
        assert!(issues.iter().any(|i| i.field == "current_cycle" && i.is_critical()));
    }

    #[test]
    fn test_cycle_count_mismatch_is_warning() {
        let mut lot = create_test_lot("L-1", FlowType::OpenLoop, "Acme", 3);
        lot.current_cycle = 4;

        let issues = validate_lot(&lot);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Warning);
        assert!(ensure_valid(issues).is_ok());
    }

    #[test]
    fn test_open_cycle_must_be_latest() {
        let mut lot = create_test_lot("L-1", FlowType::OpenLoop, "Acme", 3);
        lot.cycles[0].end_date = None;

        let issues = validate_lot(&lot);
        assert!(issues.iter().any(|i| i.message.contains("not the latest")));
    }

    #[test]
    fn test_two_open_cycles() {
        let mut lot = create_test_lot("L-1", FlowType::OpenLoop, "Acme", 3);
        lot.cycles[1].end_date = None;
        lot.cycles[2].end_date = None;

        let issues = validate_lot(&lot);
        assert!(issues.iter().any(|i| i.message.contains("2 cycles are open")));
    }

    #[test]
    fn test_duplicate_cycle_number() {
        let mut lot = create_test_lot("L-1", FlowType::Recycling, "Acme", 2);
        lot.cycles[1].number = 1;

        let issues = validate_lot(&lot);
        assert!(issues.iter().any(|i| i.message.contains("appears more than once")));
    }

    #[test]
    fn test_non_finite_weight_is_critical() {
        let mut lot = create_test_lot("L-1", FlowType::Recycling, "Acme", 1);
        lot.cycles[0].weight_kg = f64::NAN;

        let result = ensure_valid(validate_lot(&lot));
        match result {
            Err(TraceError::Validation(issues)) => {
                assert_eq!(issues.len(), 1);
                assert_eq!(issues[0].field, "weight_kg");
                assert_eq!(issues[0].id, "L-1#1");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_non_additive_emissions() {
        let mut cycle = create_test_cycle(1, 10.0, 2.0, 1.0);
        cycle.emissions = Emissions { transport: 2.0, processing: 1.0, total: 4.0 };
        let mut lot = create_test_lot("L-1", FlowType::ClosedLoop, "Acme", 0);
        lot.cycles = vec![cycle];
        lot.current_cycle = 1;

        let issues = validate_lot(&lot);
        assert!(issues.iter().any(|i| i.field == "emissions.total"));
    }

    #[test]
    fn test_cycle_counter_above_limit_is_critical() {
        let json = r#"{
            "id": "L-MAX", "flowType": "closed_loop", "productType": "Pallet",
            "weightKg": 10.0, "recycledContentPct": 80.0, "originDate": "2024-01-01",
            "currentCycle": 4294967295, "totalCycles": 4294967295, "cycles": [],
            "emissionsAvoidedKg": 0.0, "recycledPlasticKg": 8.0,
            "status": "active", "client": "Acme"
        }"#;
        let lot: Lot = serde_json::from_str(json).unwrap();

        let result = ensure_valid(validate_lot(&lot));
        match result {
            Err(TraceError::Validation(issues)) => {
                assert!(issues.iter().any(|i| i.field == "current_cycle"));
                assert!(issues.iter().any(|i| i.field == "total_cycles"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_recycled_pct_range() {
        let mut lot = create_test_lot("L-1", FlowType::ClosedLoop, "Acme", 1);
        lot.recycled_content_pct = 120.0;

        let issues = validate_lot(&lot);
        assert!(issues.iter().any(|i| i.field == "recycled_content_pct"));
    }
}
