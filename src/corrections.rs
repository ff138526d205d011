// 🩹 Data Corrections - explicit, flagged overrides of aggregated figures
//
// Some clients have known data-quality problems in their tracked records.
// Instead of patching numbers inside a report, a correction is declared in
// configuration and applied to the metrics bundle before composition. Every
// applied correction is logged and travels with the bundle so each report
// prints it.

use crate::reports::MetricsBundle;
use serde::{Deserialize, Serialize};

/// Declared override for one client's figures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsCorrection {
    pub client: String,
    pub reason: String,
    #[serde(default)]
    pub cycle_count: Option<u64>,
    #[serde(default)]
    pub recycled_kg: Option<f64>,
    #[serde(default)]
    pub emissions_transport_kg: Option<f64>,
    #[serde(default)]
    pub emissions_processing_kg: Option<f64>,
    #[serde(default)]
    pub emissions_avoided_kg: Option<f64>,
}

/// Record of a correction that changed a figure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedCorrection {
    pub client: String,
    pub field: String,
    pub original: f64,
    pub corrected: f64,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorrectionSet {
    corrections: Vec<MetricsCorrection>,
}

impl CorrectionSet {
    pub fn new() -> Self {
        CorrectionSet { corrections: Vec::new() }
    }

    pub fn from_corrections(corrections: Vec<MetricsCorrection>) -> Self {
        CorrectionSet { corrections }
    }

    pub fn add(&mut self, correction: MetricsCorrection) {
        self.corrections.push(correction);
    }

    pub fn len(&self) -> usize {
        self.corrections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corrections.is_empty()
    }

    pub fn for_client(&self, client: &str) -> Vec<&MetricsCorrection> {
        self.corrections
            .iter()
            .filter(|c| c.client.eq_ignore_ascii_case(client.trim()))
            .collect()
    }

    /// Apply every correction declared for `client` and return the new bundle.
    ///
    /// Figures that already hold the corrected value are left unflagged.
    /// Generated emissions are re-derived from transport plus processing
    /// whenever either part is corrected. The net balance is always avoided
    /// minus generated.
    pub fn apply(&self, client: &str, bundle: &MetricsBundle) -> MetricsBundle {
        let mut corrected = bundle.clone();
        let mut breakdown_changed = false;

        for correction in self.for_client(client) {
            let mut applied = Vec::new();
            let mut record = |field: &str, original: f64, value: f64| {
                if original != value {
                    applied.push(AppliedCorrection {
                        client: correction.client.clone(),
                        field: field.to_string(),
                        original,
                        corrected: value,
                        reason: correction.reason.clone(),
                    });
                }
            };

            if let Some(value) = correction.cycle_count {
                record("cycle_count", corrected.cycle_count as f64, value as f64);
                corrected.cycle_count = value;
            }
            if let Some(value) = correction.recycled_kg {
                record("recycled_kg", corrected.recycled_kg, value);
                corrected.recycled_kg = value;
            }
            breakdown_changed |=
                correction.emissions_transport_kg.is_some() || correction.emissions_processing_kg.is_some();
            if let Some(value) = correction.emissions_transport_kg {
                record("emissions_transport_kg", corrected.emissions.transport_kg, value);
                corrected.emissions.transport_kg = value;
            }
            if let Some(value) = correction.emissions_processing_kg {
                record("emissions_processing_kg", corrected.emissions.processing_kg, value);
                corrected.emissions.processing_kg = value;
            }
            if let Some(value) = correction.emissions_avoided_kg {
                record("emissions_avoided_kg", corrected.emissions.avoided_kg, value);
                corrected.emissions.avoided_kg = value;
            }

            for a in &applied {
                log::warn!(
                    "data correction for {}: {} {} -> {} ({})",
                    a.client,
                    a.field,
                    a.original,
                    a.corrected,
                    a.reason
                );
            }
            corrected.corrections.extend(applied);
        }

        let generated = corrected.emissions.transport_kg + corrected.emissions.processing_kg;
        if breakdown_changed && generated != corrected.emissions.generated_kg {
            corrected.corrections.push(AppliedCorrection {
                client: client.trim().to_string(),
                field: "emissions_generated_kg".to_string(),
                original: corrected.emissions.generated_kg,
                corrected: generated,
                reason: "derived from corrected transport and processing".to_string(),
            });
            log::warn!(
                "data correction for {}: emissions_generated_kg {} -> {} (derived)",
                client,
                corrected.emissions.generated_kg,
                generated
            );
            corrected.emissions.generated_kg = generated;
        }
        corrected.emissions.net_balance_kg =
            corrected.emissions.avoided_kg - corrected.emissions.generated_kg;
        corrected
    }
}
