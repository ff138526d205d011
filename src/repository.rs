// 🗂️ Data Access - injected source of lots and exhibitors
//
// Aggregation and reports never reach for global data. Callers hand them
// collections fetched through `LotRepository`, so the origin of the data
// (JSON file, built-in sample, a future API) stays swappable.

use crate::model::{Exhibitor, FlowType, Lot, LotStatus};
use crate::reports::{MaterialShare, WasteFigures};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

// ============================================================================
// FILTER
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LotFilter {
    pub client: Option<String>,
    pub flow_type: Option<FlowType>,
    pub status: Option<LotStatus>,
}

impl LotFilter {
    pub fn all() -> Self {
        LotFilter::default()
    }

    pub fn for_client(client: impl Into<String>) -> Self {
        LotFilter {
            client: Some(client.into()),
            ..LotFilter::default()
        }
    }

    pub fn with_flow_type(mut self, flow_type: FlowType) -> Self {
        self.flow_type = Some(flow_type);
        self
    }

    pub fn with_status(mut self, status: LotStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn matches(&self, lot: &Lot) -> bool {
        self.client.as_deref().map_or(true, |c| lot.belongs_to(c))
            && self.flow_type.map_or(true, |f| lot.flow_type == f)
            && self.status.map_or(true, |s| lot.status == s)
    }
}

// ============================================================================
// REPOSITORY TRAIT
// ============================================================================

pub trait LotRepository: Send + Sync {
    fn fetch_lots(&self, filter: &LotFilter) -> Result<Vec<Lot>>;

    /// Exhibitors, optionally restricted to one client
    fn fetch_exhibitors(&self, client: Option<&str>) -> Result<Vec<Exhibitor>>;

    /// Waste figures for a client; zero when nothing was recorded
    fn fetch_waste(&self, client: &str) -> Result<WasteFigures>;

    fn fetch_material_composition(&self, client: &str) -> Result<Vec<MaterialShare>>;

    fn find_lot(&self, id: &str) -> Result<Option<Lot>> {
        Ok(self.fetch_lots(&LotFilter::all())?.into_iter().find(|l| l.id == id))
    }

    /// Every client that owns a lot or an exhibitor, sorted
    fn clients(&self) -> Result<Vec<String>> {
        let mut clients: BTreeSet<String> = self
            .fetch_lots(&LotFilter::all())?
            .into_iter()
            .map(|l| l.client)
            .collect();
        clients.extend(self.fetch_exhibitors(None)?.into_iter().map(|e| e.client));
        Ok(clients.into_iter().collect())
    }
}

// ============================================================================
// IN-MEMORY DATASET
// ============================================================================

/// Everything a dashboard session loads up front
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub lots: Vec<Lot>,
    #[serde(default)]
    pub exhibitors: Vec<Exhibitor>,
    /// Waste figures keyed by client
    #[serde(default)]
    pub waste: BTreeMap<String, WasteFigures>,
    /// Material composition keyed by client
    #[serde(default)]
    pub materials: BTreeMap<String, Vec<MaterialShare>>,
}

fn lookup<'a, T>(map: &'a BTreeMap<String, T>, client: &str) -> Option<&'a T> {
    map.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(client.trim()))
        .map(|(_, v)| v)
}

pub struct InMemoryRepository {
    dataset: Dataset,
}

impl InMemoryRepository {
    pub fn new(dataset: Dataset) -> Self {
        InMemoryRepository { dataset }
    }

    /// Load a dataset from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read dataset file: {:?}", path.as_ref()))?;

        let dataset: Dataset = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse dataset JSON: {:?}", path.as_ref()))?;

        log::info!(
            "loaded {} lots and {} exhibitors from {:?}",
            dataset.lots.len(),
            dataset.exhibitors.len(),
            path.as_ref()
        );
        Ok(InMemoryRepository::new(dataset))
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }
}

impl LotRepository for InMemoryRepository {
    fn fetch_lots(&self, filter: &LotFilter) -> Result<Vec<Lot>> {
        Ok(self
            .dataset
            .lots
            .iter()
            .filter(|l| filter.matches(l))
            .cloned()
            .collect())
    }

    fn fetch_exhibitors(&self, client: Option<&str>) -> Result<Vec<Exhibitor>> {
        Ok(self
            .dataset
            .exhibitors
            .iter()
            .filter(|e| client.map_or(true, |c| e.belongs_to(c)))
            .cloned()
            .collect())
    }

    fn fetch_waste(&self, client: &str) -> Result<WasteFigures> {
        Ok(lookup(&self.dataset.waste, client).copied().unwrap_or_default())
    }

    fn fetch_material_composition(&self, client: &str) -> Result<Vec<MaterialShare>> {
        Ok(lookup(&self.dataset.materials, client).cloned().unwrap_or_default())
    }
}

// ============================================================================
// TESTS
// ============================================================================
