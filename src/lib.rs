// Circular Trace - Core Library
// Traceability metrics, exports and sustainability reports for reusable
// packaging lots. Used by the CLI, the API server and the tests.

pub mod aggregation;
pub mod config;
pub mod corrections;
pub mod error;
pub mod export;
pub mod model;
pub mod reports;
pub mod repository;
pub mod rows;
pub mod sample;
pub mod service;
pub mod validation;

// Re-export commonly used types
pub use aggregation::{
    avg_cycles_per_lot, client_breakdown, cumulative_emissions_series, dashboard_summary,
    emissions_totals, exhibitor_totals, flow_type_distribution, return_to_origin_rate,
    total_cycles, total_emissions_avoided, total_recycled_plastic, ClientTotals,
    DashboardSummary, EmissionsTotals, ExhibitorTotals, SeriesPoint,
};
pub use config::Config;
pub use corrections::{AppliedCorrection, CorrectionSet, MetricsCorrection};
pub use error::{EmptyInputError, Result, TraceError};
pub use export::{
    client_report_filename, export_filename, to_csv, to_spreadsheet_table, to_xlsx,
    write_xlsx, ExportFormat, SpreadsheetTable, TableStyle,
};
pub use model::{
    Condition, Cycle, Emissions, Exhibitor, ExhibitorStats, FlowType, Location, Lot,
    LotStatus, VIRGIN_MATERIAL_EMISSION_FACTOR,
};
pub use reports::{
    MetricsBundle, ReportComposer, ReportDocument, ReportPeriod, ReportStandard, Section,
    WasteFigures,
};
pub use repository::{Dataset, InMemoryRepository, LotFilter, LotRepository};
pub use rows::{client_report_rows, cycle_rows, ClientReportRow, CycleRow, ExhibitorRow, ExportDataset, LotRow};
pub use sample::{sample_dataset, sample_repository};
pub use service::{client_metrics, compose_report, lot_series};
pub use validation::{ensure_valid, validate_exhibitor, validate_exhibitors, validate_lot, validate_lots, Severity, ValidationIssue};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
