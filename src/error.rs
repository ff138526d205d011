// Error types shared by the aggregation, export and report layers

use crate::validation::ValidationIssue;
use thiserror::Error;

/// Raised when an exporter is handed zero records.
///
/// The header row is derived from the first record, so an empty slice has
/// no columns at all. Callers are expected to show a placeholder instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no records to export: cannot derive a header row from an empty collection")]
pub struct EmptyInputError;

#[derive(Debug, Error)]
pub enum TraceError {
    #[error(transparent)]
    EmptyInput(#[from] EmptyInputError),

    /// A record did not serialize to a flat key/value object
    #[error("record {index} is not a key/value object")]
    NotARecord { index: usize },

    #[error("invalid {field} on {entity} {id}: {message}")]
    InvalidField {
        entity: &'static str,
        id: String,
        field: String,
        message: String,
    },

    #[error("{} critical validation issue(s), first: {}", .0.len(), first_issue(.0))]
    Validation(Vec<ValidationIssue>),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("xlsx error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("export produced invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

fn first_issue(issues: &[ValidationIssue]) -> String {
    issues
        .first()
        .map(|i| i.to_string())
        .unwrap_or_else(|| "none".to_string())
}

pub type Result<T> = std::result::Result<T, TraceError>;
