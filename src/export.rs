// 📤 Export Formatters - CSV and spreadsheet tables
//
// Records are anything that serializes to a flat key/value object. The header
// row comes from the first record's keys in insertion order, and every record
// is projected onto that exact header list.
//
// Nothing here touches the filesystem. Writing or downloading the returned
// text/bytes is the caller's job.

use crate::error::{EmptyInputError, TraceError};
use chrono::NaiveDate;
use rust_xlsxwriter::{Format, FormatBorder, Workbook};
use serde::Serialize;
use serde_json::{Map, Value};

/// Narrowest spreadsheet column, in characters
pub const MIN_COLUMN_WIDTH: usize = 10;
/// Widest spreadsheet column, in characters
pub const MAX_COLUMN_WIDTH: usize = 50;
/// Padding added to the longest cell text of a column
pub const COLUMN_PADDING: usize = 2;

// ============================================================================
// RECORD PROJECTION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" | "excel" => Ok(ExportFormat::Xlsx),
            other => Err(format!("unknown export format: {}", other)),
        }
    }
}

/// A single table cell
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Cell {
    fn from_value(value: Option<&Value>) -> Cell {
        match value {
            None | Some(Value::Null) => Cell::Empty,
            Some(Value::String(s)) => Cell::Text(s.clone()),
            Some(Value::Bool(b)) => Cell::Bool(*b),
            Some(Value::Number(n)) => match n.as_f64() {
                Some(f) => Cell::Number(f),
                None => Cell::Text(n.to_string()),
            },
            // Nested values are flattened to their JSON text
            Some(other) => Cell::Text(other.to_string()),
        }
    }

    /// Text as it appears in a CSV field or a spreadsheet cell
    pub fn text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => format_number(*n),
            Cell::Bool(b) => b.to_string(),
        }
    }
}

/// Integral values print without a fractional part ("5", not "5.0")
fn format_number(n: f64) -> String {
    format!("{}", n)
}

fn to_objects<T: Serialize>(records: &[T]) -> Result<Vec<Map<String, Value>>, TraceError> {
    if records.is_empty() {
        return Err(EmptyInputError.into());
    }

    records
        .iter()
        .enumerate()
        .map(|(index, record)| match serde_json::to_value(record)? {
            Value::Object(map) => Ok(map),
            _ => Err(TraceError::NotARecord { index }),
        })
        .collect()
}

/// Header list plus rows projected onto it
fn project<T: Serialize>(records: &[T]) -> Result<(Vec<String>, Vec<Vec<Cell>>), TraceError> {
    let objects = to_objects(records)?;
    let headers: Vec<String> = objects[0].keys().cloned().collect();

    let rows = objects
        .iter()
        .map(|object| {
            headers
                .iter()
                .map(|h| Cell::from_value(object.get(h)))
                .collect()
        })
        .collect();

    Ok((headers, rows))
}

// ============================================================================
// CSV
// ============================================================================

/// Serialize records to CSV text.
///
/// Fields containing a comma, a double quote or a line break are quoted, with
/// inner quotes doubled. Fails with `EmptyInputError` on zero records.
pub fn to_csv<T: Serialize>(records: &[T]) -> Result<String, TraceError> {
    let (headers, rows) = project(records)?;

    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Necessary)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(&headers)?;
    for row in &rows {
        writer.write_record(row.iter().map(Cell::text))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| TraceError::Io(e.into_error()))?;
    log::debug!("csv export: {} columns, {} rows", headers.len(), rows.len());

    Ok(String::from_utf8(bytes)?)
}

// ============================================================================
// SPREADSHEET TABLE
// ============================================================================

/// Column/row shape of one worksheet, free of any styling
#[derive(Debug, Clone, PartialEq)]
pub struct SpreadsheetTable {
    pub sheet_name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    /// Display width per column, in characters
    pub column_widths: Vec<usize>,
}

/// `clamp(max(header, longest cell) + 2, 10, 50)`
pub fn column_width(header: &str, cells: &[String]) -> usize {
    let longest = cells
        .iter()
        .map(|c| c.chars().count())
        .chain(std::iter::once(header.chars().count()))
        .max()
        .unwrap_or(0);

    (longest + COLUMN_PADDING).clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH)
}

pub fn to_spreadsheet_table<T: Serialize>(
    records: &[T],
    sheet_name: &str,
) -> Result<SpreadsheetTable, TraceError> {
    let (headers, rows) = project(records)?;

    let column_widths = headers
        .iter()
        .enumerate()
        .map(|(col, header)| {
            let cells: Vec<String> = rows.iter().map(|row| row[col].text()).collect();
            column_width(header, &cells)
        })
        .collect();

    Ok(SpreadsheetTable {
        sheet_name: sheet_name.to_string(),
        headers,
        rows,
        column_widths,
    })
}

/// Optional presentation layered on top of a table when it is encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableStyle {
    pub bold_header: bool,
    pub borders: bool,
}

impl Default for TableStyle {
    fn default() -> Self {
        TableStyle {
            bold_header: true,
            borders: true,
        }
    }
}

impl TableStyle {
    fn header_format(&self) -> Format {
        let format = if self.bold_header { Format::new().set_bold() } else { Format::new() };
        self.with_borders(format)
    }

    fn cell_format(&self) -> Format {
        self.with_borders(Format::new())
    }

    fn with_borders(&self, format: Format) -> Format {
        if self.borders {
            format.set_border(FormatBorder::Thin)
        } else {
            format
        }
    }
}

/// Encode a table as an XLSX workbook with a single worksheet
pub fn write_xlsx(table: &SpreadsheetTable, style: Option<&TableStyle>) -> Result<Vec<u8>, TraceError> {
    let plain = TableStyle {
        bold_header: false,
        borders: false,
    };
    let style = style.unwrap_or(&plain);
    let header_format = style.header_format();
    let cell_format = style.cell_format();

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(&table.sheet_name)?;

    for (col, (header, width)) in table.headers.iter().zip(&table.column_widths).enumerate() {
        let col = col as u16;
        worksheet.set_column_width(col, *width as f64)?;
        worksheet.write_string_with_format(0, col, header, &header_format)?;
    }

    for (r, row) in table.rows.iter().enumerate() {
        let r = (r + 1) as u32;
        for (col, cell) in row.iter().enumerate() {
            let col = col as u16;
            match cell {
                Cell::Empty => {
                    worksheet.write_blank(r, col, &cell_format)?;
                }
                Cell::Text(s) => {
                    worksheet.write_string_with_format(r, col, s, &cell_format)?;
                }
                Cell::Number(n) => {
                    worksheet.write_number_with_format(r, col, *n, &cell_format)?;
                }
                Cell::Bool(b) => {
                    worksheet.write_boolean_with_format(r, col, *b, &cell_format)?;
                }
            }
        }
    }

    let buffer = workbook.save_to_buffer()?;
    log::debug!(
        "xlsx export '{}': {} columns, {} rows, {} bytes",
        table.sheet_name,
        table.headers.len(),
        table.rows.len(),
        buffer.len()
    );

    Ok(buffer)
}

/// Table shape plus XLSX encoding in one step
pub fn to_xlsx<T: Serialize>(
    records: &[T],
    sheet_name: &str,
    style: Option<&TableStyle>,
) -> Result<Vec<u8>, TraceError> {
    let table = to_spreadsheet_table(records, sheet_name)?;
    write_xlsx(&table, style)
}

// ============================================================================
// FILE NAMES
// ============================================================================

/// `Reporte_{Client_Name}_{YYYY-MM-DD}.csv` for the per-client report
pub fn client_report_filename(client_name: &str, date: NaiveDate) -> String {
    format!(
        "Reporte_{}_{}.csv",
        client_name.replace(' ', "_"),
        date.format("%Y-%m-%d")
    )
}

/// Caller base name with the format's extension appended
pub fn export_filename(base: &str, format: ExportFormat) -> String {
    format!("{}.{}", base, format.extension())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use serde_json::json;

    #[derive(Serialize)]
    struct Row {
        #[serde(rename = "ID")]
        id: String,
        weight: f64,
        note: Option<String>,
    }

    #[test]
    fn test_csv_quotes_and_reparses() {
        let records = vec![json!({"a": "x,y", "b": 5})];

        let csv_text = to_csv(&records).unwrap();
        assert_eq!(csv_text, "a,b\n\"x,y\",5\n");

        let mut reader = csv::Reader::from_reader(csv_text.as_bytes());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers, vec!["a", "b"]);

        let row = reader.records().next().unwrap().unwrap();
        assert_eq!(&row[0], "x,y");
        assert_eq!(&row[1], "5");
    }

    #[test]
    fn test_csv_escapes_quotes_and_newlines() {
        let records = vec![json!({"text": "say \"hi\"", "multi": "line1\nline2", "plain": "ok"})];

        let csv_text = to_csv(&records).unwrap();
        assert_eq!(
            csv_text,
            "text,multi,plain\n\"say \"\"hi\"\"\",\"line1\nline2\",ok\n"
        );
    }

    #[test]
    fn test_csv_empty_input_is_error() {
        let records: Vec<serde_json::Value> = vec![];
        let err = to_csv(&records).unwrap_err();
        assert!(matches!(err, TraceError::EmptyInput(EmptyInputError)));
    }

    #[test]
    fn test_csv_projects_onto_first_record_headers() {
        let records = vec![
            json!({"id": 1, "name": "first"}),
            json!({"name": "second", "extra": true}),
            json!({"id": 3, "name": null}),
        ];

        let csv_text = to_csv(&records).unwrap();
        assert_eq!(csv_text, "id,name\n1,first\n,second\n3,\n");
    }

    #[test]
    fn test_csv_from_struct_keeps_field_order() {
        let records = vec![Row {
            id: "L-1".to_string(),
            weight: 12.5,
            note: None,
        }];

        assert_eq!(to_csv(&records).unwrap(), "ID,weight,note\nL-1,12.5,\n");
    }

    #[test]
    fn test_csv_rejects_non_object_records() {
        let records = vec![json!({"a": 1}), json!([1, 2])];
        assert!(matches!(to_csv(&records), Err(TraceError::NotARecord { index: 1 })));
    }

    #[test]
    fn test_csv_is_deterministic() {
        let records = vec![json!({"a": "x", "b": 1.25}), json!({"a": "y", "b": 2})];
        assert_eq!(to_csv(&records).unwrap(), to_csv(&records).unwrap());
    }

    #[test]
    fn test_column_width_floor() {
        let records = vec![json!({"ID": "ab"}), json!({"ID": "cd"})];
        let table = to_spreadsheet_table(&records, "Lots").unwrap();
        assert_eq!(table.column_widths, vec![10]);
    }

    #[test]
    fn test_column_width_ceiling() {
        let long = "x".repeat(60);
        let records = vec![json!({"Description": long})];
        let table = to_spreadsheet_table(&records, "Lots").unwrap();
        assert_eq!(table.column_widths, vec![50]);
    }

    #[test]
    fn test_column_width_between_bounds() {
        assert_eq!(column_width("Campaign", &["Back to school".to_string()]), 16);
        assert_eq!(column_width("Recycled content percentage", &[]), 29);
    }

    #[test]
    fn test_spreadsheet_table_shape() {
        let records = vec![json!({"id": "L-1", "weight": 10, "returned": true, "note": null})];
        let table = to_spreadsheet_table(&records, "Lots").unwrap();

        assert_eq!(table.sheet_name, "Lots");
        assert_eq!(table.headers, vec!["id", "weight", "returned", "note"]);
        assert_eq!(
            table.rows[0],
            vec![
                Cell::Text("L-1".to_string()),
                Cell::Number(10.0),
                Cell::Bool(true),
                Cell::Empty
            ]
        );
    }

    #[test]
    fn test_spreadsheet_empty_input_is_error() {
        let records: Vec<serde_json::Value> = vec![];
        assert!(matches!(
            to_spreadsheet_table(&records, "Lots"),
            Err(TraceError::EmptyInput(_))
        ));
    }

    #[test]
    fn test_write_xlsx_produces_zip() {
        let records = vec![json!({"id": "L-1", "weight": 10.5})];
        let bytes = to_xlsx(&records, "Lots", Some(&TableStyle::default())).unwrap();

        // XLSX files are zip archives
        assert!(bytes.len() > 4);
        assert_eq!(&bytes[0..2], b"PK");
    }

    #[test]
    fn test_file_names() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        assert_eq!(
            client_report_filename("Grupo Norte Retail", date),
            "Reporte_Grupo_Norte_Retail_2025-03-14.csv"
        );
        assert_eq!(export_filename("lots_2025", ExportFormat::Xlsx), "lots_2025.xlsx");
        assert_eq!(export_filename("lots_2025", ExportFormat::Csv), "lots_2025.csv");
    }
}
