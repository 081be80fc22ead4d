//! The receipt record: one spreadsheet row's semantic content.
//!
//! Cells arrive as loosely typed [`calamine::Data`]. All coercion and default
//! substitution happens in [`ReceiptRecord::from_cells`]; nothing downstream
//! looks at raw cells.

use calamine::{Data, DataType};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};

/// Number of positional columns read from each row.
pub const RECEIPT_COLUMNS: usize = 6;

#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptRecord {
    /// Column 1. `None` when the cell is empty.
    pub receipt_number: Option<String>,
    /// Column 2.
    pub date: Option<NaiveDate>,
    /// Column 3.
    pub recipient_name: String,
    /// Column 4. Zero when absent or unparseable.
    pub amount: f64,
    /// Column 5, supplied as-is.
    pub amount_in_words: String,
    /// Column 6.
    pub description: String,
    /// 1-based sheet row number (the header is row 1).
    pub row: u32,
}

impl ReceiptRecord {
    /// Build a record from the six positional cells of sheet row `row`.
    ///
    /// Missing or unusable cells degrade to `None`, `""` or `0.0`; this never
    /// fails.
    pub fn from_cells(row: u32, cells: [Option<&Data>; RECEIPT_COLUMNS]) -> Self {
        let [number, date, recipient, amount, words, description] = cells;
        let receipt_number = Some(cell_text(number)).filter(|s| !s.is_empty());

        Self {
            receipt_number,
            date: cell_date(date),
            recipient_name: cell_text(recipient),
            amount: cell_amount(amount),
            amount_in_words: cell_text(words),
            description: cell_text(description),
            row,
        }
    }

    /// Receipt number, or the row number when the receipt number is absent.
    pub fn identifier(&self) -> String {
        match &self.receipt_number {
            Some(number) => number.clone(),
            None => self.row.to_string(),
        }
    }
}

fn cell_text(cell: Option<&Data>) -> String {
    match cell {
        None | Some(Data::Empty) | Some(Data::Error(_)) => String::new(),
        Some(Data::String(s)) => s.trim().to_string(),
        Some(Data::Int(i)) => i.to_string(),
        Some(Data::Float(f)) => plain_number(*f),
        Some(Data::Bool(b)) => b.to_string(),
        Some(d @ Data::DateTime(_)) => d
            .as_datetime()
            .map(|dt| dt.date().to_string())
            .unwrap_or_default(),
        Some(Data::DateTimeIso(s)) | Some(Data::DurationIso(s)) => s.trim().to_string(),
    }
}

fn cell_date(cell: Option<&Data>) -> Option<NaiveDate> {
    match cell? {
        d @ (Data::DateTime(_) | Data::DateTimeIso(_)) => d.as_datetime().map(|dt| dt.date()),
        Data::String(s) => parse_date_text(s),
        Data::Float(f) => excel_serial_date(*f),
        Data::Int(i) => excel_serial_date(*i as f64),
        _ => None,
    }
}

fn cell_amount(cell: Option<&Data>) -> f64 {
    let value = match cell {
        Some(Data::Float(f)) => *f,
        Some(Data::Int(i)) => *i as f64,
        Some(Data::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Integral floats print without a trailing `.0` (receipt numbers typed as numbers).
fn plain_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

fn parse_date_text(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.date());
        }
    }
    ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
}

/// Excel serial day number (1900 date system) to a calendar date.
fn excel_serial_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > 2_958_465.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.floor() as i64))
}
