//! Tabular reader: first worksheet of a spreadsheet, header skipped, one
//! [`ReceiptRecord`] per remaining row.

use calamine::{open_workbook_auto, Data, Range, Reader};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use crate::error::ReadError;
use crate::record::{ReceiptRecord, RECEIPT_COLUMNS};

/// Lazy sequence of records over an in-memory sheet.
///
/// Rows are addressed by absolute sheet position, so the header is always sheet
/// row 1 regardless of where the used range starts. Iteration runs through the
/// last used row; empty rows in between still yield default records.
#[derive(Debug, Clone)]
pub struct ReceiptRows {
    range: Range<Data>,
    // 0-based absolute index of the next row to yield
    next: u32,
    last: Option<u32>,
}

impl ReceiptRows {
    pub fn from_range(range: Range<Data>) -> Self {
        let last = range.end().map(|(row, _)| row);
        Self {
            range,
            next: 1,
            last,
        }
    }

    /// Number of data rows (excluding the header) the sheet reports.
    pub fn data_row_count(&self) -> u32 {
        self.last.unwrap_or(0)
    }
}

impl Iterator for ReceiptRows {
    type Item = ReceiptRecord;

    fn next(&mut self) -> Option<ReceiptRecord> {
        let last = self.last?;
        if self.next > last {
            return None;
        }
        let row = self.next;
        self.next += 1;

        let range = &self.range;
        let cells: [Option<&Data>; RECEIPT_COLUMNS] =
            std::array::from_fn(|col| range.get_value((row, col as u32)));
        Some(ReceiptRecord::from_cells(row + 1, cells))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = match self.last {
            Some(last) if last >= self.next => (last - self.next + 1) as usize,
            _ => 0,
        };
        (remaining, Some(remaining))
    }
}

/// Open `path` and return the record sequence of its first worksheet.
pub fn read_receipts(path: &Path) -> Result<ReceiptRows, ReadError> {
    debug!(path = %path.display(), "Opening spreadsheet");
    let mut workbook = open_workbook_auto(path).map_err(|e| {
        error!(path = %path.display(), error = %e, "Failed to open spreadsheet");
        ReadError::Open {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }
    })?;

    let range = match workbook.worksheet_range_at(0) {
        Some(Ok(range)) => range,
        Some(Err(e)) => {
            error!(path = %path.display(), error = %e, "Failed to read first worksheet");
            return Err(ReadError::Sheet {
                path: path.to_path_buf(),
                reason: e.to_string(),
            });
        }
        None => {
            error!(path = %path.display(), "Spreadsheet has no worksheet");
            return Err(ReadError::NoSheet {
                path: path.to_path_buf(),
            });
        }
    };

    let rows = ReceiptRows::from_range(range);
    info!(
        path = %path.display(),
        data_rows = rows.data_row_count(),
        "Loaded first worksheet"
    );
    Ok(rows)
}

/// [`read_receipts`] on a blocking thread.
pub async fn load_receipts(path: PathBuf) -> Result<ReceiptRows, ReadError> {
    tokio::task::spawn_blocking(move || read_receipts(&path))
        .await
        .map_err(|e| ReadError::Task(e.to_string()))?
}
