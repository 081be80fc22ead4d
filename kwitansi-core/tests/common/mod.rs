#![allow(dead_code)]

use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};
use std::path::Path;

/// One data row for a fixture workbook. Empty strings and `None` leave the
/// cell unwritten.
#[derive(Clone, Copy, Default)]
pub struct Row<'a> {
    pub number: Option<&'a str>,
    pub date: Option<(u16, u8, u8)>,
    pub recipient: &'a str,
    pub amount: Option<f64>,
    pub words: &'a str,
    pub description: &'a str,
}

pub fn row<'a>(number: &'a str, recipient: &'a str, amount: f64) -> Row<'a> {
    Row {
        number: Some(number),
        date: Some((2024, 1, 15)),
        recipient,
        amount: Some(amount),
        words: "satu juta rupiah",
        description: "Pembayaran sewa",
    }
}

/// Write a workbook with the standard header row followed by `rows`.
pub fn write_workbook(path: &Path, rows: &[Row<'_>]) {
    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        let headers = [
            "No Kwitansi",
            "Tanggal",
            "Nama Penerima",
            "Jumlah Uang",
            "Terbilang",
            "Keterangan",
        ];
        for (col, header) in headers.iter().enumerate() {
            sheet.write_string(0, col as u16, *header).unwrap();
        }

        let date_format = Format::new().set_num_format("yyyy-mm-dd");
        for (i, data) in rows.iter().enumerate() {
            let r = (i + 1) as u32;
            if let Some(number) = data.number {
                sheet.write_string(r, 0, number).unwrap();
            }
            if let Some((y, m, d)) = data.date {
                let date = ExcelDateTime::from_ymd(y, m, d).unwrap();
                sheet.write_datetime_with_format(r, 1, &date, &date_format).unwrap();
            }
            if !data.recipient.is_empty() {
                sheet.write_string(r, 2, data.recipient).unwrap();
            }
            if let Some(amount) = data.amount {
                sheet.write_number(r, 3, amount).unwrap();
            }
            if !data.words.is_empty() {
                sheet.write_string(r, 4, data.words).unwrap();
            }
            if !data.description.is_empty() {
                sheet.write_string(r, 5, data.description).unwrap();
            }
        }
    }
    workbook.save(path).unwrap();
}
