//! Indonesian (`id-ID`) number and date formatting.

use chrono::{Datelike, NaiveDate};

const MONTHS_ID: [&str; 12] = [
    "Januari",
    "Februari",
    "Maret",
    "April",
    "Mei",
    "Juni",
    "Juli",
    "Agustus",
    "September",
    "Oktober",
    "November",
    "Desember",
];

/// Format an amount with `id-ID` grouping: `.` every third digit, `,` before
/// at most three fraction digits, trailing zeros dropped.
///
/// `1000000.0` becomes `1.000.000`, `1234.5` becomes `1.234,5`.
pub fn format_amount(amount: f64) -> String {
    if !amount.is_finite() {
        return "0".to_string();
    }
    let thousandths = (amount.abs() * 1000.0).round() as u64;
    let whole = thousandths / 1000;
    let fraction = thousandths % 1000;

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    if fraction > 0 {
        let fraction = format!("{fraction:03}");
        grouped.push(',');
        grouped.push_str(fraction.trim_end_matches('0'));
    }
    if amount < 0.0 && thousandths > 0 {
        grouped.insert(0, '-');
    }
    grouped
}

/// `Rp 1.000.000`
pub fn format_rupiah(amount: f64) -> String {
    format!("Rp {}", format_amount(amount))
}

/// Long Indonesian date: day without padding, full month name, year.
pub fn format_date(date: NaiveDate) -> String {
    let month = MONTHS_ID[date.month0() as usize];
    format!("{} {} {}", date.day(), month, date.year())
}
