//! Receipt layout: the fixed structure of one receipt, independent of the PDF
//! backend that draws it.

use crate::format::{format_date, format_rupiah};
use crate::record::ReceiptRecord;

pub const RECEIPT_TITLE: &str = "KWITANSI";
pub const SIGNATURE_LINE: &str = "(___________________)";
pub const DEFAULT_CITY: &str = "Jakarta";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutSettings {
    /// Place name printed before the date in the signature footer.
    pub city: String,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            city: DEFAULT_CITY.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoRow {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptLayout {
    pub title: &'static str,
    /// `No: {receipt_number}`
    pub number_line: String,
    /// Payer, amount, purpose.
    pub rows: [InfoRow; 3],
    pub amount_in_words: String,
    /// `{city}, {date}`; the date part is blank when the record has no date.
    pub place_and_date: String,
    pub signature_line: &'static str,
}

impl ReceiptLayout {
    pub fn from_record(record: &ReceiptRecord, settings: &LayoutSettings) -> Self {
        let number = record.receipt_number.as_deref().unwrap_or("");
        let date = record.date.map(format_date).unwrap_or_default();

        Self {
            title: RECEIPT_TITLE,
            number_line: format!("No: {}", sanitize_text(number)),
            rows: [
                InfoRow {
                    label: "Telah terima dari",
                    value: sanitize_text(&record.recipient_name),
                },
                InfoRow {
                    label: "Uang sejumlah",
                    value: format_rupiah(record.amount),
                },
                InfoRow {
                    label: "Untuk pembayaran",
                    value: sanitize_text(&record.description),
                },
            ],
            amount_in_words: sanitize_text(&record.amount_in_words),
            place_and_date: format!("{}, {}", sanitize_text(&settings.city), date),
            signature_line: SIGNATURE_LINE,
        }
    }

    /// Every text fragment in drawing order.
    pub fn texts(&self) -> Vec<String> {
        let mut texts = vec![self.title.to_string(), self.number_line.clone()];
        for row in &self.rows {
            texts.push(row.label.to_string());
            texts.push(row.value.clone());
        }
        texts.push(self.amount_in_words.clone());
        texts.push(self.place_and_date.clone());
        texts.push(self.signature_line.to_string());
        texts
    }
}

/// Make untrusted cell text safe to place on the page.
///
/// Control characters become spaces, whitespace runs collapse to one space,
/// and anything outside printable Latin-1 (what the built-in PDF fonts can
/// encode) becomes `?`.
pub fn sanitize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = true;
    for ch in text.chars() {
        let ch = if ch.is_control() || ch.is_whitespace() {
            ' '
        } else if matches!(ch, ' '..='~' | '\u{a1}'..='\u{ff}') {
            ch
        } else {
            '?'
        };
        if ch == ' ' {
            if last_was_space {
                continue;
            }
            last_was_space = true;
        } else {
            last_was_space = false;
        }
        out.push(ch);
    }
    out.trim_end().to_string()
}
