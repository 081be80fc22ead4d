use chrono::NaiveDate;
use kwitansi_core::contract::ReceiptRenderer;
use kwitansi_core::layout::{LayoutSettings, ReceiptLayout};
use kwitansi_core::record::ReceiptRecord;
use kwitansi_core::render::{layout_pages, layout_to_pdf, wrap_text, PdfReceiptRenderer};
use printpdf::{Op, TextItem};

/// Every text cursor y position (pt) with the text written after it.
fn placed_text(ops: &[Op]) -> Vec<(f32, String)> {
    let mut placed = Vec::new();
    let mut y = f32::NAN;
    for op in ops {
        match op {
            Op::SetTextCursor { pos } => y = pos.y.0,
            Op::WriteTextBuiltinFont { items, .. } => {
                for item in items {
                    if let TextItem::Text(text) = item {
                        placed.push((y, text.clone()));
                    }
                }
            }
            _ => {}
        }
    }
    placed
}

fn record(row: u32) -> ReceiptRecord {
    ReceiptRecord {
        receipt_number: Some(format!("KW-{row:03}")),
        date: NaiveDate::from_ymd_opt(2024, 2, 29),
        recipient_name: "PT Maju Bersama".to_string(),
        amount: 2_750_000.0,
        amount_in_words: "Dua juta tujuh ratus lima puluh ribu rupiah".to_string(),
        description: "Pelunasan tagihan jasa konsultasi bulan Februari termasuk biaya perjalanan dinas dan akomodasi tim".to_string(),
        row,
    }
}

#[tokio::test]
async fn renders_one_pdf_per_record() {
    let renderer = PdfReceiptRenderer::default();

    let bytes = renderer.render(&record(2)).await.expect("render should succeed");

    assert!(bytes.starts_with(b"%PDF"), "output should be a PDF document");
    assert!(bytes.len() > 500, "PDF should not be trivially small");
}

#[tokio::test]
async fn renders_records_with_only_defaults() {
    let renderer = PdfReceiptRenderer::default();
    let empty = ReceiptRecord {
        receipt_number: None,
        date: None,
        recipient_name: String::new(),
        amount: 0.0,
        amount_in_words: String::new(),
        description: String::new(),
        row: 5,
    };

    let bytes = renderer.render(&empty).await.expect("defaults must render");
    assert!(bytes.starts_with(b"%PDF"));
}

#[test]
fn distinct_records_give_distinct_documents() {
    let settings = LayoutSettings::default();
    let a = layout_to_pdf(&ReceiptLayout::from_record(&record(2), &settings)).unwrap();
    let mut other = record(3);
    other.recipient_name = "CV Sumber Rejeki".to_string();
    let b = layout_to_pdf(&ReceiptLayout::from_record(&other, &settings)).unwrap();
    assert_ne!(a, b);
}

#[test]
fn wrap_text_breaks_on_words() {
    assert_eq!(wrap_text("", 10), vec![String::new()]);
    assert_eq!(wrap_text("satu dua tiga", 20), vec!["satu dua tiga"]);
    assert_eq!(wrap_text("satu dua tiga", 8), vec!["satu dua", "tiga"]);
    assert_eq!(
        wrap_text("abcdefghij klm", 4),
        vec!["abcd", "efgh", "ij", "klm"]
    );
}

#[test]
fn ordinary_receipt_fits_one_page() {
    let layout = ReceiptLayout::from_record(&record(2), &LayoutSettings::default());
    assert_eq!(layout_pages(&layout).len(), 1);
}

#[test]
fn long_text_continues_on_new_pages_and_keeps_the_footer() {
    let mut long = record(4);
    long.description = "kata ".repeat(600);
    long.amount_in_words = "sangat panjang ".repeat(80);
    let layout = ReceiptLayout::from_record(&long, &LayoutSettings::default());

    let pages = layout_pages(&layout);
    assert!(pages.len() > 1, "long text should spill onto another page");

    // 20mm bottom margin, in points.
    let margin_pt = 20.0 * 72.0 / 25.4;
    for (index, ops) in pages.iter().enumerate() {
        for (y, text) in placed_text(ops) {
            assert!(
                y >= margin_pt - 0.01,
                "page {index}: {text:?} drawn at y={y}pt, below the margin"
            );
        }
    }

    let last = placed_text(pages.last().unwrap());
    let texts: Vec<&str> = last.iter().map(|(_, t)| t.as_str()).collect();
    assert!(texts.contains(&layout.place_and_date.as_str()));
    assert_eq!(texts.last().copied(), Some(layout.signature_line));

    let bytes = layout_to_pdf(&layout).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}
