//! PDF backend for [`ReceiptLayout`]: draws one receipt on A4 pages with
//! the built-in Helvetica family via printpdf. Ordinary receipts fit one page;
//! very long text continues onto further pages.

use async_trait::async_trait;
use printpdf::{
    BuiltinFont, Color, Line, LinePoint, Mm, Op, PaintMode, PdfDocument, PdfPage,
    PdfSaveOptions, Point, Polygon, PolygonRing, Pt, Rgb, TextItem, WindingOrder,
};
use std::time::Duration;
use tracing::{debug, error};

use crate::contract::ReceiptRenderer;
use crate::error::RenderError;
use crate::layout::{LayoutSettings, ReceiptLayout};
use crate::record::ReceiptRecord;

pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(30);

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const BOX_LEFT: f32 = 20.0;
const BOX_RIGHT: f32 = 190.0;
const BOX_TOP: f32 = 277.0;
const BOTTOM_MARGIN: f32 = 20.0;
// Place/date line, signature line and the padding around them.
const FOOTER_HEIGHT: f32 = 56.0;
const CONTENT_LEFT: f32 = 28.0;
const CONTENT_RIGHT: f32 = 182.0;
const VALUE_LEFT: f32 = 75.0;
const BODY_SIZE: f32 = 11.0;
const LINE_GAP: f32 = 6.0;
// Average Helvetica glyph advance as a fraction of the font size.
const AVG_GLYPH_EM: f32 = 0.52;

/// Renders receipts to PDF on a blocking thread, bounded by a timeout.
pub struct PdfReceiptRenderer {
    settings: LayoutSettings,
    timeout: Duration,
}

impl PdfReceiptRenderer {
    pub fn new(settings: LayoutSettings, timeout: Duration) -> Self {
        Self { settings, timeout }
    }
}

impl Default for PdfReceiptRenderer {
    fn default() -> Self {
        Self::new(LayoutSettings::default(), DEFAULT_RENDER_TIMEOUT)
    }
}

#[async_trait]
impl ReceiptRenderer for PdfReceiptRenderer {
    async fn render(&self, record: &ReceiptRecord) -> Result<Vec<u8>, RenderError> {
        let row = record.row;
        let layout = ReceiptLayout::from_record(record, &self.settings);
        let task = tokio::task::spawn_blocking(move || layout_to_pdf(&layout));

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(Ok(bytes))) => {
                debug!(row, size = bytes.len(), "Rendered receipt PDF");
                Ok(bytes)
            }
            Ok(Ok(Err(reason))) => {
                error!(row, reason = %reason, "PDF engine produced no document");
                Err(RenderError::Engine { row, reason })
            }
            Ok(Err(join_err)) => {
                error!(row, error = ?join_err, "PDF engine task crashed");
                Err(RenderError::Engine {
                    row,
                    reason: join_err.to_string(),
                })
            }
            Err(_) => {
                error!(row, timeout = ?self.timeout, "PDF rendering timed out");
                Err(RenderError::Timeout {
                    row,
                    secs: self.timeout.as_secs(),
                })
            }
        }
    }
}

/// Draw the layout and serialize the document.
pub fn layout_to_pdf(layout: &ReceiptLayout) -> Result<Vec<u8>, String> {
    let pages = layout_pages(layout)
        .into_iter()
        .map(|ops| PdfPage::new(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), ops))
        .collect::<Vec<_>>();
    if pages.len() > 1 {
        debug!(pages = pages.len(), "Receipt continues onto extra pages");
    }

    let mut warnings = Vec::new();
    let bytes = PdfDocument::new("Kwitansi")
        .with_pages(pages)
        .save(&PdfSaveOptions::default(), &mut warnings);
    if !warnings.is_empty() {
        debug!(count = warnings.len(), "PDF engine reported warnings");
    }
    if bytes.is_empty() {
        return Err("PDF engine returned an empty document".to_string());
    }
    Ok(bytes)
}

/// Drawing operations for each A4 page of the receipt. Content that would
/// cross the bottom margin continues on a new page; the place/date line and
/// signature are kept together.
pub fn layout_pages(layout: &ReceiptLayout) -> Vec<Vec<Op>> {
    let mut sheet = Sheet::new();

    text_centered(&mut sheet.ops, layout.title, BuiltinFont::HelveticaBold, 20.0, sheet.y);
    sheet.y -= 8.0;
    text_centered(&mut sheet.ops, &layout.number_line, BuiltinFont::Helvetica, BODY_SIZE, sheet.y);
    sheet.y -= 14.0;

    let value_chars = chars_fitting(CONTENT_RIGHT - VALUE_LEFT, BODY_SIZE);
    for row in &layout.rows {
        let lines = wrap_text(&row.value, value_chars.saturating_sub(2));
        for (i, line) in lines.iter().enumerate() {
            sheet.reserve(LINE_GAP);
            if i == 0 {
                text_at(
                    &mut sheet.ops,
                    row.label,
                    BuiltinFont::HelveticaBold,
                    BODY_SIZE,
                    CONTENT_LEFT,
                    sheet.y,
                );
            }
            let prefix = if i == 0 { ": " } else { "  " };
            text_at(
                &mut sheet.ops,
                &format!("{prefix}{line}"),
                BuiltinFont::Helvetica,
                BODY_SIZE,
                VALUE_LEFT,
                sheet.y,
            );
            sheet.y -= LINE_GAP;
        }
        sheet.y -= 2.0;
    }

    // Highlighted spelled-out amount, one shaded band per line.
    let words_chars = chars_fitting(CONTENT_RIGHT - CONTENT_LEFT - 8.0, BODY_SIZE);
    let words = wrap_text(&format!("Terbilang: {}", layout.amount_in_words), words_chars);
    sheet.y -= 2.0;
    let last = words.len() - 1;
    for (i, line) in words.iter().enumerate() {
        let top_pad = if i == 0 { 3.0 } else { 0.0 };
        let bottom_pad = if i == last { 3.0 } else { 0.0 };
        sheet.reserve(top_pad + LINE_GAP + bottom_pad);
        let band_top = sheet.y;
        let band_bottom = band_top - top_pad - LINE_GAP - bottom_pad;
        sheet.ops.push(Op::SetFillColor { col: rgb(0.95, 0.95, 0.95) });
        sheet.ops.push(Op::DrawPolygon {
            polygon: rectangle(CONTENT_LEFT, band_bottom, CONTENT_RIGHT, band_top, PaintMode::Fill),
        });
        sheet.ops.push(Op::SetFillColor { col: rgb(0.0, 0.0, 0.0) });
        let font = if i == 0 {
            BuiltinFont::HelveticaBoldOblique
        } else {
            BuiltinFont::HelveticaOblique
        };
        text_at(&mut sheet.ops, line, font, BODY_SIZE, CONTENT_LEFT + 4.0, band_top - top_pad - 4.5);
        sheet.y = band_bottom;
    }

    sheet.reserve(FOOTER_HEIGHT);
    sheet.y -= 20.0;
    text_right(&mut sheet.ops, &layout.place_and_date, BuiltinFont::Helvetica, BODY_SIZE, sheet.y);
    sheet.y -= 24.0;
    text_right(&mut sheet.ops, layout.signature_line, BuiltinFont::Helvetica, BODY_SIZE, sheet.y);
    sheet.y -= 12.0;

    sheet.finish()
}

/// Pages drawn so far plus the cursor on the current one, in mm from the
/// bottom edge.
struct Sheet {
    pages: Vec<Vec<Op>>,
    ops: Vec<Op>,
    y: f32,
}

impl Sheet {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            ops: Vec::new(),
            y: BOX_TOP - 16.0,
        }
    }

    /// Break to a new page unless `height` mm still fits above the margin.
    fn reserve(&mut self, height: f32) {
        if self.y - height < BOTTOM_MARGIN {
            outline(&mut self.ops, BOTTOM_MARGIN);
            self.pages.push(std::mem::take(&mut self.ops));
            self.y = BOX_TOP - 10.0;
        }
    }

    fn finish(mut self) -> Vec<Vec<Op>> {
        outline(&mut self.ops, self.y.max(BOTTOM_MARGIN));
        self.pages.push(self.ops);
        self.pages
    }
}

/// Box outline from the top of the page down to `bottom`.
fn outline(ops: &mut Vec<Op>, bottom: f32) {
    ops.push(Op::SetOutlineColor { col: rgb(0.87, 0.87, 0.87) });
    ops.push(Op::SetOutlineThickness { pt: Pt(0.8) });
    ops.push(Op::DrawLine {
        line: Line {
            points: vec![
                corner(BOX_LEFT, BOX_TOP),
                corner(BOX_RIGHT, BOX_TOP),
                corner(BOX_RIGHT, bottom),
                corner(BOX_LEFT, bottom),
            ],
            is_closed: true,
        },
    });
}

/// Greedy word wrap at `max_chars` characters; always yields at least one line.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let mut word = word.to_string();
        while word.chars().count() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let split: String = word.chars().take(max_chars).collect();
            word = word.chars().skip(max_chars).collect();
            lines.push(split);
        }
        let needed = current.chars().count() + word.chars().count() + usize::from(!current.is_empty());
        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

fn chars_fitting(width_mm: f32, size_pt: f32) -> usize {
    (width_mm / text_width_mm("M", size_pt)).floor() as usize
}

fn text_width_mm(text: &str, size_pt: f32) -> f32 {
    let width_pt = text.chars().count() as f32 * size_pt * AVG_GLYPH_EM;
    width_pt * 25.4 / 72.0
}

fn text_at(ops: &mut Vec<Op>, text: &str, font: BuiltinFont, size: f32, x: f32, y: f32) {
    ops.push(Op::StartTextSection);
    ops.push(Op::SetTextCursor {
        pos: Point {
            x: Mm(x).into(),
            y: Mm(y).into(),
        },
    });
    ops.push(Op::SetFontSizeBuiltinFont { size: Pt(size), font });
    ops.push(Op::WriteTextBuiltinFont {
        items: vec![TextItem::Text(text.to_string())],
        font,
    });
    ops.push(Op::EndTextSection);
}

fn text_centered(ops: &mut Vec<Op>, text: &str, font: BuiltinFont, size: f32, y: f32) {
    let x = (PAGE_WIDTH - text_width_mm(text, size)) / 2.0;
    text_at(ops, text, font, size, x.max(CONTENT_LEFT), y);
}

fn text_right(ops: &mut Vec<Op>, text: &str, font: BuiltinFont, size: f32, y: f32) {
    let x = CONTENT_RIGHT - text_width_mm(text, size);
    text_at(ops, text, font, size, x.max(CONTENT_LEFT), y);
}

fn rgb(r: f32, g: f32, b: f32) -> Color {
    Color::Rgb(Rgb {
        r,
        g,
        b,
        icc_profile: None,
    })
}

fn corner(x: f32, y: f32) -> LinePoint {
    LinePoint {
        p: Point::new(Mm(x), Mm(y)),
        bezier: false,
    }
}

fn rectangle(left: f32, bottom: f32, right: f32, top: f32, mode: PaintMode) -> Polygon {
    Polygon {
        rings: vec![PolygonRing {
            points: vec![
                corner(left, bottom),
                corner(right, bottom),
                corner(right, top),
                corner(left, top),
            ],
        }],
        mode,
        winding_order: WindingOrder::NonZero,
    }
}
