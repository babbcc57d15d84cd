//! # Invoice PDF Renderer
//!
//! Turns a [`TaxInvoice`] into an A4 PDF.
//!
//! ## Pipeline
//! ```text
//! TaxInvoice ──► layout() ──► Vec<PageLayout> ──► paint() ──► PDF bytes
//!                 pure, tested     text + rules     printpdf
//!
//! render_to(sink): spawn_blocking(layout + paint) → write_all → flush → shutdown
//! ```
//!
//! ## Page
//! ```text
//! ┌──────────────────────────────────────────────┐  15 mm margins
//! │ Company name                     TAX INVOICE │
//! │ address / GSTIN / contact                    │
//! │──────────────────────────────────────────────│
//! │ Invoice        │ Bill To        │ Ship To    │
//! │──────────────────────────────────────────────│
//! │ Item | HSN | Qty | Price | Subtotal | GST |..│  header repeats on
//! │ ...                                          │  overflow pages
//! │ Tax breakdown            Subtotal / Tax / Total
//! │ Payment method / status                      │
//! │                                              │
//! │ footer disclaimer                            │
//! └──────────────────────────────────────────────┘
//! ```

use printpdf::{BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference, Point};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

use storefront_core::invoice::TaxInvoice;
use storefront_core::types::TaxRate;
use storefront_core::Money;

use crate::config::CompanyInfo;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 15.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

/// Rows stop above this line; the footer lives below it.
const BODY_BOTTOM: f32 = MARGIN + 15.0;

const ROW_HEIGHT: f32 = 6.0;
const TABLE_FONT: f32 = 8.0;

/// Item table columns as fractions of the content width.
pub const COLUMNS: [(&str, f32); 8] = [
    ("Item", 0.22),
    ("HSN", 0.09),
    ("Qty", 0.07),
    ("Price", 0.12),
    ("Subtotal", 0.13),
    ("GST", 0.09),
    ("Tax", 0.13),
    ("Total", 0.15),
];

pub const FOOTER_TEXT: &str =
    "This is a computer generated invoice and does not require a signature.";

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("PDF generation failed: {0}")]
    Pdf(String),

    #[error("Render task failed: {0}")]
    Task(String),

    #[error("Failed to write PDF: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Layout
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weight {
    Regular,
    Bold,
}

/// One piece of text at an absolute position (mm from bottom-left).
#[derive(Debug, Clone, PartialEq)]
pub struct TextItem {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub weight: Weight,
}

/// A horizontal rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rule {
    pub x1: f32,
    pub x2: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    pub texts: Vec<TextItem>,
    pub rules: Vec<Rule>,
}

impl PageLayout {
    fn text(&mut self, text: impl Into<String>, x: f32, y: f32, size: f32, weight: Weight) {
        self.texts.push(TextItem {
            text: text.into(),
            x,
            y,
            size,
            weight,
        });
    }

    /// Right-aligns `text` so it ends at `right`.
    fn text_right(&mut self, text: impl Into<String>, right: f32, y: f32, size: f32, weight: Weight) {
        let text = text.into();
        let x = right - text_width(&text, size);
        self.text(text, x, y, size, weight);
    }

    fn rule(&mut self, y: f32) {
        self.rules.push(Rule {
            x1: MARGIN,
            x2: PAGE_WIDTH - MARGIN,
            y,
        });
    }

    /// Whether any text item equals `needle`.
    pub fn contains_text(&self, needle: &str) -> bool {
        self.texts.iter().any(|t| t.text == needle)
    }
}

/// Approximate Helvetica width in mm (average glyph ≈ 0.5 em).
fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * 0.5 * 0.3528
}

/// Truncates `text` with "..." so it fits `width` mm.
fn fit(text: &str, width: f32, size: f32) -> String {
    if text_width(text, size) <= width {
        return text.to_string();
    }
    let max_chars = (width / (size * 0.5 * 0.3528)) as usize;
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}

/// Left edges of the item table columns.
fn column_edges() -> [f32; 9] {
    let mut edges = [MARGIN; 9];
    for (i, (_, fraction)) in COLUMNS.iter().enumerate() {
        edges[i + 1] = edges[i] + fraction * CONTENT_WIDTH;
    }
    edges
}

/// Renders invoices. Cheap to clone.
#[derive(Debug, Clone)]
pub struct InvoiceRenderer {
    company: CompanyInfo,
    currency_prefix: String,
}

impl InvoiceRenderer {
    pub fn new(company: CompanyInfo, currency_prefix: impl Into<String>) -> Self {
        InvoiceRenderer {
            company,
            currency_prefix: currency_prefix.into(),
        }
    }

    fn money(&self, paise: i64) -> String {
        Money::from_paise(paise).format_with(&self.currency_prefix)
    }

    /// Lays the invoice out into pages.
    pub fn layout(&self, invoice: &TaxInvoice) -> Vec<PageLayout> {
        let mut pages = Vec::new();
        let mut page = PageLayout::default();
        let mut y = PAGE_HEIGHT - MARGIN;

        // Company header
        page.text(&self.company.name, MARGIN, y - 6.0, 16.0, Weight::Bold);
        page.text_right("TAX INVOICE", PAGE_WIDTH - MARGIN, y - 6.0, 14.0, Weight::Bold);
        y -= 12.0;
        let mut contact: Vec<String> = self.company.address_lines.clone();
        if let Some(gstin) = &self.company.gstin {
            contact.push(format!("GSTIN: {}", gstin));
        }
        match (&self.company.email, &self.company.phone) {
            (Some(email), Some(phone)) => contact.push(format!("{} | {}", email, phone)),
            (Some(email), None) => contact.push(email.clone()),
            (None, Some(phone)) => contact.push(phone.clone()),
            (None, None) => {}
        }
        for line in contact {
            page.text(line, MARGIN, y, 9.0, Weight::Regular);
            y -= 4.5;
        }
        y -= 2.0;
        page.rule(y);
        y -= 7.0;

        // Invoice / Bill To / Ship To
        let column = CONTENT_WIDTH / 3.0;
        let blocks: [(&str, Vec<String>); 3] = [
            (
                "Invoice",
                vec![
                    format!("No: {}", invoice.invoice.invoice_number),
                    format!("Date: {}", invoice.invoice.invoice_date.format("%d %b %Y")),
                    format!("Order: #{}", invoice.invoice.order_id),
                    format!("Status: {}", invoice.invoice.order_status),
                ],
            ),
            (
                "Bill To",
                [
                    Some(invoice.customer.name.clone()),
                    Some(invoice.customer.email.clone()),
                    invoice.customer.phone.clone(),
                ]
                .into_iter()
                .flatten()
                .collect(),
            ),
            ("Ship To", invoice.shipping_address.lines()),
        ];
        let mut block_bottom = y;
        for (i, (title, lines)) in blocks.iter().enumerate() {
            let x = MARGIN + column * i as f32;
            let mut by = y;
            page.text(*title, x, by, 10.0, Weight::Bold);
            by -= 5.0;
            for line in lines {
                page.text(fit(line, column - 3.0, 9.0), x, by, 9.0, Weight::Regular);
                by -= 4.5;
            }
            block_bottom = block_bottom.min(by);
        }
        y = block_bottom - 2.0;
        page.rule(y);
        y -= 7.0;

        // Item table
        let edges = column_edges();
        y = self.table_header(&mut page, &edges, y);
        for item in &invoice.items {
            if y < BODY_BOTTOM {
                pages.push(page);
                page = PageLayout::default();
                y = self.table_header(&mut page, &edges, PAGE_HEIGHT - MARGIN - 6.0);
            }
            let cells = [
                fit(&item.name, edges[1] - edges[0] - 2.0, TABLE_FONT),
                item.hsn_code.clone().unwrap_or_else(|| "-".to_string()),
                item.quantity.to_string(),
                self.money(item.price_paise),
                self.money(item.subtotal_paise),
                TaxRate::from_bps(item.tax_rate_bps).to_string(),
                self.money(item.tax_amount_paise),
                self.money(item.total_paise),
            ];
            for (i, cell) in cells.into_iter().enumerate() {
                if i < 2 {
                    page.text(cell, edges[i] + 1.0, y, TABLE_FONT, Weight::Regular);
                } else {
                    page.text_right(cell, edges[i + 1] - 1.0, y, TABLE_FONT, Weight::Regular);
                }
            }
            y -= ROW_HEIGHT;
        }
        page.rule(y + ROW_HEIGHT - 2.0);

        // Breakdown, summary and payment stay together
        let breakdown_rows = invoice.summary.tax_breakdown.len() as f32;
        let needed = 12.0 + (breakdown_rows + 1.0) * 5.0 + 3.0 * 5.5 + 16.0;
        if y - needed < BODY_BOTTOM {
            pages.push(page);
            page = PageLayout::default();
            y = PAGE_HEIGHT - MARGIN - 6.0;
        }

        y -= 4.0;
        let summary_top = y;
        page.text("Tax Breakdown", MARGIN, y, 10.0, Weight::Bold);
        y -= 5.0;
        for entry in &invoice.summary.tax_breakdown {
            page.text(
                format!(
                    "GST {}: taxable {}, tax {}",
                    entry.rate(),
                    self.money(entry.taxable_amount_paise),
                    self.money(entry.tax_amount_paise)
                ),
                MARGIN,
                y,
                9.0,
                Weight::Regular,
            );
            y -= 5.0;
        }

        let mut sy = summary_top;
        let label_right = PAGE_WIDTH - MARGIN - 40.0;
        let value_right = PAGE_WIDTH - MARGIN;
        for (label, paise, weight) in [
            ("Subtotal", invoice.summary.subtotal_paise, Weight::Regular),
            ("Total Tax", invoice.summary.total_tax_paise, Weight::Regular),
            ("Grand Total", invoice.summary.total_paise, Weight::Bold),
        ] {
            page.text_right(label, label_right, sy, 10.0, weight);
            page.text_right(self.money(paise), value_right, sy, 10.0, weight);
            sy -= 5.5;
        }

        y = y.min(sy) - 6.0;
        page.text("Payment", MARGIN, y, 10.0, Weight::Bold);
        y -= 5.0;
        page.text(
            format!("Method: {}", invoice.payment.method_label),
            MARGIN,
            y,
            9.0,
            Weight::Regular,
        );
        y -= 4.5;
        page.text(
            format!("Status: {}", capitalize(invoice.payment.status.as_str())),
            MARGIN,
            y,
            9.0,
            Weight::Regular,
        );

        pages.push(page);

        let total = pages.len();
        for (i, page) in pages.iter_mut().enumerate() {
            page.rule(MARGIN + 8.0);
            page.text(FOOTER_TEXT, MARGIN, MARGIN + 3.0, 8.0, Weight::Regular);
            page.text_right(
                format!("Page {} of {}", i + 1, total),
                PAGE_WIDTH - MARGIN,
                MARGIN + 3.0,
                8.0,
                Weight::Regular,
            );
        }

        pages
    }

    fn table_header(&self, page: &mut PageLayout, edges: &[f32; 9], y: f32) -> f32 {
        for (i, (title, _)) in COLUMNS.iter().enumerate() {
            if i < 2 {
                page.text(*title, edges[i] + 1.0, y, TABLE_FONT, Weight::Bold);
            } else {
                page.text_right(*title, edges[i + 1] - 1.0, y, TABLE_FONT, Weight::Bold);
            }
        }
        page.rule(y - 2.0);
        y - ROW_HEIGHT - 1.0
    }

    /// Renders the invoice to PDF bytes. CPU-bound.
    pub fn render(&self, invoice: &TaxInvoice) -> Result<Vec<u8>, RenderError> {
        let pages = self.layout(invoice);
        let bytes = paint(&invoice.invoice.invoice_number, &pages)?;
        debug!(
            invoice = %invoice.invoice.invoice_number,
            pages = pages.len(),
            bytes = bytes.len(),
            "Invoice rendered"
        );
        Ok(bytes)
    }

    /// Renders off the async runtime and writes the PDF to `sink`.
    ///
    /// Returns only after the sink has been written, flushed and shut down.
    pub async fn render_to<W>(&self, invoice: TaxInvoice, sink: &mut W) -> Result<usize, RenderError>
    where
        W: AsyncWrite + Unpin,
    {
        let renderer = self.clone();
        let bytes = tokio::task::spawn_blocking(move || renderer.render(&invoice))
            .await
            .map_err(|e| RenderError::Task(e.to_string()))??;

        sink.write_all(&bytes).await?;
        sink.flush().await?;
        sink.shutdown().await?;
        Ok(bytes.len())
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// =============================================================================
// Painting
// =============================================================================

fn paint(title: &str, pages: &[PageLayout]) -> Result<Vec<u8>, RenderError> {
    let (doc, first_page, first_layer) =
        PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| RenderError::Pdf(e.to_string()))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| RenderError::Pdf(e.to_string()))?;

    for (i, page) in pages.iter().enumerate() {
        let layer = if i == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page_index, layer_index) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
            doc.get_page(page_index).get_layer(layer_index)
        };
        paint_page(&layer, page, &regular, &bold);
    }

    save(doc)
}

fn paint_page(layer: &PdfLayerReference, page: &PageLayout, regular: &IndirectFontRef, bold: &IndirectFontRef) {
    layer.set_outline_thickness(0.3);
    for rule in &page.rules {
        layer.add_line(Line {
            points: vec![
                (Point::new(Mm(rule.x1), Mm(rule.y)), false),
                (Point::new(Mm(rule.x2), Mm(rule.y)), false),
            ],
            is_closed: false,
        });
    }
    for item in &page.texts {
        let font = match item.weight {
            Weight::Regular => regular,
            Weight::Bold => bold,
        };
        layer.use_text(item.text.clone(), item.size, Mm(item.x), Mm(item.y), font);
    }
}

fn save(doc: PdfDocumentReference) -> Result<Vec<u8>, RenderError> {
    doc.save_to_bytes().map_err(|e| RenderError::Pdf(e.to_string()))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use storefront_core::invoice::{build_invoice, InvoiceItemRow};
    use storefront_core::{Address, Customer, Order, OrderStatus, PaymentMethod};

    fn invoice(lines: usize) -> TaxInvoice {
        let placed = Utc.with_ymd_and_hms(2024, 3, 9, 10, 0, 0).unwrap();
        let rows: Vec<InvoiceItemRow> = (0..lines)
            .map(|i| InvoiceItemRow {
                product_id: i as i64 + 1,
                name: format!("Product number {} with a rather long descriptive name", i + 1),
                sku: None,
                hsn_code: Some("1001".to_string()),
                quantity: 2,
                price_paise: 10_000,
                tax_rate_bps: 1800,
                tax_amount_paise: 3_600,
            })
            .collect();
        let subtotal = 20_000 * lines as i64;
        let tax = 3_600 * lines as i64;
        let order = Order {
            order_id: 42,
            user_id: 1,
            address_id: 1,
            subtotal_paise: subtotal,
            total_tax_paise: tax,
            total_price_paise: subtotal + tax,
            status: OrderStatus::Pending,
            payment_method: PaymentMethod::Upi,
            created_at: placed,
            updated_at: placed,
        };
        let customer = Customer {
            user_id: 1,
            name: "Asha Rao".to_string(),
            email: "asha@example.com".to_string(),
            phone: None,
        };
        let address = Address {
            address_id: 1,
            user_id: 1,
            full_name: "Asha Rao".to_string(),
            phone: None,
            address_line1: "4 Lake View".to_string(),
            address_line2: None,
            city: "Pune".to_string(),
            state: "Maharashtra".to_string(),
            postal_code: "411001".to_string(),
            country: "India".to_string(),
            is_default: true,
        };
        build_invoice(&order, rows, customer, address)
    }

    fn renderer() -> InvoiceRenderer {
        InvoiceRenderer::new(CompanyInfo::default(), "Rs. ")
    }

    #[test]
    fn test_column_fractions_fill_content_width() {
        let total: f32 = COLUMNS.iter().map(|(_, f)| f).sum();
        assert!((total - 1.0).abs() < 1e-6);
        let edges = column_edges();
        assert!((edges[8] - (PAGE_WIDTH - MARGIN)).abs() < 1e-3);
    }

    #[test]
    fn test_single_page_invoice() {
        let pages = renderer().layout(&invoice(2));
        assert_eq!(pages.len(), 1);
        let page = &pages[0];
        assert!(page.contains_text("TAX INVOICE"));
        assert!(page.contains_text("No: INV-20240309-000042"));
        assert!(page.contains_text("Rs. 472.00"));
        assert!(page.contains_text("GST 18%: taxable Rs. 400.00, tax Rs. 72.00"));
        assert!(page.contains_text("Method: UPI"));
        assert!(page.contains_text("Status: Paid"));
        assert!(page.contains_text(FOOTER_TEXT));
    }

    #[test]
    fn test_long_invoice_repeats_header_and_footer() {
        let pages = renderer().layout(&invoice(80));
        assert!(pages.len() >= 2);
        for page in &pages {
            assert!(page.contains_text("Subtotal"));
            assert!(page.contains_text(FOOTER_TEXT));
            assert!(page.texts.iter().all(|t| t.y >= MARGIN));
        }
        assert!(pages.last().unwrap().contains_text("Grand Total"));
    }

    #[test]
    fn test_long_names_are_truncated() {
        let width = 30.0;
        let fitted = fit(&"x".repeat(200), width, TABLE_FONT);
        assert!(fitted.ends_with("..."));
        assert!(text_width(&fitted, TABLE_FONT) <= width);
        assert_eq!(fit("Atta", width, TABLE_FONT), "Atta");
    }

    #[test]
    fn test_render_produces_pdf() {
        let bytes = renderer().render(&invoice(3)).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn test_render_to_writes_whole_document() {
        let mut sink: Vec<u8> = Vec::new();
        let written = renderer().render_to(invoice(1), &mut sink).await.unwrap();
        assert_eq!(written, sink.len());
        assert!(sink.starts_with(b"%PDF"));
    }
}
