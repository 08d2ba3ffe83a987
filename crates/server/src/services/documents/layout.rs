//! Page layout for invoices and credit notes.
//!
//! Pure and deterministic: the same [`FinancialDocument`] always yields the
//! same [`PageLayout`]. Coordinates are millimetres from the bottom-left
//! corner of an A4 portrait page, as PDF expects.

use orders_relay_core::{InvoiceItem, format_amount};
use rust_decimal::Decimal;

use super::{DocumentKind, FinancialDocument};

/// A4 portrait width.
pub const PAGE_WIDTH_MM: f32 = 210.0;
/// A4 portrait height.
pub const PAGE_HEIGHT_MM: f32 = 297.0;
/// Maximum characters of a product name in the item table.
pub const PRODUCT_NAME_BUDGET: usize = 40;

const MARGIN_MM: f32 = 20.0;
const ROW_HEIGHT_MM: f32 = 7.0;
const TABLE_TOP_MM: f32 = 190.0;
const TOTALS_TOP_MM: f32 = 70.0;
const MAX_ROWS: usize = 15;

// Item table column x positions.
const COL_PRODUCT: f32 = MARGIN_MM;
const COL_SIZE: f32 = 110.0;
const COL_QTY: f32 = 130.0;
const COL_PRICE: f32 = 148.0;
const COL_TOTAL: f32 = 172.0;
const TOTALS_LABEL_X: f32 = 120.0;

/// Font face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

/// Ink colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Normal,
    Muted,
    /// Used only on credit notes.
    Refund,
}

/// A single drawing instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutOp {
    Text {
        x: f32,
        y: f32,
        size: f32,
        font: Font,
        tone: Tone,
        text: String,
    },
    Rule {
        from: (f32, f32),
        to: (f32, f32),
        thickness: f32,
    },
}

/// Everything needed to draw one page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    pub title: String,
    pub ops: Vec<LayoutOp>,
}

impl PageLayout {
    /// All text on the page, top to bottom, for inspection.
    #[must_use]
    pub fn texts(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                LayoutOp::Text { text, .. } => Some(text.as_str()),
                LayoutOp::Rule { .. } => None,
            })
            .collect()
    }
}

struct Builder {
    ops: Vec<LayoutOp>,
}

impl Builder {
    fn text(&mut self, x: f32, y: f32, size: f32, font: Font, tone: Tone, text: impl Into<String>) {
        self.ops.push(LayoutOp::Text {
            x,
            y,
            size,
            font,
            tone,
            text: text.into(),
        });
    }

    fn rule(&mut self, y: f32, thickness: f32) {
        self.ops.push(LayoutOp::Rule {
            from: (MARGIN_MM, y),
            to: (PAGE_WIDTH_MM - MARGIN_MM, y),
            thickness,
        });
    }
}

/// Lay out a financial document on a single A4 page.
#[must_use]
pub fn layout(document: &FinancialDocument) -> PageLayout {
    let invoice = &document.invoice;
    let credit = matches!(document.kind, DocumentKind::CreditNote);
    let accent = if credit { Tone::Refund } else { Tone::Normal };
    let mut page = Builder { ops: Vec::new() };

    // Header
    let title = document.kind.title();
    page.text(MARGIN_MM, 270.0, 20.0, Font::Bold, accent, title);
    page.rule(265.0, if credit { 1.5 } else { 0.5 });

    let reference_label = match document.kind {
        DocumentKind::CreditNote => "Factura original",
        DocumentKind::OriginalInvoiceCopy => "Nota de crédito asociada",
    };
    let date = invoice
        .created_at
        .map_or_else(|| "-".to_string(), |at| at.format("%d/%m/%Y").to_string());

    let details = [
        ("Nº documento", invoice.invoice_number.clone()),
        (reference_label, document.related_number.clone()),
        ("Pedido", document.order_number.clone()),
        ("Fecha", date),
    ];
    let mut y = 255.0;
    for (label, value) in details {
        page.text(MARGIN_MM, y, 10.0, Font::Bold, Tone::Normal, format!("{label}:"));
        page.text(65.0, y, 10.0, Font::Regular, Tone::Normal, value);
        y -= 6.0;
    }

    page.text(120.0, 255.0, 10.0, Font::Bold, Tone::Normal, "Cliente");
    page.text(
        120.0,
        249.0,
        10.0,
        Font::Regular,
        Tone::Normal,
        invoice.customer_name.as_deref().unwrap_or("-"),
    );
    page.text(
        120.0,
        243.0,
        10.0,
        Font::Regular,
        Tone::Muted,
        invoice.customer_email.as_deref().unwrap_or("-"),
    );

    // Item table
    let header_y = TABLE_TOP_MM + ROW_HEIGHT_MM;
    for (x, label) in [
        (COL_PRODUCT, "Producto"),
        (COL_SIZE, "Talla"),
        (COL_QTY, "Cant."),
        (COL_PRICE, "Precio"),
        (COL_TOTAL, "Total"),
    ] {
        page.text(x, header_y, 10.0, Font::Bold, Tone::Normal, label);
    }
    page.rule(header_y - 2.5, 0.5);

    let mut row_y = TABLE_TOP_MM;
    for item in invoice.items.iter().take(MAX_ROWS) {
        item_row(&mut page, item, row_y);
        row_y -= ROW_HEIGHT_MM;
    }
    if invoice.items.len() > MAX_ROWS {
        let hidden = invoice.items.len() - MAX_ROWS;
        page.text(
            COL_PRODUCT,
            row_y,
            9.0,
            Font::Regular,
            Tone::Muted,
            format!("... y {hidden} artículo(s) más"),
        );
    }

    // Totals
    page.rule(TOTALS_TOP_MM + 6.0, 0.5);
    let sign = |amount: Decimal| if credit { -amount.abs() } else { amount };
    let totals = [
        ("Subtotal", sign(invoice.subtotal)),
        ("IVA (21%)", sign(invoice.iva_amount)),
        ("Envío", sign(invoice.shipping_cost)),
    ];
    let mut y = TOTALS_TOP_MM;
    for (label, amount) in totals {
        page.text(TOTALS_LABEL_X, y, 10.0, Font::Regular, Tone::Normal, label);
        page.text(COL_TOTAL, y, 10.0, Font::Regular, Tone::Normal, format_amount(amount));
        y -= 6.0;
    }
    let grand_label = if credit { "TOTAL A REEMBOLSAR" } else { "TOTAL" };
    page.text(TOTALS_LABEL_X, y - 2.0, 12.0, Font::Bold, accent, grand_label);
    page.text(
        COL_TOTAL,
        y - 2.0,
        12.0,
        Font::Bold,
        accent,
        format_amount(sign(invoice.total)),
    );

    if matches!(document.kind, DocumentKind::OriginalInvoiceCopy) {
        page.text(
            MARGIN_MM,
            25.0,
            8.0,
            Font::Regular,
            Tone::Muted,
            "Copia de la factura original emitida para este pedido.",
        );
    }

    PageLayout {
        title: format!("{title} {}", invoice.invoice_number),
        ops: page.ops,
    }
}

fn item_row(page: &mut Builder, item: &InvoiceItem, y: f32) {
    page.text(
        COL_PRODUCT,
        y,
        9.0,
        Font::Regular,
        Tone::Normal,
        truncate(&item.product_name, PRODUCT_NAME_BUDGET),
    );
    page.text(
        COL_SIZE,
        y,
        9.0,
        Font::Regular,
        Tone::Normal,
        item.size.as_deref().unwrap_or("-"),
    );
    page.text(COL_QTY, y, 9.0, Font::Regular, Tone::Normal, item.quantity.to_string());
    page.text(COL_PRICE, y, 9.0, Font::Regular, Tone::Normal, format_amount(item.price));
    page.text(
        COL_TOTAL,
        y,
        9.0,
        Font::Regular,
        Tone::Normal,
        item.line_total().map_or_else(|| "-".to_string(), format_amount),
    );
}

/// Cut `text` to at most `budget` characters, marking the cut with `...`.
#[must_use]
pub fn truncate(text: &str, budget: usize) -> String {
    if text.chars().count() <= budget {
        return text.to_string();
    }
    let kept: String = text.chars().take(budget.saturating_sub(3)).collect();
    format!("{kept}...")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use orders_relay_core::{Invoice, InvoiceId, OrderId};

    use super::*;

    fn document(kind: DocumentKind, items: usize) -> FinancialDocument {
        let item = InvoiceItem {
            product_name: "Chaqueta de punto con botones de nácar y bolsillos laterales".to_string(),
            size: Some("L".to_string()),
            quantity: 2,
            price: Decimal::new(2995, 2),
            total: Decimal::ZERO,
        };
        FinancialDocument {
            kind,
            invoice: Invoice {
                id: InvoiceId::new("cn-1"),
                invoice_number: "NC-2026-0001".to_string(),
                order_id: OrderId::new("ord-1"),
                customer_name: Some("Ana Ruiz".to_string()),
                customer_email: Some("ana@example.com".to_string()),
                items: vec![item; items],
                subtotal: Decimal::new(4950, 2),
                iva_amount: Decimal::new(1040, 2),
                shipping_cost: Decimal::ZERO,
                total: Decimal::new(5990, 2),
                created_at: None,
            },
            related_number: "F-2026-0100".to_string(),
            order_number: "FS-0042".to_string(),
        }
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Camisa", 40), "Camisa");
        let long = "a".repeat(41);
        let cut = truncate(&long, 40);
        assert_eq!(cut.chars().count(), 40);
        assert!(cut.ends_with("..."));
        assert_eq!(truncate("ñññññ", 4), "ñ...");
    }

    #[test]
    fn test_credit_note_is_framed_as_refund() {
        let page = layout(&document(DocumentKind::CreditNote, 1));
        let texts = page.texts();

        assert_eq!(texts[0], "NOTA DE CRÉDITO");
        assert!(texts.contains(&"TOTAL A REEMBOLSAR"));
        assert!(texts.contains(&"-59.90 €"));
        assert!(texts.contains(&"F-2026-0100"));
        assert!(texts.contains(&"FS-0042"));
    }

    #[test]
    fn test_original_copy_totals_are_positive() {
        let page = layout(&document(DocumentKind::OriginalInvoiceCopy, 1));
        let texts = page.texts();

        assert_eq!(texts[0], "COPIA DE FACTURA ORIGINAL");
        assert!(texts.contains(&"TOTAL"));
        assert!(texts.contains(&"59.90 €"));
        assert!(!texts.iter().any(|t| t.starts_with('-') && t.ends_with('€')));
    }

    #[test]
    fn test_item_row_formatting() {
        let page = layout(&document(DocumentKind::CreditNote, 1));
        let texts = page.texts();

        assert!(texts.contains(&"Chaqueta de punto con botones de náca..."));
        assert!(texts.contains(&"29.95 €"));
        assert!(texts.contains(&"59.90 €"));
        assert!(texts.contains(&"L"));
    }

    #[test]
    fn test_overflowing_items_are_summarized() {
        let page = layout(&document(DocumentKind::CreditNote, MAX_ROWS + 3));
        assert!(page.texts().contains(&"... y 3 artículo(s) más"));
    }

    #[test]
    fn test_layout_is_deterministic() {
        let doc = document(DocumentKind::CreditNote, 4);
        assert_eq!(layout(&doc), layout(&doc));
    }
}
