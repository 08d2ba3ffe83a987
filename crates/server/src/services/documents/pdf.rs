//! `printpdf` renderer for [`PageLayout`](super::layout::PageLayout)s.

use printpdf::{BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, Point, Rgb};

use super::layout::{Font, LayoutOp, PAGE_HEIGHT_MM, PAGE_WIDTH_MM, Tone, layout};
use super::{DocumentError, DocumentRenderer, FinancialDocument};

/// Renders documents as single-page A4 PDFs with the built-in Helvetica faces.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfRenderer;

fn ink(tone: Tone) -> Color {
    let (r, g, b) = match tone {
        Tone::Normal => (0.0, 0.0, 0.0),
        Tone::Muted => (0.45, 0.45, 0.45),
        Tone::Refund => (0.7, 0.0, 0.1),
    };
    Color::Rgb(Rgb::new(r, g, b, None))
}

fn render_error(err: &printpdf::Error) -> DocumentError {
    DocumentError::Render(format!("{err:?}"))
}

impl DocumentRenderer for PdfRenderer {
    fn render(&self, document: &FinancialDocument) -> Result<Vec<u8>, DocumentError> {
        let page = layout(document);
        let (pdf, page_index, layer_index) = PdfDocument::new(
            page.title.as_str(),
            Mm(PAGE_WIDTH_MM),
            Mm(PAGE_HEIGHT_MM),
            "contenido",
        );
        let regular: IndirectFontRef = pdf
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| render_error(&e))?;
        let bold: IndirectFontRef = pdf
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| render_error(&e))?;
        let layer = pdf.get_page(page_index).get_layer(layer_index);

        for op in &page.ops {
            match op {
                LayoutOp::Text {
                    x,
                    y,
                    size,
                    font,
                    tone,
                    text,
                } => {
                    let face = match font {
                        Font::Regular => &regular,
                        Font::Bold => &bold,
                    };
                    layer.set_fill_color(ink(*tone));
                    layer.use_text(text.as_str(), *size, Mm(*x), Mm(*y), face);
                }
                LayoutOp::Rule {
                    from,
                    to,
                    thickness,
                } => {
                    layer.set_outline_color(ink(Tone::Normal));
                    layer.set_outline_thickness(*thickness);
                    layer.add_line(Line {
                        points: vec![
                            (Point::new(Mm(from.0), Mm(from.1)), false),
                            (Point::new(Mm(to.0), Mm(to.1)), false),
                        ],
                        is_closed: false,
                    });
                }
            }
        }

        pdf.save_to_bytes().map_err(|e| render_error(&e))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use orders_relay_core::{Invoice, InvoiceId, OrderId};
    use rust_decimal::Decimal;

    use super::super::DocumentKind;
    use super::*;

    #[test]
    fn test_renders_pdf_bytes() {
        let document = FinancialDocument {
            kind: DocumentKind::OriginalInvoiceCopy,
            invoice: Invoice {
                id: InvoiceId::new("inv-1"),
                invoice_number: "F-2026-0100".to_string(),
                order_id: OrderId::new("ord-1"),
                customer_name: Some("Ana".to_string()),
                customer_email: None,
                items: vec![],
                subtotal: Decimal::ZERO,
                iva_amount: Decimal::ZERO,
                shipping_cost: Decimal::ZERO,
                total: Decimal::ZERO,
                created_at: None,
            },
            related_number: "NC-2026-0001".to_string(),
            order_number: "FS-0042".to_string(),
        };

        let bytes = PdfRenderer.render(&document).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
