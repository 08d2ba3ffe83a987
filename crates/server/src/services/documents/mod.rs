//! Financial document generation.
//!
//! A document is laid out by the pure [`layout`](layout::layout) stage and
//! drawn by a [`DocumentRenderer`]. Handlers only see the renderer trait, so a
//! rendering failure can be substituted in tests.

pub mod layout;
mod pdf;

pub use pdf::PdfRenderer;

use orders_relay_core::Invoice;
use thiserror::Error;

/// Which document is being produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// A credit note reversing part of an invoice.
    CreditNote,
    /// A copy of the invoice a credit note refers to.
    OriginalInvoiceCopy,
}

impl DocumentKind {
    /// Title printed at the top of the page.
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::CreditNote => "NOTA DE CRÉDITO",
            Self::OriginalInvoiceCopy => "COPIA DE FACTURA ORIGINAL",
        }
    }

    /// Attachment file name for a document number.
    #[must_use]
    pub fn filename(&self, number: &str) -> String {
        match self {
            Self::CreditNote => format!("nota-credito-{number}.pdf"),
            Self::OriginalInvoiceCopy => format!("factura-{number}.pdf"),
        }
    }
}

/// Input to the document generator.
#[derive(Debug, Clone)]
pub struct FinancialDocument {
    pub kind: DocumentKind,
    pub invoice: Invoice,
    /// Number of the document this one cross-references.
    pub related_number: String,
    pub order_number: String,
}

/// Errors that can occur while rendering.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("PDF rendering failed: {0}")]
    Render(String),
}

/// Turns a financial document into file bytes.
pub trait DocumentRenderer: Send + Sync {
    /// Render the document.
    ///
    /// # Errors
    ///
    /// Returns `DocumentError` if the document cannot be produced.
    fn render(&self, document: &FinancialDocument) -> Result<Vec<u8>, DocumentError>;
}
