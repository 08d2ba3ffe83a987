//! Record store gateway.
//!
//! The record store owns orders, invoices and credit notes. The relay reads
//! rows fresh on every request, performs at most one conditional write per
//! request, and delegates credit-note issuance to an atomic remote procedure
//! whose numbering it trusts without re-validating.
//!
//! [`RecordStore`] is the seam the direct action handlers depend on;
//! [`RestStore`] implements it against a PostgREST-style HTTP gateway.

mod rest;

pub use rest::RestStore;

use async_trait::async_trait;
use orders_relay_core::{Email, Invoice, InvoiceId, InvoiceItem, Order, OrderId, OrderStatus};
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur when talking to the record store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// HTTP request failed.
    #[error("Record store request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered with a non-success status.
    #[error("Record store error: {status} - {message}")]
    Api { status: u16, message: String },

    /// A conditional update matched no row.
    #[error("Record store conflict: {0}")]
    Conflict(String),

    /// The response did not have the expected shape.
    #[error("Record store response could not be parsed: {0}")]
    Parse(String),
}

/// Input to the credit-note issuing procedure.
#[derive(Debug, Clone)]
pub struct CreditNoteRequest {
    /// Admin identity recorded on the credit note.
    pub admin_email: Email,
    pub order_id: OrderId,
    pub returned_items: Vec<InvoiceItem>,
    /// Positive refund amount.
    pub refund_amount: Decimal,
}

/// What the credit-note procedure reports back.
///
/// The number is always present; the id may be missing when the procedure
/// returns a partial result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditNoteReceipt {
    pub credit_note_number: String,
    pub credit_note_id: Option<InvoiceId>,
}

/// Typed access to the external record store.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Point read of an order by primary key.
    async fn order(&self, id: &OrderId) -> Result<Option<Order>, StoreError>;

    /// Set an order's status, conditional on the row not having changed since
    /// `order` was read.
    async fn update_order_status(
        &self,
        order: &Order,
        status: OrderStatus,
    ) -> Result<Order, StoreError>;

    /// The earliest invoice for the order whose number is not a credit note.
    async fn original_invoice(&self, order_id: &OrderId) -> Result<Option<Invoice>, StoreError>;

    /// Point read of an invoice or credit note by primary key.
    async fn invoice(&self, id: &InvoiceId) -> Result<Option<Invoice>, StoreError>;

    /// Point read of an invoice or credit note by its number.
    async fn invoice_by_number(&self, number: &str) -> Result<Option<Invoice>, StoreError>;

    /// Atomically create a partial credit note for an order.
    async fn create_partial_credit_note(
        &self,
        request: &CreditNoteRequest,
    ) -> Result<CreditNoteReceipt, StoreError>;
}
