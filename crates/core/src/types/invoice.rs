//! Invoice and credit-note records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{InvoiceId, OrderId, split_vat};

/// Reserved invoice-number prefix marking a credit note.
pub const CREDIT_NOTE_PREFIX: &str = "NC-";

/// A derived amount does not fit in a `Decimal`.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("invoice amount out of range")]
pub struct AmountOverflow;

/// One line of an invoice or credit note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceItem {
    #[serde(alias = "productName")]
    pub product_name: String,
    #[serde(default)]
    pub size: Option<String>,
    pub quantity: u32,
    /// Unit price, VAT included.
    pub price: Decimal,
    /// Line total, VAT included.
    #[serde(default)]
    pub total: Decimal,
}

impl InvoiceItem {
    /// The line total, derived from price and quantity when the stored value is zero.
    ///
    /// `None` if price times quantity overflows.
    #[must_use]
    pub fn line_total(&self) -> Option<Decimal> {
        if self.total.is_zero() {
            self.price.checked_mul(Decimal::from(self.quantity))
        } else {
            Some(self.total)
        }
    }
}

/// An invoice or credit note row, owned by the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub invoice_number: String,
    pub order_id: OrderId,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub items: Vec<InvoiceItem>,
    #[serde(default)]
    pub subtotal: Decimal,
    #[serde(default)]
    pub iva_amount: Decimal,
    #[serde(default)]
    pub shipping_cost: Decimal,
    #[serde(default)]
    pub total: Decimal,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Invoice {
    /// Whether the invoice number carries the credit-note prefix.
    #[must_use]
    pub fn is_credit_note(&self) -> bool {
        is_credit_note_number(&self.invoice_number)
    }

    /// Fill in totals the store left empty.
    ///
    /// Missing line totals come from price times quantity, a missing grand
    /// total from the lines plus shipping, and a missing subtotal/VAT split
    /// from the grand total. Values the store did provide are kept.
    ///
    /// # Errors
    ///
    /// Returns `AmountOverflow` if a line or the grand total does not fit.
    pub fn with_derived_totals(mut self) -> Result<Self, AmountOverflow> {
        for item in &mut self.items {
            item.total = item.line_total().ok_or(AmountOverflow)?;
        }

        if self.total.is_zero() && !self.items.is_empty() {
            let total = self
                .items
                .iter()
                .try_fold(self.shipping_cost, |acc, item| acc.checked_add(item.total))
                .ok_or(AmountOverflow)?;
            self.total = if self.is_credit_note() {
                -total.abs()
            } else {
                total
            };
        }

        if self.subtotal.is_zero() && self.iva_amount.is_zero() {
            let (subtotal, vat) = split_vat(self.total);
            self.subtotal = subtotal;
            self.iva_amount = vat;
        }

        Ok(self)
    }
}

/// Whether an invoice number carries the credit-note prefix.
#[must_use]
pub fn is_credit_note_number(number: &str) -> bool {
    number.starts_with(CREDIT_NOTE_PREFIX)
}
