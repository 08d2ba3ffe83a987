//! `accept-partial-return`: issue a partial credit note and send it.
//!
//! Fetch order, fetch original invoice and issue the credit note form a strict
//! chain; a failure in any of them fails the request before anything is sent.
//! Documents and email run afterwards and only report their outcome.

use askama::Template;
use chrono::Utc;
use orders_relay_core::{
    Email, Invoice, InvoiceId, InvoiceItem, Order, OrderId, format_amount,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::instrument;

use super::{Enrichment, Outcome, StepOutcome, notify, recipient};
use crate::error::{RelayError, Result};
use crate::services::documents::{DocumentKind, DocumentRenderer, FinancialDocument};
use crate::services::email::{Attachment, OutgoingEmail, PartialRefundEmail, RefundLineView};
use crate::state::AppState;
use crate::store::{CreditNoteReceipt, CreditNoteRequest};

/// Committed result of an accepted partial return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialRefundIssued {
    pub success: bool,
    pub order_id: OrderId,
    pub credit_note_number: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub refund_amount: Decimal,
}

/// Raw envelope fields; every field is checked before any store access.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartialReturnFields {
    order_id: Option<String>,
    admin_email: Option<String>,
    refund_amount: Option<Decimal>,
    returned_items: Option<Vec<InvoiceItem>>,
    reason: Option<String>,
}

/// A validated partial return request.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PartialReturn {
    order_id: OrderId,
    admin_email: Email,
    refund_amount: Decimal,
    returned_items: Vec<InvoiceItem>,
    reason: Option<String>,
}

impl PartialReturn {
    fn from_fields(fields: &Map<String, Value>) -> Result<Self> {
        let raw: PartialReturnFields = serde_json::from_value(Value::Object(fields.clone()))
            .map_err(|e| RelayError::BadRequest(format!("Invalid partial return payload: {e}")))?;

        let order_id = raw
            .order_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| RelayError::BadRequest("orderId is required".to_string()))?;
        let admin_email = raw
            .admin_email
            .ok_or_else(|| RelayError::BadRequest("adminEmail is required".to_string()))?;
        let admin_email = Email::parse(&admin_email)
            .map_err(|e| RelayError::BadRequest(format!("adminEmail is invalid: {e}")))?;
        let refund_amount = raw
            .refund_amount
            .ok_or_else(|| RelayError::BadRequest("refundAmount is required".to_string()))?;
        if refund_amount <= Decimal::ZERO {
            return Err(RelayError::BadRequest(
                "refundAmount must be greater than zero".to_string(),
            ));
        }
        let returned_items = raw
            .returned_items
            .filter(|items| !items.is_empty())
            .ok_or_else(|| RelayError::BadRequest("returnedItems must not be empty".to_string()))?;
        let lines = returned_items.iter().try_fold(Decimal::ZERO, |acc, item| {
            item.line_total().and_then(|total| acc.checked_add(total))
        });
        if lines.is_none() {
            return Err(RelayError::BadRequest(
                "returnedItems amounts are out of range".to_string(),
            ));
        }

        Ok(Self {
            order_id: OrderId::new(order_id),
            admin_email,
            refund_amount,
            returned_items,
            reason: raw
                .reason
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty()),
        })
    }
}

/// Accept part of a return and refund it through a credit note.
///
/// # Errors
///
/// - `BadRequest` for missing fields or when the order has no original invoice
/// - `NotFound` if the order does not exist
/// - `Upstream` if a store read or the credit-note procedure fails
#[instrument(skip(state, fields), fields(order_id = tracing::field::Empty))]
pub async fn accept_partial_return(
    state: &AppState,
    fields: &Map<String, Value>,
) -> Result<Outcome<PartialRefundIssued>> {
    let request = PartialReturn::from_fields(fields)?;
    tracing::Span::current().record("order_id", request.order_id.as_str());

    let order = state
        .store()
        .order(&request.order_id)
        .await?
        .ok_or_else(|| RelayError::NotFound("Order not found".to_string()))?;

    let original = state
        .store()
        .original_invoice(&order.id)
        .await?
        .ok_or_else(|| {
            RelayError::BadRequest(
                "cannot issue a credit note without an original invoice".to_string(),
            )
        })?;
    let original = derive_totals(original);

    let receipt = state
        .store()
        .create_partial_credit_note(&CreditNoteRequest {
            admin_email: request.admin_email.clone(),
            order_id: order.id.clone(),
            returned_items: request.returned_items.clone(),
            refund_amount: request.refund_amount,
        })
        .await?;
    tracing::info!(
        credit_note_number = %receipt.credit_note_number,
        refund_amount = %request.refund_amount,
        "Credit note issued"
    );

    // Committed. Nothing below may fail the request.
    let credit_note = load_credit_note(state, &receipt, &order, &request).await;
    let (attachments, documents) = render_documents(
        state.renderer(),
        &credit_note,
        &original,
        &order.order_number,
    );

    let address = order
        .customer_email
        .as_deref()
        .or(original.customer_email.as_deref());
    let email = match recipient(address) {
        Ok(to) => send_refund_email(state, to, &order, &receipt, &request, attachments).await,
        Err(skipped) => skipped,
    };

    Ok(Outcome {
        committed: PartialRefundIssued {
            success: true,
            order_id: order.id,
            credit_note_number: receipt.credit_note_number,
            refund_amount: request.refund_amount,
        },
        enrichment: Enrichment {
            email,
            documents: Some(documents),
        },
    })
}

/// The stored credit note, or a local approximation if it cannot be read back.
async fn load_credit_note(
    state: &AppState,
    receipt: &CreditNoteReceipt,
    order: &Order,
    request: &PartialReturn,
) -> Invoice {
    let fetched = match &receipt.credit_note_id {
        Some(id) => state.store().invoice(id).await,
        None => {
            state
                .store()
                .invoice_by_number(&receipt.credit_note_number)
                .await
        }
    };

    match fetched {
        Ok(Some(credit_note)) => match credit_note.with_derived_totals() {
            Ok(credit_note) => return credit_note,
            Err(e) => tracing::warn!(error = %e, "Stored credit note totals unusable, approximating"),
        },
        Ok(None) => tracing::warn!("Credit note not readable after issue, approximating"),
        Err(e) => tracing::warn!(error = %e, "Failed to re-fetch credit note, approximating"),
    }

    let approximation = Invoice {
        id: receipt
            .credit_note_id
            .clone()
            .unwrap_or_else(|| InvoiceId::new(receipt.credit_note_number.clone())),
        invoice_number: receipt.credit_note_number.clone(),
        order_id: order.id.clone(),
        customer_name: order.customer_name.clone(),
        customer_email: order.customer_email.clone(),
        items: request.returned_items.clone(),
        subtotal: Decimal::ZERO,
        iva_amount: Decimal::ZERO,
        shipping_cost: Decimal::ZERO,
        total: -request.refund_amount,
        created_at: Some(Utc::now()),
    };
    derive_totals(approximation)
}

/// The invoice with derived totals, or as stored if they do not fit.
fn derive_totals(invoice: Invoice) -> Invoice {
    invoice.clone().with_derived_totals().unwrap_or_else(|e| {
        tracing::warn!(error = %e, invoice = %invoice.invoice_number, "Keeping stored totals");
        invoice
    })
}

/// Render the credit note and the original invoice copy.
///
/// A document that fails to render becomes an empty attachment.
fn render_documents(
    renderer: &dyn DocumentRenderer,
    credit_note: &Invoice,
    original: &Invoice,
    order_number: &str,
) -> (Vec<Attachment>, StepOutcome) {
    let documents = [
        FinancialDocument {
            kind: DocumentKind::CreditNote,
            invoice: credit_note.clone(),
            related_number: original.invoice_number.clone(),
            order_number: order_number.to_string(),
        },
        FinancialDocument {
            kind: DocumentKind::OriginalInvoiceCopy,
            invoice: original.clone(),
            related_number: credit_note.invoice_number.clone(),
            order_number: order_number.to_string(),
        },
    ];

    let mut failures = Vec::new();
    let attachments: Vec<Attachment> = documents
        .iter()
        .map(|document| {
            let content = renderer.render(document).unwrap_or_else(|e| {
                tracing::warn!(
                    error = %e,
                    document = document.kind.title(),
                    "Document rendering failed"
                );
                failures.push(e.to_string());
                Vec::new()
            });
            Attachment {
                filename: document.kind.filename(&document.invoice.invoice_number),
                content,
            }
        })
        .collect();

    let outcome = if failures.is_empty() {
        StepOutcome::Completed
    } else {
        StepOutcome::Failed(failures.join("; "))
    };
    (attachments, outcome)
}

async fn send_refund_email(
    state: &AppState,
    to: Email,
    order: &Order,
    receipt: &CreditNoteReceipt,
    request: &PartialReturn,
    attachments: Vec<Attachment>,
) -> StepOutcome {
    let items: Vec<RefundLineView> = request
        .returned_items
        .iter()
        .map(|item| RefundLineView {
            product_name: item.product_name.clone(),
            size: item.size.clone().unwrap_or_else(|| "-".to_string()),
            quantity: item.quantity,
            total: item
                .line_total()
                .map_or_else(|| "-".to_string(), format_amount),
        })
        .collect();
    let refund_amount = format_amount(request.refund_amount);
    let attachments: Vec<Attachment> = attachments
        .into_iter()
        .filter(|a| !a.content.is_empty())
        .collect();

    let html = PartialRefundEmail {
        customer_name: order.display_name(),
        order_number: &order.order_number,
        credit_note_number: &receipt.credit_note_number,
        items: &items,
        refund_amount: &refund_amount,
        reason: request.reason.as_deref(),
        has_attachments: !attachments.is_empty(),
    }
    .render();
    let html = match html {
        Ok(html) => html,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to render refund email");
            return StepOutcome::Failed(e.to_string());
        }
    };

    let message = OutgoingEmail {
        to: vec![to],
        subject: format!("Reembolso parcial - Pedido {}", order.order_number),
        html,
        attachments,
    };
    notify(state.mailer(), &message).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn fields(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn valid() -> Value {
        json!({
            "orderId": "ord-1",
            "adminEmail": "admin@shop.example",
            "refundAmount": 24.2,
            "returnedItems": [
                {"product_name": "Camisa lino", "size": "M", "quantity": 1, "price": 24.2}
            ],
            "reason": "  talla incorrecta "
        })
    }

    #[test]
    fn test_parses_valid_request() {
        let request = PartialReturn::from_fields(&fields(valid())).unwrap();
        assert_eq!(request.order_id.as_str(), "ord-1");
        assert_eq!(request.refund_amount, Decimal::new(242, 1));
        assert_eq!(request.returned_items.len(), 1);
        assert_eq!(request.reason.as_deref(), Some("talla incorrecta"));
    }

    #[test]
    fn test_accepts_camel_case_item_names_and_string_amounts() {
        let mut value = valid();
        value["refundAmount"] = json!("10.50");
        value["returnedItems"] = json!([{"productName": "Falda", "quantity": 2, "price": "5.25"}]);
        let request = PartialReturn::from_fields(&fields(value)).unwrap();
        assert_eq!(request.refund_amount, Decimal::new(1050, 2));
        assert_eq!(request.returned_items[0].product_name, "Falda");
    }

    #[test]
    fn test_rejects_missing_fields() {
        for key in ["orderId", "adminEmail", "refundAmount", "returnedItems"] {
            let mut value = valid();
            value.as_object_mut().unwrap().remove(key);
            let err = PartialReturn::from_fields(&fields(value)).unwrap_err();
            assert!(
                matches!(err, RelayError::BadRequest(_)),
                "missing {key} should be a bad request"
            );
        }
    }

    #[test]
    fn test_rejects_line_totals_out_of_range() {
        let mut value = valid();
        value["returnedItems"] = json!([
            {"productName": "Abrigo", "quantity": 4_000_000_000_u32, "price": "70000000000000000000000000000"}
        ]);
        let err = PartialReturn::from_fields(&fields(value)).unwrap_err();
        assert!(matches!(err, RelayError::BadRequest(_)));

        let mut value = valid();
        value["returnedItems"] = json!([
            {"productName": "Abrigo", "quantity": 1, "price": "70000000000000000000000000000"},
            {"productName": "Abrigo", "quantity": 1, "price": "70000000000000000000000000000"}
        ]);
        assert!(PartialReturn::from_fields(&fields(value)).is_err());
    }

    #[test]
    fn test_rejects_non_positive_refund_and_empty_items() {
        let mut value = valid();
        value["refundAmount"] = json!(0);
        assert!(PartialReturn::from_fields(&fields(value)).is_err());

        let mut value = valid();
        value["returnedItems"] = json!([]);
        assert!(PartialReturn::from_fields(&fields(value)).is_err());

        let mut value = valid();
        value["adminEmail"] = json!("nobody");
        assert!(PartialReturn::from_fields(&fields(value)).is_err());
    }
}
