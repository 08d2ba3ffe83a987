//! `reject-return`: mark a return request as rejected and tell the customer.

use askama::Template;
use orders_relay_core::{OrderId, OrderStatus};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::instrument;

use super::{Enrichment, Outcome, StepOutcome, notify, optional_str, recipient, required_str};
use crate::error::{RelayError, Result};
use crate::services::email::{OutgoingEmail, ReturnRejectedEmail};
use crate::state::AppState;

/// Committed result of a rejected return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnRejected {
    pub success: bool,
    pub order_id: OrderId,
    pub status: OrderStatus,
}

/// Reject a customer's return request.
///
/// # Errors
///
/// - `BadRequest` if `orderId` is missing
/// - `NotFound` if the order does not exist
/// - `Upstream` if the status update fails
#[instrument(skip(state, fields), fields(order_id = tracing::field::Empty))]
pub async fn reject_return(
    state: &AppState,
    fields: &Map<String, Value>,
) -> Result<Outcome<ReturnRejected>> {
    let order_id = OrderId::new(required_str(fields, "orderId")?);
    let reason = optional_str(fields, "reason");
    tracing::Span::current().record("order_id", order_id.as_str());

    let order = state
        .store()
        .order(&order_id)
        .await?
        .ok_or_else(|| RelayError::NotFound("Order not found".to_string()))?;

    let updated = state
        .store()
        .update_order_status(&order, OrderStatus::ReturnRejected)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to reject return");
            RelayError::from(e)
        })?;
    tracing::info!(order_number = %updated.order_number, "Return rejected");

    let email = match recipient(updated.customer_email.as_deref()) {
        Ok(to) => {
            let html = ReturnRejectedEmail {
                customer_name: updated.display_name(),
                order_number: &updated.order_number,
                reason,
            }
            .render();
            match html {
                Ok(html) => {
                    let message = OutgoingEmail {
                        to: vec![to],
                        subject: format!(
                            "Solicitud de devolución rechazada - Pedido {}",
                            updated.order_number
                        ),
                        html,
                        attachments: Vec::new(),
                    };
                    notify(state.mailer(), &message).await
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to render rejection email");
                    StepOutcome::Failed(e.to_string())
                }
            }
        }
        Err(skipped) => skipped,
    };

    Ok(Outcome {
        committed: ReturnRejected {
            success: true,
            order_id: updated.id,
            status: updated.status,
        },
        enrichment: Enrichment {
            email,
            documents: None,
        },
    })
}
