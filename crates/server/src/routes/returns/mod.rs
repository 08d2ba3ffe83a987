//! Direct action handlers for return workflows.
//!
//! Both handlers split their work in two phases. The authoritative write
//! (status change or credit-note issuance) either succeeds or fails the whole
//! request. Everything after it (documents, customer email) is enrichment:
//! its outcome is reported next to the committed result and never turns a
//! committed request into an error.

mod partial;
mod reject;

pub use partial::{PartialRefundIssued, accept_partial_return};
pub use reject::{ReturnRejected, reject_return};

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use orders_relay_core::Email;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{RelayError, Result};
use crate::services::email::{Mailer, OutgoingEmail};

/// Result of one best-effort step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum StepOutcome {
    Completed,
    Skipped(String),
    Failed(String),
}

/// Outcome of the steps that run after the commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Enrichment {
    pub email: StepOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents: Option<StepOutcome>,
}

/// A committed result paired with its enrichment outcome.
///
/// Always rendered as `200 OK`; the committed fields are flattened into the
/// top-level JSON object.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome<C> {
    #[serde(flatten)]
    pub committed: C,
    pub enrichment: Enrichment,
}

impl<C: Serialize> IntoResponse for Outcome<C> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// A non-blank string field.
fn required_str<'a>(fields: &'a Map<String, Value>, key: &str) -> Result<&'a str> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| RelayError::BadRequest(format!("{key} is required")))
}

/// An optional, non-blank string field.
fn optional_str<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// The customer address to notify, or why there is none.
fn recipient(address: Option<&str>) -> std::result::Result<Email, StepOutcome> {
    let Some(address) = address else {
        return Err(StepOutcome::Skipped(
            "order has no customer email".to_string(),
        ));
    };
    Email::parse(address)
        .map_err(|e| StepOutcome::Skipped(format!("invalid customer email: {e}")))
}

/// Send one email, folding every failure into the outcome.
async fn notify(mailer: &dyn Mailer, email: &OutgoingEmail) -> StepOutcome {
    match mailer.send(email).await {
        Ok(response) if response.is_success() => {
            tracing::info!(
                attachments = email.attachments.len(),
                "Customer notification sent"
            );
            StepOutcome::Completed
        }
        Ok(response) => {
            tracing::warn!(
                status = response.status,
                body = %response.body,
                "Email provider rejected notification"
            );
            StepOutcome::Failed(format!("email provider returned {}", response.status))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to send customer notification");
            StepOutcome::Failed(e.to_string())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[derive(Serialize)]
    struct Committed {
        success: bool,
    }

    #[test]
    fn test_outcome_flattens_committed_fields() {
        let outcome = Outcome {
            committed: Committed { success: true },
            enrichment: Enrichment {
                email: StepOutcome::Failed("email provider returned 500".to_string()),
                documents: None,
            },
        };
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({
                "success": true,
                "enrichment": {
                    "email": {"outcome": "failed", "detail": "email provider returned 500"}
                }
            })
        );
    }

    #[test]
    fn test_required_str() {
        let fields = json!({"orderId": " o-1 ", "blank": "  ", "num": 3})
            .as_object()
            .cloned()
            .unwrap();
        assert_eq!(required_str(&fields, "orderId").unwrap(), "o-1");
        assert!(required_str(&fields, "blank").is_err());
        assert!(required_str(&fields, "num").is_err());
        assert!(required_str(&fields, "missing").is_err());
        assert_eq!(optional_str(&fields, "blank"), None);
    }

    #[test]
    fn test_recipient() {
        assert!(recipient(Some("ana@example.com")).is_ok());
        assert!(matches!(recipient(None), Err(StepOutcome::Skipped(_))));
        assert!(matches!(
            recipient(Some("not-an-address")),
            Err(StepOutcome::Skipped(_))
        ));
    }
}
