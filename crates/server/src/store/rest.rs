//! PostgREST-style HTTP implementation of [`RecordStore`].

use async_trait::async_trait;
use orders_relay_core::{
    CREDIT_NOTE_PREFIX, Invoice, InvoiceId, InvoiceItem, Order, OrderId, OrderStatus,
};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::instrument;
use url::Url;

use super::{CreditNoteReceipt, CreditNoteRequest, RecordStore, StoreError};
use crate::config::StoreConfig;

const ORDERS: &str = "orders";
const INVOICES: &str = "invoices";
const CREDIT_NOTE_RPC: &str = "create_partial_credit_note";

/// Record store client speaking the PostgREST dialect.
#[derive(Clone)]
pub struct RestStore {
    client: reqwest::Client,
    base_url: Url,
}

/// Wire shape of the credit-note procedure arguments.
#[derive(Serialize)]
struct CreditNoteArgs<'a> {
    p_admin_email: &'a str,
    p_order_id: &'a str,
    p_returned_items: &'a [InvoiceItem],
    #[serde(with = "rust_decimal::serde::float")]
    p_refund_amount: Decimal,
}

impl RestStore {
    /// Create a new record store client.
    ///
    /// # Errors
    ///
    /// Returns error if the service key is not a valid header value or the
    /// HTTP client fails to build.
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let key = config.service_key.expose_secret();
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(key)
                .map_err(|e| StoreError::Parse(format!("Invalid service key format: {e}")))?,
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| StoreError::Parse(format!("Invalid service key format: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.clone(),
        })
    }

    /// Build `{base}/rest/v1/{resource}` with the given query filters.
    fn endpoint(&self, resource: &str, filters: &[(&str, String)]) -> Result<Url, StoreError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let mut url = Url::parse(&format!("{base}/rest/v1/{resource}"))
            .map_err(|e| StoreError::Parse(format!("Invalid store URL: {e}")))?;
        if !filters.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in filters {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// GET a table query and return the first row, if any.
    async fn first_row<T: DeserializeOwned>(&self, url: Url) -> Result<Option<T>, StoreError> {
        let response = self.client.get(url).send().await?;
        let rows: Vec<T> = read_json(response).await?;
        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl RecordStore for RestStore {
    #[instrument(skip(self), fields(order_id = %id))]
    async fn order(&self, id: &OrderId) -> Result<Option<Order>, StoreError> {
        let url = self.endpoint(
            ORDERS,
            &[("id", format!("eq.{id}")), ("select", "*".to_string())],
        )?;
        self.first_row(url).await
    }

    #[instrument(skip(self, order, status), fields(order_id = %order.id, status = %status))]
    async fn update_order_status(
        &self,
        order: &Order,
        status: OrderStatus,
    ) -> Result<Order, StoreError> {
        let mut filters = vec![("id", format!("eq.{}", order.id))];
        if let Some(seen) = order.updated_at {
            filters.push((
                "updated_at",
                format!(
                    "eq.{}",
                    seen.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true)
                ),
            ));
        }
        let url = self.endpoint(ORDERS, &filters)?;

        let response = self
            .client
            .patch(url)
            .header("Prefer", "return=representation")
            .json(&serde_json::json!({
                "status": status,
                "updated_at": chrono::Utc::now(),
            }))
            .send()
            .await?;

        let rows: Vec<Order> = read_json(response).await?;
        rows.into_iter().next().ok_or_else(|| {
            StoreError::Conflict(format!("order {} changed before it could be updated", order.id))
        })
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    async fn original_invoice(&self, order_id: &OrderId) -> Result<Option<Invoice>, StoreError> {
        let url = self.endpoint(
            INVOICES,
            &[
                ("order_id", format!("eq.{order_id}")),
                ("invoice_number", format!("not.like.{CREDIT_NOTE_PREFIX}*")),
                ("order", "created_at.asc".to_string()),
                ("limit", "1".to_string()),
            ],
        )?;
        self.first_row(url).await
    }

    #[instrument(skip(self), fields(invoice_id = %id))]
    async fn invoice(&self, id: &InvoiceId) -> Result<Option<Invoice>, StoreError> {
        let url = self.endpoint(INVOICES, &[("id", format!("eq.{id}"))])?;
        self.first_row(url).await
    }

    #[instrument(skip(self))]
    async fn invoice_by_number(&self, number: &str) -> Result<Option<Invoice>, StoreError> {
        let url = self.endpoint(INVOICES, &[("invoice_number", format!("eq.{number}"))])?;
        self.first_row(url).await
    }

    #[instrument(skip(self, request), fields(order_id = %request.order_id))]
    async fn create_partial_credit_note(
        &self,
        request: &CreditNoteRequest,
    ) -> Result<CreditNoteReceipt, StoreError> {
        let url = self.endpoint(&format!("rpc/{CREDIT_NOTE_RPC}"), &[])?;
        let args = CreditNoteArgs {
            p_admin_email: request.admin_email.as_str(),
            p_order_id: request.order_id.as_str(),
            p_returned_items: &request.returned_items,
            p_refund_amount: request.refund_amount,
        };

        let response = self.client.post(url).json(&args).send().await?;
        let value: Value = read_json(response).await?;
        parse_receipt(value)
    }
}

/// Read a JSON body, turning non-success statuses into [`StoreError::Api`].
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, StoreError> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(StoreError::Api {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json()
        .await
        .map_err(|e| StoreError::Parse(e.to_string()))
}

/// Extract the receipt from an RPC result, which may be a row or a one-row set.
fn parse_receipt(value: Value) -> Result<CreditNoteReceipt, StoreError> {
    let row = match value {
        Value::Array(rows) => rows.into_iter().next().unwrap_or(Value::Null),
        other => other,
    };

    let credit_note_number = row
        .get("credit_note_number")
        .and_then(Value::as_str)
        .filter(|number| !number.is_empty())
        .ok_or_else(|| StoreError::Parse("credit note procedure returned no number".to_string()))?
        .to_string();

    let credit_note_id = row.get("credit_note_id").and_then(|id| match id {
        Value::String(s) if !s.is_empty() => Some(InvoiceId::new(s.as_str())),
        Value::Number(n) => Some(InvoiceId::new(n.to_string())),
        _ => None,
    });

    Ok(CreditNoteReceipt {
        credit_note_number,
        credit_note_id,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use orders_relay_core::Email;
    use secrecy::SecretString;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn store(server: &MockServer) -> RestStore {
        RestStore::new(&StoreConfig {
            url: Url::parse(&server.uri()).unwrap(),
            service_key: SecretString::from("svc-key"),
        })
        .unwrap()
    }

    fn order_row() -> Value {
        json!({
            "id": "ord-1",
            "order_number": "FS-0001",
            "customer_name": "Lucía",
            "customer_email": "lucia@example.com",
            "status": "return_requested",
            "updated_at": "2026-05-01T09:30:00Z"
        })
    }

    #[tokio::test]
    async fn test_order_sends_credentials_and_filters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/orders"))
            .and(query_param("id", "eq.ord-1"))
            .and(header("apikey", "svc-key"))
            .and(header("authorization", "Bearer svc-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([order_row()])))
            .expect(1)
            .mount(&server)
            .await;

        let order = store(&server).order(&OrderId::new("ord-1")).await.unwrap();
        assert_eq!(order.unwrap().order_number, "FS-0001");
    }

    #[tokio::test]
    async fn test_missing_order_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/orders"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let order = store(&server).order(&OrderId::new("nope")).await.unwrap();
        assert!(order.is_none());
    }

    #[tokio::test]
    async fn test_update_is_conditional_on_updated_at() {
        let server = MockServer::start().await;
        let mut updated = order_row();
        updated["status"] = json!("return_rejected");
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/orders"))
            .and(query_param("id", "eq.ord-1"))
            .and(query_param("updated_at", "eq.2026-05-01T09:30:00Z"))
            .and(header("prefer", "return=representation"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([updated])))
            .expect(1)
            .mount(&server)
            .await;

        let order: Order = serde_json::from_value(order_row()).unwrap();
        let result = store(&server)
            .update_order_status(&order, OrderStatus::ReturnRejected)
            .await
            .unwrap();
        assert_eq!(result.status, OrderStatus::ReturnRejected);
    }

    #[tokio::test]
    async fn test_update_matching_no_row_is_conflict() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/orders"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let order: Order = serde_json::from_value(order_row()).unwrap();
        let err = store(&server)
            .update_order_status(&order, OrderStatus::ReturnRejected)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_original_invoice_excludes_credit_notes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/invoices"))
            .and(query_param("order_id", "eq.ord-1"))
            .and(query_param("invoice_number", "not.like.NC-*"))
            .and(query_param("order", "created_at.asc"))
            .and(query_param("limit", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": "inv-1",
                "invoice_number": "F-2026-0001",
                "order_id": "ord-1",
                "total": 60.5
            }])))
            .expect(1)
            .mount(&server)
            .await;

        let invoice = store(&server)
            .original_invoice(&OrderId::new("ord-1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(invoice.invoice_number, "F-2026-0001");
    }

    #[tokio::test]
    async fn test_credit_note_rpc_arguments_and_receipt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/create_partial_credit_note"))
            .and(body_json(json!({
                "p_admin_email": "admin@shop.example",
                "p_order_id": "ord-1",
                "p_returned_items": [],
                "p_refund_amount": 12.5
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "credit_note_number": "NC-2026-0007",
                "credit_note_id": "cn-7"
            }])))
            .expect(1)
            .mount(&server)
            .await;

        let receipt = store(&server)
            .create_partial_credit_note(&CreditNoteRequest {
                admin_email: Email::parse("admin@shop.example").unwrap(),
                order_id: OrderId::new("ord-1"),
                returned_items: vec![],
                refund_amount: Decimal::new(125, 1),
            })
            .await
            .unwrap();

        assert_eq!(receipt.credit_note_number, "NC-2026-0007");
        assert_eq!(receipt.credit_note_id, Some(InvoiceId::new("cn-7")));
    }

    #[tokio::test]
    async fn test_store_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/create_partial_credit_note"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = store(&server)
            .create_partial_credit_note(&CreditNoteRequest {
                admin_email: Email::parse("admin@shop.example").unwrap(),
                order_id: OrderId::new("ord-1"),
                returned_items: vec![],
                refund_amount: Decimal::ONE,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Api { status: 500, .. }));
    }

    #[test]
    fn test_parse_receipt_shapes() {
        let row = parse_receipt(json!({"credit_note_number": "NC-1", "credit_note_id": 42})).unwrap();
        assert_eq!(row.credit_note_id, Some(InvoiceId::new("42")));

        let partial = parse_receipt(json!({"credit_note_number": "NC-2"})).unwrap();
        assert!(partial.credit_note_id.is_none());

        assert!(parse_receipt(json!([])).is_err());
    }
}
