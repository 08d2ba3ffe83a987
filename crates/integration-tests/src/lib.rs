//! End-to-end harness for the orders relay.
//!
//! Drives the real router in-process. The upstream commerce API is a
//! `wiremock` server; the record store, mailer and document renderer are
//! in-memory fakes that record what the handlers asked of them.
//!
//! ```rust,ignore
//! let ctx = TestContext::new().await;
//! let (status, body) = ctx.send(post(json!({"action": "stock"}), None)).await;
//! ```

#![allow(clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use orders_relay_core::{Email, Invoice, InvoiceId, InvoiceItem, Order, OrderId, OrderStatus};
use orders_relay_server::config::{EmailConfig, RelayConfig, StoreConfig, UpstreamConfig};
use orders_relay_server::services::documents::{
    DocumentError, DocumentRenderer, FinancialDocument, PdfRenderer,
};
use orders_relay_server::services::email::{MailError, Mailer, OutgoingEmail, ProviderResponse};
use orders_relay_server::state::AppState;
use orders_relay_server::store::{CreditNoteReceipt, CreditNoteRequest, RecordStore, StoreError};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;
use url::Url;
use wiremock::MockServer;

// =============================================================================
// Record store
// =============================================================================

#[derive(Default)]
struct StoreState {
    orders: HashMap<OrderId, Order>,
    invoices: Vec<Invoice>,
    credit_note_calls: Vec<CreditNoteRequest>,
    status_updates: usize,
    lookups_by_number: Vec<String>,
    fail_credit_notes: bool,
    fail_updates: bool,
    omit_receipt_ids: bool,
    hide_credit_notes: bool,
    fail_invoice_reads: bool,
}

/// In-memory [`RecordStore`].
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    fn lock(&self) -> std::sync::MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert_order(&self, order: Order) {
        self.lock().orders.insert(order.id.clone(), order);
    }

    pub fn insert_invoice(&self, invoice: Invoice) {
        self.lock().invoices.push(invoice);
    }

    /// Make the credit-note procedure fail from now on.
    pub fn fail_credit_notes(&self) {
        self.lock().fail_credit_notes = true;
    }

    /// Make status updates fail from now on.
    pub fn fail_updates(&self) {
        self.lock().fail_updates = true;
    }

    /// Issue credit-note receipts without the new row's id.
    pub fn omit_receipt_ids(&self) {
        self.lock().omit_receipt_ids = true;
    }

    /// Keep issued credit notes out of invoice lookups.
    pub fn hide_credit_notes(&self) {
        self.lock().hide_credit_notes = true;
    }

    /// Make single-invoice lookups fail from now on.
    pub fn fail_invoice_reads(&self) {
        self.lock().fail_invoice_reads = true;
    }

    /// Invoice numbers looked up through `invoice_by_number`.
    #[must_use]
    pub fn lookups_by_number(&self) -> Vec<String> {
        self.lock().lookups_by_number.clone()
    }

    #[must_use]
    pub fn credit_note_calls(&self) -> Vec<CreditNoteRequest> {
        self.lock().credit_note_calls.clone()
    }

    #[must_use]
    pub fn status_updates(&self) -> usize {
        self.lock().status_updates
    }

    #[must_use]
    pub fn order_status(&self, id: &str) -> Option<OrderStatus> {
        self.lock()
            .orders
            .get(&OrderId::new(id))
            .map(|order| order.status)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn order(&self, id: &OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.lock().orders.get(id).cloned())
    }

    async fn update_order_status(
        &self,
        order: &Order,
        status: OrderStatus,
    ) -> Result<Order, StoreError> {
        let mut state = self.lock();
        if state.fail_updates {
            return Err(StoreError::Api {
                status: 503,
                message: "store unavailable".to_string(),
            });
        }
        let stored = state
            .orders
            .get_mut(&order.id)
            .ok_or_else(|| StoreError::Conflict(format!("order {} changed", order.id)))?;
        stored.status = status;
        let updated = stored.clone();
        state.status_updates += 1;
        Ok(updated)
    }

    async fn original_invoice(&self, order_id: &OrderId) -> Result<Option<Invoice>, StoreError> {
        let state = self.lock();
        let mut originals: Vec<&Invoice> = state
            .invoices
            .iter()
            .filter(|inv| &inv.order_id == order_id && !inv.is_credit_note())
            .collect();
        originals.sort_by_key(|inv| inv.created_at);
        Ok(originals.first().map(|inv| (*inv).clone()))
    }

    async fn invoice(&self, id: &InvoiceId) -> Result<Option<Invoice>, StoreError> {
        self.lock().lookup(|inv| &inv.id == id)
    }

    async fn invoice_by_number(&self, number: &str) -> Result<Option<Invoice>, StoreError> {
        let mut state = self.lock();
        state.lookups_by_number.push(number.to_string());
        state.lookup(|inv| inv.invoice_number == number)
    }

    async fn create_partial_credit_note(
        &self,
        request: &CreditNoteRequest,
    ) -> Result<CreditNoteReceipt, StoreError> {
        let mut state = self.lock();
        state.credit_note_calls.push(request.clone());
        if state.fail_credit_notes {
            return Err(StoreError::Api {
                status: 500,
                message: "credit note procedure failed".to_string(),
            });
        }

        let sequence = state.credit_note_calls.len();
        let number = format!("NC-2026-{sequence:04}");
        let id = InvoiceId::new(format!("cn-{sequence}"));
        let customer = state.orders.get(&request.order_id).cloned();
        state.invoices.push(Invoice {
            id: id.clone(),
            invoice_number: number.clone(),
            order_id: request.order_id.clone(),
            customer_name: customer.as_ref().and_then(|o| o.customer_name.clone()),
            customer_email: customer.and_then(|o| o.customer_email),
            items: request.returned_items.clone(),
            subtotal: Decimal::ZERO,
            iva_amount: Decimal::ZERO,
            shipping_cost: Decimal::ZERO,
            total: -request.refund_amount,
            created_at: None,
        });

        Ok(CreditNoteReceipt {
            credit_note_number: number,
            credit_note_id: (!state.omit_receipt_ids).then_some(id),
        })
    }
}

impl StoreState {
    fn lookup(&self, matches: impl Fn(&Invoice) -> bool) -> Result<Option<Invoice>, StoreError> {
        if self.fail_invoice_reads {
            return Err(StoreError::Api {
                status: 503,
                message: "store unavailable".to_string(),
            });
        }
        Ok(self
            .invoices
            .iter()
            .filter(|inv| !(self.hide_credit_notes && inv.is_credit_note()))
            .find(|inv| matches(inv))
            .cloned())
    }
}

// =============================================================================
// Mailer and renderer
// =============================================================================

/// [`Mailer`] that records every message and answers with a fixed status.
pub struct RecordingMailer {
    status: u16,
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl RecordingMailer {
    #[must_use]
    pub const fn answering(status: u16) -> Self {
        Self {
            status,
            sent: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<ProviderResponse, MailError> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(email.clone());
        Ok(ProviderResponse {
            status: self.status,
            body: serde_json::json!({"id": "em_test"}),
        })
    }
}

/// [`DocumentRenderer`] that always fails.
pub struct FailingRenderer;

impl DocumentRenderer for FailingRenderer {
    fn render(&self, _document: &FinancialDocument) -> Result<Vec<u8>, DocumentError> {
        Err(DocumentError::Render("font table unavailable".to_string()))
    }
}

// =============================================================================
// Context
// =============================================================================

/// A relay wired to a mock upstream and in-memory collaborators.
pub struct TestContext {
    pub upstream: MockServer,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
    app: Router,
}

impl TestContext {
    /// Relay with the PDF renderer and a mailer that accepts everything.
    pub async fn new() -> Self {
        Self::build(Arc::new(RecordingMailer::answering(200)), Arc::new(PdfRenderer)).await
    }

    /// Relay whose email provider answers with `status`.
    pub async fn with_mail_status(status: u16) -> Self {
        Self::build(Arc::new(RecordingMailer::answering(status)), Arc::new(PdfRenderer)).await
    }

    /// Relay whose document renderer always fails.
    pub async fn with_failing_renderer() -> Self {
        Self::build(Arc::new(RecordingMailer::answering(200)), Arc::new(FailingRenderer)).await
    }

    async fn build(mailer: Arc<RecordingMailer>, renderer: Arc<dyn DocumentRenderer>) -> Self {
        let upstream = MockServer::start().await;
        let store = Arc::new(MemoryStore::default());
        let state = AppState::from_parts(
            config(&upstream.uri()),
            store.clone(),
            mailer.clone(),
            renderer,
        )
        .unwrap_or_else(|e| panic!("failed to build state: {e}"));

        Self {
            upstream,
            store,
            mailer,
            app: orders_relay_server::app(state),
        }
    }

    /// The upstream's origin as the relay sees it.
    #[must_use]
    pub fn upstream_origin(&self) -> String {
        self.upstream.uri().trim_end_matches('/').to_string()
    }

    /// Send a request through the full middleware stack.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .unwrap_or_else(|e| match e {});
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .map(|collected| collected.to_bytes())
            .unwrap_or_default();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, body)
    }
}

fn config(upstream: &str) -> RelayConfig {
    let parse = |raw: &str| Url::parse(raw).unwrap_or_else(|e| panic!("bad URL {raw}: {e}"));
    RelayConfig {
        host: std::net::IpAddr::from([127, 0, 0, 1]),
        port: 0,
        allowed_origin: "*".to_string(),
        upstream: UpstreamConfig {
            base_url: parse(upstream),
        },
        store: StoreConfig {
            url: parse("http://store.invalid"),
            service_key: SecretString::from("test-service-key"),
        },
        email: EmailConfig {
            api_url: parse("http://mail.invalid"),
            api_key: SecretString::from("test-mail-key"),
            from_address: Email::parse("tienda@shop.example")
                .unwrap_or_else(|e| panic!("bad sender: {e}")),
        },
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

// =============================================================================
// Requests and fixtures
// =============================================================================

/// `POST /` with a JSON body and an optional bearer token.
#[must_use]
pub fn post(body: &Value, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(body.to_string()))
        .unwrap_or_else(|e| panic!("bad request: {e}"))
}

/// An order awaiting a return decision.
#[must_use]
pub fn order(id: &str) -> Order {
    Order {
        id: OrderId::new(id),
        order_number: "FS-1042".to_string(),
        customer_name: Some("Ana Ruiz".to_string()),
        customer_email: Some("ana@example.com".to_string()),
        status: OrderStatus::ReturnRequested,
        updated_at: None,
    }
}

/// The order's original invoice.
#[must_use]
pub fn original_invoice(order_id: &str) -> Invoice {
    Invoice {
        id: InvoiceId::new("inv-1"),
        invoice_number: "F-2026-0100".to_string(),
        order_id: OrderId::new(order_id),
        customer_name: Some("Ana Ruiz".to_string()),
        customer_email: Some("ana@example.com".to_string()),
        items: vec![
            item("Camisa lino", 2420, 1),
            item("Falda midi", 3570, 1),
        ],
        subtotal: Decimal::ZERO,
        iva_amount: Decimal::ZERO,
        shipping_cost: Decimal::new(495, 2),
        total: Decimal::ZERO,
        created_at: None,
    }
}

/// A line item priced in cents.
#[must_use]
pub fn item(name: &str, cents: i64, quantity: u32) -> InvoiceItem {
    InvoiceItem {
        product_name: name.to_string(),
        size: Some("M".to_string()),
        quantity,
        price: Decimal::new(cents, 2),
        total: Decimal::ZERO,
    }
}
