//! Order records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{OrderId, OrderStatus};

/// An order row, owned by the record store.
///
/// The relay never holds an authoritative copy; every handler reads it fresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    pub status: OrderStatus,
    /// Last write timestamp, used as the optimistic concurrency token.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Customer name for greetings, falling back to a neutral salutation.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.customer_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or("cliente")
    }
}
