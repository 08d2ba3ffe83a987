//! Order status values as stored by the record store.

use serde::{Deserialize, Serialize};

/// Order status.
///
/// The relay only ever writes [`OrderStatus::ReturnRejected`] itself; the
/// partially refunded state is reached through the store's own credit-note
/// transaction. Values this build does not know deserialize as `Unknown` so a
/// new store-side status never breaks a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    Shipped,
    Delivered,
    Cancelled,
    ReturnRequested,
    ReturnRejected,
    Returned,
    PartiallyRefunded,
    Refunded,
    #[serde(other)]
    Unknown,
}

impl OrderStatus {
    /// The stored string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::ReturnRequested => "return_requested",
            Self::ReturnRejected => "return_rejected",
            Self::Returned => "returned",
            Self::PartiallyRefunded => "partially_refunded",
            Self::Refunded => "refunded",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_form_matches_as_str() {
        let json = serde_json::to_string(&OrderStatus::ReturnRejected).unwrap();
        assert_eq!(json, "\"return_rejected\"");
        assert_eq!(OrderStatus::PartiallyRefunded.to_string(), "partially_refunded");
    }

    #[test]
    fn test_unrecognized_status_is_unknown() {
        let status: OrderStatus = serde_json::from_str("\"awaiting_pickup\"").unwrap();
        assert_eq!(status, OrderStatus::Unknown);
    }
}
