//! The closed set of relay actions and their handling descriptors.
//!
//! Every inbound request names exactly one [`Action`]. Each action resolves to
//! a single static [`ActionSpec`] that says where it goes upstream, which
//! authorization strategy applies, how it is transported, and whether it is
//! handled in-process instead of forwarded. The table lives in
//! [`Action::spec`] and is the only place these facts are recorded.

use core::fmt;

use serde::{Deserialize, Serialize};

/// How an action is carried to the upstream commerce API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    /// POST with a JSON body.
    Post,
    /// GET with the envelope fields serialized into the query string.
    Get,
}

/// Authorization strategy selected for an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMode {
    /// Pass the caller's bearer credential through unchanged.
    Bearer,
    /// Synthesize an admin-session cookie from the envelope's `adminEmail`.
    AdminSession,
    /// No credential is required or attached.
    Public,
}

/// Immutable descriptor for one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionSpec {
    /// Upstream path, `None` for actions handled in-process.
    pub path: Option<&'static str>,
    /// Authorization strategy.
    pub auth: AuthMode,
    /// Outbound transport.
    pub transport: Transport,
}

impl ActionSpec {
    const fn forward(path: &'static str, auth: AuthMode, transport: Transport) -> Self {
        Self {
            path: Some(path),
            auth,
            transport,
        }
    }

    const fn local() -> Self {
        Self {
            path: None,
            auth: AuthMode::Bearer,
            transport: Transport::Post,
        }
    }

    /// Whether the caller must present a bearer credential.
    #[must_use]
    pub const fn requires_auth(&self) -> bool {
        !matches!(self.auth, AuthMode::Public)
    }

    /// Whether the outbound call carries a synthesized admin session.
    #[must_use]
    pub const fn uses_admin_session(&self) -> bool {
        matches!(self.auth, AuthMode::AdminSession)
    }

    /// Whether the action is forwarded as a GET request.
    #[must_use]
    pub const fn is_get(&self) -> bool {
        matches!(self.transport, Transport::Get)
    }

    /// Whether the action is handled without forwarding.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        self.path.is_none()
    }
}

/// A named relay action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    RequestReturn,
    Cancel,
    RequestInvoice,
    AcceptReturn,
    AdminCancel,
    Checkout,
    VerifyCheckout,
    Stock,
    SendShippingUpdate,
    SendOrderDelivered,
    SendNewsletter,
    RejectReturn,
    AcceptPartialReturn,
}

impl Action {
    /// Every action, in declaration order.
    pub const ALL: [Self; 13] = [
        Self::RequestReturn,
        Self::Cancel,
        Self::RequestInvoice,
        Self::AcceptReturn,
        Self::AdminCancel,
        Self::Checkout,
        Self::VerifyCheckout,
        Self::Stock,
        Self::SendShippingUpdate,
        Self::SendOrderDelivered,
        Self::SendNewsletter,
        Self::RejectReturn,
        Self::AcceptPartialReturn,
    ];

    /// The wire name of the action.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RequestReturn => "request-return",
            Self::Cancel => "cancel",
            Self::RequestInvoice => "request-invoice",
            Self::AcceptReturn => "accept-return",
            Self::AdminCancel => "admin-cancel",
            Self::Checkout => "checkout",
            Self::VerifyCheckout => "verify-checkout",
            Self::Stock => "stock",
            Self::SendShippingUpdate => "send-shipping-update",
            Self::SendOrderDelivered => "send-order-delivered",
            Self::SendNewsletter => "send-newsletter",
            Self::RejectReturn => "reject-return",
            Self::AcceptPartialReturn => "accept-partial-return",
        }
    }

    /// The static descriptor for this action.
    #[must_use]
    pub const fn spec(&self) -> &'static ActionSpec {
        use AuthMode::{AdminSession, Bearer, Public};
        use Transport::{Get, Post};

        const REQUEST_RETURN: ActionSpec =
            ActionSpec::forward("/api/orders/request-return", Bearer, Post);
        const CANCEL: ActionSpec = ActionSpec::forward("/api/orders/cancel", Bearer, Post);
        const REQUEST_INVOICE: ActionSpec =
            ActionSpec::forward("/api/orders/request-invoice", Bearer, Post);
        const ACCEPT_RETURN: ActionSpec =
            ActionSpec::forward("/api/orders/accept-return", AdminSession, Post);
        const ADMIN_CANCEL: ActionSpec =
            ActionSpec::forward("/api/orders/admin-cancel", AdminSession, Post);
        const CHECKOUT: ActionSpec =
            ActionSpec::forward("/api/checkout/create-session", Bearer, Post);
        const VERIFY_CHECKOUT: ActionSpec =
            ActionSpec::forward("/api/checkout/verify-session", Bearer, Post);
        const STOCK: ActionSpec = ActionSpec::forward("/api/products/stock", Public, Get);
        const SEND_SHIPPING_UPDATE: ActionSpec =
            ActionSpec::forward("/api/orders/send-shipping-update", AdminSession, Post);
        const SEND_ORDER_DELIVERED: ActionSpec =
            ActionSpec::forward("/api/orders/send-order-delivered", AdminSession, Post);
        const SEND_NEWSLETTER: ActionSpec =
            ActionSpec::forward("/api/newsletter/send", AdminSession, Post);
        const LOCAL: ActionSpec = ActionSpec::local();

        match self {
            Self::RequestReturn => &REQUEST_RETURN,
            Self::Cancel => &CANCEL,
            Self::RequestInvoice => &REQUEST_INVOICE,
            Self::AcceptReturn => &ACCEPT_RETURN,
            Self::AdminCancel => &ADMIN_CANCEL,
            Self::Checkout => &CHECKOUT,
            Self::VerifyCheckout => &VERIFY_CHECKOUT,
            Self::Stock => &STOCK,
            Self::SendShippingUpdate => &SEND_SHIPPING_UPDATE,
            Self::SendOrderDelivered => &SEND_ORDER_DELIVERED,
            Self::SendNewsletter => &SEND_NEWSLETTER,
            Self::RejectReturn | Self::AcceptPartialReturn => &LOCAL,
        }
    }

    /// Whether the action may be called without a bearer credential.
    #[must_use]
    pub const fn is_public(&self) -> bool {
        !self.spec().requires_auth()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no known action.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown action: {0}")]
pub struct UnknownAction(pub String);

impl std::str::FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_names() {
        for action in Action::ALL {
            assert_eq!(action.as_str().parse::<Action>().unwrap(), action);
        }
    }

    #[test]
    fn test_serde_names_match_wire_names() {
        for action in Action::ALL {
            let json = serde_json::to_string(&action).unwrap();
            assert_eq!(json, format!("\"{}\"", action.as_str()));
        }
    }

    #[test]
    fn test_unknown_action_echoes_name() {
        let err = "refund-everything".parse::<Action>().unwrap_err();
        assert_eq!(err.to_string(), "unknown action: refund-everything");
    }

    #[test]
    fn test_only_stock_is_public() {
        let public: Vec<_> = Action::ALL.into_iter().filter(Action::is_public).collect();
        assert_eq!(public, vec![Action::Stock]);
    }

    #[test]
    fn test_local_actions_have_no_path() {
        assert!(Action::RejectReturn.spec().is_local());
        assert!(Action::AcceptPartialReturn.spec().is_local());
        assert!(Action::RejectReturn.spec().requires_auth());
        assert!(!Action::AcceptPartialReturn.spec().uses_admin_session());
    }

    #[test]
    fn test_admin_session_actions() {
        let admin: Vec<_> = Action::ALL
            .into_iter()
            .filter(|a| a.spec().uses_admin_session())
            .collect();
        assert_eq!(
            admin,
            vec![
                Action::AcceptReturn,
                Action::AdminCancel,
                Action::SendShippingUpdate,
                Action::SendOrderDelivered,
                Action::SendNewsletter,
            ]
        );
    }

    #[test]
    fn test_stock_is_get() {
        assert!(Action::Stock.spec().is_get());
        assert_eq!(Action::Stock.spec().path, Some("/api/products/stock"));
        assert!(!Action::Checkout.spec().is_get());
    }
}
