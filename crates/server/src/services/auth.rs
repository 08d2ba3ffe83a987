//! Outbound authorization for forwarded actions.
//!
//! Each [`AuthMode`] has its own [`AuthStrategy`]. The admin-session strategy
//! vouches for the caller purely from the `adminEmail` field; callers of admin
//! actions are expected to have been authenticated before reaching the relay.

use chrono::Utc;
use orders_relay_core::AuthMode;
use serde_json::{Map, Value, json};

use crate::error::RelayError;

/// Name of the session cookie understood by the upstream admin API.
pub const ADMIN_SESSION_COOKIE: &str = "admin-session";

/// What the relay knows about the inbound caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct InboundContext<'a> {
    /// Raw `Authorization` header, already checked to be a bearer credential.
    pub authorization: Option<&'a str>,
    /// Browser `Origin` header.
    pub origin: Option<&'a str>,
}

/// Headers to attach to the outbound call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutboundAuth {
    pub authorization: Option<String>,
    pub cookie: Option<String>,
    pub origin: Option<String>,
    pub referer: Option<String>,
}

/// Computes the outbound authorization context for one action class.
pub trait AuthStrategy: Send + Sync {
    /// Translate the inbound caller into outbound headers.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::BadRequest` if a field the strategy needs is missing.
    fn translate(
        &self,
        inbound: &InboundContext<'_>,
        fields: &Map<String, Value>,
    ) -> Result<OutboundAuth, RelayError>;
}

/// Pass the caller's bearer credential through and echo its browser origin.
///
/// The upstream builds checkout redirect URLs from `Origin`, so the echo is
/// needed for payment flows to land back on the caller's site.
#[derive(Debug, Clone, Copy, Default)]
pub struct BearerPassthrough;

impl AuthStrategy for BearerPassthrough {
    fn translate(
        &self,
        inbound: &InboundContext<'_>,
        _fields: &Map<String, Value>,
    ) -> Result<OutboundAuth, RelayError> {
        let origin = inbound.origin.filter(|o| !o.is_empty());
        Ok(OutboundAuth {
            authorization: inbound.authorization.map(str::to_string),
            cookie: None,
            origin: origin.map(str::to_string),
            referer: origin.map(|o| format!("{o}/")),
        })
    }
}

/// Synthesize an admin session cookie from the envelope's `adminEmail`.
#[derive(Debug, Clone)]
pub struct AdminSessionSynthesis {
    upstream_origin: String,
}

impl AdminSessionSynthesis {
    /// Create the strategy; `upstream_origin` is sent as `Origin`.
    #[must_use]
    pub fn new(upstream_origin: impl Into<String>) -> Self {
        Self {
            upstream_origin: upstream_origin.into(),
        }
    }

    /// Build the cookie header value for an admin email at a point in time.
    #[must_use]
    pub fn session_cookie(email: &str, timestamp_ms: i64) -> String {
        let session = json!({
            "email": email,
            "role": "admin",
            "timestamp": timestamp_ms,
        });
        format!(
            "{ADMIN_SESSION_COOKIE}={}",
            urlencoding::encode(&session.to_string())
        )
    }
}

impl AuthStrategy for AdminSessionSynthesis {
    fn translate(
        &self,
        _inbound: &InboundContext<'_>,
        fields: &Map<String, Value>,
    ) -> Result<OutboundAuth, RelayError> {
        let email = fields
            .get("adminEmail")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| {
                RelayError::BadRequest("adminEmail is required for admin actions".to_string())
            })?;

        tracing::debug!(admin_email = %email, "Synthesizing admin session");

        Ok(OutboundAuth {
            authorization: None,
            cookie: Some(Self::session_cookie(email, Utc::now().timestamp_millis())),
            origin: Some(self.upstream_origin.clone()),
            referer: None,
        })
    }
}

/// Attach nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuth;

impl AuthStrategy for NoAuth {
    fn translate(
        &self,
        _inbound: &InboundContext<'_>,
        _fields: &Map<String, Value>,
    ) -> Result<OutboundAuth, RelayError> {
        Ok(OutboundAuth::default())
    }
}

/// Holds one instance of every strategy and picks by [`AuthMode`].
#[derive(Debug, Clone)]
pub struct AuthTranslator {
    bearer: BearerPassthrough,
    admin: AdminSessionSynthesis,
    public: NoAuth,
}

impl AuthTranslator {
    /// Create a translator for an upstream at `upstream_origin`.
    #[must_use]
    pub fn new(upstream_origin: impl Into<String>) -> Self {
        Self {
            bearer: BearerPassthrough,
            admin: AdminSessionSynthesis::new(upstream_origin),
            public: NoAuth,
        }
    }

    /// The strategy for an action's auth mode.
    #[must_use]
    pub fn strategy(&self, mode: AuthMode) -> &dyn AuthStrategy {
        match mode {
            AuthMode::Bearer => &self.bearer,
            AuthMode::AdminSession => &self.admin,
            AuthMode::Public => &self.public,
        }
    }
}

/// Whether an `Authorization` header value is a bearer credential.
#[must_use]
pub fn is_bearer(value: &str) -> bool {
    value.starts_with("Bearer ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn fields(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_bearer_echoes_origin_as_referer() {
        let inbound = InboundContext {
            authorization: Some("Bearer abc"),
            origin: Some("https://app.example"),
        };
        let out = BearerPassthrough.translate(&inbound, &Map::new()).unwrap();

        assert_eq!(out.authorization.as_deref(), Some("Bearer abc"));
        assert_eq!(out.origin.as_deref(), Some("https://app.example"));
        assert_eq!(out.referer.as_deref(), Some("https://app.example/"));
        assert!(out.cookie.is_none());
    }

    #[test]
    fn test_bearer_without_origin() {
        let inbound = InboundContext {
            authorization: Some("Bearer abc"),
            origin: None,
        };
        let out = BearerPassthrough.translate(&inbound, &Map::new()).unwrap();
        assert!(out.origin.is_none());
        assert!(out.referer.is_none());
    }

    #[test]
    fn test_admin_session_uses_upstream_origin() {
        let translator = AuthTranslator::new("https://shop.example");
        let inbound = InboundContext {
            authorization: Some("Bearer abc"),
            origin: Some("https://app.example"),
        };
        let out = translator
            .strategy(AuthMode::AdminSession)
            .translate(&inbound, &fields(json!({"adminEmail": "admin@shop.example"})))
            .unwrap();

        assert_eq!(out.origin.as_deref(), Some("https://shop.example"));
        assert!(out.authorization.is_none());
        let cookie = out.cookie.unwrap();
        assert!(cookie.starts_with("admin-session=%7B"));
        assert!(cookie.contains("admin%40shop.example"));
    }

    #[test]
    fn test_session_cookie_decodes_to_json() {
        let cookie = AdminSessionSynthesis::session_cookie("a@b.example", 1_700_000_000_000);
        let encoded = cookie.strip_prefix("admin-session=").unwrap();
        let decoded = urlencoding::decode(encoded).unwrap();
        let session: Value = serde_json::from_str(&decoded).unwrap();

        assert_eq!(
            session,
            json!({"email": "a@b.example", "role": "admin", "timestamp": 1_700_000_000_000_i64})
        );
    }

    #[test]
    fn test_admin_session_requires_email() {
        let strategy = AdminSessionSynthesis::new("https://shop.example");
        let err = strategy
            .translate(&InboundContext::default(), &fields(json!({"orderId": "1"})))
            .unwrap_err();
        assert!(matches!(err, RelayError::BadRequest(_)));

        let err = strategy
            .translate(&InboundContext::default(), &fields(json!({"adminEmail": "  "})))
            .unwrap_err();
        assert!(matches!(err, RelayError::BadRequest(_)));
    }

    #[test]
    fn test_public_attaches_nothing() {
        let translator = AuthTranslator::new("https://shop.example");
        let inbound = InboundContext {
            authorization: Some("Bearer abc"),
            origin: Some("https://app.example"),
        };
        let out = translator
            .strategy(AuthMode::Public)
            .translate(&inbound, &Map::new())
            .unwrap();
        assert_eq!(out, OutboundAuth::default());
    }

    #[test]
    fn test_is_bearer() {
        assert!(is_bearer("Bearer token"));
        assert!(!is_bearer("Basic dXNlcg=="));
        assert!(!is_bearer("bearer"));
    }
}
