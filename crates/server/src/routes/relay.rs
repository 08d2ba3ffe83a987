//! The single action entry point.
//!
//! Check order for every `POST`:
//!
//! 1. Bearer credential, unless the action is public. A missing or
//!    unrecognized action is never public.
//! 2. Envelope shape and `action` presence.
//! 3. `action` is in the closed enumeration.
//! 4. Dispatch: actions without an upstream path run in-process, the rest
//!    go through the forwarding gateway.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
};
use orders_relay_core::{Action, UnknownAction};
use serde_json::{Map, Value};
use tracing::instrument;

use super::returns;
use crate::error::{RelayError, Result};
use crate::services::auth::{InboundContext, is_bearer};
use crate::services::sanitize::sanitize_checkout;
use crate::state::AppState;

/// Inbound request body: `{ action, ...fields }`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Envelope {
    /// Raw `action` value, before validation.
    pub action: Option<Value>,
    /// Everything except `action`.
    pub fields: Map<String, Value>,
}

impl Envelope {
    /// Split a JSON body into action and fields.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::BadRequest` if the body is not a JSON object.
    pub fn parse(body: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| RelayError::BadRequest(format!("Invalid JSON body: {e}")))?;
        let Value::Object(mut fields) = value else {
            return Err(RelayError::BadRequest(
                "Request body must be a JSON object".to_string(),
            ));
        };
        let action = fields.remove("action").filter(|a| !a.is_null());
        Ok(Self { action, fields })
    }

    /// The named action, if it is a known one.
    #[must_use]
    pub fn known_action(&self) -> Option<Action> {
        self.action.as_ref()?.as_str()?.parse().ok()
    }

    /// Validate the action name.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` when absent and `UnknownAction` when not in the
    /// enumeration.
    pub fn action(&self) -> Result<Action> {
        let value = self
            .action
            .as_ref()
            .ok_or_else(|| RelayError::BadRequest("Missing \"action\" field".to_string()))?;
        let name = match value {
            Value::String(name) => name.clone(),
            other => other.to_string(),
        };
        name.parse()
            .map_err(|UnknownAction(name)| RelayError::UnknownAction(name))
    }
}

/// `POST /`.
#[instrument(skip(state, headers, body), fields(action = tracing::field::Empty))]
pub async fn relay(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    let envelope = Envelope::parse(&body);

    let known = envelope.as_ref().ok().and_then(Envelope::known_action);
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .filter(|v| is_bearer(v));
    if !known.is_some_and(|a| a.is_public()) && authorization.is_none() {
        return Err(RelayError::Unauthorized("No authorization token".to_string()));
    }

    let envelope = envelope?;
    let action = envelope.action()?;
    tracing::Span::current().record("action", action.as_str());

    let inbound = InboundContext {
        authorization,
        origin: headers.get(header::ORIGIN).and_then(|v| v.to_str().ok()),
    };

    match action.spec().path {
        None => handle_local(&state, action, &envelope.fields).await,
        Some(path) => forward(&state, action, path, &inbound, envelope.fields).await,
    }
}

/// Run an action that has no upstream path.
async fn handle_local(
    state: &AppState,
    action: Action,
    fields: &Map<String, Value>,
) -> Result<Response> {
    match action {
        Action::RejectReturn => Ok(returns::reject_return(state, fields).await?.into_response()),
        Action::AcceptPartialReturn => Ok(returns::accept_partial_return(state, fields)
            .await?
            .into_response()),
        _ => Err(RelayError::Internal(format!("{action} has no local handler"))),
    }
}

/// Relay a forwarded action to the upstream and mirror its answer.
async fn forward(
    state: &AppState,
    action: Action,
    path: &str,
    inbound: &InboundContext<'_>,
    mut fields: Map<String, Value>,
) -> Result<Response> {
    let spec = action.spec();
    let response = if spec.is_get() {
        state.upstream().get(path, &fields).await?
    } else {
        let auth = state.auth().strategy(spec.auth).translate(inbound, &fields)?;
        if action == Action::Checkout {
            sanitize_checkout(&mut fields, &state.config().upstream.origin());
        }
        state.upstream().post(path, &auth, &fields).await?
    };

    tracing::info!(action = %action, status = %response.status, "Forwarded action");
    Ok((response.status, Json(response.body)).into_response())
}
