//! Forwarding gateway to the upstream commerce API.
//!
//! The relay never reinterprets upstream answers: status and JSON body are
//! handed back as received. Only transport and decoding failures become
//! relay errors.

use axum::http::StatusCode;
use reqwest::header::{CONTENT_TYPE, COOKIE, HeaderValue, ORIGIN, REFERER};
use serde_json::{Map, Value};
use tracing::instrument;
use url::Url;

use super::auth::OutboundAuth;
use crate::config::UpstreamConfig;
use crate::error::RelayError;

/// The upstream's answer, relayed verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// HTTP client for the upstream commerce API.
#[derive(Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    base_url: Url,
}

impl UpstreamClient {
    /// Create a new upstream client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &UpstreamConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, RelayError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}{path}"))
            .map_err(|e| RelayError::Internal(format!("invalid upstream URL: {e}")))
    }

    /// POST `body` as JSON with the translated authorization headers.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::Upstream` on network failure or a non-JSON answer.
    #[instrument(skip(self, auth, body))]
    pub async fn post(
        &self,
        path: &str,
        auth: &OutboundAuth,
        body: &Map<String, Value>,
    ) -> Result<UpstreamResponse, RelayError> {
        let mut request = self.client.post(self.endpoint(path)?).json(body);

        if let Some(authorization) = &auth.authorization {
            request = request.header(reqwest::header::AUTHORIZATION, header(authorization)?);
        }
        if let Some(cookie) = &auth.cookie {
            request = request.header(COOKIE, header(cookie)?);
        }
        if let Some(origin) = &auth.origin {
            request = request.header(ORIGIN, header(origin)?);
        }
        if let Some(referer) = &auth.referer {
            request = request.header(REFERER, header(referer)?);
        }

        let response = request.send().await.map_err(upstream_error)?;
        relay(response).await
    }

    /// GET with every non-null field in the query string.
    ///
    /// No authorization is attached.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::Upstream` on network failure or a non-JSON answer.
    #[instrument(skip(self, fields))]
    pub async fn get(
        &self,
        path: &str,
        fields: &Map<String, Value>,
    ) -> Result<UpstreamResponse, RelayError> {
        let mut url = self.endpoint(path)?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in fields {
                if let Some(value) = query_value(value) {
                    pairs.append_pair(key, &value);
                }
            }
        }
        // An empty serializer still leaves a bare `?`.
        if url.query() == Some("") {
            url.set_query(None);
        }

        let response = self
            .client
            .get(url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .send()
            .await
            .map_err(upstream_error)?;
        relay(response).await
    }
}

/// Stringify a JSON value for a query parameter; `null` is omitted.
fn query_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(_) | Value::Number(_) | Value::Array(_) | Value::Object(_) => {
            Some(value.to_string())
        }
    }
}

fn header(value: &str) -> Result<HeaderValue, RelayError> {
    HeaderValue::from_str(value)
        .map_err(|_| RelayError::BadRequest("header value contains invalid characters".to_string()))
}

fn upstream_error(err: reqwest::Error) -> RelayError {
    tracing::error!(error = %err, "Upstream request failed");
    RelayError::Upstream(err.to_string())
}

async fn relay(response: reqwest::Response) -> Result<UpstreamResponse, RelayError> {
    let status = response.status();
    let body = response.json::<Value>().await.map_err(upstream_error)?;
    tracing::debug!(status = %status, "Upstream responded");
    Ok(UpstreamResponse { status, body })
}
