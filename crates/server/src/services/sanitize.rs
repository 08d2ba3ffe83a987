//! Checkout payload URL normalization.
//!
//! Browser clients supply redirect targets and product image URLs for the
//! checkout action. Only absolute `http`/`https` URLs with a host survive;
//! protocol-relative URLs (`//host/path`) are promoted to `https` regardless
//! of host. Redirect targets that fail the check fall back to fixed pages on
//! the upstream's own origin; invalid item images are removed.

use serde_json::{Map, Value};
use url::Url;

/// Redirect fields rewritten on checkout, with their fallback page.
const REDIRECT_FIELDS: [(&str, &str); 2] = [
    ("successUrl", "/checkout/success"),
    ("cancelUrl", "/checkout/cancel"),
];

/// Normalize a single URL, or `None` if it is not safe to forward.
///
/// The result is the parsed URL's serialization, never the raw input.
#[must_use]
pub fn sanitize_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let candidate = if trimmed.starts_with("//") {
        format!("https:{trimmed}")
    } else {
        trimmed.to_string()
    };

    let url = Url::parse(&candidate).ok()?;
    let has_host = url.host_str().is_some_and(|host| !host.is_empty());
    (matches!(url.scheme(), "http" | "https") && has_host).then(|| url.to_string())
}

/// Rewrite the URL-valued fields of a checkout payload in place.
///
/// Fields that are absent stay absent.
pub fn sanitize_checkout(fields: &mut Map<String, Value>, upstream_origin: &str) {
    for (key, fallback_path) in REDIRECT_FIELDS {
        let Some(value) = fields.get_mut(key) else {
            continue;
        };
        let sanitized = value.as_str().and_then(sanitize_url);
        if sanitized.is_none() {
            tracing::warn!(field = key, "Replacing unsafe checkout redirect URL");
        }
        *value = Value::String(
            sanitized.unwrap_or_else(|| format!("{upstream_origin}{fallback_path}")),
        );
    }

    let Some(Value::Array(items)) = fields.get_mut("items") else {
        return;
    };
    for item in items.iter_mut().filter_map(Value::as_object_mut) {
        let Some(image) = item.get("image") else {
            continue;
        };
        match image.as_str().and_then(sanitize_url) {
            Some(url) => {
                item.insert("image".to_string(), Value::String(url));
            }
            None => {
                item.remove("image");
            }
        }
    }
}
