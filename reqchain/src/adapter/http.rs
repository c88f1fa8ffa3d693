//! reqwest-backed request adapter.
//!
//! Available behind the `http` cargo feature. The adapter translates a
//! [`RequestDescriptor`] into a concrete HTTP call over a shared
//! [`reqwest::Client`] and shapes every response into the same value:
//! `{"status": u16, "headers": {..}, "body": json-or-text}`.
//!
//! Extension fields honored: `timeout_ms` (per-request timeout in
//! milliseconds) and `query` (object serialized into query pairs).

use super::RequestAdapter;
use crate::errors::{TransportError, TransportErrorKind};
use crate::guard::UrlGuard;
use crate::request::{HttpMethod, RequestDescriptor};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

/// [`RequestAdapter`] backed by a shared [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct HttpAdapter {
    client: reqwest::Client,
    guard: UrlGuard,
}

impl HttpAdapter {
    /// Creates an adapter with a default client and the strict default guard.
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            guard: UrlGuard::default(),
        }
    }

    /// Sets the URL guard.
    #[must_use]
    pub fn with_guard(mut self, guard: UrlGuard) -> Self {
        self.guard = guard;
        self
    }

    /// Sets the underlying client, for callers that need custom TLS,
    /// proxies, or connection tuning.
    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

impl Default for HttpAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RequestAdapter for HttpAdapter {
    async fn create_request(&self, config: &RequestDescriptor) -> Result<Value, TransportError> {
        let mut request = self.client.request(to_reqwest_method(config.method), &config.url);

        for (name, value) in &config.headers {
            request = request.header(name, value);
        }
        if let Some(timeout_ms) = config.extension("timeout_ms").and_then(Value::as_u64) {
            request = request.timeout(Duration::from_millis(timeout_ms));
        }
        if let Some(Value::Object(query)) = config.extension("query") {
            let pairs: Vec<(String, String)> = query
                .iter()
                .map(|(key, value)| (key.clone(), query_value(value)))
                .collect();
            request = request.query(&pairs);
        }
        if let Some(data) = &config.data {
            request = request.json(data);
        }

        let response = request.send().await.map_err(from_reqwest_error)?;
        let status = response.status();
        let headers = header_map(response.headers());
        let text = response.text().await.map_err(from_reqwest_error)?;

        if !status.is_success() {
            return Err(TransportError::status(
                status.as_u16(),
                format!("HTTP {} from {}", status.as_u16(), config.url),
            ));
        }

        Ok(json!({
            "status": status.as_u16(),
            "headers": headers,
            "body": parse_body(&text),
        }))
    }

    fn guard(&self) -> &UrlGuard {
        &self.guard
    }
}

fn to_reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
        HttpMethod::Head => reqwest::Method::HEAD,
        HttpMethod::Options => reqwest::Method::OPTIONS,
    }
}

fn from_reqwest_error(err: reqwest::Error) -> TransportError {
    let kind = if err.is_timeout() {
        TransportErrorKind::Timeout
    } else if err.is_connect() {
        TransportErrorKind::Connect
    } else if err.is_decode() {
        TransportErrorKind::Decode
    } else {
        TransportErrorKind::Other
    };
    let mut transport = TransportError::new(kind, err.to_string());
    if let Some(status) = err.status() {
        transport = transport.with_status(status.as_u16());
    }
    transport
}

/// Bodies that parse as JSON are forwarded as JSON; everything else is a
/// plain string.
fn parse_body(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn header_map(headers: &reqwest::header::HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|text| (name.as_str().to_string(), text.to_string()))
        })
        .collect()
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
