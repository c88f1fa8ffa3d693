//! Request descriptors: what a single chain stage asks the transport to do.
//!
//! A [`RequestDescriptor`] is the unit of configuration a stage resolves to
//! before dispatch. Adapter-specific knobs ride in the flattened extension
//! bag so the core model stays closed while adapters stay open.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// HTTP method for a request descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// HTTP GET.
    Get,
    /// HTTP POST.
    Post,
    /// HTTP PUT.
    Put,
    /// HTTP PATCH.
    Patch,
    /// HTTP DELETE.
    Delete,
    /// HTTP HEAD.
    Head,
    /// HTTP OPTIONS.
    Options,
}

impl HttpMethod {
    /// Returns the canonical uppercase method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

impl Default for HttpMethod {
    fn default() -> Self {
        Self::Get
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Describes a single HTTP request for an adapter to dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestDescriptor {
    /// Target URL.
    pub url: String,
    /// HTTP method (GET when omitted).
    #[serde(default)]
    pub method: HttpMethod,
    /// Optional request body; HTTP adapters serialize it as JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Request headers.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
    /// Open extension bag for adapter-specific fields
    /// (e.g. `timeout_ms`, `query`).
    #[serde(flatten)]
    pub extensions: HashMap<String, Value>,
}

impl RequestDescriptor {
    /// Creates a descriptor for the given URL with method GET.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: HttpMethod::Get,
            data: None,
            headers: HashMap::new(),
            extensions: HashMap::new(),
        }
    }

    /// Creates a GET descriptor.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(url)
    }

    /// Creates a POST descriptor with a JSON body.
    #[must_use]
    pub fn post(url: impl Into<String>, data: Value) -> Self {
        Self::new(url).with_method(HttpMethod::Post).with_data(data)
    }

    /// Sets the HTTP method.
    #[must_use]
    pub const fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Adds an adapter-specific extension field.
    #[must_use]
    pub fn with_extension(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extensions.insert(key.into(), value);
        self
    }

    /// Looks up an extension field.
    #[must_use]
    pub fn extension(&self, key: &str) -> Option<&Value> {
        self.extensions.get(key)
    }
}
