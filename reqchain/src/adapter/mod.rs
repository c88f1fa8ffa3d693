//! Adapter capability boundary.
//!
//! Concrete transports plug into the engine through [`RequestAdapter`].
//! The engine only ever calls [`RequestAdapter::execute_request`], the
//! provided composition point that runs the URL guard before delegating to
//! [`RequestAdapter::create_request`], so validation cannot be skipped by
//! reaching a transport directly.

use crate::errors::{ChainError, TransportError};
use crate::guard::UrlGuard;
use crate::request::RequestDescriptor;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

#[cfg(feature = "http")]
mod http;

#[cfg(feature = "http")]
pub use http::HttpAdapter;

/// Capability contract a concrete transport exposes to the engine.
#[async_trait]
pub trait RequestAdapter: Send + Sync {
    /// Performs the actual transport call.
    ///
    /// Implementations surface transport problems as errors rather than
    /// error-shaped values, and must be safe for concurrent invocation
    /// across unrelated requests.
    async fn create_request(&self, config: &RequestDescriptor) -> Result<Value, TransportError>;

    /// Transform hook over a raw execution result; identity by default.
    ///
    /// Typed narrowing lives on [`AdapterResultExt::result_as`].
    fn get_result(&self, raw: Value) -> Result<Value, ChainError> {
        Ok(raw)
    }

    /// The URL guard applied to every request this adapter issues.
    ///
    /// Guard configuration is supplied once at adapter construction.
    fn guard(&self) -> &UrlGuard;

    /// Validates the target URL, then dispatches.
    ///
    /// A rejected URL fails here with the validation error; zero transport
    /// attempts occur for it.
    async fn execute_request(&self, config: &RequestDescriptor) -> Result<Value, ChainError> {
        if let Err(err) = self.guard().validate(&config.url) {
            tracing::warn!(url = %config.url, violation = %err.violation, "Blocked request target");
            return Err(ChainError::Ssrf(err));
        }
        tracing::debug!(method = %config.method, url = %config.url, "Dispatching request");
        Ok(self.create_request(config).await?)
    }
}

/// Typed narrowing over [`RequestAdapter::get_result`].
pub trait AdapterResultExt: RequestAdapter {
    /// Applies the adapter's result transform, then deserializes into `T`.
    ///
    /// Decode failures surface as transport decode errors, which the
    /// default retry condition does not retry.
    fn result_as<T: DeserializeOwned>(&self, raw: Value) -> Result<T, ChainError> {
        let transformed = self.get_result(raw)?;
        serde_json::from_value(transformed)
            .map_err(|err| TransportError::decode(err.to_string()).into())
    }
}

impl<A: RequestAdapter + ?Sized> AdapterResultExt for A {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{SsrfViolation, TransportErrorKind};
    use crate::guard::UrlGuardConfig;
    use crate::testing::MockAdapter;
    use serde::Deserialize;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_result_is_identity_by_default() {
        let adapter = MockAdapter::new();
        let raw = json!({"status": 200, "body": {"id": 7}});
        assert_eq!(adapter.get_result(raw.clone()).expect("identity"), raw);
    }

    #[tokio::test]
    async fn test_result_as_narrows_to_typed_view() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Login {
            token: String,
        }

        let adapter = MockAdapter::new();
        let login: Login = adapter
            .result_as(json!({"token": "t-123"}))
            .expect("typed narrowing succeeds");
        assert_eq!(login, Login { token: "t-123".to_string() });
    }

    #[tokio::test]
    async fn test_result_as_surfaces_decode_errors() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Login {
            token: String,
        }

        let adapter = MockAdapter::new();
        let err = adapter
            .result_as::<Login>(json!({"unexpected": true}))
            .expect_err("shape mismatch fails");

        match err {
            ChainError::Transport(transport) => {
                assert_eq!(transport.kind, TransportErrorKind::Decode);
            }
            other => panic!("expected transport decode error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_execute_request_validates_before_dispatch() {
        let adapter = MockAdapter::new();
        let blocked = RequestDescriptor::get("http://127.0.0.1/admin");

        let err = adapter.execute_request(&blocked).await.expect_err("loopback blocked");
        match err {
            ChainError::Ssrf(ssrf) => assert_eq!(ssrf.violation, SsrfViolation::Loopback),
            other => panic!("expected ssrf error, got {other:?}"),
        }
        assert_eq!(adapter.call_count(), 0);
    }

    #[tokio::test]
    async fn test_execute_request_dispatches_when_guard_allows() {
        let adapter = MockAdapter::new()
            .with_guard(UrlGuard::new(UrlGuardConfig::new().with_allow_localhost(true)));
        let descriptor = RequestDescriptor::get("http://127.0.0.1/admin");

        let result = adapter.execute_request(&descriptor).await.expect("allowed through");
        assert_eq!(result.get("status"), Some(&json!(200)));
        assert_eq!(adapter.call_count(), 1);
    }
}
