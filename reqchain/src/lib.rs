//! # Reqchain
//!
//! An engine for chained, dependent HTTP requests.
//!
//! Reqchain runs an ordered list of request stages where each stage's request
//! can be built from the result of the stage before it, with support for:
//!
//! - **Dependent configuration**: Build a stage's request descriptor from the
//!   previous stage's mapped result via a config factory
//! - **Result mappers**: Reshape each raw result, synchronously or
//!   asynchronously, before it is cached and handed to the next stage
//! - **Per-stage retries**: Exponential backoff, delay caps, jitter, and
//!   custom retry conditions for transport failures
//! - **Guarded dispatch**: Every target URL passes an SSRF guard before any
//!   connection is opened
//! - **Nested chains**: A whole chain can run as a single stage of a parent
//!   chain and collapse to its final result
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use reqchain::adapter::HttpAdapter;
//! use reqchain::prelude::*;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! // Log in, then fetch the caller's profile with the returned token.
//! let mut chain = RequestChain::begin(
//!     RequestDescriptor::post("https://api.example.com/login", json!({"user": "ada"})),
//!     Arc::new(HttpAdapter::new()),
//! )
//! .next(RequestStage::from_factory(|login| {
//!     let token = login
//!         .and_then(|value| value["body"]["token"].as_str())
//!         .ok_or_else(|| "login response carries no token".to_string())?;
//!     Ok(RequestDescriptor::get("https://api.example.com/me")
//!         .with_header("Authorization", format!("Bearer {token}")))
//! }));
//!
//! let profile = chain.execute().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod adapter;
pub mod chain;
pub mod errors;
pub mod guard;
pub mod request;
pub mod retry;
pub mod stage;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::adapter::{AdapterResultExt, RequestAdapter};
    pub use crate::chain::{ChainOutput, RequestChain};
    pub use crate::errors::{
        ChainError, ConfigResolutionError, MapperError, SsrfValidationError,
        SsrfViolation, TransportError, TransportErrorKind, UnknownStageError,
    };
    pub use crate::guard::{UrlGuard, UrlGuardConfig};
    pub use crate::request::{HttpMethod, RequestDescriptor};
    pub use crate::retry::{RetryDecision, RetryPolicy};
    pub use crate::stage::{ConfigSource, ManagerStage, RequestStage, Stage};
}
