//! Testing utilities for request chains.
//!
//! This module provides a scripted mock adapter for exercising chains
//! without any network access.

mod mocks;

pub use mocks::MockAdapter;
