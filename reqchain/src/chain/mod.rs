//! Chain building and execution.
//!
//! This module provides:
//! - The [`RequestChain`] engine
//! - Handler slots and the success output shapes they observe

mod engine;
mod handlers;

pub use engine::RequestChain;
pub use handlers::{ChainOutput, ErrorHandler, FinishHandler, ResultHandler};
