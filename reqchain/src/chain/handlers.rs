//! Handler slots and the values they observe.
//!
//! Handlers are side-effecting observers: the error handler never converts
//! a failure into a success, the result handler fires only on success, and
//! the finish handler fires exactly once on every path, last.

use crate::errors::ChainError;
use serde_json::Value;
use std::fmt::Debug;

/// Value handed to a result handler on the success path.
#[derive(Debug, Clone, PartialEq)]
pub enum ChainOutput {
    /// The chain's final value, as returned by `execute`.
    Final(Value),
    /// Every stage's output in append order, as returned by `execute_all`.
    All(Vec<Value>),
}

/// Boxed observer of a chain failure.
pub type ErrorHandler = Box<dyn Fn(&ChainError) + Send + Sync>;

/// Boxed observer of a chain success.
pub type ResultHandler = Box<dyn Fn(&ChainOutput) + Send + Sync>;

/// Boxed cleanup hook, invoked exactly once per execution.
pub type FinishHandler = Box<dyn Fn() + Send + Sync>;

/// The three optional handler slots of a chain.
#[derive(Default)]
pub(crate) struct HandlerSlots {
    pub(crate) on_error: Option<ErrorHandler>,
    pub(crate) on_result: Option<ResultHandler>,
    pub(crate) on_finish: Option<FinishHandler>,
}

impl HandlerSlots {
    pub(crate) fn notify_error(&self, error: &ChainError) {
        if let Some(handler) = &self.on_error {
            handler(error);
        }
    }

    pub(crate) fn notify_result(&self, output: &ChainOutput) {
        if let Some(handler) = &self.on_result {
            handler(output);
        }
    }

    pub(crate) fn notify_finish(&self) {
        if let Some(handler) = &self.on_finish {
            handler();
        }
    }
}

impl Debug for HandlerSlots {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerSlots")
            .field("has_error_handler", &self.on_error.is_some())
            .field("has_result_handler", &self.on_result.is_some())
            .field("has_finish_handler", &self.on_finish.is_some())
            .finish()
    }
}
