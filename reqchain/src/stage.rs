//! Stage model: the units a request chain is built from.
//!
//! A [`Stage`] is an explicit tagged union: [`RequestStage`] dispatches one
//! request through the adapter, [`ManagerStage`] drives a nested chain to
//! completion. Which variant a stage is gets fixed at construction time;
//! there is no shape-sniffing at execution time. The only place a stage
//! shape is still inspected dynamically is [`RequestStage::from_literal`],
//! which parses the serializable subset of the caller-facing literal form.

use crate::chain::RequestChain;
use crate::errors::UnknownStageError;
use crate::request::RequestDescriptor;
use crate::retry::RetryPolicy;
use futures::future::BoxFuture;
use serde_json::Value;
use std::fmt::Debug;
use std::future::Future;

/// Boxed nullary predicate deciding whether a stage runs.
pub type Precondition = Box<dyn Fn() -> bool + Send + Sync>;

/// Boxed async transform from a raw execution result to the stage's output.
pub type Mapper = Box<dyn Fn(Value) -> BoxFuture<'static, Result<Value, String>> + Send + Sync>;

/// Boxed factory building a request descriptor from the previous stage's
/// mapped result (`None` for the first stage).
pub type ConfigFactory =
    Box<dyn Fn(Option<&Value>) -> Result<RequestDescriptor, String> + Send + Sync>;

/// How a request stage obtains its descriptor.
pub enum ConfigSource {
    /// A fixed descriptor, cloned for every dispatch.
    Literal(RequestDescriptor),
    /// A factory fed the previous stage's mapped result.
    Factory(ConfigFactory),
}

impl ConfigSource {
    /// Resolves the descriptor for one dispatch attempt.
    ///
    /// Factories are re-invoked on every retry attempt with the same
    /// previous-result context, so a factory reading mutable external state
    /// may legitimately produce different descriptors across attempts.
    pub fn resolve(&self, previous: Option<&Value>) -> Result<RequestDescriptor, String> {
        match self {
            Self::Literal(descriptor) => Ok(descriptor.clone()),
            Self::Factory(factory) => factory(previous),
        }
    }
}

impl Debug for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Literal(descriptor) => f.debug_tuple("Literal").field(descriptor).finish(),
            Self::Factory(_) => f.debug_tuple("Factory").field(&"<factory>").finish(),
        }
    }
}

impl From<RequestDescriptor> for ConfigSource {
    fn from(descriptor: RequestDescriptor) -> Self {
        Self::Literal(descriptor)
    }
}

/// A stage that dispatches a single request through the adapter.
pub struct RequestStage {
    pub(crate) config: ConfigSource,
    pub(crate) precondition: Option<Precondition>,
    pub(crate) mapper: Option<Mapper>,
    pub(crate) retry_policy: Option<RetryPolicy>,
    pub(crate) result: Option<Value>,
}

impl RequestStage {
    /// Creates a stage from a literal descriptor or an existing source.
    #[must_use]
    pub fn new(config: impl Into<ConfigSource>) -> Self {
        Self {
            config: config.into(),
            precondition: None,
            mapper: None,
            retry_policy: None,
            result: None,
        }
    }

    /// Creates a stage whose descriptor is built from the previous stage's
    /// mapped result.
    #[must_use]
    pub fn from_factory<F>(factory: F) -> Self
    where
        F: Fn(Option<&Value>) -> Result<RequestDescriptor, String> + Send + Sync + 'static,
    {
        Self {
            config: ConfigSource::Factory(Box::new(factory)),
            precondition: None,
            mapper: None,
            retry_policy: None,
            result: None,
        }
    }

    /// Parses the serializable stage literal shape
    /// `{ "config": <descriptor>, "retry_policy"?: <policy> }`.
    ///
    /// Closure-valued slots (`precondition`, `mapper`, config factories) and
    /// nested chains cannot be expressed in JSON; attach them with the
    /// builder methods instead. A literal carrying a `request` key, both a
    /// `config` and a `request` key, or neither, matches no stage shape and
    /// is rejected.
    pub fn from_literal(literal: Value) -> Result<Self, UnknownStageError> {
        let Value::Object(mut fields) = literal else {
            return Err(UnknownStageError::new("stage literal must be a JSON object"));
        };

        let has_config = fields.contains_key("config");
        let has_request = fields.contains_key("request");
        if has_config && has_request {
            return Err(UnknownStageError::new(
                "stage literal carries both 'config' and 'request' keys",
            ));
        }
        if has_request {
            return Err(UnknownStageError::new(
                "nested chains cannot be expressed as literals; build a manager stage instead",
            ));
        }
        let Some(config) = fields.remove("config") else {
            return Err(UnknownStageError::new(
                "stage literal carries neither a 'config' nor a 'request' key",
            ));
        };

        let descriptor: RequestDescriptor = serde_json::from_value(config).map_err(|err| {
            UnknownStageError::new(format!("'config' is not a request descriptor: {err}"))
        })?;
        let retry_policy = match fields.remove("retry_policy") {
            Some(policy) => Some(serde_json::from_value(policy).map_err(|err| {
                UnknownStageError::new(format!("'retry_policy' did not parse: {err}"))
            })?),
            None => None,
        };

        let mut stage = Self::new(descriptor);
        stage.retry_policy = retry_policy;
        Ok(stage)
    }

    /// Sets the precondition; the stage is skipped when it returns false.
    #[must_use]
    pub fn with_precondition<F>(mut self, precondition: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.precondition = Some(Box::new(precondition));
        self
    }

    /// Sets a synchronous result mapper.
    #[must_use]
    pub fn with_mapper<F>(mut self, mapper: F) -> Self
    where
        F: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.mapper = Some(Box::new(move |value| Box::pin(std::future::ready(mapper(value)))));
        self
    }

    /// Sets an async result mapper.
    #[must_use]
    pub fn with_async_mapper<F, Fut>(mut self, mapper: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, String>> + Send + 'static,
    {
        self.mapper = Some(Box::new(move |value| Box::pin(mapper(value))));
        self
    }

    /// Attaches a retry policy to this stage's dispatch.
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Returns the mapped output cached by the most recent execution.
    #[must_use]
    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }
}

impl Debug for RequestStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestStage")
            .field("config", &self.config)
            .field("has_precondition", &self.precondition.is_some())
            .field("has_mapper", &self.mapper.is_some())
            .field("retry_policy", &self.retry_policy)
            .field("result", &self.result)
            .finish()
    }
}

/// A stage whose "request" is a nested chain rather than a single call.
///
/// The nested chain is an independent engine with its own adapter and
/// handler slots; it runs to full completion, handlers included, before the
/// parent chain proceeds. A mapper on this stage transforms the nested
/// chain's already-mapped final output.
pub struct ManagerStage {
    pub(crate) chain: RequestChain,
    pub(crate) precondition: Option<Precondition>,
    pub(crate) mapper: Option<Mapper>,
    pub(crate) result: Option<Value>,
}

impl ManagerStage {
    /// Wraps a nested chain as a stage.
    #[must_use]
    pub fn new(chain: RequestChain) -> Self {
        Self {
            chain,
            precondition: None,
            mapper: None,
            result: None,
        }
    }

    /// Sets the precondition; the stage is skipped when it returns false.
    #[must_use]
    pub fn with_precondition<F>(mut self, precondition: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.precondition = Some(Box::new(precondition));
        self
    }

    /// Sets a synchronous result mapper.
    #[must_use]
    pub fn with_mapper<F>(mut self, mapper: F) -> Self
    where
        F: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.mapper = Some(Box::new(move |value| Box::pin(std::future::ready(mapper(value)))));
        self
    }

    /// Sets an async result mapper.
    #[must_use]
    pub fn with_async_mapper<F, Fut>(mut self, mapper: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, String>> + Send + 'static,
    {
        self.mapper = Some(Box::new(move |value| Box::pin(mapper(value))));
        self
    }

    /// Returns the mapped output cached by the most recent execution.
    #[must_use]
    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }
}

impl Debug for ManagerStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagerStage")
            .field("chain", &self.chain)
            .field("has_precondition", &self.precondition.is_some())
            .field("has_mapper", &self.mapper.is_some())
            .field("result", &self.result)
            .finish()
    }
}

/// One node in a request chain.
#[derive(Debug)]
pub enum Stage {
    /// Dispatches a single request through the adapter.
    Request(RequestStage),
    /// Drives a nested chain to completion.
    Manager(ManagerStage),
}

impl Stage {
    /// Short label for log fields.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Request(_) => "request",
            Self::Manager(_) => "manager",
        }
    }

    /// Returns the mapped output cached by the most recent execution.
    #[must_use]
    pub fn result(&self) -> Option<&Value> {
        match self {
            Self::Request(stage) => stage.result(),
            Self::Manager(stage) => stage.result(),
        }
    }

    /// Evaluates the precondition; absent preconditions hold.
    pub(crate) fn precondition_holds(&self) -> bool {
        let precondition = match self {
            Self::Request(stage) => stage.precondition.as_ref(),
            Self::Manager(stage) => stage.precondition.as_ref(),
        };
        precondition.map_or(true, |check| check())
    }

    pub(crate) fn mapper(&self) -> Option<&Mapper> {
        match self {
            Self::Request(stage) => stage.mapper.as_ref(),
            Self::Manager(stage) => stage.mapper.as_ref(),
        }
    }

    pub(crate) fn set_result(&mut self, value: Value) {
        match self {
            Self::Request(stage) => stage.result = Some(value),
            Self::Manager(stage) => stage.result = Some(value),
        }
    }

    pub(crate) fn clear_result(&mut self) {
        match self {
            Self::Request(stage) => stage.result = None,
            Self::Manager(stage) => stage.result = None,
        }
    }
}

impl From<RequestStage> for Stage {
    fn from(stage: RequestStage) -> Self {
        Self::Request(stage)
    }
}

impl From<ManagerStage> for Stage {
    fn from(stage: ManagerStage) -> Self {
        Self::Manager(stage)
    }
}

impl From<RequestDescriptor> for Stage {
    fn from(descriptor: RequestDescriptor) -> Self {
        Self::Request(RequestStage::new(descriptor))
    }
}

impl From<RequestChain> for Stage {
    fn from(chain: RequestChain) -> Self {
        Self::Manager(ManagerStage::new(chain))
    }
}
