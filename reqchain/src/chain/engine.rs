//! The chain engine: stage sequencing, result propagation, handler dispatch.

use super::handlers::{ChainOutput, HandlerSlots};
use crate::adapter::RequestAdapter;
use crate::errors::{ChainError, ConfigResolutionError, MapperError};
use crate::retry::run_with_policy;
use crate::stage::Stage;
use futures::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// Runs an ordered list of stages, threading each stage's mapped output
/// into the next stage as its "previous result".
///
/// A chain is a mutable builder until execution: stages are appended with
/// [`next`](Self::next) and keep their append order. Execution borrows the
/// chain mutably, so one instance can never run concurrently with itself;
/// independent chains (including nested ones) run concurrently freely when
/// their adapters allow it.
///
/// Stage result caches are cleared when a run starts and overwritten as
/// stages complete, so re-executing the same chain always reflects the
/// latest run.
pub struct RequestChain {
    stages: Vec<Stage>,
    adapter: Arc<dyn RequestAdapter>,
    handlers: HandlerSlots,
}

struct WalkOutcome {
    outputs: Vec<Value>,
    final_value: Value,
}

impl RequestChain {
    /// Creates a chain seeded with one stage and an explicit adapter.
    #[must_use]
    pub fn begin(stage: impl Into<Stage>, adapter: Arc<dyn RequestAdapter>) -> Self {
        Self {
            stages: vec![stage.into()],
            adapter,
            handlers: HandlerSlots::default(),
        }
    }

    /// Appends a stage.
    #[must_use]
    pub fn next(mut self, stage: impl Into<Stage>) -> Self {
        self.stages.push(stage.into());
        self
    }

    /// Replaces the adapter for every subsequent execution.
    #[must_use]
    pub fn with_adapter(mut self, adapter: Arc<dyn RequestAdapter>) -> Self {
        self.adapter = adapter;
        self
    }

    /// Registers the failure observer; replaces any previous registration.
    ///
    /// The handler is invoked exactly once with the failure and never
    /// suppresses it; the execution still ends in that failure.
    #[must_use]
    pub fn with_error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&ChainError) + Send + Sync + 'static,
    {
        self.handlers.on_error = Some(Box::new(handler));
        self
    }

    /// Registers the success observer; replaces any previous registration.
    ///
    /// Receives [`ChainOutput::Final`] from [`execute`](Self::execute) and
    /// [`ChainOutput::All`] from [`execute_all`](Self::execute_all).
    #[must_use]
    pub fn with_result_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&ChainOutput) + Send + Sync + 'static,
    {
        self.handlers.on_result = Some(Box::new(handler));
        self
    }

    /// Registers the cleanup hook; replaces any previous registration.
    ///
    /// Runs exactly once per execution, success or failure, after every
    /// other handler.
    #[must_use]
    pub fn with_finish_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.handlers.on_finish = Some(Box::new(handler));
        self
    }

    /// Number of stages currently appended.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// The appended stages, in order; cached results are readable here
    /// after a run.
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Runs every stage in order and returns the chain's final value.
    ///
    /// The final value is the last mapped output a stage produced; stages
    /// skipped by their precondition contribute nothing, and a chain whose
    /// stages all skipped yields `Value::Null`.
    pub async fn execute(&mut self) -> Result<Value, ChainError> {
        match self.run().await {
            Ok(walk) => {
                self.handlers.notify_result(&ChainOutput::Final(walk.final_value.clone()));
                self.handlers.notify_finish();
                Ok(walk.final_value)
            }
            Err(error) => {
                self.handlers.notify_error(&error);
                self.handlers.notify_finish();
                Err(error)
            }
        }
    }

    /// Runs every stage in order and returns each stage's output,
    /// index-aligned to append order.
    ///
    /// A stage skipped by its precondition holds its index with
    /// `Value::Null`.
    pub async fn execute_all(&mut self) -> Result<Vec<Value>, ChainError> {
        match self.run().await {
            Ok(walk) => {
                self.handlers.notify_result(&ChainOutput::All(walk.outputs.clone()));
                self.handlers.notify_finish();
                Ok(walk.outputs)
            }
            Err(error) => {
                self.handlers.notify_error(&error);
                self.handlers.notify_finish();
                Err(error)
            }
        }
    }

    // Boxed so a manager stage's nested chain can recurse through
    // `execute` without an infinitely sized future type.
    fn run(&mut self) -> BoxFuture<'_, Result<WalkOutcome, ChainError>> {
        Box::pin(async move {
            let run_id = Uuid::new_v4();
            tracing::debug!(run_id = %run_id, stages = self.stages.len(), "Chain run starting");
            let outcome = self.walk(run_id).await;
            match &outcome {
                Ok(_) => tracing::debug!(run_id = %run_id, "Chain run completed"),
                Err(error) => tracing::warn!(run_id = %run_id, error = %error, "Chain run aborted"),
            }
            outcome
        })
    }

    async fn walk(&mut self, run_id: Uuid) -> Result<WalkOutcome, ChainError> {
        for stage in &mut self.stages {
            stage.clear_result();
        }

        let adapter = Arc::clone(&self.adapter);
        let mut outputs = Vec::with_capacity(self.stages.len());
        let mut previous: Option<Value> = None;

        for (stage_index, stage) in self.stages.iter_mut().enumerate() {
            if !stage.precondition_holds() {
                tracing::debug!(
                    run_id = %run_id,
                    stage_index,
                    kind = stage.kind(),
                    "Stage skipped by precondition"
                );
                outputs.push(Value::Null);
                continue;
            }

            let raw = match stage {
                Stage::Request(request) => {
                    let policy = request.retry_policy.clone();
                    let config = &request.config;
                    let previous_ref = previous.as_ref();
                    run_with_policy(policy.as_ref(), |_attempt| {
                        let resolved = config
                            .resolve(previous_ref)
                            .map_err(|message| ConfigResolutionError::new(stage_index, message));
                        let adapter = Arc::clone(&adapter);
                        async move {
                            let descriptor = resolved?;
                            adapter.execute_request(&descriptor).await
                        }
                    })
                    .await?
                }
                Stage::Manager(manager) => manager.chain.execute().await?,
            };

            let mapped = match stage.mapper() {
                Some(mapper) => mapper(raw)
                    .await
                    .map_err(|message| MapperError::new(stage_index, message))?,
                None => raw,
            };

            tracing::debug!(
                run_id = %run_id,
                stage_index,
                kind = stage.kind(),
                "Stage completed"
            );
            stage.set_result(mapped.clone());
            outputs.push(mapped.clone());
            previous = Some(mapped);
        }

        Ok(WalkOutcome {
            outputs,
            final_value: previous.unwrap_or(Value::Null),
        })
    }
}

impl std::fmt::Debug for RequestChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestChain")
            .field("stages", &self.stages)
            .field("handlers", &self.handlers)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::RequestDescriptor;
    use crate::stage::{ManagerStage, RequestStage};
    use crate::testing::MockAdapter;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_begin_and_next_preserve_order() {
        let adapter = Arc::new(MockAdapter::new());
        let nested = RequestChain::begin(
            RequestDescriptor::get("https://inner.example.com"),
            Arc::clone(&adapter) as Arc<dyn RequestAdapter>,
        );

        let chain = RequestChain::begin(RequestDescriptor::get("https://a.example.com"), adapter)
            .next(RequestStage::from_factory(|_| {
                Ok(RequestDescriptor::get("https://b.example.com"))
            }))
            .next(ManagerStage::new(nested));

        assert_eq!(chain.stage_count(), 3);
        let kinds: Vec<_> = chain.stages().iter().map(Stage::kind).collect();
        assert_eq!(kinds, ["request", "request", "manager"]);
    }

    #[tokio::test]
    async fn test_with_adapter_replaces_transport() {
        let first = Arc::new(MockAdapter::new());
        let second = Arc::new(MockAdapter::new());

        let mut chain = RequestChain::begin(
            RequestDescriptor::get("https://api.example.com"),
            Arc::clone(&first) as Arc<dyn RequestAdapter>,
        )
        .with_adapter(Arc::clone(&second) as Arc<dyn RequestAdapter>);

        chain.execute().await.expect("chain succeeds");

        assert_eq!(first.call_count(), 0);
        assert_eq!(second.call_count(), 1);
    }

    #[tokio::test]
    async fn test_handler_reregistration_replaces_slot() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let first_count = Arc::clone(&first);
        let second_count = Arc::clone(&second);
        let mut chain = RequestChain::begin(
            RequestDescriptor::get("https://api.example.com"),
            Arc::new(MockAdapter::new()),
        )
        .with_finish_handler(move || {
            first_count.fetch_add(1, Ordering::SeqCst);
        })
        .with_finish_handler(move || {
            second_count.fetch_add(1, Ordering::SeqCst);
        });

        chain.execute().await.expect("chain succeeds");

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_debug_hides_adapter() {
        let chain = RequestChain::begin(
            RequestDescriptor::get("https://api.example.com"),
            Arc::new(MockAdapter::new()),
        );

        let rendered = format!("{chain:?}");
        assert!(rendered.contains("RequestChain"));
        assert!(rendered.contains("stages"));
    }
}
