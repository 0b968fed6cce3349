// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stacflow contributors

//! Stream executor
//!
//! Composes instantiated modules into one lazy pull chain per pipeline:
//! the source opens an item stream, each transformer wraps it in a mapping
//! stage, and the sink drains it. Stages pull only when the sink pulls, so
//! backpressure falls out of the composition. Item-level errors are routed
//! into the failure collector and never abort the pipeline; only sink
//! finalization errors (and composition mistakes) are fatal.

use std::sync::Arc;

use futures::stream::BoxStream;
use futures::StreamExt;

use crate::context::WorkflowContext;
use crate::errors::{StacflowError, StacflowResult};
use crate::modules::{item_id, Item, ItemStream, Module, Sink, Transform};

/// Accepted items between progress log lines
const PROGRESS_INTERVAL: u64 = 100;

/// One instantiated step, in execution order
pub struct ExecutionStep {
    pub id: String,
    pub module: Module,
}

/// Drives one composed pipeline to completion
pub struct StreamExecutor;

impl StreamExecutor {
    /// Run the pipeline formed by `steps` (already in topological order).
    ///
    /// Returns the number of items the sink successfully accepted.
    pub async fn run(
        steps: Vec<ExecutionStep>,
        ctx: Arc<WorkflowContext>,
    ) -> StacflowResult<u64> {
        let mut stream: Option<BoxStream<'static, Item>> = None;
        let mut sink: Option<(String, Box<dyn Sink>)> = None;

        for step in steps {
            let step_id = step.id;
            match step.module {
                Module::Source(mut source) => {
                    if stream.is_some() {
                        return Err(StacflowError::InvalidStep {
                            step: step_id,
                            reason: "pipeline already has a source".to_string(),
                        });
                    }
                    ctx.logger.info(format!("Executing step '{step_id}' (source)"));
                    let raw = source.fetch(ctx.clone()).await?;
                    stream = Some(Self::capture_source_errors(raw, ctx.clone(), step_id));
                }
                Module::Transform(transform) => {
                    let upstream = stream
                        .take()
                        .ok_or_else(|| StacflowError::MissingSource { step: step_id.clone() })?;
                    ctx.logger
                        .info(format!("Executing step '{step_id}' (transformer)"));
                    stream = Some(Self::wrap_transform(transform, upstream, ctx.clone(), step_id));
                }
                Module::Sink(s) => {
                    if stream.is_none() {
                        return Err(StacflowError::MissingSource { step: step_id });
                    }
                    if sink.is_some() {
                        return Err(StacflowError::InvalidStep {
                            step: step_id,
                            reason: "pipeline already has a sink".to_string(),
                        });
                    }
                    sink = Some((step_id, s));
                }
            }
        }

        let Some(stream) = stream else {
            return Err(StacflowError::ExecutionFailed {
                message: "Pipeline has no source step".to_string(),
                help: None,
            });
        };
        let Some((sink_id, mut sink)) = sink else {
            return Err(StacflowError::ExecutionFailed {
                message: "Pipeline has no sink step".to_string(),
                help: None,
            });
        };

        ctx.logger.info(format!("Executing step '{sink_id}' (sink)"));
        let count = Self::drain(sink.as_mut(), stream, &ctx, &sink_id).await;

        sink.finalize(&ctx).await.map_err(|e| StacflowError::FinalizeFailed {
            step: sink_id,
            reason: e.to_string(),
        })?;

        Ok(count)
    }

    /// Capture per-item source errors into the failure collector. The item
    /// never materialized, so it reports as `"unknown"`.
    fn capture_source_errors(
        raw: ItemStream,
        ctx: Arc<WorkflowContext>,
        step_id: String,
    ) -> BoxStream<'static, Item> {
        let stream = async_stream::stream! {
            let mut raw = raw;
            while let Some(next) = raw.next().await {
                match next {
                    Ok(item) => yield item,
                    Err(e) => {
                        ctx.logger.warn(format!(
                            "Source '{step_id}' failed to produce an item: {e}"
                        ));
                        ctx.failures().add("unknown", &e, &step_id);
                    }
                }
            }
        };
        stream.boxed()
    }

    /// Wrap a transformer into a lazy mapping stage: drop on `None`,
    /// capture errors, pass everything else downstream.
    fn wrap_transform(
        transform: Box<dyn Transform>,
        upstream: BoxStream<'static, Item>,
        ctx: Arc<WorkflowContext>,
        step_id: String,
    ) -> BoxStream<'static, Item> {
        let stream = async_stream::stream! {
            let mut upstream = upstream;
            while let Some(item) = upstream.next().await {
                let id = item_id(&item);
                match transform.modify(item, &ctx) {
                    Ok(Some(result)) => yield result,
                    Ok(None) => {
                        ctx.logger.debug(format!("Transformer '{step_id}' dropped item {id}"));
                    }
                    Err(e) => {
                        ctx.logger.warn(format!(
                            "Transformer '{step_id}' failed for item {id}: {e}"
                        ));
                        ctx.failures().add(&id, &e, &step_id);
                    }
                }
            }
        };
        stream.boxed()
    }

    /// Drain the stream into the sink, counting successful acceptances
    async fn drain(
        sink: &mut dyn Sink,
        stream: BoxStream<'static, Item>,
        ctx: &Arc<WorkflowContext>,
        step_id: &str,
    ) -> u64 {
        let mut stream = stream;
        let mut count: u64 = 0;

        while let Some(item) = stream.next().await {
            let id = item_id(&item);
            match sink.accept(item, ctx).await {
                Ok(()) => {
                    count += 1;
                    if count % PROGRESS_INTERVAL == 0 {
                        ctx.logger
                            .debug(format!("Processed {count} items through '{step_id}'"));
                    }
                }
                Err(e) => {
                    ctx.logger
                        .warn(format!("Sink '{step_id}' failed for item {id}: {e}"));
                    ctx.failures().add(&id, &e, step_id);
                }
            }
        }

        ctx.logger.info(format!("Step '{step_id}' processed {count} items"));
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::{CheckpointHandle, CheckpointStore};
    use crate::failures::FailureCollector;
    use crate::logging::{LogLevel, StepLogger};
    use async_trait::async_trait;
    use serde_json::{json, Map, Value};
    use tempfile::TempDir;

    fn make_context(root: &std::path::Path) -> Arc<WorkflowContext> {
        let store = CheckpointStore::new("wf", "default", root, true).unwrap();
        Arc::new(WorkflowContext::new(
            "wf",
            StepLogger::for_workflow("wf", LogLevel::Error),
            FailureCollector::new(),
            CheckpointHandle::new(store),
            Map::new(),
        ))
    }

    struct ListSource {
        items: Vec<StacflowResult<Value>>,
    }

    #[async_trait]
    impl crate::modules::Source for ListSource {
        async fn fetch(&mut self, _ctx: Arc<WorkflowContext>) -> StacflowResult<ItemStream> {
            let items = std::mem::take(&mut self.items);
            Ok(futures::stream::iter(items).boxed())
        }
    }

    struct DropOn {
        target: String,
    }

    impl Transform for DropOn {
        fn modify(&self, item: Item, _ctx: &WorkflowContext) -> StacflowResult<Option<Item>> {
            if item_id(&item) == self.target {
                Ok(None)
            } else {
                Ok(Some(item))
            }
        }
    }

    struct FailOn {
        target: String,
    }

    impl Transform for FailOn {
        fn modify(&self, item: Item, _ctx: &WorkflowContext) -> StacflowResult<Option<Item>> {
            if item_id(&item) == self.target {
                Err(StacflowError::data("bad"))
            } else {
                Ok(Some(item))
            }
        }
    }

    #[derive(Default)]
    struct CollectingSink {
        seen: Arc<std::sync::Mutex<Vec<String>>>,
        fail_on: Option<String>,
    }

    #[async_trait]
    impl Sink for CollectingSink {
        async fn accept(&mut self, item: Item, _ctx: &WorkflowContext) -> StacflowResult<()> {
            let id = item_id(&item);
            if self.fail_on.as_deref() == Some(id.as_str()) {
                return Err(StacflowError::data("sink rejected"));
            }
            self.seen.lock().unwrap().push(id);
            Ok(())
        }

        async fn finalize(&mut self, _ctx: &WorkflowContext) -> StacflowResult<()> {
            Ok(())
        }
    }

    fn items(ids: &[&str]) -> Vec<StacflowResult<Value>> {
        ids.iter().map(|id| Ok(json!({ "id": id }))).collect()
    }

    fn source_step(items: Vec<StacflowResult<Value>>) -> ExecutionStep {
        ExecutionStep {
            id: "source".into(),
            module: Module::Source(Box::new(ListSource { items })),
        }
    }

    fn sink_step() -> ExecutionStep {
        ExecutionStep {
            id: "sink".into(),
            module: Module::Sink(Box::new(CollectingSink::default())),
        }
    }

    #[tokio::test]
    async fn test_all_items_reach_sink_in_order() {
        let root = TempDir::new().unwrap();
        let ctx = make_context(root.path());
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));

        let steps = vec![
            source_step(items(&["a", "b", "c"])),
            ExecutionStep {
                id: "sink".into(),
                module: Module::Sink(Box::new(CollectingSink {
                    seen: seen.clone(),
                    fail_on: None,
                })),
            },
        ];
        let count = StreamExecutor::run(steps, ctx.clone()).await.unwrap();

        assert_eq!(count, 3);
        assert!(ctx.failures().is_empty());
        // Items reach the sink in source order
        assert_eq!(*seen.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_transformer_drop_is_not_a_failure() {
        let root = TempDir::new().unwrap();
        let ctx = make_context(root.path());

        let steps = vec![
            source_step(items(&["a", "b"])),
            ExecutionStep {
                id: "drop".into(),
                module: Module::Transform(Box::new(DropOn { target: "b".into() })),
            },
            sink_step(),
        ];
        let count = StreamExecutor::run(steps, ctx.clone()).await.unwrap();

        assert_eq!(count, 1);
        assert!(ctx.failures().is_empty());
    }

    #[tokio::test]
    async fn test_transformer_error_is_captured() {
        let root = TempDir::new().unwrap();
        let ctx = make_context(root.path());

        let steps = vec![
            source_step(items(&["a", "b", "c"])),
            ExecutionStep {
                id: "enrich".into(),
                module: Module::Transform(Box::new(FailOn { target: "b".into() })),
            },
            sink_step(),
        ];
        let count = StreamExecutor::run(steps, ctx.clone()).await.unwrap();

        assert_eq!(count, 2);
        let failures = ctx.failures().get_all();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].item_id, "b");
        assert_eq!(failures[0].step_id, "enrich");
        assert_eq!(failures[0].error_kind, "DataProcessing");
        assert!(failures[0].message.contains("bad"));
    }

    #[tokio::test]
    async fn test_source_error_is_captured_as_unknown() {
        let root = TempDir::new().unwrap();
        let ctx = make_context(root.path());

        let steps = vec![
            source_step(vec![
                Ok(json!({"id": "a"})),
                Err(StacflowError::data("read failed")),
                Ok(json!({"id": "b"})),
            ]),
            sink_step(),
        ];
        let count = StreamExecutor::run(steps, ctx.clone()).await.unwrap();

        assert_eq!(count, 2);
        let failures = ctx.failures().get_all();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].item_id, "unknown");
        assert_eq!(failures[0].step_id, "source");
    }

    #[tokio::test]
    async fn test_sink_error_is_captured_and_not_counted() {
        let root = TempDir::new().unwrap();
        let ctx = make_context(root.path());

        let steps = vec![
            source_step(items(&["a", "b"])),
            ExecutionStep {
                id: "sink".into(),
                module: Module::Sink(Box::new(CollectingSink {
                    fail_on: Some("a".into()),
                    ..Default::default()
                })),
            },
        ];
        let count = StreamExecutor::run(steps, ctx.clone()).await.unwrap();

        assert_eq!(count, 1);
        assert_eq!(ctx.failures().len(), 1);
        assert_eq!(ctx.failures().get_all()[0].step_id, "sink");
    }

    #[tokio::test]
    async fn test_transformer_before_source_is_fatal() {
        let root = TempDir::new().unwrap();
        let ctx = make_context(root.path());

        let steps = vec![ExecutionStep {
            id: "enrich".into(),
            module: Module::Transform(Box::new(DropOn { target: "x".into() })),
        }];
        let result = StreamExecutor::run(steps, ctx).await;

        assert!(matches!(result, Err(StacflowError::MissingSource { .. })));
    }

    #[tokio::test]
    async fn test_missing_sink_is_fatal() {
        let root = TempDir::new().unwrap();
        let ctx = make_context(root.path());

        let steps = vec![source_step(items(&["a"]))];
        let result = StreamExecutor::run(steps, ctx).await;

        assert!(matches!(result, Err(StacflowError::ExecutionFailed { .. })));
    }

    #[tokio::test]
    async fn test_finalize_error_is_fatal() {
        struct FailingFinalize;

        #[async_trait]
        impl Sink for FailingFinalize {
            async fn accept(&mut self, _item: Item, _ctx: &WorkflowContext) -> StacflowResult<()> {
                Ok(())
            }
            async fn finalize(&mut self, _ctx: &WorkflowContext) -> StacflowResult<()> {
                Err(StacflowError::checkpoint("disk full"))
            }
        }

        let root = TempDir::new().unwrap();
        let ctx = make_context(root.path());

        let steps = vec![
            source_step(items(&["a"])),
            ExecutionStep {
                id: "sink".into(),
                module: Module::Sink(Box::new(FailingFinalize)),
            },
        ];
        let result = StreamExecutor::run(steps, ctx).await;

        assert!(matches!(result, Err(StacflowError::FinalizeFailed { .. })));
    }
}
