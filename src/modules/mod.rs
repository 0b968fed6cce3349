// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stacflow contributors

//! Pipeline modules
//!
//! Every module plays exactly one of three roles, declared by the variant
//! of [`Module`] its constructor returns:
//!
//! - [`Source`] produces a lazy, finite stream of items.
//! - [`Transform`] maps one item to a replacement item, or drops it.
//! - [`Sink`] consumes items and flushes durable state on finalize.
//!
//! Items are opaque JSON trees; the engine only reads the `id` field, and
//! an item without one reports as `"unknown"`.

pub mod registry;

mod extension;
mod ingest;
mod output;
mod scaffold;
mod seed;
mod static_source;
mod transform;
mod update;
mod validate;

pub use extension::ExtensionModule;
pub use ingest::IngestModule;
pub use output::OutputModule;
pub use registry::ModuleRegistry;
pub use scaffold::ScaffoldModule;
pub use seed::SeedModule;
pub use static_source::StaticSourceModule;
pub use transform::TransformModule;
pub use update::UpdateModule;
pub use validate::ValidateModule;

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::context::WorkflowContext;
use crate::errors::{StacflowError, StacflowResult};
use crate::logging::StepLogger;

/// A single record flowing through the pipeline
pub type Item = Value;

/// Lazy, finite sequence of items produced by a source. Production may
/// suspend on I/O; per-item errors flow through as `Err` and are captured
/// by the executor.
pub type ItemStream = BoxStream<'static, StacflowResult<Item>>;

/// Opaque configuration mapping handed to module constructors
pub type ModuleConfig = serde_json::Map<String, Value>;

/// Produces items from an external or local source
#[async_trait]
pub trait Source: Send + Sync {
    /// Open the item stream for this pipeline run
    async fn fetch(&mut self, ctx: Arc<WorkflowContext>) -> StacflowResult<ItemStream>;

    /// Receive a step-specific logger before first use
    fn set_logger(&mut self, _logger: StepLogger) {}
}

/// Transforms or validates a single item
///
/// `modify` is synchronous and must not block on external I/O; bounded
/// local reads belong in the constructor.
pub trait Transform: Send + Sync {
    /// Return a replacement item, `Ok(None)` to drop the item silently,
    /// or an error to record an item-level failure.
    fn modify(&self, item: Item, ctx: &WorkflowContext) -> StacflowResult<Option<Item>>;

    /// Receive a step-specific logger before first use
    fn set_logger(&mut self, _logger: StepLogger) {}
}

/// Finalizes and writes items to storage
#[async_trait]
pub trait Sink: Send + Sync {
    /// Consume one item; may buffer internally
    async fn accept(&mut self, item: Item, ctx: &WorkflowContext) -> StacflowResult<()>;

    /// Flush all buffered state to durable storage
    async fn finalize(&mut self, ctx: &WorkflowContext) -> StacflowResult<()>;

    /// Receive a step-specific logger before first use
    fn set_logger(&mut self, _logger: StepLogger) {}
}

/// Step role, used for pipeline-shape validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleRole {
    Source,
    Transform,
    Sink,
}

impl std::fmt::Display for ModuleRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Source => write!(f, "source"),
            Self::Transform => write!(f, "transformer"),
            Self::Sink => write!(f, "sink"),
        }
    }
}

/// An instantiated module, tagged with its role
pub enum Module {
    Source(Box<dyn Source>),
    Transform(Box<dyn Transform>),
    Sink(Box<dyn Sink>),
}

impl Module {
    pub fn role(&self) -> ModuleRole {
        match self {
            Self::Source(_) => ModuleRole::Source,
            Self::Transform(_) => ModuleRole::Transform,
            Self::Sink(_) => ModuleRole::Sink,
        }
    }

    /// Inject a step-specific logger into the underlying module
    pub fn set_logger(&mut self, logger: StepLogger) {
        match self {
            Self::Source(m) => m.set_logger(logger),
            Self::Transform(m) => m.set_logger(logger),
            Self::Sink(m) => m.set_logger(logger),
        }
    }
}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Module::{}", self.role())
    }
}

/// Item id for reporting and checkpointing. Missing or non-string ids
/// degrade to the literal `"unknown"`; processing continues.
pub fn item_id(item: &Item) -> String {
    item.get("id")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string()
}

/// Deserialize a module's opaque config mapping into its typed config
pub(crate) fn parse_config<T: DeserializeOwned>(config: &ModuleConfig) -> StacflowResult<T> {
    serde_json::from_value(Value::Object(config.clone()))
        .map_err(|e| StacflowError::Json { message: e.to_string() })
}
