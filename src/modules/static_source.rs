// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stacflow contributors

//! Static source module
//!
//! Yields a list of literal items straight from the step config. Mostly
//! useful for tests and demo workflows.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;

use super::{parse_config, Item, ItemStream, Module, ModuleConfig, Source};
use crate::context::WorkflowContext;
use crate::errors::StacflowResult;
use crate::logging::StepLogger;

#[derive(Debug, Deserialize)]
struct StaticSourceConfig {
    items: Vec<Item>,
}

/// Source that yields static items from config
pub struct StaticSourceModule {
    config: StaticSourceConfig,
    logger: Option<StepLogger>,
}

impl StaticSourceModule {
    pub fn construct(config: &ModuleConfig) -> StacflowResult<Module> {
        Ok(Module::Source(Box::new(Self {
            config: parse_config(config)?,
            logger: None,
        })))
    }
}

#[async_trait]
impl Source for StaticSourceModule {
    async fn fetch(&mut self, _ctx: Arc<WorkflowContext>) -> StacflowResult<ItemStream> {
        if let Some(logger) = &self.logger {
            logger.debug(format!("Yielding {} static items", self.config.items.len()));
        }
        let items = self.config.items.clone();
        Ok(futures::stream::iter(items.into_iter().map(Ok)).boxed())
    }

    fn set_logger(&mut self, logger: StepLogger) {
        self.logger = Some(logger);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_construct_requires_items() {
        assert!(StaticSourceModule::construct(&ModuleConfig::new()).is_err());

        let mut config = ModuleConfig::new();
        config.insert("items".into(), json!([{"id": "a"}]));
        assert!(StaticSourceModule::construct(&config).is_ok());
    }
}
