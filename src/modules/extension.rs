// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stacflow contributors

//! Extension module
//!
//! Generic STAC extension application: registers the extension's schema
//! URI on the item and merges configured properties into `properties`.

use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::{parse_config, Item, Module, ModuleConfig, Transform};
use crate::context::WorkflowContext;
use crate::errors::StacflowResult;
use crate::logging::StepLogger;
use crate::utils::field_ops::set_nested;

#[derive(Debug, Deserialize)]
struct ExtensionConfig {
    /// Extension schema URI appended to `stac_extensions`
    schema_uri: String,
    /// Extension properties merged into the item's `properties`
    #[serde(default)]
    properties: Option<Map<String, Value>>,
}

/// Transformer that applies a generic extension to each item
pub struct ExtensionModule {
    config: ExtensionConfig,
    logger: Option<StepLogger>,
}

impl ExtensionModule {
    pub fn construct(config: &ModuleConfig) -> StacflowResult<Module> {
        Ok(Module::Transform(Box::new(Self {
            config: parse_config(config)?,
            logger: None,
        })))
    }
}

impl Transform for ExtensionModule {
    fn modify(&self, item: Item, _ctx: &WorkflowContext) -> StacflowResult<Option<Item>> {
        if let Some(logger) = &self.logger {
            logger.debug(format!("Applying extension {}", self.config.schema_uri));
        }

        let mut item = item;

        let schemas = item
            .as_object_mut()
            .map(|map| {
                map.entry("stac_extensions".to_string())
                    .or_insert_with(|| json!([]))
            })
            .and_then(Value::as_array_mut);
        if let Some(schemas) = schemas {
            let uri = json!(self.config.schema_uri);
            if !schemas.contains(&uri) {
                schemas.push(uri);
            }
        }

        if let Some(properties) = &self.config.properties {
            for (key, value) in properties {
                set_nested(&mut item, &format!("properties.{key}"), value.clone());
            }
        }

        Ok(Some(item))
    }

    fn set_logger(&mut self, logger: StepLogger) {
        self.logger = Some(logger);
    }
}
