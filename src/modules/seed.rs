// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stacflow contributors

//! Seed module
//!
//! Yields skeleton items from a configured list and/or a JSON source file.
//! String entries normalize to `{"id": …}`; configured defaults act as the
//! merge base so entry fields win. When the context data bag carries a
//! `collection_id` (matrix runs), items without a `collection` inherit it.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::{parse_config, ItemStream, Module, ModuleConfig, Source};
use crate::context::WorkflowContext;
use crate::errors::{StacflowError, StacflowResult};
use crate::logging::StepLogger;
use crate::utils::field_ops::{deep_merge, MergeStrategy};

#[derive(Debug, Deserialize)]
struct SeedConfig {
    #[serde(default)]
    items: Option<Vec<Value>>,
    #[serde(default)]
    source_file: Option<PathBuf>,
    #[serde(default)]
    defaults: Option<Map<String, Value>>,
}

/// Source that yields skeleton items from config or a source file
pub struct SeedModule {
    config: SeedConfig,
    logger: Option<StepLogger>,
}

impl SeedModule {
    pub fn construct(config: &ModuleConfig) -> StacflowResult<Module> {
        Ok(Module::Source(Box::new(Self {
            config: parse_config(config)?,
            logger: None,
        })))
    }
}

#[async_trait]
impl Source for SeedModule {
    async fn fetch(&mut self, ctx: Arc<WorkflowContext>) -> StacflowResult<ItemStream> {
        let logger = self
            .logger
            .clone()
            .unwrap_or_else(|| ctx.logger.for_step("seed", None));
        let step_id = logger.step_id().to_string();
        let configured = self.config.items.clone().unwrap_or_default();
        let source_file = self.config.source_file.clone();
        let defaults = self.config.defaults.clone();

        let stream = async_stream::stream! {
            logger.info(format!(
                "Starting seed generation. Configured items: {}",
                configured.len()
            ));

            let mut entries = configured;
            if let Some(path) = source_file {
                match tokio::fs::read_to_string(&path).await {
                    Ok(text) => match serde_json::from_str::<Value>(&text) {
                        Ok(Value::Array(file_items)) => {
                            logger.debug(format!(
                                "Loaded {} items from {}",
                                file_items.len(),
                                path.display()
                            ));
                            entries.extend(file_items);
                        }
                        Ok(_) => {
                            ctx.failures().add_message(
                                "global",
                                format!("Seed source file '{}' must contain an array", path.display()),
                                &step_id,
                            );
                        }
                        Err(e) => {
                            ctx.failures().add_message(
                                "global",
                                format!("Failed to parse seed source file '{}': {e}", path.display()),
                                &step_id,
                            );
                        }
                    },
                    Err(_) => {
                        logger.warn(format!("Source file not found: {}", path.display()));
                        ctx.failures().add_message(
                            "global",
                            format!("Source file not found: {}", path.display()),
                            &step_id,
                        );
                    }
                }
            }

            let mut count: usize = 0;
            for entry in entries {
                let item = match entry {
                    Value::String(id) => json!({ "id": id }),
                    Value::Object(map) => Value::Object(map),
                    other => {
                        yield Err(StacflowError::data(format!(
                            "Invalid seed entry, expected string or object: {other}"
                        )));
                        continue;
                    }
                };

                // Defaults are the base, entry fields win
                let mut seeded = match &defaults {
                    Some(defaults) => {
                        let mut base = Value::Object(defaults.clone());
                        deep_merge(&mut base, &item, MergeStrategy::Overwrite);
                        base
                    }
                    None => item,
                };

                if seeded.get("collection").is_none() {
                    if let Some(collection) = ctx.data_str("collection_id") {
                        seeded["collection"] = json!(collection);
                    }
                }

                count += 1;
                yield Ok(seeded);
            }

            logger.info(format!("Seed generation complete. Total {count} items yielded"));
        };

        Ok(stream.boxed())
    }

    fn set_logger(&mut self, logger: StepLogger) {
        self.logger = Some(logger);
    }
}
