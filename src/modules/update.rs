// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stacflow contributors

//! Update module
//!
//! Modifies existing STAC items: applies a patch document, dot-path field
//! updates (with `*` wildcard fan-out over object keys and template
//! variables), field removals, and an automatic `properties.updated`
//! timestamp. The patch file is loaded once at construction; `modify`
//! itself stays free of I/O.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

use super::{parse_config, Item, Module, ModuleConfig, Transform};
use crate::context::WorkflowContext;
use crate::errors::{StacflowError, StacflowResult};
use crate::logging::StepLogger;
use crate::utils::field_ops::{
    deep_merge, expand_wildcard_paths, remove_nested, set_nested, MergeStrategy,
};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
enum PatchMode {
    /// Deep-merge the patch into the item (patch wins)
    #[default]
    Merge,
    /// Replace the entire item with the patch
    Replace,
}

#[derive(Debug, Deserialize)]
struct UpdateConfig {
    /// Dot-path → value assignments; paths may contain one `*` segment
    #[serde(default)]
    updates: Option<Map<String, Value>>,
    /// Dot paths to remove
    #[serde(default)]
    removes: Option<Vec<String>>,
    /// JSON document applied to every item
    #[serde(default)]
    patch_file: Option<PathBuf>,
    #[serde(default)]
    mode: PatchMode,
    #[serde(default = "default_true")]
    auto_update_timestamp: bool,
}

/// Transformer that applies configured updates to each item
pub struct UpdateModule {
    config: UpdateConfig,
    patch: Option<Value>,
    logger: Option<StepLogger>,
}

impl UpdateModule {
    pub fn construct(config: &ModuleConfig) -> StacflowResult<Module> {
        let config: UpdateConfig = parse_config(config)?;

        let patch = match &config.patch_file {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    StacflowError::FileReadError { path: path.clone(), error: e.to_string() }
                })?;
                Some(serde_json::from_str(&text)?)
            }
            None => None,
        };

        Ok(Module::Transform(Box::new(Self { config, patch, logger: None })))
    }
}

impl Transform for UpdateModule {
    fn modify(&self, item: Item, _ctx: &WorkflowContext) -> StacflowResult<Option<Item>> {
        let mut item = item;

        if let Some(patch) = &self.patch {
            match self.config.mode {
                PatchMode::Replace => item = patch.clone(),
                PatchMode::Merge => deep_merge(&mut item, patch, MergeStrategy::Overwrite),
            }
        }

        if let Some(updates) = &self.config.updates {
            let expanded = expand_wildcard_paths(updates, &item, &HashMap::new());
            for (path, value) in expanded {
                set_nested(&mut item, &path, value);
            }
        }

        if let Some(removes) = &self.config.removes {
            for path in removes {
                remove_nested(&mut item, path);
            }
        }

        if self.config.auto_update_timestamp {
            let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
            set_nested(&mut item, "properties.updated", Value::String(now));
        }

        Ok(Some(item))
    }

    fn set_logger(&mut self, logger: StepLogger) {
        self.logger = Some(logger);
    }
}
