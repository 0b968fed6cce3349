// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stacflow contributors

//! Validate module
//!
//! Structural validation of STAC items. An invalid item is an item-level
//! error: the executor records it and the item leaves the stream. `strict`
//! widens the rule set with collection/links/assets checks.

use serde::Deserialize;
use serde_json::Value;

use super::{item_id, parse_config, Item, Module, ModuleConfig, Transform};
use crate::context::WorkflowContext;
use crate::errors::{StacflowError, StacflowResult};
use crate::logging::StepLogger;

#[derive(Debug, Deserialize, Default)]
struct ValidateConfig {
    #[serde(default)]
    strict: bool,
}

/// Transformer that validates STAC item structure
pub struct ValidateModule {
    config: ValidateConfig,
    logger: Option<StepLogger>,
}

impl ValidateModule {
    pub fn construct(config: &ModuleConfig) -> StacflowResult<Module> {
        Ok(Module::Transform(Box::new(Self {
            config: parse_config(config)?,
            logger: None,
        })))
    }

    fn check(&self, item: &Item) -> Vec<String> {
        let mut errors = Vec::new();

        if item.get("type").and_then(Value::as_str) != Some("Feature") {
            errors.push("'type' must be 'Feature'".to_string());
        }
        if item
            .get("stac_version")
            .and_then(Value::as_str)
            .map_or(true, str::is_empty)
        {
            errors.push("'stac_version' is missing".to_string());
        }
        if item.get("id").and_then(Value::as_str).map_or(true, str::is_empty) {
            errors.push("'id' is missing".to_string());
        }

        let has_geometry = item.get("geometry").is_some_and(|g| g.is_object());
        let has_bbox = item.get("bbox").is_some_and(|b| b.is_array());
        if !has_geometry && !has_bbox {
            errors.push("one of 'geometry' or 'bbox' is required".to_string());
        }

        match item.get("properties").and_then(Value::as_object) {
            Some(properties) => {
                let has_datetime = properties
                    .get("datetime")
                    .is_some_and(|d| d.as_str().is_some());
                let has_range = properties.get("start_datetime").is_some()
                    && properties.get("end_datetime").is_some();
                if !has_datetime && !has_range {
                    errors.push(
                        "'properties.datetime' (or start/end_datetime) is required".to_string(),
                    );
                }
            }
            None => errors.push("'properties' object is missing".to_string()),
        }

        if self.config.strict {
            if item.get("collection").and_then(Value::as_str).is_none() {
                errors.push("strict: 'collection' is required".to_string());
            }
            if !item.get("links").is_some_and(|l| l.is_array()) {
                errors.push("strict: 'links' array is required".to_string());
            }
            if !item.get("assets").is_some_and(|a| a.is_object()) {
                errors.push("strict: 'assets' object is required".to_string());
            }
            if has_geometry && !has_bbox {
                errors.push("strict: 'bbox' is required when 'geometry' is present".to_string());
            }
        }

        errors
    }
}

impl Transform for ValidateModule {
    fn modify(&self, item: Item, _ctx: &WorkflowContext) -> StacflowResult<Option<Item>> {
        let errors = self.check(&item);
        if errors.is_empty() {
            return Ok(Some(item));
        }

        if let Some(logger) = &self.logger {
            logger.warn(format!(
                "Item '{}' failed validation: {}",
                item_id(&item),
                errors.join("; ")
            ));
        }
        Err(StacflowError::Validation { message: errors.join("; ") })
    }

    fn set_logger(&mut self, logger: StepLogger) {
        self.logger = Some(logger);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::{CheckpointHandle, CheckpointStore};
    use crate::failures::FailureCollector;
    use crate::logging::LogLevel;
    use serde_json::{json, Map};
    use tempfile::TempDir;

    fn make_context(root: &std::path::Path) -> WorkflowContext {
        let store = CheckpointStore::new("wf", "default", root, true).unwrap();
        WorkflowContext::new(
            "wf",
            StepLogger::for_workflow("wf", LogLevel::Error),
            FailureCollector::new(),
            CheckpointHandle::new(store),
            Map::new(),
        )
    }

    fn validate_module(strict: bool) -> ValidateModule {
        ValidateModule { config: ValidateConfig { strict }, logger: None }
    }

    fn valid_item() -> Value {
        json!({
            "type": "Feature",
            "stac_version": "1.0.0",
            "id": "scene-1",
            "geometry": {"type": "Point", "coordinates": [0.0, 0.0]},
            "bbox": [0.0, 0.0, 0.0, 0.0],
            "properties": {"datetime": "2023-06-01T00:00:00Z"},
            "links": [],
            "assets": {},
            "collection": "demo"
        })
    }

    #[test]
    fn test_valid_item_passes_through_unchanged() {
        let root = TempDir::new().unwrap();
        let ctx = make_context(root.path());
        let module = validate_module(false);

        let item = valid_item();
        let result = module.modify(item.clone(), &ctx).unwrap().unwrap();
        assert_eq!(result, item);
    }

    #[test]
    fn test_missing_datetime_is_a_validation_error() {
        let root = TempDir::new().unwrap();
        let ctx = make_context(root.path());
        let module = validate_module(false);

        let mut item = valid_item();
        item["properties"] = json!({});
        let result = module.modify(item, &ctx);
        assert!(matches!(result, Err(StacflowError::Validation { .. })));
    }

    #[test]
    fn test_datetime_range_is_accepted() {
        let root = TempDir::new().unwrap();
        let ctx = make_context(root.path());
        let module = validate_module(false);

        let mut item = valid_item();
        item["properties"] = json!({
            "start_datetime": "2023-06-01T00:00:00Z",
            "end_datetime": "2023-06-02T00:00:00Z"
        });
        assert!(module.modify(item, &ctx).is_ok());
    }

    #[test]
    fn test_missing_geometry_and_bbox_is_an_error() {
        let root = TempDir::new().unwrap();
        let ctx = make_context(root.path());
        let module = validate_module(false);

        let mut item = valid_item();
        item.as_object_mut().unwrap().remove("geometry");
        item.as_object_mut().unwrap().remove("bbox");
        assert!(module.modify(item, &ctx).is_err());
    }

    #[test]
    fn test_strict_requires_collection() {
        let root = TempDir::new().unwrap();
        let ctx = make_context(root.path());

        let mut item = valid_item();
        item.as_object_mut().unwrap().remove("collection");

        assert!(validate_module(false).modify(item.clone(), &ctx).is_ok());
        let result = validate_module(true).modify(item, &ctx);
        assert!(matches!(result, Err(StacflowError::Validation { .. })));
    }

    #[test]
    fn test_error_message_lists_all_problems() {
        let root = TempDir::new().unwrap();
        let ctx = make_context(root.path());
        let module = validate_module(false);

        let result = module.modify(json!({}), &ctx);
        let Err(StacflowError::Validation { message }) = result else {
            panic!("expected validation error");
        };
        assert!(message.contains("'type'"));
        assert!(message.contains("'id'"));
        assert!(message.contains("'properties'"));
    }
}
