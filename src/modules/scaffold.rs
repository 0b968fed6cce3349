// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stacflow contributors

//! Scaffold module
//!
//! Shapes intermediate records into proper STAC item skeletons. Records
//! that lack an id, a usable geometry, or a parseable datetime cannot
//! become items; they are dropped with a warning rather than failed, so a
//! partially-described batch still yields its viable items.

use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::{parse_config, Item, Module, ModuleConfig, Transform};
use crate::context::WorkflowContext;
use crate::errors::StacflowResult;
use crate::logging::StepLogger;
use crate::utils::geometry::ensure_bbox;

const STAC_VERSION: &str = "1.0.0";

fn default_license() -> String {
    "CC-BY-4.0".to_string()
}

#[derive(Debug, Deserialize)]
struct ScaffoldDefaults {
    #[serde(default = "default_license")]
    license: String,
    /// Fallback geometry for records that carry none
    #[serde(default)]
    geometry: Option<Value>,
}

impl Default for ScaffoldDefaults {
    fn default() -> Self {
        Self { license: default_license(), geometry: None }
    }
}

#[derive(Debug, Deserialize)]
struct ScaffoldConfig {
    #[serde(default)]
    collection_id: Option<String>,
    #[serde(default)]
    defaults: ScaffoldDefaults,
}

/// Transformer that scaffolds records into STAC item skeletons
pub struct ScaffoldModule {
    config: ScaffoldConfig,
    logger: Option<StepLogger>,
}

impl ScaffoldModule {
    pub fn construct(config: &ModuleConfig) -> StacflowResult<Module> {
        Ok(Module::Transform(Box::new(Self {
            config: parse_config(config)?,
            logger: None,
        })))
    }

    fn warn(&self, ctx: &WorkflowContext, message: String) {
        match &self.logger {
            Some(logger) => logger.warn(message),
            None => ctx.logger.warn(message),
        }
    }
}

impl Transform for ScaffoldModule {
    fn modify(&self, item: Item, ctx: &WorkflowContext) -> StacflowResult<Option<Item>> {
        let Some(id) = item.get("id").and_then(Value::as_str).map(String::from) else {
            self.warn(ctx, "Scaffold skipped a record without an id".to_string());
            return Ok(None);
        };

        let geometry = item
            .get("geometry")
            .filter(|g| !g.is_null())
            .cloned()
            .or_else(|| self.config.defaults.geometry.clone());
        let Some(geometry) = geometry else {
            self.warn(ctx, format!("Scaffold skipped '{id}': missing geometry"));
            return Ok(None);
        };

        let mut properties = item
            .get("properties")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_else(Map::new);

        let datetime = properties
            .get("datetime")
            .and_then(Value::as_str)
            .and_then(normalize_datetime);
        let Some(datetime) = datetime else {
            self.warn(ctx, format!("Scaffold skipped '{id}': missing or invalid datetime"));
            return Ok(None);
        };
        properties.insert("datetime".to_string(), json!(datetime));
        properties.insert("license".to_string(), json!(self.config.defaults.license));

        let mut scaffolded = json!({
            "type": "Feature",
            "stac_version": STAC_VERSION,
            "id": id,
            "geometry": geometry,
            "properties": properties,
            "links": [],
            "assets": {}
        });

        if let Some(bbox) = ensure_bbox(&geometry) {
            scaffolded["bbox"] = json!(bbox);
        }
        if let Some(collection_id) = &self.config.collection_id {
            scaffolded["collection"] = json!(collection_id);
        }

        Ok(Some(scaffolded))
    }

    fn set_logger(&mut self, logger: StepLogger) {
        self.logger = Some(logger);
    }
}

fn normalize_datetime(text: &str) -> Option<String> {
    use chrono::{DateTime, SecondsFormat, Utc};
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Secs, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::{CheckpointHandle, CheckpointStore};
    use crate::failures::FailureCollector;
    use crate::logging::LogLevel;
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

    fn scaffold_module(config_json: Value) -> ScaffoldModule {
        let Value::Object(config) = config_json else { panic!("config must be an object") };
        ScaffoldModule { config: parse_config(&config).unwrap(), logger: None }
    }

    fn record() -> Value {
        json!({
            "id": "scene-1",
            "geometry": {"type": "Point", "coordinates": [10.0, 20.0]},
            "properties": {"datetime": "2023-06-01T00:00:00Z", "platform": "ls9"}
        })
    }

    #[test]
    fn test_scaffolds_full_skeleton() {
        let root = TempDir::new().unwrap();
        let ctx = make_context(root.path());
        let module = scaffold_module(json!({"collection_id": "landsat-c2"}));

        let item = module.modify(record(), &ctx).unwrap().unwrap();
        assert_eq!(item["type"], json!("Feature"));
        assert_eq!(item["stac_version"], json!(STAC_VERSION));
        assert_eq!(item["id"], json!("scene-1"));
        assert_eq!(item["bbox"], json!([10.0, 20.0, 10.0, 20.0]));
        assert_eq!(item["collection"], json!("landsat-c2"));
        assert_eq!(item["properties"]["platform"], json!("ls9"));
        assert_eq!(item["properties"]["license"], json!("CC-BY-4.0"));
        assert!(item["links"].is_array());
        assert!(item["assets"].is_object());
    }

    #[test]
    fn test_missing_id_is_dropped_not_failed() {
        let root = TempDir::new().unwrap();
        let ctx = make_context(root.path());
        let module = scaffold_module(json!({}));

        let mut item = record();
        item.as_object_mut().unwrap().remove("id");
        assert!(module.modify(item, &ctx).unwrap().is_none());
        assert!(ctx.failures().is_empty());
    }

    #[test]
    fn test_default_geometry_fallback() {
        let root = TempDir::new().unwrap();
        let ctx = make_context(root.path());
        let module = scaffold_module(json!({
            "defaults": {"geometry": {"type": "Point", "coordinates": [1.0, 2.0]}}
        }));

        let mut item = record();
        item.as_object_mut().unwrap().remove("geometry");
        let result = module.modify(item, &ctx).unwrap().unwrap();
        assert_eq!(result["bbox"], json!([1.0, 2.0, 1.0, 2.0]));
    }

    #[test]
    fn test_missing_datetime_is_dropped() {
        let root = TempDir::new().unwrap();
        let ctx = make_context(root.path());
        let module = scaffold_module(json!({}));

        let item = json!({
            "id": "scene-1",
            "geometry": {"type": "Point", "coordinates": [0.0, 0.0]},
            "properties": {}
        });
        assert!(module.modify(item, &ctx).unwrap().is_none());
    }
}
