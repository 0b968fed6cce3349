// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stacflow contributors

//! Transform module
//!
//! Maps raw records toward a STAC-like shape through an ordered list of
//! field mapping rules. Rules address fields with dot paths, optionally
//! coerce the value type, and can mark a source field as required — a
//! missing required field is an item-level failure.

use serde::Deserialize;
use serde_json::{json, Value};

use super::{parse_config, Item, Module, ModuleConfig, Transform};
use crate::context::WorkflowContext;
use crate::errors::{StacflowError, StacflowResult};
use crate::logging::StepLogger;
use crate::utils::field_ops::{get_nested, set_nested};

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum FieldType {
    String,
    Int,
    Float,
    Datetime,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
enum TransformStrategy {
    /// Build a fresh item containing only mapped fields
    #[default]
    New,
    /// Overlay mapped fields onto a copy of the incoming item
    Merge,
}

#[derive(Debug, Deserialize)]
struct MappingRule {
    source_field: String,
    target_field: String,
    #[serde(rename = "type", default)]
    field_type: Option<FieldType>,
    #[serde(default)]
    required: bool,
}

#[derive(Debug, Deserialize)]
struct TransformConfig {
    mappings: Vec<MappingRule>,
    #[serde(default)]
    strategy: TransformStrategy,
}

/// Transformer that maps fields between item shapes
pub struct TransformModule {
    config: TransformConfig,
    logger: Option<StepLogger>,
}

impl TransformModule {
    pub fn construct(config: &ModuleConfig) -> StacflowResult<Module> {
        Ok(Module::Transform(Box::new(Self {
            config: parse_config(config)?,
            logger: None,
        })))
    }
}

impl Transform for TransformModule {
    fn modify(&self, item: Item, _ctx: &WorkflowContext) -> StacflowResult<Option<Item>> {
        let mut result = match self.config.strategy {
            TransformStrategy::New => json!({ "properties": {} }),
            TransformStrategy::Merge => {
                let mut copy = item.clone();
                if copy.get("properties").map_or(true, |p| !p.is_object()) {
                    set_nested(&mut copy, "properties", json!({}));
                }
                copy
            }
        };

        for rule in &self.config.mappings {
            match get_nested(&item, &rule.source_field) {
                Some(value) => {
                    let coerced = coerce(value, rule.field_type, &rule.source_field)?;
                    set_nested(&mut result, &rule.target_field, coerced);
                }
                None if rule.required => {
                    return Err(StacflowError::data(format!(
                        "Required field '{}' is missing",
                        rule.source_field
                    )));
                }
                None => {
                    if let Some(logger) = &self.logger {
                        logger.debug(format!("Optional field '{}' not present", rule.source_field));
                    }
                }
            }
        }

        Ok(Some(result))
    }

    fn set_logger(&mut self, logger: StepLogger) {
        self.logger = Some(logger);
    }
}

fn coerce(value: &Value, field_type: Option<FieldType>, field: &str) -> StacflowResult<Value> {
    let Some(field_type) = field_type else {
        return Ok(value.clone());
    };

    match field_type {
        FieldType::String => Ok(match value {
            Value::String(s) => Value::String(s.clone()),
            other => Value::String(other.to_string()),
        }),
        FieldType::Int => match value {
            Value::Number(n) if n.as_i64().is_some() => Ok(value.clone()),
            Value::Number(n) => n
                .as_f64()
                .map(|f| json!(f as i64))
                .ok_or_else(|| coercion_error(field, value, "int")),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(|i| json!(i))
                .map_err(|_| coercion_error(field, value, "int")),
            _ => Err(coercion_error(field, value, "int")),
        },
        FieldType::Float => match value {
            Value::Number(n) => n
                .as_f64()
                .map(|f| json!(f))
                .ok_or_else(|| coercion_error(field, value, "float")),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map(|f| json!(f))
                .map_err(|_| coercion_error(field, value, "float")),
            _ => Err(coercion_error(field, value, "float")),
        },
        FieldType::Datetime => {
            let text = value
                .as_str()
                .ok_or_else(|| coercion_error(field, value, "datetime"))?;
            parse_datetime(text)
                .map(Value::String)
                .ok_or_else(|| coercion_error(field, value, "datetime"))
        }
    }
}

/// Normalize a datetime string to RFC 3339 UTC with a `Z` suffix
fn parse_datetime(text: &str) -> Option<String> {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Secs, true));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc().to_rfc3339_opts(SecondsFormat::Secs, true));
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        let naive = date.and_hms_opt(0, 0, 0)?;
        return Some(naive.and_utc().to_rfc3339_opts(SecondsFormat::Secs, true));
    }
    None
}

fn coercion_error(field: &str, value: &Value, target: &str) -> StacflowError {
    StacflowError::data(format!("Cannot coerce field '{field}' value {value} to {target}"))
}
