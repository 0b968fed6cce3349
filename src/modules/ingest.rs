// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stacflow contributors

//! Ingest module
//!
//! Reads STAC items from local JSON files. `source` is a path or a glob
//! pattern; each matched file may hold a single item, an item array, a
//! FeatureCollection, or newline-delimited JSON. Read and parse problems
//! are item-level failures, never fatal.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::Value;

use super::{parse_config, ItemStream, Module, ModuleConfig, Source};
use crate::context::WorkflowContext;
use crate::errors::{StacflowError, StacflowResult};
use crate::logging::StepLogger;

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum IngestFormat {
    Json,
    Ndjson,
}

#[derive(Debug, Deserialize)]
struct IngestConfig {
    /// File path or glob pattern to read items from
    source: String,
    /// Format override; detected from the extension when absent
    #[serde(default)]
    format: Option<IngestFormat>,
    /// Stop after this many items across all matched files
    #[serde(default)]
    max_items: Option<usize>,
}

/// Source that reads items from local JSON files
pub struct IngestModule {
    config: IngestConfig,
    logger: Option<StepLogger>,
}

impl IngestModule {
    pub fn construct(config: &ModuleConfig) -> StacflowResult<Module> {
        Ok(Module::Source(Box::new(Self {
            config: parse_config(config)?,
            logger: None,
        })))
    }

    fn format_for(&self, path: &Path) -> IngestFormat {
        self.config.format.unwrap_or_else(|| {
            match path.extension().and_then(|e| e.to_str()) {
                Some("ndjson") | Some("jsonl") => IngestFormat::Ndjson,
                _ => IngestFormat::Json,
            }
        })
    }
}

#[async_trait]
impl Source for IngestModule {
    async fn fetch(&mut self, ctx: Arc<WorkflowContext>) -> StacflowResult<ItemStream> {
        let logger = self
            .logger
            .clone()
            .unwrap_or_else(|| ctx.logger.for_step("ingest", None));
        let source = self.config.source.clone();
        let max_items = self.config.max_items;

        // Resolve the pattern eagerly so configuration typos surface at the
        // head of the stream rather than mid-run
        let files: Vec<(PathBuf, IngestFormat)> = match glob::glob(&source) {
            Ok(paths) => {
                let mut files: Vec<PathBuf> = paths.filter_map(Result::ok).collect();
                files.sort();
                files
                    .into_iter()
                    .map(|p| { let f = self.format_for(&p); (p, f) })
                    .collect()
            }
            Err(e) => return Err(e.into()),
        };

        let stream = async_stream::stream! {
            if files.is_empty() {
                yield Err(StacflowError::FileNotFound {
                    path: PathBuf::from(&source),
                    help: Some("No files matched the ingest source pattern".to_string()),
                });
                return;
            }

            let mut total: usize = 0;
            'files: for (path, format) in files {
                let text = match tokio::fs::read_to_string(&path).await {
                    Ok(text) => text,
                    Err(e) => {
                        yield Err(StacflowError::FileReadError {
                            path: path.clone(),
                            error: e.to_string(),
                        });
                        continue;
                    }
                };

                let mut file_count: usize = 0;
                match format {
                    IngestFormat::Ndjson => {
                        for line in text.lines().filter(|l| !l.trim().is_empty()) {
                            match serde_json::from_str::<Value>(line) {
                                Ok(item) => {
                                    file_count += 1;
                                    total += 1;
                                    yield Ok(item);
                                }
                                Err(e) => {
                                    yield Err(StacflowError::Json { message: e.to_string() });
                                }
                            }
                            if max_items.is_some_and(|max| total >= max) {
                                logger.info(format!("Reached max_items ({total}), stopping ingest"));
                                break 'files;
                            }
                        }
                    }
                    IngestFormat::Json => {
                        let items = match serde_json::from_str::<Value>(&text) {
                            Ok(Value::Array(items)) => items,
                            Ok(value) if value.get("type").and_then(Value::as_str)
                                == Some("FeatureCollection") =>
                            {
                                match value.get("features").and_then(Value::as_array) {
                                    Some(features) => features.clone(),
                                    None => Vec::new(),
                                }
                            }
                            Ok(value) => vec![value],
                            Err(e) => {
                                yield Err(StacflowError::Json { message: e.to_string() });
                                continue;
                            }
                        };

                        for item in items {
                            file_count += 1;
                            total += 1;
                            yield Ok(item);
                            if max_items.is_some_and(|max| total >= max) {
                                logger.info(format!("Reached max_items ({total}), stopping ingest"));
                                break 'files;
                            }
                        }
                    }
                }

                logger.debug(format!(
                    "Read {file_count} items from {}",
                    path.display()
                ));
            }

            logger.info(format!("Ingest complete. Total items read: {total}"));
        };

        Ok(stream.boxed())
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

    fn ingest_module(config_json: Value) -> IngestModule {
        let Value::Object(config) = config_json else { panic!("config must be an object") };
        IngestModule { config: parse_config(&config).unwrap(), logger: None }
    }

    async fn collect(module: &mut IngestModule, ctx: Arc<WorkflowContext>) -> Vec<StacflowResult<Value>> {
        let mut stream = module.fetch(ctx).await.unwrap();
        let mut results = Vec::new();
        while let Some(next) = stream.next().await {
            results.push(next);
        }
        results
    }

    #[tokio::test]
    async fn test_reads_feature_collection() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("items.json");
        std::fs::write(
            &path,
            json!({
                "type": "FeatureCollection",
                "features": [{"id": "a"}, {"id": "b"}]
            })
            .to_string(),
        )
        .unwrap();

        let ctx = make_context(dir.path());
        let mut module = ingest_module(json!({"source": path.to_str().unwrap()}));

        let results = collect(&mut module, ctx).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap()["id"], json!("a"));
    }

    #[tokio::test]
    async fn test_reads_item_array_with_max_items() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("items.json");
        std::fs::write(&path, r#"[{"id": "a"}, {"id": "b"}, {"id": "c"}]"#).unwrap();

        let ctx = make_context(dir.path());
        let mut module = ingest_module(json!({
            "source": path.to_str().unwrap(),
            "max_items": 2
        }));

        let results = collect(&mut module, ctx).await;
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_reads_ndjson_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("items.ndjson");
        std::fs::write(&path, "{\"id\": \"a\"}\n\n{\"id\": \"b\"}\n").unwrap();

        let ctx = make_context(dir.path());
        let mut module = ingest_module(json!({"source": path.to_str().unwrap()}));

        let results = collect(&mut module, ctx).await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(Result::is_ok));
    }

    #[tokio::test]
    async fn test_glob_reads_files_in_sorted_order() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.json"), r#"{"id": "from-b"}"#).unwrap();
        std::fs::write(dir.path().join("a.json"), r#"{"id": "from-a"}"#).unwrap();

        let ctx = make_context(dir.path());
        let pattern = dir.path().join("*.json");
        let mut module = ingest_module(json!({"source": pattern.to_str().unwrap()}));

        let results = collect(&mut module, ctx).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap()["id"], json!("from-a"));
        assert_eq!(results[1].as_ref().unwrap()["id"], json!("from-b"));
    }

    #[tokio::test]
    async fn test_missing_source_yields_item_level_error() {
        let dir = TempDir::new().unwrap();
        let ctx = make_context(dir.path());
        let mut module = ingest_module(json!({"source": "/nonexistent/*.json"}));

        let results = collect(&mut module, ctx).await;
        assert_eq!(results.len(), 1);
        assert!(matches!(
            results[0],
            Err(StacflowError::FileNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_unparseable_file_yields_error_and_continues() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.json"), "not json").unwrap();
        std::fs::write(dir.path().join("b.json"), r#"{"id": "ok"}"#).unwrap();

        let ctx = make_context(dir.path());
        let pattern = dir.path().join("*.json");
        let mut module = ingest_module(json!({"source": pattern.to_str().unwrap()}));

        let results = collect(&mut module, ctx).await;
        assert_eq!(results.len(), 2);
        assert!(results[0].is_err());
        assert_eq!(results[1].as_ref().unwrap()["id"], json!("ok"));
    }
}
