// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stacflow contributors

//! Output module
//!
//! Terminal sink: writes one JSON file per item under `output_dir` and
//! keeps the checkpoint store truthful. Items already present in the
//! completed set are skipped when `skip_completed` is on, which is how
//! resumed runs avoid repeating work. `finalize` writes a manifest and
//! flushes the checkpoint store; a flush failure there is fatal.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{item_id, parse_config, Item, Module, ModuleConfig, Sink};
use crate::context::WorkflowContext;
use crate::errors::{StacflowError, StacflowResult};
use crate::logging::StepLogger;

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct OutputConfig {
    /// Directory receiving one `<item_id>.json` per item
    output_dir: PathBuf,
    /// Skip items the checkpoint store already reports as completed
    #[serde(default = "default_true")]
    skip_completed: bool,
    /// Pretty-print the written JSON
    #[serde(default)]
    pretty: bool,
}

/// Sink that writes items to disk as JSON files
pub struct OutputModule {
    config: OutputConfig,
    files_written: Vec<String>,
    skipped: usize,
    logger: Option<StepLogger>,
}

impl OutputModule {
    pub fn construct(config: &ModuleConfig) -> StacflowResult<Module> {
        let config: OutputConfig = parse_config(config)?;

        std::fs::create_dir_all(&config.output_dir).map_err(|e| {
            StacflowError::FileWriteError {
                path: config.output_dir.clone(),
                error: e.to_string(),
            }
        })?;

        Ok(Module::Sink(Box::new(Self {
            config,
            files_written: Vec::new(),
            skipped: 0,
            logger: None,
        })))
    }

    fn log(&self, ctx: &WorkflowContext) -> StepLogger {
        self.logger
            .clone()
            .unwrap_or_else(|| ctx.logger.for_step("output", None))
    }
}

#[async_trait]
impl Sink for OutputModule {
    async fn accept(&mut self, item: Item, ctx: &WorkflowContext) -> StacflowResult<()> {
        let id = item_id(&item);

        if self.config.skip_completed && ctx.checkpoints().is_completed(&id) {
            self.log(ctx).debug(format!("Skipping '{id}': already completed"));
            self.skipped += 1;
            return Ok(());
        }

        let path = self.config.output_dir.join(format!("{id}.json"));
        let payload = if self.config.pretty {
            serde_json::to_string_pretty(&item)?
        } else {
            serde_json::to_string(&item)?
        };

        match tokio::fs::write(&path, payload).await {
            Ok(()) => {
                let path_str = path.to_string_lossy().to_string();
                self.log(ctx).debug(format!("Wrote item to {path_str}"));
                self.files_written.push(path_str.clone());
                ctx.checkpoints().mark_completed(&id, &path_str)?;
                Ok(())
            }
            Err(e) => {
                let error = StacflowError::FileWriteError { path, error: e.to_string() };
                if let Err(checkpoint_error) =
                    ctx.checkpoints().mark_failed(&id, &error.to_string())
                {
                    self.log(ctx).warn(format!(
                        "Could not record failure for '{id}': {checkpoint_error}"
                    ));
                }
                Err(error)
            }
        }
    }

    async fn finalize(&mut self, ctx: &WorkflowContext) -> StacflowResult<()> {
        let logger = self.log(ctx);
        logger.info(format!(
            "Finalizing output. Files written: {}, skipped: {}",
            self.files_written.len(),
            self.skipped
        ));

        let manifest_path = self.config.output_dir.join("manifest.json");
        let manifest = json!({
            "files": self.files_written,
            "total": self.files_written.len()
        });
        tokio::fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)
            .await
            .map_err(|e| StacflowError::FileWriteError {
                path: manifest_path,
                error: e.to_string(),
            })?;

        ctx.checkpoints().flush()?;
        Ok(())
    }

    fn set_logger(&mut self, logger: StepLogger) {
        self.logger = Some(logger);
    }
}
