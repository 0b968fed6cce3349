// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stacflow contributors

//! Parquet-backed checkpoint store
//!
//! Layout: `<root>/<workflow_id>/<collection_id>.parquet`, one row per
//! record. Records are buffered in memory and flushed by rewriting the
//! whole file through a sibling temporary file followed by an atomic
//! rename, so readers never observe a partial write.

use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{SecondsFormat, Utc};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;

use super::CheckpointRecord;
use crate::errors::{StacflowError, StacflowResult};

/// Records buffered before an automatic flush
pub const DEFAULT_BUFFER_SIZE: usize = 1000;

/// Buffered completion log for one `(workflow_id, collection_id)` pair
#[derive(Debug)]
pub struct CheckpointStore {
    workflow_id: String,
    collection_id: String,
    checkpoint_file: PathBuf,
    buffer_size: usize,
    buffer: Vec<CheckpointRecord>,
    completed: HashSet<String>,
}

impl CheckpointStore {
    /// Open (or create) the store for a collection within a workflow.
    ///
    /// With `resume_from_existing` the completed set is loaded from the
    /// existing checkpoint file; load problems degrade to an empty state
    /// with a warning, they never fail construction.
    pub fn new(
        workflow_id: &str,
        collection_id: &str,
        checkpoint_root: &Path,
        resume_from_existing: bool,
    ) -> StacflowResult<Self> {
        let checkpoint_dir = checkpoint_root.join(workflow_id);
        std::fs::create_dir_all(&checkpoint_dir).map_err(|e| StacflowError::Checkpoint {
            message: format!(
                "Failed to create checkpoint directory '{}': {}",
                checkpoint_dir.display(),
                e
            ),
        })?;

        let mut store = Self {
            workflow_id: workflow_id.to_string(),
            collection_id: collection_id.to_string(),
            checkpoint_file: checkpoint_dir.join(format!("{collection_id}.parquet")),
            buffer_size: DEFAULT_BUFFER_SIZE,
            buffer: Vec::new(),
            completed: HashSet::new(),
        };

        if resume_from_existing {
            store.load_state();
        }

        Ok(store)
    }

    /// Override the auto-flush threshold
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    /// Full path of the backing Parquet file
    pub fn checkpoint_path(&self) -> &Path {
        &self.checkpoint_file
    }

    /// The workflow this store belongs to
    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    /// O(1) lookup: has this item completed the entire pipeline?
    pub fn is_completed(&self, item_id: &str) -> bool {
        self.completed.contains(item_id)
    }

    /// Number of records waiting for the next flush
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Record an item as successfully completed through the pipeline
    pub fn mark_completed(&mut self, item_id: &str, output_path: &str) -> StacflowResult<()> {
        self.buffer.push(CheckpointRecord {
            item_id: item_id.to_string(),
            collection_id: self.collection_id.clone(),
            output_path: output_path.to_string(),
            completed: true,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            error: None,
        });
        self.completed.insert(item_id.to_string());
        self.maybe_flush()
    }

    /// Record an item as failed. It is not added to the completed set, so
    /// the next run retries it.
    pub fn mark_failed(&mut self, item_id: &str, error: &str) -> StacflowResult<()> {
        self.buffer.push(CheckpointRecord {
            item_id: item_id.to_string(),
            collection_id: self.collection_id.clone(),
            output_path: String::new(),
            completed: false,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            error: Some(error.to_string()),
        });
        self.maybe_flush()
    }

    fn maybe_flush(&mut self) -> StacflowResult<()> {
        if self.buffer.len() >= self.buffer_size {
            self.flush()?;
        }
        Ok(())
    }

    /// Flush buffered records atomically.
    ///
    /// Reads the existing file (if any), appends the buffer, writes a
    /// sibling temp file, and renames it over the final path. The buffer is
    /// cleared only after the rename succeeds; a failed flush removes the
    /// temp file and leaves the buffer intact for retry.
    pub fn flush(&mut self) -> StacflowResult<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let mut records = if self.checkpoint_file.exists() {
            read_records(&self.checkpoint_file)?
        } else {
            Vec::new()
        };
        records.extend(self.buffer.iter().cloned());

        let temp_file = self
            .checkpoint_file
            .with_extension(format!("parquet.tmp.{}", std::process::id()));

        if let Err(e) = write_records(&temp_file, &records) {
            let _ = std::fs::remove_file(&temp_file);
            return Err(e);
        }

        if let Err(e) = std::fs::rename(&temp_file, &self.checkpoint_file) {
            let _ = std::fs::remove_file(&temp_file);
            return Err(StacflowError::Checkpoint {
                message: format!(
                    "Failed to replace checkpoint file '{}': {}",
                    self.checkpoint_file.display(),
                    e
                ),
            });
        }

        self.buffer.clear();
        Ok(())
    }

    /// Reduce the on-disk history to the completed set
    fn load_state(&mut self) {
        if !self.checkpoint_file.exists() {
            return;
        }

        match read_records(&self.checkpoint_file) {
            Ok(records) => {
                self.completed = records
                    .into_iter()
                    .filter(|r| r.completed)
                    .map(|r| r.item_id)
                    .collect();
            }
            Err(e) => {
                tracing::warn!(
                    target: "stacflow::checkpoint",
                    workflow = %self.workflow_id,
                    collection = %self.collection_id,
                    "Failed to load checkpoint state, starting fresh: {e}"
                );
            }
        }
    }
}

impl Drop for CheckpointStore {
    /// Best-effort flush of anything still buffered
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            tracing::warn!(
                target: "stacflow::checkpoint",
                workflow = %self.workflow_id,
                collection = %self.collection_id,
                "Checkpoint flush on drop failed: {e}"
            );
        }
    }
}

fn file_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("item_id", DataType::Utf8, false),
        Field::new("collection_id", DataType::Utf8, false),
        Field::new("output_path", DataType::Utf8, false),
        Field::new("completed", DataType::Boolean, false),
        Field::new("timestamp", DataType::Utf8, false),
        Field::new("error", DataType::Utf8, true),
    ]))
}

fn write_records(path: &Path, records: &[CheckpointRecord]) -> StacflowResult<()> {
    let schema = file_schema();

    let item_ids: ArrayRef = Arc::new(StringArray::from(
        records.iter().map(|r| r.item_id.as_str()).collect::<Vec<_>>(),
    ));
    let collection_ids: ArrayRef = Arc::new(StringArray::from(
        records.iter().map(|r| r.collection_id.as_str()).collect::<Vec<_>>(),
    ));
    let output_paths: ArrayRef = Arc::new(StringArray::from(
        records.iter().map(|r| r.output_path.as_str()).collect::<Vec<_>>(),
    ));
    let completed: ArrayRef = Arc::new(BooleanArray::from(
        records.iter().map(|r| r.completed).collect::<Vec<_>>(),
    ));
    let timestamps: ArrayRef = Arc::new(StringArray::from(
        records.iter().map(|r| r.timestamp.as_str()).collect::<Vec<_>>(),
    ));
    let errors: ArrayRef = Arc::new(StringArray::from(
        records.iter().map(|r| r.error.as_deref()).collect::<Vec<_>>(),
    ));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![item_ids, collection_ids, output_paths, completed, timestamps, errors],
    )
    .map_err(StacflowError::checkpoint)?;

    let file = File::create(path).map_err(|e| StacflowError::Checkpoint {
        message: format!("Failed to create checkpoint temp file '{}': {}", path.display(), e),
    })?;

    let mut writer = ArrowWriter::try_new(file, schema, None).map_err(StacflowError::checkpoint)?;
    writer.write(&batch).map_err(StacflowError::checkpoint)?;
    writer.close().map_err(StacflowError::checkpoint)?;

    Ok(())
}

fn read_records(path: &Path) -> StacflowResult<Vec<CheckpointRecord>> {
    let file = File::open(path).map_err(|e| StacflowError::Checkpoint {
        message: format!("Failed to open checkpoint file '{}': {}", path.display(), e),
    })?;

    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(StacflowError::checkpoint)?
        .build()
        .map_err(StacflowError::checkpoint)?;

    let mut records = Vec::new();
    for batch in reader {
        let batch = batch.map_err(StacflowError::checkpoint)?;

        let item_ids = string_column(&batch, "item_id")?;
        let collection_ids = string_column(&batch, "collection_id")?;
        let output_paths = string_column(&batch, "output_path")?;
        let timestamps = string_column(&batch, "timestamp")?;
        let errors = string_column(&batch, "error")?;
        let completed = batch
            .column_by_name("completed")
            .and_then(|c| c.as_any().downcast_ref::<BooleanArray>())
            .ok_or_else(|| StacflowError::Checkpoint {
                message: "Checkpoint file is missing the 'completed' column".to_string(),
            })?;

        use arrow::array::Array;
        for row in 0..batch.num_rows() {
            records.push(CheckpointRecord {
                item_id: item_ids.value(row).to_string(),
                collection_id: collection_ids.value(row).to_string(),
                output_path: output_paths.value(row).to_string(),
                completed: completed.value(row),
                timestamp: timestamps.value(row).to_string(),
                error: if errors.is_null(row) {
                    None
                } else {
                    Some(errors.value(row).to_string())
                },
            });
        }
    }

    Ok(records)
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> StacflowResult<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| StacflowError::Checkpoint {
            message: format!("Checkpoint file is missing the '{name}' column"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open(root: &Path, resume: bool) -> CheckpointStore {
        CheckpointStore::new("test-workflow", "sentinel", root, resume).unwrap()
    }

    #[test]
    fn test_round_trip_completed() {
        let root = TempDir::new().unwrap();

        let mut store = open(root.path(), true);
        store.mark_completed("item-a", "/out/item-a.json").unwrap();
        store.flush().unwrap();

        let fresh = open(root.path(), true);
        assert!(fresh.is_completed("item-a"));
        assert!(!fresh.is_completed("item-b"));
    }

    #[test]
    fn test_failed_items_are_retried() {
        let root = TempDir::new().unwrap();

        let mut store = open(root.path(), true);
        store.mark_failed("item-a", "network timeout").unwrap();
        store.flush().unwrap();

        let fresh = open(root.path(), true);
        assert!(!fresh.is_completed("item-a"));
    }

    #[test]
    fn test_failed_then_completed_is_completed() {
        let root = TempDir::new().unwrap();

        let mut store = open(root.path(), true);
        store.mark_failed("item-a", "first attempt").unwrap();
        store.flush().unwrap();
        store.mark_completed("item-a", "/out/item-a.json").unwrap();
        store.flush().unwrap();

        let fresh = open(root.path(), true);
        assert!(fresh.is_completed("item-a"));

        // Both the failure and the completion remain in the history
        let records = read_records(fresh.checkpoint_path()).unwrap();
        assert_eq!(records.len(), 2);
        assert!(!records[0].completed);
        assert!(records[1].completed);
        assert_eq!(records[0].error.as_deref(), Some("first attempt"));
    }

    #[test]
    fn test_no_resume_ignores_existing_state() {
        let root = TempDir::new().unwrap();

        let mut store = open(root.path(), true);
        store.mark_completed("item-a", "/out/item-a.json").unwrap();
        store.flush().unwrap();

        let fresh = open(root.path(), false);
        assert!(!fresh.is_completed("item-a"));
    }

    #[test]
    fn test_missing_file_degrades_to_empty() {
        let root = TempDir::new().unwrap();
        let store = open(root.path(), true);
        assert!(!store.is_completed("anything"));
        assert_eq!(store.buffered(), 0);
    }

    #[test]
    fn test_buffer_threshold_triggers_flush() {
        let root = TempDir::new().unwrap();

        let mut store = open(root.path(), true).with_buffer_size(3);
        store.mark_completed("a", "/out/a.json").unwrap();
        store.mark_completed("b", "/out/b.json").unwrap();
        assert_eq!(store.buffered(), 2);
        assert!(!store.checkpoint_path().exists());

        store.mark_completed("c", "/out/c.json").unwrap();
        assert_eq!(store.buffered(), 0);
        assert!(store.checkpoint_path().exists());
    }

    #[test]
    fn test_flush_appends_to_existing_history() {
        let root = TempDir::new().unwrap();

        let mut store = open(root.path(), true);
        store.mark_completed("a", "/out/a.json").unwrap();
        store.flush().unwrap();
        store.mark_completed("b", "/out/b.json").unwrap();
        store.flush().unwrap();

        let records = read_records(store.checkpoint_path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].item_id, "a");
        assert_eq!(records[1].item_id, "b");
        assert_eq!(records[0].collection_id, "sentinel");
    }

    #[test]
    fn test_empty_flush_is_a_no_op() {
        let root = TempDir::new().unwrap();

        let mut store = open(root.path(), true);
        store.flush().unwrap();
        assert!(!store.checkpoint_path().exists());
    }

    #[test]
    fn test_drop_flushes_buffered_records() {
        let root = TempDir::new().unwrap();
        let path;

        {
            let mut store = open(root.path(), true);
            store.mark_completed("a", "/out/a.json").unwrap();
            path = store.checkpoint_path().to_path_buf();
            assert!(!path.exists());
        }

        assert!(path.exists());
        let fresh = open(root.path(), true);
        assert!(fresh.is_completed("a"));
    }

    #[test]
    fn test_stray_temp_file_does_not_affect_reads() {
        let root = TempDir::new().unwrap();

        let mut store = open(root.path(), true);
        store.mark_completed("a", "/out/a.json").unwrap();
        store.flush().unwrap();

        // A flush interrupted between temp-write and rename leaves only a
        // temp file behind; the final path still holds the previous
        // complete contents
        let temp = store.checkpoint_path().with_extension("parquet.tmp.999");
        std::fs::write(&temp, b"partial garbage").unwrap();

        let fresh = open(root.path(), true);
        assert!(fresh.is_completed("a"));
        let records = read_records(fresh.checkpoint_path()).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_load_deduplicates_completed_ids() {
        let root = TempDir::new().unwrap();

        let mut store = open(root.path(), true);
        store.mark_completed("a", "/out/a.json").unwrap();
        store.mark_completed("a", "/out/a.json").unwrap();
        store.flush().unwrap();

        let fresh = open(root.path(), true);
        assert!(fresh.is_completed("a"));
        let records = read_records(fresh.checkpoint_path()).unwrap();
        assert_eq!(records.len(), 2);
    }
}
