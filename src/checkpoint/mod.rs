// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stacflow contributors

//! Checkpoint persistence
//!
//! Tracks which items have completed the entire pipeline, in one Parquet
//! file per `(workflow_id, collection_id)` pair. The completed set answers
//! "did this item already reach the sink?", which lets re-runs skip work
//! and lets interrupted runs resume. Failed items are recorded but never
//! enter the completed set, so they are retried on the next run.

mod store;

pub use store::{CheckpointStore, DEFAULT_BUFFER_SIZE};

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::errors::StacflowResult;

/// Single checkpoint record tracking one item's outcome
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CheckpointRecord {
    pub item_id: String,
    pub collection_id: String,
    pub output_path: String,
    pub completed: bool,
    /// RFC 3339 timestamp in UTC
    pub timestamp: String,
    pub error: Option<String>,
}

/// Shared handle to one pipeline's checkpoint store
///
/// The store itself is single-owner per pipeline; the handle exists so the
/// execution context and the sink can reach the same store without
/// threading `&mut` through the stream stages.
#[derive(Debug, Clone)]
pub struct CheckpointHandle {
    inner: Arc<Mutex<CheckpointStore>>,
}

impl CheckpointHandle {
    pub fn new(store: CheckpointStore) -> Self {
        Self { inner: Arc::new(Mutex::new(store)) }
    }

    /// O(1) lookup against the in-memory completed set
    pub fn is_completed(&self, item_id: &str) -> bool {
        self.lock().is_completed(item_id)
    }

    /// Record successful completion; may trigger an auto-flush
    pub fn mark_completed(&self, item_id: &str, output_path: &str) -> StacflowResult<()> {
        self.lock().mark_completed(item_id, output_path)
    }

    /// Record a failure; the item stays retryable; may trigger an auto-flush
    pub fn mark_failed(&self, item_id: &str, error: &str) -> StacflowResult<()> {
        self.lock().mark_failed(item_id, error)
    }

    /// Flush all buffered records to disk atomically
    pub fn flush(&self) -> StacflowResult<()> {
        self.lock().flush()
    }

    /// Full path of the backing Parquet file
    pub fn path(&self) -> PathBuf {
        self.lock().checkpoint_path().to_path_buf()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CheckpointStore> {
        self.inner.lock().expect("checkpoint store lock poisoned")
    }
}
