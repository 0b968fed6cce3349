// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stacflow contributors

//! Failure collection and reporting
//!
//! Item-level errors never abort a pipeline. They are appended to a shared
//! [`FailureCollector`] tagged with the step that raised them, and reported
//! in the workflow result. The collector is cheap to clone and safe to share
//! across the parallel pipelines of a matrix run.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::errors::StacflowError;

/// Optional debugging context attached to a failure record
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct FailureContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_number: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_attempt: Option<u32>,
}

/// Single captured item-level failure, immutable once appended
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FailureRecord {
    pub step_id: String,
    pub item_id: String,
    pub error_kind: String,
    pub message: String,
    /// RFC 3339 timestamp in UTC
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<FailureContext>,
}

/// Append-only, thread-safe collector of non-fatal failures
#[derive(Debug, Clone, Default)]
pub struct FailureCollector {
    failures: Arc<Mutex<Vec<FailureRecord>>>,
}

impl FailureCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure caused by an error value. The error's `kind()`
    /// becomes the record's `error_kind`.
    pub fn add(&self, item_id: &str, error: &StacflowError, step_id: &str) {
        self.push(item_id, error.kind().to_string(), error.to_string(), step_id, None);
    }

    /// Record a failure with extra debugging context
    pub fn add_with_context(
        &self,
        item_id: &str,
        error: &StacflowError,
        step_id: &str,
        context: FailureContext,
    ) {
        self.push(
            item_id,
            error.kind().to_string(),
            error.to_string(),
            step_id,
            Some(context),
        );
    }

    /// Record a failure from a free-form message. The `error_kind` is the
    /// fixed tag `"str"`.
    pub fn add_message(&self, item_id: &str, message: impl Into<String>, step_id: &str) {
        self.push(item_id, "str".to_string(), message.into(), step_id, None);
    }

    fn push(
        &self,
        item_id: &str,
        error_kind: String,
        message: String,
        step_id: &str,
        context: Option<FailureContext>,
    ) {
        let record = FailureRecord {
            step_id: step_id.to_string(),
            item_id: item_id.to_string(),
            error_kind,
            message,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            context,
        };
        self.failures
            .lock()
            .expect("failure collector lock poisoned")
            .push(record);
    }

    /// Snapshot copy of all collected failures
    pub fn get_all(&self) -> Vec<FailureRecord> {
        self.failures
            .lock()
            .expect("failure collector lock poisoned")
            .clone()
    }

    /// Number of collected failures
    pub fn len(&self) -> usize {
        self.failures
            .lock()
            .expect("failure collector lock poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Failure counts aggregated by step id
    pub fn count_by_step(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for record in self
            .failures
            .lock()
            .expect("failure collector lock poisoned")
            .iter()
        {
            *counts.entry(record.step_id.clone()).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_error_derives_kind() {
        let collector = FailureCollector::new();
        let err = StacflowError::Validation { message: "missing geometry".into() };
        collector.add("item-1", &err, "validate");

        let all = collector.get_all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].error_kind, "Validation");
        assert_eq!(all[0].item_id, "item-1");
        assert_eq!(all[0].step_id, "validate");
        assert!(all[0].message.contains("missing geometry"));
    }

    #[test]
    fn test_add_message_uses_str_kind() {
        let collector = FailureCollector::new();
        collector.add_message("item-2", "source file not found", "seed");

        let all = collector.get_all();
        assert_eq!(all[0].error_kind, "str");
        assert_eq!(all[0].message, "source file not found");
    }

    #[test]
    fn test_context_is_attached() {
        let collector = FailureCollector::new();
        let err = StacflowError::data("fetch failed");
        collector.add_with_context(
            "item-3",
            &err,
            "ingest",
            FailureContext {
                source_file: Some("raw/items.json".into()),
                retry_attempt: Some(2),
                ..Default::default()
            },
        );

        let record = &collector.get_all()[0];
        let context = record.context.as_ref().unwrap();
        assert_eq!(context.source_file.as_deref(), Some("raw/items.json"));
        assert_eq!(context.retry_attempt, Some(2));
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let collector = FailureCollector::new();
        collector.add_message("a", "one", "s1");

        let snapshot = collector.get_all();
        collector.add_message("b", "two", "s1");

        assert_eq!(snapshot.len(), 1);
        assert_eq!(collector.len(), 2);
    }

    #[test]
    fn test_count_by_step() {
        let collector = FailureCollector::new();
        collector.add_message("a", "one", "transform");
        collector.add_message("b", "two", "transform");
        collector.add_message("c", "three", "output");

        let counts = collector.count_by_step();
        assert_eq!(counts["transform"], 2);
        assert_eq!(counts["output"], 1);
    }

    #[test]
    fn test_timestamps_are_utc_rfc3339() {
        let collector = FailureCollector::new();
        collector.add_message("a", "one", "s1");

        let record = &collector.get_all()[0];
        assert!(record.timestamp.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&record.timestamp).is_ok());
    }

    #[test]
    fn test_shared_across_clones() {
        let collector = FailureCollector::new();
        let other = collector.clone();
        other.add_message("a", "one", "s1");
        assert_eq!(collector.len(), 1);
    }
}
