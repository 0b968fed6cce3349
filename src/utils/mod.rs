// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stacflow contributors

//! Utility modules
//!
//! Field manipulation, geometry helpers, and CLI progress indicators.

pub mod field_ops;
pub mod geometry;
pub mod spinner;

pub use field_ops::{deep_merge, get_nested, remove_nested, set_nested, MergeStrategy};
pub use geometry::ensure_bbox;
pub use spinner::*;
