// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagepipe contributors

//! Utility modules
//!
//! Common utilities for the stagepipe CLI.

pub mod colors;
pub mod report;
pub mod spinner;

pub use colors::*;
pub use spinner::stage_spinner;

/// Whole milliseconds, saturating
pub fn millis(d: std::time::Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
