//! Common types used throughout the pipeline
//!
//! This module contains small shared enums that configure how the
//! layers read, join and hand data to each other.

use serde::{Deserialize, Serialize};

// ============================================================================
// Backoff Type
// ============================================================================

/// Type of backoff for retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Constant delay between retries
    Constant,
    /// Linear increase in delay
    Linear,
    /// Exponential increase in delay
    #[default]
    Exponential,
}

// ============================================================================
// Environment
// ============================================================================

/// Deployment environment selected on the command line
///
/// Informational only: it is logged at startup but does not change
/// pipeline behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    #[default]
    Dev,
    Prod,
}

impl Environment {
    /// Upper-case label used in log lines
    pub fn label(self) -> &'static str {
        match self {
            Environment::Dev => "DEV",
            Environment::Prod => "PROD",
        }
    }
}

// ============================================================================
// Parse Policy
// ============================================================================

/// How delimited text sources treat malformed rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParsePolicy {
    /// Drop malformed rows and count them
    #[default]
    Permissive,
    /// Fail the whole load on the first malformed row
    Strict,
}

// ============================================================================
// Handoff
// ============================================================================

/// Representation one layer passes to the next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Handoff {
    /// Pass the freshly computed in-memory table
    #[default]
    Memory,
    /// Pass the persisted location and let the next layer re-read it
    Disk,
}

// ============================================================================
// Holiday Join
// ============================================================================

/// How holidays sharing a calendar date are joined onto collisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HolidayJoin {
    /// Collapse to one row per date before joining (names concatenated,
    /// tag lists unioned) so every collision is counted exactly once
    #[default]
    Collapse,
    /// Join every holiday row, duplicating collisions on shared dates
    FanOut,
}
