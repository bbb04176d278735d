//! Harness configuration.
//!
//! Two environment variables seed the defaults, and command-line flags
//! override them:
//! - `MEMOPS_FILL_SWEEP`: `sentinels`, `boundary`, `standard` (default) or
//!   `exhaustive`. Unknown values fall back to the default sweep.
//! - `MEMOPS_SHARDS`: number of shards run in parallel (default 1). Values
//!   that are not a positive integer fall back to 1.

use memops_core::FillSweep;

use crate::error::HarnessError;

pub const FILL_SWEEP_ENV: &str = "MEMOPS_FILL_SWEEP";
pub const SHARDS_ENV: &str = "MEMOPS_SHARDS";

/// Resolved settings for a conformance run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarnessConfig {
    pub fill: FillSweep,
    pub shards: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            fill: FillSweep::default(),
            shards: 1,
        }
    }
}

impl HarnessConfig {
    /// Read the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve from an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            fill: lookup(FILL_SWEEP_ENV)
                .map(|raw| parse_fill_env(&raw))
                .unwrap_or_default(),
            shards: lookup(SHARDS_ENV)
                .map(|raw| parse_shards_env(&raw))
                .unwrap_or(1),
        }
    }

    /// Apply command-line overrides.
    #[must_use]
    pub fn with_overrides(mut self, fill: Option<FillSweep>, shards: Option<u64>) -> Self {
        if let Some(fill) = fill {
            self.fill = fill;
        }
        if let Some(shards) = shards {
            self.shards = shards;
        }
        self
    }

    pub fn validate(&self) -> Result<(), HarnessError> {
        if self.shards == 0 {
            return Err(HarnessError::InvalidShard(self.shards));
        }
        Ok(())
    }
}

fn parse_fill_env(raw: &str) -> FillSweep {
    FillSweep::from_str_loose(raw).unwrap_or_default()
}

fn parse_shards_env(raw: &str) -> u64 {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|&n| n > 0)
        .unwrap_or(1)
}

/// Strict parse for command-line values.
pub fn parse_fill_arg(raw: &str) -> Result<FillSweep, HarnessError> {
    FillSweep::from_str_loose(raw).ok_or_else(|| HarnessError::UnknownFillSweep(raw.to_string()))
}
