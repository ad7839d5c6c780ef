//! Device tier classification.
//!
//! A coarse low/medium/high rating of client rendering capacity, derived
//! once at startup from CPU parallelism (with a settings override) and used
//! to pick streaming render strategies and commit cadences.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use strum::Display;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeviceTier {
    Low,
    Medium,
    High,
}

impl DeviceTier {
    /// Derive the tier once at startup. An explicit override wins; otherwise
    /// the CPU core count decides.
    pub fn detect(override_tier: Option<DeviceTier>) -> Self {
        if let Some(tier) = override_tier {
            debug!(target: "core.device", %tier, "device tier overridden");
            return tier;
        }
        let cores = std::thread::available_parallelism().map_or(1, |n| n.get());
        let tier = Self::from_cores(cores);
        debug!(target: "core.device", cores, %tier, "device tier detected");
        tier
    }

    pub fn from_cores(cores: usize) -> Self {
        match cores {
            0..=2 => DeviceTier::Low,
            3..=5 => DeviceTier::Medium,
            _ => DeviceTier::High,
        }
    }

    /// Commit cadence for streaming text snapshots.
    pub fn text_commit_interval(self) -> Duration {
        match self {
            DeviceTier::High => Duration::from_millis(8),
            DeviceTier::Medium => Duration::from_millis(33),
            DeviceTier::Low => Duration::from_millis(100),
        }
    }

    /// Cadence for heavier UI state updates driven by a stream.
    pub fn ui_update_interval(self) -> Duration {
        match self {
            DeviceTier::High => Duration::from_millis(100),
            DeviceTier::Medium => Duration::from_millis(200),
            DeviceTier::Low => Duration::from_millis(300),
        }
    }
}
