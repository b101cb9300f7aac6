//! Signal dialects: what the per-frame scalar means and how far to trust it.
//!
//! The counter itself is signal-agnostic. A dialect bundles the default
//! threshold configuration for one signal source and an explicit reliability
//! grade, so the brightness fallback is never mistaken for the pose-driven
//! dialect it degrades from.

use crate::counter::CounterConfig;
use serde::{Deserialize, Serialize};

/// Interpretation of the scalar fed to the counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Dialect {
    /// Elbow angle in degrees, from shoulder/elbow/wrist landmarks.
    Angle,
    /// Change in mean luma between consecutive frames.
    BrightnessDelta,
}

impl Dialect {
    /// Inverse of the Display name, for values read back from storage.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "angle" => Some(Dialect::Angle),
            "brightness-delta" => Some(Dialect::BrightnessDelta),
            _ => None,
        }
    }

    /// Default thresholds for this dialect.
    ///
    /// These are the values the source material shipped with, not calibrated
    /// constants. Hosts are expected to override them per camera setup; see
    /// [`crate::config::Profile`].
    pub fn default_config(&self) -> CounterConfig {
        match self {
            Dialect::Angle => CounterConfig::new(90.0, 160.0, 1.0),
            Dialect::BrightnessDelta => CounterConfig::new(-2.0, 2.0, 1.0),
        }
    }

    pub fn reliability(&self) -> Reliability {
        match self {
            Dialect::Angle => Reliability::Anatomical,
            Dialect::BrightnessDelta => Reliability::Degraded,
        }
    }
}

/// How much a dialect's counts can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Reliability {
    /// Grounded in joint geometry.
    Anatomical,
    /// Whole-frame statistic with no anatomical grounding; counts are a
    /// rough estimate at best.
    Degraded,
}

impl Reliability {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Reliability::Degraded)
    }
}

/// Turns a stream of absolute luma levels into frame-to-frame deltas.
///
/// The first level has nothing to diff against and yields no observation,
/// as does any non-finite level — the counter never sees either frame.
#[derive(Debug, Clone, Default)]
pub struct BrightnessDelta {
    last_level: Option<f64>,
}

impl BrightnessDelta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next mean-luma level; returns the delta once two finite
    /// levels have been seen.
    pub fn push(&mut self, level: f64) -> Option<f64> {
        if !level.is_finite() {
            return None;
        }
        let delta = self.last_level.map(|prev| level - prev);
        self.last_level = Some(level);
        delta
    }

    pub fn reset(&mut self) {
        self.last_level = None;
    }
}
