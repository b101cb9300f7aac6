//! The repetition-counting state machine.
//!
//! A rep is one full excursion of a periodic scalar signal: below the low
//! threshold (DOWN), then back above the high threshold (UP). The band
//! between the thresholds is hysteresis — observations inside it never
//! reclassify the phase, so signal noise cannot toggle state. A cooldown
//! suppresses double counts from jitter around the high threshold.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Last confidently classified movement extreme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Phase {
    Up,
    Down,
    Unknown,
}

/// Threshold pair and cooldown driving one counter.
///
/// Values are in whatever unit the signal dialect uses (degrees for joint
/// angles, luma units for brightness deltas). See [`crate::signal::Dialect`]
/// for the per-dialect defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CounterConfig {
    pub low_threshold: f64,
    pub high_threshold: f64,
    pub cooldown_secs: f64,
}

impl CounterConfig {
    pub fn new(low_threshold: f64, high_threshold: f64, cooldown_secs: f64) -> Self {
        Self {
            low_threshold,
            high_threshold,
            cooldown_secs,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SignalError {
    #[error("signal value must be finite, got {0}")]
    NonFiniteSignal(f64),
    #[error("timestamp must be finite, got {0}")]
    NonFiniteTimestamp(f64),
}

/// Result of advancing the counter by one observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepUpdate {
    pub count: u32,
    pub phase: Phase,
    /// True exactly when this observation completed a rep.
    pub counted: bool,
}

/// Counts repetitions from a stream of `(signal, timestamp)` observations.
///
/// State is owned by exactly one counting session and mutated only through
/// [`RepCounter::update`]. A frame with no usable observation is handled by
/// not calling `update` at all — phase and count carry over unchanged.
#[derive(Debug, Clone)]
pub struct RepCounter {
    config: CounterConfig,
    count: u32,
    phase: Phase,
    last_rep_at: Option<f64>,
}

impl RepCounter {
    pub fn new(config: CounterConfig) -> Self {
        Self {
            config,
            count: 0,
            phase: Phase::Unknown,
            last_rep_at: None,
        }
    }

    /// Advance the state machine by one observation.
    ///
    /// `timestamp` is in seconds on whatever clock the host uses; the
    /// counter only ever compares timestamps against each other. Non-finite
    /// input is rejected without touching state.
    pub fn update(&mut self, signal: f64, timestamp: f64) -> Result<RepUpdate, SignalError> {
        if !signal.is_finite() {
            return Err(SignalError::NonFiniteSignal(signal));
        }
        if !timestamp.is_finite() {
            return Err(SignalError::NonFiniteTimestamp(timestamp));
        }

        let candidate = if signal < self.config.low_threshold {
            Phase::Down
        } else if signal > self.config.high_threshold {
            Phase::Up
        } else {
            // Inside the hysteresis band: keep the confirmed phase.
            self.phase
        };

        let mut counted = false;
        if self.phase == Phase::Down && candidate == Phase::Up && self.cooldown_clear(timestamp) {
            self.count += 1;
            self.last_rep_at = Some(timestamp);
            counted = true;
        }

        self.phase = candidate;

        Ok(RepUpdate {
            count: self.count,
            phase: self.phase,
            counted,
        })
    }

    fn cooldown_clear(&self, timestamp: f64) -> bool {
        match self.last_rep_at {
            None => true,
            Some(prev) => timestamp - prev > self.config.cooldown_secs,
        }
    }

    /// Return to the initial state: count 0, phase UNKNOWN, no rep recorded.
    pub fn reset(&mut self) {
        self.count = 0;
        self.phase = Phase::Unknown;
        self.last_rep_at = None;
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> &CounterConfig {
        &self.config
    }
}
