//! One counting session: a RepCounter plus the bookkeeping around it.
//!
//! A session is created when a stream or replay starts, fed once per
//! processed frame, and discarded at the end. Frames with no usable
//! observation are recorded with [`Session::skip`] rather than fed to the
//! counter, so a dropped pose never moves the phase.

use crate::app_dirs::AppDirs;
use crate::counter::{CounterConfig, Phase, RepCounter, RepUpdate, SignalError};
use crate::geometry::{joint_angle, GeometryError, Point2D};
use crate::signal::{Dialect, Reliability};
use crate::util;
use chrono::Local;
use itertools::Itertools;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use thiserror::Error;

/// Shoulder/elbow/wrist landmarks for one arm in one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmLandmarks {
    pub shoulder: Point2D,
    pub elbow: Point2D,
    pub wrist: Point2D,
}

impl ArmLandmarks {
    pub fn elbow_angle(&self) -> Result<f64, GeometryError> {
        joint_angle(self.shoulder, self.elbow, self.wrist)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ObservationError {
    #[error(transparent)]
    Estimator(#[from] GeometryError),
    #[error(transparent)]
    Signal(#[from] SignalError),
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub dialect: Dialect,
    pub counter: CounterConfig,
}

impl SessionConfig {
    /// A session using the dialect's default thresholds.
    pub fn for_dialect(dialect: Dialect) -> Self {
        Self {
            dialect,
            counter: dialect.default_config(),
        }
    }
}

/// Per-session counting state. Owned by exactly one stream or replay.
#[derive(Debug)]
pub struct Session {
    dialect: Dialect,
    counter: RepCounter,
    started_at: Option<f64>,
    last_observed_at: Option<f64>,
    rep_times: Vec<f64>,
    frames_observed: u32,
    frames_skipped: u32,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            dialect: config.dialect,
            counter: RepCounter::new(config.counter),
            started_at: None,
            last_observed_at: None,
            rep_times: Vec::new(),
            frames_observed: 0,
            frames_skipped: 0,
        }
    }

    /// Feed one scalar observation to the counter.
    pub fn observe(&mut self, signal: f64, timestamp: f64) -> Result<RepUpdate, SignalError> {
        let update = self.counter.update(signal, timestamp)?;

        if self.started_at.is_none() {
            self.started_at = Some(timestamp);
        }
        self.last_observed_at = Some(timestamp);
        self.frames_observed += 1;
        if update.counted {
            self.rep_times.push(timestamp);
        }

        Ok(update)
    }

    /// Angle-dialect convenience: estimate the elbow angle, then observe it.
    ///
    /// A degenerate landmark triple fails before the counter is touched.
    pub fn observe_arm(
        &mut self,
        arm: &ArmLandmarks,
        timestamp: f64,
    ) -> Result<RepUpdate, ObservationError> {
        let angle = arm.elbow_angle()?;
        Ok(self.observe(angle, timestamp)?)
    }

    /// Record a frame that produced no usable observation (pose missing or
    /// below the model's confidence floor). Phase and count carry over.
    pub fn skip(&mut self) {
        self.frames_skipped += 1;
    }

    pub fn count(&self) -> u32 {
        self.counter.count()
    }

    pub fn phase(&self) -> Phase {
        self.counter.phase()
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn reliability(&self) -> Reliability {
        self.dialect.reliability()
    }

    pub fn summary(&self) -> SessionSummary {
        let duration_secs = match (self.started_at, self.last_observed_at) {
            (Some(start), Some(end)) => end - start,
            _ => 0.0,
        };

        let intervals: Vec<f64> = self
            .rep_times
            .iter()
            .tuple_windows()
            .map(|(a, b)| b - a)
            .collect();

        SessionSummary {
            dialect: self.dialect,
            reliability: self.dialect.reliability(),
            reps: self.counter.count(),
            duration_secs,
            frames_observed: self.frames_observed,
            frames_skipped: self.frames_skipped,
            rep_times: self.rep_times.clone(),
            interval_mean: util::mean(&intervals),
            interval_std_dev: util::std_dev(&intervals),
        }
    }
}

/// Final report for one session. This is what outlives the session; the
/// counter state itself is never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub dialect: Dialect,
    pub reliability: Reliability,
    pub reps: u32,
    pub duration_secs: f64,
    pub frames_observed: u32,
    pub frames_skipped: u32,
    /// Timestamp of each counted rep, in session time.
    pub rep_times: Vec<f64>,
    pub interval_mean: Option<f64>,
    pub interval_std_dev: Option<f64>,
}

impl SessionSummary {
    /// Append a line to the plain-text session log under the state dir.
    pub fn append_log(&self) -> io::Result<()> {
        match AppDirs::session_log_path() {
            Some(path) => self.append_log_to(&path),
            None => Ok(()),
        }
    }

    pub fn append_log_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let needs_header = !path.exists();

        let mut log_file = OpenOptions::new().append(true).create(true).open(path)?;

        if needs_header {
            writeln!(
                log_file,
                "date,dialect,reliability,reps,duration_secs,frames_observed,frames_skipped"
            )?;
        }

        writeln!(
            log_file,
            "{},{},{},{},{:.2},{},{}",
            Local::now().format("%c"),
            self.dialect,
            self.reliability,
            self.reps,
            self.duration_secs,
            self.frames_observed,
            self.frames_skipped,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn angle_session() -> Session {
        let mut config = SessionConfig::for_dialect(Dialect::Angle);
        config.counter.cooldown_secs = 0.0;
        Session::new(config)
    }

    fn arm(shoulder: (f64, f64), elbow: (f64, f64), wrist: (f64, f64)) -> ArmLandmarks {
        ArmLandmarks {
            shoulder: shoulder.into(),
            elbow: elbow.into(),
            wrist: wrist.into(),
        }
    }

    #[test]
    fn counts_one_pushup() {
        let mut session = angle_session();

        session.observe(170.0, 0.0).unwrap();
        session.observe(80.0, 0.5).unwrap();
        let update = session.observe(170.0, 1.0).unwrap();

        assert_eq!(update.count, 1);
        assert_eq!(session.count(), 1);
        assert_eq!(session.phase(), Phase::Up);
    }

    #[test]
    fn observe_arm_drives_the_counter() {
        let mut session = angle_session();

        // Straight arm, then bent past 90, then straight again.
        let straight = arm((0.0, 0.0), (0.5, 0.0), (1.0, 0.0));
        let bent = arm((0.0, 0.0), (0.5, 0.0), (0.45, -0.5));

        session.observe_arm(&straight, 0.0).unwrap();
        session.observe_arm(&bent, 0.5).unwrap();
        let update = session.observe_arm(&straight, 1.0).unwrap();

        assert_eq!(update.count, 1);
    }

    #[test]
    fn degenerate_landmarks_leave_state_untouched() {
        let mut session = angle_session();
        session.observe(170.0, 0.0).unwrap();

        let collapsed = arm((0.5, 0.5), (0.5, 0.5), (1.0, 1.0));
        assert_matches!(
            session.observe_arm(&collapsed, 1.0),
            Err(ObservationError::Estimator(GeometryError::CoincidentPoints))
        );

        assert_eq!(session.count(), 0);
        assert_eq!(session.phase(), Phase::Up);
        assert_eq!(session.summary().frames_observed, 1);
    }

    #[test]
    fn skipped_frames_are_counted_separately() {
        let mut session = angle_session();

        session.observe(170.0, 0.0).unwrap();
        session.skip();
        session.skip();
        session.observe(80.0, 1.0).unwrap();

        let summary = session.summary();
        assert_eq!(summary.frames_observed, 2);
        assert_eq!(summary.frames_skipped, 2);
    }

    #[test]
    fn summary_reports_duration_and_intervals() {
        let mut session = angle_session();

        // Three reps at t = 1, 3, 5: intervals of 2.0 each.
        for t in [1.0, 3.0, 5.0] {
            session.observe(80.0, t - 0.5).unwrap();
            session.observe(170.0, t).unwrap();
        }

        let summary = session.summary();
        assert_eq!(summary.reps, 3);
        assert_eq!(summary.rep_times, vec![1.0, 3.0, 5.0]);
        assert_eq!(summary.interval_mean, Some(2.0));
        assert_eq!(summary.interval_std_dev, Some(0.0));
        assert!((summary.duration_secs - 4.5).abs() < 1e-9);
    }

    #[test]
    fn empty_session_summary_is_zeroed() {
        let session = angle_session();
        let summary = session.summary();

        assert_eq!(summary.reps, 0);
        assert_eq!(summary.duration_secs, 0.0);
        assert_eq!(summary.interval_mean, None);
        assert_eq!(summary.interval_std_dev, None);
    }

    #[test]
    fn brightness_session_is_flagged_degraded() {
        let session = Session::new(SessionConfig::for_dialect(Dialect::BrightnessDelta));
        assert!(session.reliability().is_degraded());
        assert!(session.summary().reliability.is_degraded());
    }

    #[test]
    fn log_line_appends_with_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.csv");

        let mut session = angle_session();
        session.observe(170.0, 0.0).unwrap();
        session.observe(80.0, 0.5).unwrap();
        session.observe(170.0, 1.0).unwrap();

        let summary = session.summary();
        summary.append_log_to(&path).unwrap();
        summary.append_log_to(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("date,dialect,reliability,reps"));
        assert!(lines[1].contains("angle,anatomical,1"));
    }
}
