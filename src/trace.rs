//! Recorded signal traces.
//!
//! A trace is the per-frame scalar stream written down: CSV rows of
//! `timestamp,value`, in seconds and dialect units. Traces stand in for the
//! live frame pipeline (pose model or pixel statistics), which stays outside
//! this crate. A couple of demo traces are embedded so the CLI can run
//! without any input file.

use crate::runtime::Observation;
use crate::signal::BrightnessDelta;
use include_dir::{include_dir, Dir};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

static TRACE_DIR: Dir = include_dir!("src/traces");

/// Demo trace names accepted by [`demo_trace`].
pub const DEMO_PUSHUP_ANGLE: &str = "pushup_angle";
pub const DEMO_BRIGHTNESS_LEVELS: &str = "brightness_levels";

#[derive(Debug, Deserialize)]
struct TraceRow {
    timestamp: f64,
    value: f64,
}

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("failed to read trace: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed trace row: {0}")]
    Malformed(#[from] csv::Error),
    #[error("unknown demo trace `{0}`")]
    UnknownDemo(String),
}

/// Parse a `timestamp,value` CSV stream into observations, in file order.
pub fn read_trace<R: Read>(reader: R) -> Result<Vec<Observation>, TraceError> {
    let mut rows = csv::Reader::from_reader(reader);
    let mut observations = Vec::new();
    for row in rows.deserialize() {
        let row: TraceRow = row?;
        observations.push(Observation::new(row.value, row.timestamp));
    }
    Ok(observations)
}

pub fn read_trace_file(path: &Path) -> Result<Vec<Observation>, TraceError> {
    read_trace(File::open(path)?)
}

/// One of the embedded demo traces.
pub fn demo_trace(name: &str) -> Result<Vec<Observation>, TraceError> {
    let file = TRACE_DIR
        .get_file(format!("{name}.csv"))
        .ok_or_else(|| TraceError::UnknownDemo(name.to_string()))?;
    read_trace(file.contents())
}

/// Convert a trace of absolute luma levels into frame-to-frame deltas.
///
/// The first level (and any non-finite one) yields no observation, so the
/// output is shorter than the input.
pub fn differentiate(levels: &[Observation]) -> Vec<Observation> {
    let mut differ = BrightnessDelta::new();
    levels
        .iter()
        .filter_map(|obs| {
            differ
                .push(obs.signal)
                .map(|delta| Observation::new(delta, obs.timestamp))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn parses_rows_in_order() {
        let csv = "timestamp,value\n0.0,170.0\n0.1,150.5\n0.2,80.0\n";
        let observations = read_trace(csv.as_bytes()).unwrap();

        assert_eq!(observations.len(), 3);
        assert_eq!(observations[0], Observation::new(170.0, 0.0));
        assert_eq!(observations[2], Observation::new(80.0, 0.2));
    }

    #[test]
    fn malformed_rows_are_an_error() {
        let csv = "timestamp,value\n0.0,not-a-number\n";
        assert_matches!(read_trace(csv.as_bytes()), Err(TraceError::Malformed(_)));
    }

    #[test]
    fn unknown_demo_name_is_an_error() {
        assert_matches!(demo_trace("no_such_trace"), Err(TraceError::UnknownDemo(_)));
    }

    #[test]
    fn embedded_pushup_trace_counts_five_reps() {
        use crate::session::{Session, SessionConfig};
        use crate::signal::Dialect;

        let observations = demo_trace(DEMO_PUSHUP_ANGLE).unwrap();
        assert!(!observations.is_empty());

        let mut session = Session::new(SessionConfig::for_dialect(Dialect::Angle));
        for obs in &observations {
            session.observe(obs.signal, obs.timestamp).unwrap();
        }

        assert_eq!(session.count(), 5);
    }

    #[test]
    fn embedded_brightness_trace_counts_after_differencing() {
        use crate::session::{Session, SessionConfig};
        use crate::signal::Dialect;

        let levels = demo_trace(DEMO_BRIGHTNESS_LEVELS).unwrap();
        let deltas = differentiate(&levels);
        assert_eq!(deltas.len(), levels.len() - 1);

        let mut session = Session::new(SessionConfig::for_dialect(Dialect::BrightnessDelta));
        for obs in &deltas {
            session.observe(obs.signal, obs.timestamp).unwrap();
        }

        assert_eq!(session.count(), 4);
        assert!(session.reliability().is_degraded());
    }

    #[test]
    fn differencing_skips_the_first_level() {
        let levels = vec![
            Observation::new(128.0, 0.0),
            Observation::new(124.0, 0.1),
            Observation::new(129.0, 0.2),
        ];
        let deltas = differentiate(&levels);

        assert_eq!(
            deltas,
            vec![Observation::new(-4.0, 0.1), Observation::new(5.0, 0.2)]
        );
    }
}
