use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use repkit::runtime::{ChannelSource, FrameEvent, Observation, SessionRunner, StepOutcome};
use repkit::session::{Session, SessionConfig};
use repkit::signal::Dialect;

// End-to-end flow over the embedded demo trace: producer thread, bounded
// channel, runner, summary. No camera, no pose model.
#[test]
fn demo_trace_counts_through_the_full_pipeline() {
    let observations = repkit::trace::demo_trace(repkit::trace::DEMO_PUSHUP_ANGLE).unwrap();
    let total_frames = observations.len() as u32;

    let (tx, source) = ChannelSource::bounded(8);
    let producer = thread::spawn(move || {
        for obs in observations {
            if tx.send(FrameEvent::Observation(obs)).is_err() {
                return;
            }
        }
        let _ = tx.send(FrameEvent::Stop);
    });

    let session = Session::new(SessionConfig::for_dialect(Dialect::Angle));
    let mut reps_seen = 0;
    let summary = SessionRunner::new(source, session).run(|outcome| {
        if let StepOutcome::Updated(update) = outcome {
            if update.counted {
                reps_seen += 1;
            }
        }
    });
    producer.join().unwrap();

    assert_eq!(summary.reps, 5);
    assert_eq!(reps_seen, 5);
    assert_eq!(summary.frames_observed, total_frames);
    assert_eq!(summary.frames_skipped, 0);
    assert!(!summary.reliability.is_degraded());
    assert_eq!(summary.rep_times.len(), 5);
}

// Stopping mid-stream ends the session cleanly with the partial count.
#[test]
fn cancellation_reports_the_partial_summary() {
    let observations = repkit::trace::demo_trace(repkit::trace::DEMO_PUSHUP_ANGLE).unwrap();
    let cutoff = observations.len() / 2;

    let (tx, source) = ChannelSource::bounded(8);
    let producer = thread::spawn(move || {
        for obs in observations.into_iter().take(cutoff) {
            if tx.send(FrameEvent::Observation(obs)).is_err() {
                return;
            }
        }
        // User stopped the stream.
        let _ = tx.send(FrameEvent::Stop);
    });

    let session = Session::new(SessionConfig::for_dialect(Dialect::Angle));
    let summary = SessionRunner::new(source, session).run(|_| {});
    producer.join().unwrap();

    assert_eq!(summary.frames_observed, cutoff as u32);
    assert!(summary.reps < 5);
}

// The brightness fallback flows through the same machinery but comes out
// flagged as degraded.
#[test]
fn brightness_fallback_is_degraded_end_to_end() {
    let levels = repkit::trace::demo_trace(repkit::trace::DEMO_BRIGHTNESS_LEVELS).unwrap();
    let deltas = repkit::trace::differentiate(&levels);

    let (tx, source) = ChannelSource::bounded(8);
    let producer = thread::spawn(move || {
        for obs in deltas {
            if tx.send(FrameEvent::Observation(obs)).is_err() {
                return;
            }
        }
        let _ = tx.send(FrameEvent::Stop);
    });

    let session = Session::new(SessionConfig::for_dialect(Dialect::BrightnessDelta));
    let summary = SessionRunner::new(source, session).run(|_| {});
    producer.join().unwrap();

    assert_eq!(summary.reps, 4);
    assert!(summary.reliability.is_degraded());
}

// Dropped frames (no pose) and malformed observations interleave with good
// ones without corrupting the count.
#[test]
fn gaps_and_garbage_do_not_corrupt_the_count() {
    let (tx, rx) = mpsc::channel();
    let events = [
        FrameEvent::Observation(Observation::new(170.0, 0.0)),
        FrameEvent::NoObservation,
        FrameEvent::Observation(Observation::new(80.0, 0.5)),
        FrameEvent::Observation(Observation::new(f64::NAN, 0.7)),
        FrameEvent::NoObservation,
        FrameEvent::Observation(Observation::new(170.0, 1.0)),
        FrameEvent::Stop,
    ];
    for event in events {
        tx.send(event).unwrap();
    }

    let mut config = SessionConfig::for_dialect(Dialect::Angle);
    config.counter.cooldown_secs = 0.0;
    let session = Session::new(config);

    let mut rejected = 0;
    let summary = SessionRunner::new(repkit::runtime::TestSource::new(rx), session)
        .with_poll_interval(Duration::from_millis(5))
        .run(|outcome| {
            if matches!(outcome, StepOutcome::Rejected(_)) {
                rejected += 1;
            }
        });

    assert_eq!(summary.reps, 1);
    assert_eq!(rejected, 1);
    assert_eq!(summary.frames_observed, 3);
    // Two dropped frames plus the rejected one.
    assert_eq!(summary.frames_skipped, 3);
}

// A slow consumer throttles the producer through the bounded channel rather
// than letting frames pile up.
#[test]
fn slow_consumer_applies_backpressure() {
    let (tx, source) = ChannelSource::bounded(2);

    let producer = thread::spawn(move || {
        for i in 0..20 {
            let obs = Observation::new(if i % 2 == 0 { 170.0 } else { 80.0 }, i as f64 * 0.1);
            if tx.send(FrameEvent::Observation(obs)).is_err() {
                return;
            }
        }
        let _ = tx.send(FrameEvent::Stop);
    });

    let mut config = SessionConfig::for_dialect(Dialect::Angle);
    config.counter.cooldown_secs = 0.0;
    let session = Session::new(config);

    // Drain slowly; the producer must wait for channel slots.
    let mut runner = SessionRunner::new(source, session);
    let mut stopped = false;
    while !stopped {
        thread::sleep(Duration::from_millis(1));
        stopped = runner.step() == StepOutcome::Stopped;
    }
    let summary = runner.finish();
    producer.join().unwrap();

    assert_eq!(summary.frames_observed, 20);
    assert_eq!(summary.reps, 9);
}
