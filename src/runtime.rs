//! Frame handoff between the producer (camera capture, video decode) and the
//! counting consumer.
//!
//! The producer side lives on its own thread and pushes one event per frame
//! into a bounded channel; a slow consumer blocks the producer instead of
//! buffering without limit. Dropping the sender or sending [`FrameEvent::Stop`]
//! ends the session, which reports its final summary and nothing else.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::time::Duration;

use crate::counter::{RepUpdate, SignalError};
use crate::session::{Session, SessionSummary};

/// One frame's worth of signal, ready for the counter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub signal: f64,
    pub timestamp: f64,
}

impl Observation {
    pub fn new(signal: f64, timestamp: f64) -> Self {
        Self { signal, timestamp }
    }
}

/// Unified event type consumed by the session runner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameEvent {
    Observation(Observation),
    /// Frame was processed upstream but produced no usable signal
    /// (missing pose, low landmark confidence).
    NoObservation,
    Stop,
}

/// Source of frame events.
pub trait ObservationSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or
    /// Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<FrameEvent, RecvTimeoutError>;
}

/// Production source backed by a bounded channel.
pub struct ChannelSource {
    rx: Receiver<FrameEvent>,
}

impl ChannelSource {
    /// Create the source and its sender half. `capacity` bounds how many
    /// frames may be in flight before the producer blocks.
    pub fn bounded(capacity: usize) -> (SyncSender<FrameEvent>, Self) {
        let (tx, rx) = mpsc::sync_channel(capacity);
        (tx, Self { rx })
    }
}

impl ObservationSource for ChannelSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<FrameEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Test event source for unit tests.
pub struct TestSource {
    rx: Receiver<FrameEvent>,
}

impl TestSource {
    pub fn new(rx: Receiver<FrameEvent>) -> Self {
        Self { rx }
    }
}

impl ObservationSource for TestSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<FrameEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// What one call to [`SessionRunner::step`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// An observation advanced the counter.
    Updated(RepUpdate),
    /// A frame with no usable signal was recorded as skipped.
    Skipped,
    /// A malformed observation was rejected; the session state is
    /// unchanged and the frame is recorded as skipped.
    Rejected(SignalError),
    /// No event arrived within the poll interval.
    Idle,
    /// The stream ended (explicit stop or producer hangup).
    Stopped,
}

/// Advances one session one frame event at a time.
pub struct SessionRunner<S: ObservationSource> {
    source: S,
    session: Session,
    poll_interval: Duration,
}

impl<S: ObservationSource> SessionRunner<S> {
    pub fn new(source: S, session: Session) -> Self {
        Self {
            source,
            session,
            poll_interval: Duration::from_millis(100),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Block up to the poll interval and process the next event.
    pub fn step(&mut self) -> StepOutcome {
        match self.source.recv_timeout(self.poll_interval) {
            Ok(FrameEvent::Observation(obs)) => {
                match self.session.observe(obs.signal, obs.timestamp) {
                    Ok(update) => StepOutcome::Updated(update),
                    Err(err) => {
                        self.session.skip();
                        StepOutcome::Rejected(err)
                    }
                }
            }
            Ok(FrameEvent::NoObservation) => {
                self.session.skip();
                StepOutcome::Skipped
            }
            Ok(FrameEvent::Stop) | Err(RecvTimeoutError::Disconnected) => StepOutcome::Stopped,
            Err(RecvTimeoutError::Timeout) => StepOutcome::Idle,
        }
    }

    /// Drain events until the stream ends, reporting each outcome to
    /// `on_step`, then return the final summary.
    pub fn run<F: FnMut(&StepOutcome)>(mut self, mut on_step: F) -> SessionSummary {
        loop {
            let outcome = self.step();
            on_step(&outcome);
            if outcome == StepOutcome::Stopped {
                break;
            }
        }
        self.finish()
    }

    /// Consume the runner and report the session's final summary.
    pub fn finish(self) -> SessionSummary {
        self.session.summary()
    }
}
