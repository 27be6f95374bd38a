//! Progress events and the sinks that receive them
//!
//! Every step of a run emits a `Running` event followed by a `Completed`
//! event, or `Failed` when a fan-out database could not be analyzed. A run
//! without a subscriber uses [`NoopSink`].

use std::fmt;
use tokio::sync::mpsc;

/// Status of one progress step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Running,
    Completed,
    Failed,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepStatus::Running => write!(f, "running"),
            StepStatus::Completed => write!(f, "completed"),
            StepStatus::Failed => write!(f, "failed"),
        }
    }
}

/// One progress notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Analyzer name, or database name during server fan-out
    pub step: String,
    /// 1-based position of the step
    pub current: usize,
    pub total: usize,
    pub status: StepStatus,
}

impl ProgressEvent {
    pub fn running(step: &str, current: usize, total: usize) -> Self {
        Self {
            step: step.to_string(),
            current,
            total,
            status: StepStatus::Running,
        }
    }

    pub fn completed(step: &str, current: usize, total: usize) -> Self {
        Self {
            status: StepStatus::Completed,
            ..Self::running(step, current, total)
        }
    }

    pub fn failed(step: &str, current: usize, total: usize) -> Self {
        Self {
            status: StepStatus::Failed,
            ..Self::running(step, current, total)
        }
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}] {} {}", self.current, self.total, self.step, self.status)
    }
}

/// Receives progress events; delivery failures are never errors
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Forwards events into an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelSink {
    /// A sink and the receiver that observes it
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelSink {
    fn emit(&self, event: ProgressEvent) {
        // A dropped receiver just means nobody is listening.
        let _ = self.tx.send(event);
    }
}

/// Calls a closure for every event
pub struct FnSink<F>(pub F);

impl<F> ProgressSink for FnSink<F>
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn emit(&self, event: ProgressEvent) {
        (self.0)(event)
    }
}
