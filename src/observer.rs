//! Callbacks through which a run reports to its caller.
//!
//! The coordinator is the only caller of an observer and invokes it from a
//! single task, so implementations see log lines and progress ticks in order.

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use crate::types::RunStatus;

/// Receives log lines, progress ticks and the final status of a run.
pub trait ConversionObserver: Send + Sync {
    /// One user-facing log line (may contain newlines for multi-line reports).
    fn on_log(&self, line: &str);

    /// `completed` out of `total` task units are done. Never decreases.
    fn on_progress(&self, completed: usize, total: usize);

    /// The run ended; called exactly once.
    fn on_finished(&self, status: RunStatus, detail: &str);
}

/// Progress as a whole percentage, 0 when there is nothing to do yet.
pub fn percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((completed.min(total) * 100) / total) as u8
}

/// Forwards everything to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl ConversionObserver for LogObserver {
    fn on_log(&self, line: &str) {
        for part in line.lines() {
            log::info!("{}", part);
        }
    }

    fn on_progress(&self, completed: usize, total: usize) {
        log::debug!(
            "Progress {}/{} ({}%)",
            completed,
            total,
            percent(completed, total)
        );
    }

    fn on_finished(&self, status: RunStatus, detail: &str) {
        match status {
            RunStatus::Completed => log::info!("{}", detail),
            RunStatus::Cancelled => log::warn!("{}", detail),
            RunStatus::Failed => log::error!("{}", detail),
        }
    }
}

/// One observer callback as a value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConversionEvent {
    Log(String),
    Progress { completed: usize, total: usize },
    Finished { status: RunStatus, detail: String },
}

/// Sends every callback as a [`ConversionEvent`] over an unbounded channel,
/// for UIs that consume updates on their own event loop.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    sender: UnboundedSender<ConversionEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, UnboundedReceiver<ConversionEvent>) {
        let (sender, receiver) = unbounded_channel();
        (Self { sender }, receiver)
    }

    fn send(&self, event: ConversionEvent) {
        // receiver gone means nobody is listening anymore
        let _ = self.sender.send(event);
    }
}

impl ConversionObserver for ChannelObserver {
    fn on_log(&self, line: &str) {
        self.send(ConversionEvent::Log(line.to_string()));
    }

    fn on_progress(&self, completed: usize, total: usize) {
        self.send(ConversionEvent::Progress { completed, total });
    }

    fn on_finished(&self, status: RunStatus, detail: &str) {
        self.send(ConversionEvent::Finished {
            status,
            detail: detail.to_string(),
        });
    }
}
