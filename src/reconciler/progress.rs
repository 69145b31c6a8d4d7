//! Utilities to track the progression of a load operation

use std::fmt::{Display, Error, Formatter};
use std::sync::Arc;

use chrono::NaiveDate;

use crate::reconciler::LoadOutcome;
use crate::traits::Channel;

/// An event that happens during a load operation
#[derive(Clone, Debug, PartialEq)]
pub enum LoadEvent {
    /// No load has started
    NotStarted,
    /// A load has just started. `date` is unknown for initial loads
    Started { date: Option<NaiveDate> },
    /// The view now shows the bookings of `date`
    Rendered { date: NaiveDate, channel: Channel },
    /// A result arrived for a date that is not selected anymore
    Discarded { date: NaiveDate, channel: Channel },
    /// The window of valid dates has moved, everything is loaded again
    Reloading,
    /// The load is over
    Finished { outcome: LoadOutcome },
}

impl Display for LoadEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match self {
            LoadEvent::NotStarted => write!(f, "Not started"),
            LoadEvent::Started{ date: None } => write!(f, "Loading..."),
            LoadEvent::Started{ date: Some(date) } => write!(f, "Loading {}...", date),
            LoadEvent::Rendered{ date, channel } => write!(f, "Showing {} (from {})", date, channel),
            LoadEvent::Discarded{ date, channel } => write!(f, "Dropped {} (from {}), another date is selected", date, channel),
            LoadEvent::Reloading => write!(f, "Valid dates have changed, reloading..."),
            LoadEvent::Finished{ outcome } => write!(f, "Load finished: {:?}", outcome),
        }
    }
}

impl Default for LoadEvent {
    fn default() -> Self {
        Self::NotStarted
    }
}


/// See [`feedback_channel`]
pub type FeedbackSender = tokio::sync::watch::Sender<LoadEvent>;
/// See [`feedback_channel`]
pub type FeedbackReceiver = tokio::sync::watch::Receiver<LoadEvent>;

/// Create a feeback channel, that can be used to follow the load operations of a view
pub fn feedback_channel() -> (FeedbackSender, FeedbackReceiver) {
    tokio::sync::watch::channel(LoadEvent::default())
}


/// Logs the steps of one operation, and reports its milestones to the listener (if any)
pub struct LoadProgress {
    operation: String,
    feedback_channel: Option<Arc<FeedbackSender>>,
}

impl LoadProgress {
    pub fn new<S: ToString>(operation: S, feedback_channel: Option<Arc<FeedbackSender>>) -> Self {
        Self { operation: operation.to_string(), feedback_channel }
    }

    pub fn error(&self, text: &str) {
        log::error!("[{}] {}", self.operation, text);
    }
    pub fn warn(&self, text: &str) {
        log::warn!("[{}] {}", self.operation, text);
    }
    pub fn info(&self, text: &str) {
        log::info!("[{}] {}", self.operation, text);
    }
    pub fn debug(&self, text: &str) {
        log::debug!("[{}] {}", self.operation, text);
    }

    /// Send an event as a feedback to the listener (if any).
    pub fn feedback(&self, event: LoadEvent) {
        if let Some(sender) = &self.feedback_channel {
            // Nobody listening is fine
            let _ = sender.send(event);
        }
    }
}
