//! Status reporting toward an external indicator

use std::cell::Cell;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Error,
    Loading,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Ok => "ok",
            Status::Error => "error",
            Status::Loading => "loading",
        }
    }
}

/// Receiver for data-status changes. The default does nothing, so callers
/// never need to check whether an indicator exists.
pub trait StatusSink {
    fn report_status(&self, _status: Status) {}
}

/// Sink for when nothing is listening
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStatus;

impl StatusSink for NullStatus {}

/// Remembers the latest status and logs transitions
#[derive(Debug, Default)]
pub struct StatusCell {
    last: Cell<Option<Status>>,
    reports: Cell<usize>,
}

impl StatusCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<Status> {
        self.last.get()
    }

    /// Number of reports received, including repeats
    pub fn reports(&self) -> usize {
        self.reports.get()
    }
}

impl StatusSink for StatusCell {
    fn report_status(&self, status: Status) {
        self.reports.set(self.reports.get() + 1);
        if self.last.replace(Some(status)) == Some(status) {
            return;
        }
        match status {
            Status::Error => warn!(status = status.as_str(), "data status changed"),
            _ => info!(status = status.as_str(), "data status changed"),
        }
    }
}
