//! Progress reporting for long-running operations

use std::fmt;

/// Milestones reported while a note is being illustrated
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Asking the planner where images go
    Planning,
    /// Starting image `index` of `total` (1-based)
    Generating {
        /// Item number
        index: usize,
        /// Items in the batch
        total: usize,
        /// Item title
        title: String,
    },
    /// A status check came back non-terminal
    Polling {
        /// Item number
        index: usize,
        /// Items in the batch
        total: usize,
        /// Status check number
        attempt: u32,
        /// Attempt-based estimate (0-100)
        percent: u8,
        /// Status message
        message: &'static str,
    },
    /// Writing image `index` to the vault
    Saving {
        /// Item number
        index: usize,
        /// Items in the batch
        total: usize,
    },
    /// Inserting `count` blocks into the note
    Injecting {
        /// Blocks to insert
        count: usize,
    },
    /// Finished; `count` images were added
    Done {
        /// Images added
        count: usize,
    },
    /// Stopped with an error
    Failed {
        /// What went wrong
        message: String,
    },
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Planning => write!(f, "Generating plan..."),
            Self::Generating {
                index,
                total,
                title,
            } => write!(f, "Generating image {}/{}: {}", index, total, title),
            Self::Polling {
                index,
                total,
                message,
                ..
            } => write!(f, "Image {}/{}: {}", index, total, message),
            Self::Saving { index, total } => write!(f, "Saving image {}/{}...", index, total),
            Self::Injecting { .. } => write!(f, "Injecting images into note..."),
            Self::Done { count } => write!(f, "Successfully generated {} images!", count),
            Self::Failed { message } => write!(f, "Error: {}", message),
        }
    }
}

/// Receives [`ProgressEvent`]s in order
pub trait ProgressReporter: Send + Sync {
    /// Handle one event
    fn report(&self, event: ProgressEvent);
}

impl<F> ProgressReporter for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn report(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Discards all events
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _event: ProgressEvent) {}
}
