//! Progress reporting port for UI integration.

use std::sync::Arc;

use crate::domain::ConcentrationStatus;

/// Events emitted by the frame-pull loop.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// A frame was read and is about to be processed.
    Started {
        /// Frame number (0-based).
        index: usize,
        /// Total frames, if known.
        total: Option<usize>,
    },
    /// A frame was processed.
    Completed {
        /// The published status.
        status: Arc<ConcentrationStatus>,
    },
    /// A read produced no frame.
    Skipped {
        /// Why nothing was processed.
        reason: String,
    },
    /// The source closed.
    Finished {
        /// Frames processed.
        processed: usize,
        /// Reads that produced no frame.
        skipped: usize,
    },
}

/// Port for receiving progress events.
pub trait ProgressSink: Send + Sync {
    /// Called when a progress event occurs.
    fn on_event(&self, event: ProgressEvent);
}
