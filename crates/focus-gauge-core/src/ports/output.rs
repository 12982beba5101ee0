//! Output ports for status records and debug images.

use crate::domain::{ConcentrationStatus, Frame};

/// Port for emitting status records.
pub trait StatusOutput: Send + Sync {
    /// Writes a single status record.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write(&self, status: &ConcentrationStatus) -> anyhow::Result<()>;

    /// Flushes any buffered output.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing fails.
    fn flush(&self) -> anyhow::Result<()>;
}

/// Port for the debug video stream.
pub trait DebugImageSink: Send + Sync {
    /// Sends one annotated frame downstream.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    fn send(&self, frame: &Frame) -> anyhow::Result<()>;
}
