//! Frame source port: anything that hands out frames on demand.

use crate::domain::Frame;

/// Outcome of a single read from a [`FrameSource`].
#[derive(Debug, Clone)]
pub enum FrameRead {
    /// A frame was captured.
    Frame(Frame),
    /// No frame right now; the source may recover on a later read.
    Unavailable,
    /// The source is exhausted or gone for good.
    Closed,
}

/// Port for pulling frames from a camera, a file set or a test script.
pub trait FrameSource: Send {
    /// Reads the next frame. Never blocks indefinitely and never panics.
    fn read(&mut self) -> FrameRead;

    /// Re-initializes the underlying device after repeated failed reads.
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot be reopened.
    fn reopen(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Releases the underlying device. Further reads return
    /// [`FrameRead::Closed`] until [`FrameSource::reopen`] succeeds.
    fn release(&mut self) {}

    /// Total number of frames, if known ahead of time.
    fn count_hint(&self) -> Option<usize> {
        None
    }
}
