//! Frame validation.
//!
//! Every pipeline stage checks its input here first and short-circuits on
//! rejection.

use tracing::debug;

use crate::domain::Frame;

/// Returns true if `frame` is a non-empty `(height, width, channels)` buffer
/// with 3 or 4 channels.
#[must_use]
pub fn is_valid_frame(frame: Option<&Frame>) -> bool {
    let Some(frame) = frame else {
        debug!("Frame rejected: no frame");
        return false;
    };

    if frame.is_empty() {
        debug!("Frame rejected: empty buffer with shape {:?}", frame.shape());
        return false;
    }

    if frame.ndim() != 3 {
        debug!("Frame rejected: expected 3 axes, got {}", frame.ndim());
        return false;
    }

    match frame.channels() {
        Some(3 | 4) => true,
        channels => {
            debug!("Frame rejected: unsupported channel count {channels:?}");
            false
        }
    }
}
