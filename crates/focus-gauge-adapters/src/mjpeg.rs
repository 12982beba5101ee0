//! MJPEG encoding of the debug video stream.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use focus_gauge_core::{DebugImageSink, Frame};
use image::codecs::jpeg::JpegEncoder;

/// JPEG quality used for debug frames.
pub const JPEG_QUALITY: u8 = 85;

/// Multipart boundary between frames.
pub const BOUNDARY: &str = "frame";

/// HTTP content type of the full stream.
pub const CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

/// Encodes a color frame as JPEG. Alpha is dropped.
///
/// # Errors
///
/// Returns an error if the frame is not a color image or encoding fails.
pub fn encode_jpeg(frame: &Frame, quality: u8) -> Result<Vec<u8>> {
    let image = frame.to_rgb_image().context("Debug frame is not a color image")?;
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality)
        .encode_image(&image)
        .context("JPEG encoding failed")?;
    Ok(buf)
}

/// Writes one multipart part wrapping `jpeg`.
///
/// # Errors
///
/// Returns any error from the underlying writer.
pub fn write_part<W: Write + ?Sized>(writer: &mut W, jpeg: &[u8]) -> io::Result<()> {
    write!(writer, "--{BOUNDARY}\r\nContent-Type: image/jpeg\r\n\r\n")?;
    writer.write_all(jpeg)?;
    writer.write_all(b"\r\n")
}

/// Debug image sink writing an MJPEG multipart stream.
pub struct MjpegSink {
    writer: Mutex<Box<dyn Write + Send>>,
    quality: u8,
}

impl std::fmt::Debug for MjpegSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MjpegSink")
            .field("quality", &self.quality)
            .finish_non_exhaustive()
    }
}

impl MjpegSink {
    /// Creates a sink over any writer.
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
            quality: JPEG_QUALITY,
        }
    }

    /// Creates a sink writing to `path`, truncating it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create MJPEG output: {}", path.display()))?;
        Ok(Self::new(BufWriter::new(file)))
    }

    /// Overrides the JPEG quality (clamped to 1..=100).
    #[must_use]
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.clamp(1, 100);
        self
    }
}

impl DebugImageSink for MjpegSink {
    fn send(&self, frame: &Frame) -> Result<()> {
        let jpeg = encode_jpeg(frame, self.quality)?;
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        write_part(&mut *writer, &jpeg).context("Failed to write MJPEG part")?;
        writer.flush().context("Failed to flush MJPEG stream")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_part_layout() {
        let mut out = Vec::new();
        write_part(&mut out, b"JPEG").unwrap();
        assert_eq!(
            out,
            b"--frame\r\nContent-Type: image/jpeg\r\n\r\nJPEG\r\n".to_vec()
        );
    }

    #[test]
    fn test_encode_rejects_gray() {
        assert!(encode_jpeg(&Frame::zeros(&[4, 4]), JPEG_QUALITY).is_err());
    }

    #[test]
    fn test_encode_produces_jpeg_markers() {
        let jpeg = encode_jpeg(&Frame::blank(), JPEG_QUALITY).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        assert_eq!(&jpeg[jpeg.len() - 2..], &[0xFF, 0xD9]);
    }
}
