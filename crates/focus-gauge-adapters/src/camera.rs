//! Live camera frame source backed by nokhwa.
//!
//! The camera handle lives on a dedicated capture thread; `read` requests one
//! frame over a channel and waits with a timeout, so a stalled device never
//! blocks the pipeline indefinitely. Releasing waits at most one read timeout
//! for the thread to stop and detaches it otherwise.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use focus_gauge_core::{Frame, FrameRead, FrameSource};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
};
use nokhwa::Camera;
use tracing::{debug, info, warn};

/// Camera selection and retry settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraConfig {
    /// Device index.
    pub index: u32,
    /// Requested frame width.
    pub width: u32,
    /// Requested frame height.
    pub height: u32,
    /// Open attempts before giving up.
    pub max_retries: u32,
    /// Pause between open attempts.
    pub retry_delay: Duration,
    /// Longest wait for a single frame.
    pub read_timeout: Duration,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            width: 640,
            height: 480,
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            read_timeout: Duration::from_secs(2),
        }
    }
}

struct Worker {
    requests: SyncSender<()>,
    frames: Receiver<Result<Frame>>,
    /// Disconnects when the capture thread exits.
    exited: Receiver<()>,
    handle: JoinHandle<()>,
}

impl Worker {
    /// Signals the capture thread to stop and joins it if it exits within
    /// `grace`. Returns false if the thread was left running detached.
    fn shutdown(self, grace: Duration) -> bool {
        let Self {
            requests,
            frames,
            exited,
            handle,
        } = self;
        drop(requests);
        drop(frames);

        if let Err(RecvTimeoutError::Timeout) = exited.recv_timeout(grace) {
            return false;
        }
        if handle.join().is_err() {
            warn!("Camera capture thread panicked");
        }
        true
    }
}

/// Frame source reading from a local camera.
pub struct CameraSource {
    config: CameraConfig,
    worker: Option<Worker>,
}

impl std::fmt::Debug for CameraSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraSource")
            .field("config", &self.config)
            .field("open", &self.worker.is_some())
            .finish()
    }
}

impl CameraSource {
    /// Opens the camera, retrying up to `max_retries` times.
    ///
    /// An attempt only counts as successful once a test frame was captured.
    ///
    /// # Errors
    ///
    /// Returns the last failure if every attempt fails.
    pub fn open(config: CameraConfig) -> Result<Self> {
        let worker = spawn_worker(&config)?;
        Ok(Self {
            config,
            worker: Some(worker),
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &CameraConfig {
        &self.config
    }

    /// Returns true while the capture thread holds the device.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.worker.is_some()
    }
}

impl FrameSource for CameraSource {
    fn read(&mut self) -> FrameRead {
        let Some(worker) = self.worker.as_ref() else {
            return FrameRead::Closed;
        };

        // Drop replies to requests that previously timed out.
        while worker.frames.try_recv().is_ok() {}

        if worker.requests.send(()).is_err() {
            warn!("Camera capture thread exited");
            self.release();
            return FrameRead::Unavailable;
        }

        match worker.frames.recv_timeout(self.config.read_timeout) {
            Ok(Ok(frame)) => FrameRead::Frame(frame),
            Ok(Err(e)) => {
                warn!("Failed to read camera frame: {e:#}");
                FrameRead::Unavailable
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!("Camera read timed out");
                FrameRead::Unavailable
            }
            Err(RecvTimeoutError::Disconnected) => {
                warn!("Camera capture thread exited");
                self.release();
                FrameRead::Unavailable
            }
        }
    }

    fn reopen(&mut self) -> Result<()> {
        self.release();
        info!("Reopening camera {}", self.config.index);
        self.worker = Some(spawn_worker(&self.config)?);
        Ok(())
    }

    fn release(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.shutdown(self.config.read_timeout) {
                info!("Camera {} released", self.config.index);
            } else {
                warn!(
                    "Camera {} capture thread still busy after {:?}, detaching it",
                    self.config.index, self.config.read_timeout
                );
            }
        }
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        self.release();
    }
}

fn spawn_worker(config: &CameraConfig) -> Result<Worker> {
    let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();
    let (request_tx, request_rx) = mpsc::sync_channel::<()>(1);
    let (frame_tx, frame_rx) = mpsc::sync_channel::<Result<Frame>>(1);
    let (exit_tx, exit_rx) = mpsc::channel::<()>();
    let config = config.clone();

    let handle = thread::Builder::new()
        .name(format!("camera-{}", config.index))
        .spawn(move || {
            let _exit = exit_tx;
            let mut camera = match open_with_retries(&config) {
                Ok(camera) => camera,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            let _ = ready_tx.send(Ok(()));

            while request_rx.recv().is_ok() {
                if frame_tx.send(capture(&mut camera)).is_err() {
                    break;
                }
            }
            if let Err(e) = camera.stop_stream() {
                debug!("Failed to stop camera stream: {e}");
            }
        })
        .context("Failed to spawn camera thread")?;

    match ready_rx.recv() {
        Ok(Ok(())) => Ok(Worker {
            requests: request_tx,
            frames: frame_rx,
            exited: exit_rx,
            handle,
        }),
        Ok(Err(e)) => {
            let _ = handle.join();
            Err(e)
        }
        Err(_) => {
            let _ = handle.join();
            bail!("Camera thread exited during startup")
        }
    }
}

fn open_with_retries(config: &CameraConfig) -> Result<Camera> {
    let attempts = config.max_retries.max(1);
    let mut last_error = anyhow!("Camera {} was never opened", config.index);

    for attempt in 1..=attempts {
        match open_once(config) {
            Ok(camera) => {
                info!("Opened camera {} ({})", config.index, camera.camera_format());
                return Ok(camera);
            }
            Err(e) => {
                warn!(
                    "Camera {} open attempt {attempt}/{attempts} failed: {e:#}",
                    config.index
                );
                last_error = e;
            }
        }
        if attempt < attempts {
            thread::sleep(config.retry_delay);
        }
    }

    Err(last_error.context(format!(
        "Failed to open camera {} after {attempts} attempts",
        config.index
    )))
}

fn open_once(config: &CameraConfig) -> Result<Camera> {
    let format = CameraFormat::new(
        Resolution::new(config.width, config.height),
        FrameFormat::MJPEG,
        30,
    );
    let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(format));
    let mut camera = Camera::new(CameraIndex::Index(config.index), requested)
        .map_err(|e| anyhow!(e))
        .context("Failed to create camera instance")?;
    camera
        .open_stream()
        .map_err(|e| anyhow!(e))
        .context("Failed to open camera stream")?;
    capture(&mut camera).context("Test read failed")?;
    Ok(camera)
}

fn capture(camera: &mut Camera) -> Result<Frame> {
    let buffer = camera
        .frame()
        .map_err(|e| anyhow!(e))
        .context("Failed to get frame")?;
    let decoded = buffer
        .decode_image::<RgbFormat>()
        .map_err(|e| anyhow!(e))
        .context("Failed to decode frame")?;
    let shape = [decoded.height() as usize, decoded.width() as usize, 3];
    Frame::from_shape_vec(&shape, decoded.into_raw()).context("Camera returned a short buffer")
}
