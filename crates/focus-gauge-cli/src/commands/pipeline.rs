//! Shared pipeline arguments and the frame-pull loop.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use clap::Args;
use focus_gauge_adapters::models::{model_path_in, FACE_DETECTOR, FACE_MESH};
use focus_gauge_adapters::{models_dir, MjpegSink, JPEG_QUALITY};
use focus_gauge_core::inference::{
    select_device, BlazeFaceConfig, BlazeFaceDetector, MeshConfig, MeshLandmarker,
};
use focus_gauge_core::modules::{FaceDetectorLoader, LandmarkLoader, DEFAULT_HISTORY_SIZE};
use focus_gauge_core::{
    DebugImageSink, FaceDetector, FrameProcessor, FrameRead, FrameSource, GazeConfig,
    GazeEstimator, LandmarkDetector, ProgressEvent, ProgressSink, StatusOutput,
};
use tracing::{debug, error, info, warn};

use super::ExitCode;
use crate::config::AppConfig;
use crate::output::{JsonOutput, OutputFormat, ProgressBar};

/// Consecutive failed reads before the source is reopened.
pub const DEFAULT_MAX_READ_FAILURES: usize = 5;

/// Parse and validate a value in 0.0-1.0.
fn parse_unit(s: &str) -> Result<f32, String> {
    let value: f32 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{value} is not in 0.0..=1.0"))
    }
}

/// Parse a strictly positive ratio bound.
fn parse_positive(s: &str) -> Result<f32, String> {
    let value: f32 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if value > 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(format!("{value} must be a positive number"))
    }
}

/// Arguments shared by every command that runs the pipeline.
#[derive(Args, Clone, Debug, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct PipelineArgs {
    /// Write the annotated debug stream as MJPEG to this file
    #[arg(long, value_name = "FILE")]
    pub mjpeg: Option<PathBuf>,

    /// Custom models directory (overrides default and config)
    #[arg(long, value_name = "DIR")]
    pub models_dir: Option<PathBuf>,

    /// Eye aspect ratio below which eyes count as closed (0.0-1.0)
    #[arg(long, value_parser = parse_unit)]
    pub ear_threshold: Option<f32>,

    /// Gaze smoothing window length
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    pub history_size: Option<u16>,

    /// Lower bound of the focus band
    #[arg(long, value_parser = parse_positive)]
    pub focus_lo: Option<f32>,

    /// Upper bound of the focus band
    #[arg(long, value_parser = parse_positive)]
    pub focus_hi: Option<f32>,

    /// Minimum face detection confidence (0.0-1.0)
    #[arg(long, value_parser = parse_unit)]
    pub min_face_confidence: Option<f32>,

    /// Process frames as captured instead of mirrored
    #[arg(long)]
    pub no_mirror: bool,

    /// Show progress bar
    #[arg(long)]
    pub progress: bool,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Pretty-print JSON output (only affects --format json)
    #[arg(long)]
    pub pretty: bool,

    /// Merged config (populated by `with_config`, not from CLI).
    #[arg(skip)]
    config: AppConfig,
}

impl PipelineArgs {
    /// Apply configuration file values, respecting CLI precedence.
    ///
    /// Layering priority (lowest to highest):
    /// 1. Hardcoded defaults (in accessor methods)
    /// 2. Config file values (XDG, then project-local)
    /// 3. CLI arguments (already set on self)
    #[must_use]
    pub fn with_config(mut self, config: &AppConfig) -> Self {
        self.ear_threshold = self.ear_threshold.or(config.gaze.ear_threshold);
        self.focus_lo = self.focus_lo.or(config.gaze.focus_lo);
        self.focus_hi = self.focus_hi.or(config.gaze.focus_hi);
        self.min_face_confidence = self.min_face_confidence.or(config.face.min_confidence);

        if self.format.is_none() {
            self.format = config
                .output
                .format
                .as_deref()
                .and_then(OutputFormat::from_config);
        }
        if !self.pretty {
            self.pretty = config.output.pretty.unwrap_or(false);
        }
        if !self.progress {
            self.progress = config.output.progress.unwrap_or(false);
        }
        if !self.no_mirror {
            self.no_mirror = config.camera.mirror == Some(false);
        }
        if self.models_dir.is_none() {
            self.models_dir.clone_from(&config.models.dir);
        }

        self.config = config.clone();
        self
    }

    /// Gaze estimation settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the merged focus band is empty.
    pub fn gaze_config(&self) -> Result<GazeConfig> {
        let defaults = GazeConfig::default();
        let history_size = self
            .history_size
            .map(usize::from)
            .or(self.config.gaze.history_size)
            .unwrap_or(DEFAULT_HISTORY_SIZE);
        let focus_lo = self.focus_lo.unwrap_or(defaults.focus_lo);
        let focus_hi = self.focus_hi.unwrap_or(defaults.focus_hi);
        ensure!(
            focus_lo < focus_hi,
            "focus band lower bound ({focus_lo}) must be below upper bound ({focus_hi})"
        );
        Ok(defaults
            .with_history_size(history_size)
            .with_ear_threshold(self.ear_threshold.unwrap_or(defaults.ear_threshold))
            .with_focus_band(focus_lo, focus_hi))
    }

    /// Face presence settings.
    #[must_use]
    pub fn face_config(&self) -> BlazeFaceConfig {
        let defaults = BlazeFaceConfig::default();
        defaults
            .clone()
            .with_min_confidence(self.min_face_confidence.unwrap_or(defaults.min_confidence))
            .with_model_selection(
                self.config
                    .face
                    .model_selection
                    .unwrap_or(defaults.model_selection),
            )
    }

    /// Landmark detector settings.
    #[must_use]
    pub fn mesh_config(&self) -> MeshConfig {
        let mut config = MeshConfig::default();
        if let Some(min_confidence) = self.config.landmarks.min_confidence {
            config.min_confidence = min_confidence;
        }
        config
    }

    /// Directory holding model weights.
    #[must_use]
    pub fn models_dir(&self) -> PathBuf {
        self.models_dir.clone().unwrap_or_else(models_dir)
    }

    /// Output format with fallback to JSONL.
    #[must_use]
    pub fn format(&self) -> OutputFormat {
        self.format.unwrap_or_default()
    }

    /// JPEG quality for the debug stream.
    #[must_use]
    pub fn jpeg_quality(&self) -> u8 {
        self.config.stream.jpeg_quality.unwrap_or(JPEG_QUALITY)
    }

    /// Merged configuration.
    #[must_use]
    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    fn loop_config(&self, idle_delay: Duration, max_frames: Option<usize>) -> LoopConfig {
        LoopConfig {
            mirror: !self.no_mirror,
            max_read_failures: self
                .config
                .camera
                .max_read_failures
                .unwrap_or(DEFAULT_MAX_READ_FAILURES)
                .max(1),
            idle_delay,
            max_frames,
        }
    }
}

/// Frame-pull loop behaviour.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Mirror each frame horizontally before processing.
    pub mirror: bool,
    /// Consecutive failed reads before `reopen`.
    pub max_read_failures: usize,
    /// Pause after a failed read.
    pub idle_delay: Duration,
    /// Stop after this many processed frames.
    pub max_frames: Option<usize>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            mirror: true,
            max_read_failures: DEFAULT_MAX_READ_FAILURES,
            idle_delay: Duration::ZERO,
            max_frames: None,
        }
    }
}

/// Counters from one run of the pull loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopSummary {
    /// Frames handed to the processor.
    pub processed: usize,
    /// Reads that produced no frame.
    pub skipped: usize,
    /// Times the source was reopened.
    pub reopens: usize,
}

/// Pulls frames until the source closes, publishing each status.
///
/// Debug images go to `sink` when one is given; a failing sink is logged and
/// otherwise ignored. The source is released when the loop ends.
///
/// # Errors
///
/// Returns an error if writing a status record fails.
pub fn run_loop(
    source: &mut dyn FrameSource,
    processor: &FrameProcessor,
    output: &dyn StatusOutput,
    sink: Option<&dyn DebugImageSink>,
    progress: &dyn ProgressSink,
    config: &LoopConfig,
) -> Result<LoopSummary> {
    let total = source.count_hint();
    let mut summary = LoopSummary::default();
    let mut failures = 0usize;

    loop {
        if config.max_frames.is_some_and(|max| summary.processed >= max) {
            debug!("Frame limit reached");
            break;
        }

        match source.read() {
            FrameRead::Frame(frame) => {
                failures = 0;
                let frame = if config.mirror { frame.mirrored() } else { frame };
                progress.on_event(ProgressEvent::Started {
                    index: summary.processed,
                    total,
                });

                let status = processor.process(Some(&frame));
                output.write(&status).context("Failed to write status")?;
                if let Some(sink) = sink {
                    if let Err(e) = sink.send(&status.debug_image) {
                        warn!("Debug stream write failed: {e:#}");
                    }
                }

                summary.processed += 1;
                progress.on_event(ProgressEvent::Completed { status });
            }
            FrameRead::Unavailable => {
                summary.skipped += 1;
                failures += 1;
                progress.on_event(ProgressEvent::Skipped {
                    reason: "frame unavailable".to_string(),
                });

                if failures >= config.max_read_failures {
                    warn!("{failures} consecutive failed reads, reopening source");
                    failures = 0;
                    match source.reopen() {
                        Ok(()) => summary.reopens += 1,
                        Err(e) => error!("Failed to reopen source: {e:#}"),
                    }
                }
                if !config.idle_delay.is_zero() {
                    thread::sleep(config.idle_delay);
                }
            }
            FrameRead::Closed => {
                debug!("Frame source closed");
                break;
            }
        }
    }

    source.release();
    output.flush().context("Failed to flush output")?;
    progress.on_event(ProgressEvent::Finished {
        processed: summary.processed,
        skipped: summary.skipped,
    });
    Ok(summary)
}

/// Builds an unstarted processor backed by the candle models in the
/// configured directory.
///
/// # Errors
///
/// Returns an error if the face presence configuration is unsupported.
pub fn build_processor(args: &PipelineArgs) -> Result<FrameProcessor> {
    let dir = args.models_dir();
    let detector_path =
        model_path_in(&dir, FACE_DETECTOR).context("Face detector model is not registered")?;
    let mesh_path = model_path_in(&dir, FACE_MESH).context("Face mesh model is not registered")?;

    let gaze_config = args.gaze_config()?;
    let face_config = args.face_config();
    face_config.validate().context("Invalid face detector settings")?;
    let mesh_config = args.mesh_config();
    let device = select_device();

    let face_loader: FaceDetectorLoader = {
        let path = detector_path.clone();
        let device = device.clone();
        Box::new(move || {
            let detector = BlazeFaceDetector::load(&path, face_config.clone(), &device)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            Ok(Box::new(detector) as Box<dyn FaceDetector>)
        })
    };

    let landmark_loader: LandmarkLoader = Box::new(move || {
        let landmarker =
            MeshLandmarker::load(&detector_path, &mesh_path, mesh_config.clone(), &device)
                .with_context(|| format!("Failed to load {}", mesh_path.display()))?;
        Ok(Box::new(landmarker) as Box<dyn LandmarkDetector>)
    });

    Ok(FrameProcessor::new(
        face_loader,
        GazeEstimator::new(gaze_config, landmark_loader),
    ))
}

/// Runs a full session: start the processor, pull frames, write outputs.
///
/// If the processor cannot start, frames are still pulled and every record
/// reports `System Error: Not Initialized`; the exit code is then
/// [`ExitCode::Degraded`].
///
/// # Errors
///
/// Returns an error if outputs cannot be created or written.
pub fn run_session(
    source: &mut dyn FrameSource,
    args: &PipelineArgs,
    idle_delay: Duration,
    max_frames: Option<usize>,
) -> Result<ExitCode> {
    let processor = build_processor(args)?;
    let started = match processor.start() {
        Ok(()) => true,
        Err(e) => {
            error!("{e:#}");
            eprintln!("warning: {e:#}. Run `focus-gauge models fetch`.");
            false
        }
    };

    let output = JsonOutput::stdout(args.format(), args.pretty);
    let sink = args
        .mjpeg
        .as_deref()
        .map(|path| MjpegSink::create(path).map(|s| s.with_quality(args.jpeg_quality())))
        .transpose()?;

    let show_progress = !args.quiet && (args.progress || std::io::stderr().is_terminal());
    let progress = ProgressBar::new(
        source.count_hint().map(|t| t as u64),
        args.quiet,
        show_progress,
    );

    let summary = run_loop(
        source,
        &processor,
        &output,
        sink.as_ref().map(|s| s as &dyn DebugImageSink),
        &progress,
        &args.loop_config(idle_delay, max_frames),
    )?;
    processor.release();

    info!(
        "Processed {} frames ({} skipped, {} reopens)",
        summary.processed, summary.skipped, summary.reopens
    );
    Ok(if started {
        ExitCode::Success
    } else {
        ExitCode::Degraded
    })
}
