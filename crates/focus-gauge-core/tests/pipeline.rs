//! End-to-end pipeline tests with mocked backends.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use focus_gauge_core::modules::{FrameProcessor, GazeConfig, GazeEstimator};
use focus_gauge_core::{GazeError, GazeState, StatusLabel, SystemFault};
use focus_gauge_test_support::{
    centered_detection, FaceLandmarksBuilder, IrisPosition, MockFaceDetector,
    MockLandmarkDetector, SyntheticFrameBuilder,
};

fn started(landmarks: &MockLandmarkDetector, faces: &MockFaceDetector) -> FrameProcessor {
    let estimator = GazeEstimator::new(GazeConfig::default(), landmarks.loader());
    let processor = FrameProcessor::new(faces.loader(), estimator);
    processor.start().unwrap();
    processor
}

fn open_face() -> MockLandmarkDetector {
    MockLandmarkDetector::with_face(FaceLandmarksBuilder::new().build())
}

fn one_face() -> MockFaceDetector {
    MockFaceDetector::with_detections(vec![centered_detection()])
}

#[test]
fn test_frontal_face_is_partially_focusing() {
    let processor = started(&open_face(), &one_face());
    let frame = SyntheticFrameBuilder::neutral();

    for _ in 0..10 {
        let status = processor.process(Some(&frame));
        assert_eq!(status.gaze_status, GazeState::Focusing);
    }

    let status = processor.current_status();
    assert_eq!(status.status, StatusLabel::PartiallyFocusing);
    assert_eq!(status.concentration_score, 60);
    assert_eq!(status.raw_score, 60);
    assert!(status.face_detected);
}

#[test]
fn test_focusing_label_unreachable_with_current_weights() {
    let processor = started(&open_face(), &one_face());
    let frame = SyntheticFrameBuilder::neutral();
    let best = (0..12)
        .map(|_| processor.process(Some(&frame)).concentration_score)
        .max()
        .unwrap();
    assert!(best < 70);
}

#[test]
fn test_debug_image_carries_markers() {
    let processor = started(&open_face(), &one_face());
    let status = processor.process(Some(&SyntheticFrameBuilder::neutral()));

    let image = status.debug_image.to_rgb_image().unwrap();
    assert_eq!(image.dimensions(), (640, 480));
    // Outer corner of the left eye: (0.30, 0.40)
    assert_eq!(image.get_pixel(192, 192).0, [0, 255, 0]);
    // Detection box left edge at x = 0.25 * 640
    assert_eq!(image.get_pixel(160, 240).0, [224, 224, 224]);
}

#[test]
fn test_eyes_closed() {
    let landmarks = MockLandmarkDetector::with_face(FaceLandmarksBuilder::closed().build());
    let processor = started(&landmarks, &one_face());

    let status = processor.process(Some(&SyntheticFrameBuilder::neutral()));
    assert_eq!(status.gaze_status, GazeState::EyesClosed);
    assert_eq!(status.concentration_score, 0);
    assert_eq!(status.raw_score, 0);
    assert_eq!(status.status, StatusLabel::NotFocusing);
}

#[test]
fn test_iris_left_of_center_looks_right() {
    let processor = started(&open_face(), &one_face());
    let frame = SyntheticFrameBuilder::face_with_iris(640, 480, IrisPosition::Left);

    let status = processor.process(Some(&frame));
    assert_eq!(status.gaze_status, GazeState::LookingRight);
    assert_eq!(status.concentration_score, 20);
    assert_eq!(status.status, StatusLabel::NotFocusing);
}

#[test]
fn test_iris_right_of_center_looks_left() {
    let processor = started(&open_face(), &one_face());
    let frame = SyntheticFrameBuilder::face_with_iris(640, 480, IrisPosition::Right);

    let status = processor.process(Some(&frame));
    assert_eq!(status.gaze_status, GazeState::LookingLeft);
}

#[test]
fn test_history_damps_and_recovers() {
    let processor = started(&open_face(), &one_face());
    let away = SyntheticFrameBuilder::face_with_iris(640, 480, IrisPosition::Left);
    let neutral = SyntheticFrameBuilder::neutral();

    for _ in 0..5 {
        processor.process(Some(&away));
    }
    // Mean (5 * 10 + 1) / 6 is still far outside the focus band.
    let status = processor.process(Some(&neutral));
    assert_eq!(status.gaze_status, GazeState::LookingRight);

    for _ in 0..9 {
        processor.process(Some(&neutral));
    }
    let status = processor.current_status();
    assert_eq!(status.gaze_status, GazeState::Focusing);
}

#[test]
fn test_non_finite_eye_point_is_processing_error() {
    for x in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
        let landmarks =
            MockLandmarkDetector::with_face(FaceLandmarksBuilder::new().with_left_corner_x(x).build());
        let processor = started(&landmarks, &one_face());

        let status = processor.process(Some(&SyntheticFrameBuilder::neutral()));
        assert_eq!(status.gaze_status, GazeState::ProcessingError, "x = {x}");
        assert!(status.face_detected);
        assert_eq!(status.concentration_score, 20);
    }
}

#[test]
fn test_non_finite_eye_point_is_typed_error() {
    let landmarks = MockLandmarkDetector::with_face(
        FaceLandmarksBuilder::new()
            .with_left_corner_x(f32::NAN)
            .build(),
    );
    let mut estimator = GazeEstimator::new(GazeConfig::default(), landmarks.loader());
    let err = estimator
        .try_estimate(Some(&SyntheticFrameBuilder::neutral()))
        .unwrap_err();
    assert!(matches!(err, GazeError::NonFiniteLandmark));
    assert!(estimator.history().is_empty());
}

#[test]
fn test_failed_estimates_leave_history_untouched() {
    let landmarks = open_face();
    let mut estimator = GazeEstimator::new(GazeConfig::default(), landmarks.loader());
    let frame = SyntheticFrameBuilder::neutral();

    assert_eq!(estimator.estimate(Some(&frame)), GazeState::Focusing);
    assert_eq!(estimator.history().len(), 1);

    landmarks.set_face(Some(FaceLandmarksBuilder::closed().build()));
    assert_eq!(estimator.estimate(Some(&frame)), GazeState::EyesClosed);
    assert_eq!(estimator.history().len(), 1);

    landmarks.set_face(Some(FaceLandmarksBuilder::new().collapsed().build()));
    assert_eq!(estimator.estimate(Some(&frame)), GazeState::ProcessingError);
    assert_eq!(estimator.history().len(), 1);

    landmarks.set_face(None);
    assert_eq!(estimator.estimate(Some(&frame)), GazeState::FaceNotDetected);
    assert_eq!(estimator.history().len(), 1);

    landmarks.set_face(Some(FaceLandmarksBuilder::new().build()));
    for invalid in [None, Some(SyntheticFrameBuilder::grayscale(8, 8))] {
        assert_eq!(estimator.estimate(invalid.as_ref()), GazeState::InvalidFrame);
    }
    assert_eq!(estimator.history().len(), 1);
}

#[test]
fn test_estimator_reset_history() {
    let mut estimator = GazeEstimator::new(GazeConfig::default(), open_face().loader());
    let away = SyntheticFrameBuilder::face_with_iris(640, 480, IrisPosition::Left);
    for _ in 0..3 {
        estimator.estimate(Some(&away));
    }
    assert_eq!(estimator.history().len(), 3);

    estimator.reset_history();
    assert!(estimator.history().is_empty());
    assert_eq!(
        estimator.estimate(Some(&SyntheticFrameBuilder::neutral())),
        GazeState::Focusing
    );
}

#[test]
fn test_processor_reset_history() {
    let processor = started(&open_face(), &one_face());
    let away = SyntheticFrameBuilder::face_with_iris(640, 480, IrisPosition::Left);
    let neutral = SyntheticFrameBuilder::neutral();
    for _ in 0..5 {
        processor.process(Some(&away));
    }

    processor.reset_history();
    let status = processor.process(Some(&neutral));
    assert_eq!(status.gaze_status, GazeState::Focusing);
    assert_eq!(status.concentration_score, 60);
}

#[test]
fn test_no_face_skips_landmark_backend() {
    let landmarks = open_face();
    let processor = started(&landmarks, &MockFaceDetector::none());

    let status = processor.process(Some(&SyntheticFrameBuilder::neutral()));
    assert_eq!(status.status, StatusLabel::FaceNotDetected);
    assert_eq!(status.gaze_status, GazeState::FaceNotDetected);
    assert_eq!(status.concentration_score, 0);
    assert!(!status.face_detected);
    assert_eq!(landmarks.loads(), 0);
}

#[test]
fn test_landmark_backend_loaded_once() {
    let landmarks = open_face();
    let processor = started(&landmarks, &one_face());
    assert_eq!(landmarks.loads(), 0);

    for _ in 0..3 {
        processor.process(Some(&SyntheticFrameBuilder::neutral()));
    }
    assert_eq!(landmarks.loads(), 1);
    // estimate + debug overlay per frame
    assert_eq!(landmarks.calls(), 6);
}

#[test]
fn test_landmark_load_failure_degrades_gaze_only() {
    let estimator = GazeEstimator::new(
        GazeConfig::default(),
        MockLandmarkDetector::failing_loader("weights missing"),
    );
    let processor = FrameProcessor::new(one_face().loader(), estimator);
    processor.start().unwrap();

    let status = processor.process(Some(&SyntheticFrameBuilder::neutral()));
    assert_eq!(status.gaze_status, GazeState::ProcessingError);
    assert!(status.face_detected);
    assert_eq!(status.concentration_score, 20);
    assert_eq!(status.debug_image.shape(), &[480, 640, 3]);
}

#[test]
fn test_landmark_detection_error() {
    let processor = started(&MockLandmarkDetector::failing("inference"), &one_face());
    let status = processor.process(Some(&SyntheticFrameBuilder::neutral()));
    assert_eq!(status.gaze_status, GazeState::ProcessingError);
}

#[test]
fn test_collapsed_eye_is_processing_error() {
    let landmarks = MockLandmarkDetector::with_face(FaceLandmarksBuilder::new().collapsed().build());
    let processor = started(&landmarks, &one_face());

    let status = processor.process(Some(&SyntheticFrameBuilder::neutral()));
    assert_eq!(status.gaze_status, GazeState::ProcessingError);
    assert_eq!(status.concentration_score, 20);
}

#[test]
fn test_short_mesh_is_processing_error() {
    let landmarks =
        MockLandmarkDetector::with_face(FaceLandmarksBuilder::new().truncated(100).build());
    let processor = started(&landmarks, &one_face());

    let status = processor.process(Some(&SyntheticFrameBuilder::neutral()));
    assert_eq!(status.gaze_status, GazeState::ProcessingError);
}

#[test]
fn test_face_detector_error_is_system_error() {
    let processor = started(&open_face(), &MockFaceDetector::failing("boom"));
    let status = processor.process(Some(&SyntheticFrameBuilder::neutral()));
    assert_eq!(
        status.status,
        StatusLabel::SystemError(SystemFault::ProcessingFailed)
    );
    assert_eq!(status.concentration_score, 0);
    assert!(!status.face_detected);
}

#[test]
fn test_invalid_inputs() {
    let processor = started(&open_face(), &one_face());
    for frame in [
        None,
        Some(SyntheticFrameBuilder::grayscale(8, 8)),
        Some(SyntheticFrameBuilder::with_channels(8, 8, 2, 0)),
        Some(SyntheticFrameBuilder::with_channels(8, 8, 5, 0)),
        Some(SyntheticFrameBuilder::empty()),
    ] {
        let status = processor.process(frame.as_ref());
        assert_eq!(status.status, StatusLabel::InvalidImage);
        assert_eq!(status.debug_image.shape(), &[480, 640, 3]);
    }
}

#[test]
fn test_rgba_frames_accepted() {
    let processor = started(&open_face(), &one_face());
    let status = processor.process(Some(&SyntheticFrameBuilder::rgba(64, 48)));
    assert!(status.face_detected);
}

#[test]
fn test_snapshot_identity_between_updates() {
    let processor = started(&open_face(), &one_face());

    let placeholder = processor.current_status();
    assert_eq!(placeholder.status, StatusLabel::NotFocusing);
    assert_eq!(placeholder.gaze_status, GazeState::FaceNotDetected);
    assert!(Arc::ptr_eq(&placeholder, &processor.current_status()));

    let published = processor.process(Some(&SyntheticFrameBuilder::neutral()));
    let first = processor.current_status();
    let second = processor.current_status();
    assert!(Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&first, &published));
    assert!(!Arc::ptr_eq(&first, &placeholder));
}

#[test]
fn test_release_and_restart() {
    let landmarks = open_face();
    let processor = started(&landmarks, &one_face());
    processor.process(Some(&SyntheticFrameBuilder::neutral()));

    processor.release();
    let status = processor.process(Some(&SyntheticFrameBuilder::neutral()));
    assert_eq!(
        status.status,
        StatusLabel::SystemError(SystemFault::NotInitialized)
    );

    processor.start().unwrap();
    let status = processor.process(Some(&SyntheticFrameBuilder::neutral()));
    assert!(status.face_detected);
    assert_eq!(landmarks.loads(), 2);
}

#[test]
fn test_readers_see_complete_records() {
    let processor = started(&open_face(), &one_face());
    let frames = [
        SyntheticFrameBuilder::neutral(),
        SyntheticFrameBuilder::face_with_iris(640, 480, IrisPosition::Left),
        SyntheticFrameBuilder::grayscale(4, 4),
    ];

    std::thread::scope(|scope| {
        let reader = scope.spawn(|| {
            for _ in 0..200 {
                let status = processor.current_status();
                let expected = focus_gauge_core::classify(status.face_detected, status.gaze_status);
                if status.face_detected {
                    assert_eq!(status.concentration_score, expected.score);
                }
            }
        });
        for frame in frames.iter().cycle().take(12) {
            processor.process(Some(frame));
        }
        reader.join().unwrap();
    });
}
