//! Property tests for validation, ratio bounds, smoothing and scoring.

use focus_gauge_core::domain::Point;
use focus_gauge_core::modules::{
    classify, combine_ratios, eye_gaze_ratio, is_valid_frame, label_for_score, GazeHistory,
    MAX_GAZE_RATIO, MIN_GAZE_RATIO,
};
use focus_gauge_core::{Frame, GazeState};
use image::RgbImage;
use proptest::prelude::*;

fn gaze_state() -> impl Strategy<Value = GazeState> {
    prop_oneof![
        Just(GazeState::Focusing),
        Just(GazeState::LookingLeft),
        Just(GazeState::LookingRight),
        Just(GazeState::EyesClosed),
        Just(GazeState::FaceNotDetected),
        Just(GazeState::ProcessingError),
        Just(GazeState::InvalidFrame),
    ]
}

fn contour() -> impl Strategy<Value = [Point; 6]> {
    prop::array::uniform6((-0.2f32..1.2, -0.2f32..1.2).prop_map(|(x, y)| Point::new(x, y, 0.0)))
}

proptest! {
    #[test]
    fn prop_validator_matches_shape_rules(shape in prop::collection::vec(0usize..6, 0..5)) {
        let frame = Frame::zeros(&shape);
        let expected = shape.len() == 3
            && shape.iter().all(|&d| d > 0)
            && matches!(shape[2], 3 | 4);
        prop_assert_eq!(is_valid_frame(Some(&frame)), expected);
    }

    #[test]
    fn prop_combined_ratio_bounded(
        pixels in prop::collection::vec(any::<u8>(), 24 * 16 * 3),
        left in contour(),
        right in contour(),
    ) {
        let Some(image) = RgbImage::from_raw(24, 16, pixels) else {
            return Err(TestCaseError::fail("buffer size"));
        };
        let ratio = combine_ratios(eye_gaze_ratio(&image, &left), eye_gaze_ratio(&image, &right));
        prop_assert!((MIN_GAZE_RATIO..=MAX_GAZE_RATIO).contains(&ratio));
    }

    #[test]
    fn prop_uniform_crops_are_neutral(level in any::<u8>(), eye in contour()) {
        let image = RgbImage::from_pixel(32, 24, image::Rgb([level; 3]));
        prop_assert!((eye_gaze_ratio(&image, &eye) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn prop_history_bounded(values in prop::collection::vec(0.1f32..10.0, 0..40), capacity in 1usize..15) {
        let mut history = GazeHistory::new(capacity);
        for v in &values {
            history.push(*v);
            prop_assert!(history.len() <= capacity);
        }
        if let Some(mean) = history.mean() {
            prop_assert!((0.1 - 1e-4..=10.0 + 1e-4).contains(&mean));
        }
    }

    #[test]
    fn prop_score_bounded_and_labelled(face in any::<bool>(), gaze in gaze_state()) {
        let c = classify(face, gaze);
        prop_assert!(c.score <= 100);
        prop_assert_eq!(c.status, label_for_score(c.score));
        prop_assert_eq!(i32::from(c.score), c.raw_score.clamp(0, 100));
    }
}

#[test]
fn test_history_forgets_first_value_after_eleven_pushes() {
    let mut history = GazeHistory::default();
    history.push(10.0);
    for _ in 0..10 {
        history.push(1.0);
    }
    assert_eq!(history.len(), 10);
    assert!((history.mean().unwrap_or(f32::NAN) - 1.0).abs() < f32::EPSILON);
}
