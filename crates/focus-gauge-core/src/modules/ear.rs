//! Eye aspect ratio.
//!
//! EAR = (|p2 - p6| + |p3 - p5|) / (2 |p1 - p4|) over a six-point eye contour,
//! where p1/p4 are the eye corners and the other pairs span the lids.

use crate::domain::{Eye, GazeError, Landmarks, Point};

/// Computes the eye aspect ratio of a six-point contour.
///
/// # Errors
///
/// Returns [`GazeError::DegenerateEye`] if the corners coincide.
pub fn eye_aspect_ratio(contour: &[Point; 6]) -> Result<f32, GazeError> {
    let [p1, p2, p3, p4, p5, p6] = contour;
    let horizontal = p1.distance(p4);
    if horizontal <= f32::EPSILON {
        return Err(GazeError::DegenerateEye);
    }
    let vertical = p2.distance(p6) + p3.distance(p5);
    Ok(vertical / (2.0 * horizontal))
}

/// Mean EAR over both eyes.
///
/// # Errors
///
/// Propagates missing landmarks and degenerate contours.
pub fn mean_eye_aspect_ratio(landmarks: &Landmarks) -> Result<f32, GazeError> {
    let left = eye_aspect_ratio(&landmarks.eye(Eye::Left)?)?;
    let right = eye_aspect_ratio(&landmarks.eye(Eye::Right)?)?;
    Ok((left + right) / 2.0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn contour(half_width: f32, half_height: f32) -> [Point; 6] {
        [
            Point::new(-half_width, 0.0, 0.0),
            Point::new(-half_width / 3.0, -half_height, 0.0),
            Point::new(half_width / 3.0, -half_height, 0.0),
            Point::new(half_width, 0.0, 0.0),
            Point::new(half_width / 3.0, half_height, 0.0),
            Point::new(-half_width / 3.0, half_height, 0.0),
        ]
    }

    #[test]
    fn test_open_eye() {
        let ear = eye_aspect_ratio(&contour(0.05, 0.015)).unwrap();
        assert!((ear - 0.3).abs() < 1e-5, "ear = {ear}");
    }

    #[test]
    fn test_closed_eye_below_threshold() {
        let ear = eye_aspect_ratio(&contour(0.05, 0.002)).unwrap();
        assert!(ear < 0.18);
    }

    #[test]
    fn test_collapsed_eye_is_error() {
        let collapsed = [Point::new(0.4, 0.4, 0.0); 6];
        assert!(matches!(
            eye_aspect_ratio(&collapsed),
            Err(GazeError::DegenerateEye)
        ));
    }

    #[test]
    fn test_zero_width_with_open_lids_is_error() {
        let mut c = contour(0.05, 0.02);
        c[3] = c[0];
        assert!(matches!(eye_aspect_ratio(&c), Err(GazeError::DegenerateEye)));
    }
}
