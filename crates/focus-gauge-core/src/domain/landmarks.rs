//! Facial landmark types for a single face.

use super::GazeError;

/// Number of points in a full face mesh.
pub const MESH_POINTS: usize = 468;

/// A landmark in normalized image coordinates.
///
/// `x` and `y` are fractions of the frame width and height; `z` is relative
/// depth and unused by the geometry in this crate.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    /// Horizontal position, 0.0 = left edge.
    pub x: f32,
    /// Vertical position, 0.0 = top edge.
    pub y: f32,
    /// Relative depth.
    pub z: f32,
}

impl Point {
    /// Creates a new point.
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance in the image plane.
    #[must_use]
    pub fn distance(&self, other: &Self) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// True when the image-plane coordinates are finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Which eye a contour belongs to, from the subject's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Eye {
    /// Subject's left eye.
    Left,
    /// Subject's right eye.
    Right,
}

impl Eye {
    /// Mesh indices of the left eye contour, ordered p1..p6.
    pub const LEFT_INDICES: [usize; 6] = [33, 159, 158, 133, 153, 144];
    /// Mesh indices of the right eye contour, ordered p1..p6.
    pub const RIGHT_INDICES: [usize; 6] = [362, 386, 385, 263, 373, 380];

    /// Both eyes, left first.
    pub const BOTH: [Self; 2] = [Self::Left, Self::Right];

    /// Contour indices for this eye.
    #[must_use]
    pub const fn indices(self) -> [usize; 6] {
        match self {
            Self::Left => Self::LEFT_INDICES,
            Self::Right => Self::RIGHT_INDICES,
        }
    }
}

/// Ordered landmarks of the first detected face.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Landmarks {
    points: Vec<Point>,
}

impl Landmarks {
    /// Wraps an ordered point sequence.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// All points in mesh order.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if there are no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Extracts the six contour points of one eye.
    ///
    /// # Errors
    ///
    /// Returns [`GazeError::MissingLandmark`] if the sequence is too short to
    /// contain the eye indices.
    pub fn eye(&self, eye: Eye) -> Result<[Point; 6], GazeError> {
        let mut contour = [Point::default(); 6];
        for (slot, index) in contour.iter_mut().zip(eye.indices()) {
            *slot = *self.points.get(index).ok_or(GazeError::MissingLandmark {
                index,
                len: self.points.len(),
            })?;
        }
        Ok(contour)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_distance() {
        let a = Point::new(0.0, 0.0, 0.0);
        let b = Point::new(3.0, 4.0, 9.0);
        assert!((a.distance(&b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_eye_contour_order() {
        let points = (0..MESH_POINTS)
            .map(|i| Point::new(i as f32, 0.0, 0.0))
            .collect();
        let landmarks = Landmarks::new(points);

        let right = landmarks.eye(Eye::Right).unwrap();
        let xs: Vec<f32> = right.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![362.0, 386.0, 385.0, 263.0, 373.0, 380.0]);
    }

    #[test]
    fn test_short_mesh_reports_missing_index() {
        let landmarks = Landmarks::new(vec![Point::default(); 100]);
        let err = landmarks.eye(Eye::Left).unwrap_err();
        assert!(matches!(
            err,
            GazeError::MissingLandmark { index: 159, len: 100 }
        ));
    }
}
