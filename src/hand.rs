//! Hand detections as reported by a [`Landmarker`].
//!
//! [`Landmarker`]: crate::landmarker::Landmarker

use crate::landmark::{CoordinateSpace, HandLandmarks, ImageSpace, WorldSpace};

/// A classification category with its confidence score.
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    name: String,
    score: f32,
}

impl Category {
    pub fn new(name: impl Into<String>, score: f32) -> Self {
        Self {
            name: name.into(),
            score,
        }
    }

    /// The category name, eg. `"Left"` or `"Right"` for handedness.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn score(&self) -> f32 {
        self.score
    }
}

/// Which hand the detector believes it is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    /// Interprets a handedness category name.
    ///
    /// Only `"left"` (compared case-insensitively) is [`Handedness::Left`]; every other name,
    /// including unexpected ones, is treated as [`Handedness::Right`].
    pub fn from_category_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("left") {
            Handedness::Left
        } else {
            Handedness::Right
        }
    }

    /// Returns the category name the detector uses for this handedness.
    pub fn category_name(self) -> &'static str {
        match self {
            Handedness::Left => "Left",
            Handedness::Right => "Right",
        }
    }
}

/// A single detected hand.
#[derive(Debug, Clone, PartialEq)]
pub struct HandDetection {
    landmarks: HandLandmarks<ImageSpace>,
    world_landmarks: HandLandmarks<WorldSpace>,
    handedness: Vec<Category>,
}

impl HandDetection {
    /// Creates a hand detection.
    ///
    /// `handedness` is ranked by confidence, best category first.
    pub fn new(
        landmarks: HandLandmarks<ImageSpace>,
        world_landmarks: HandLandmarks<WorldSpace>,
        handedness: Vec<Category>,
    ) -> Self {
        Self {
            landmarks,
            world_landmarks,
            handedness,
        }
    }

    /// Returns the landmarks in normalized image coordinates.
    pub fn landmarks(&self) -> &HandLandmarks<ImageSpace> {
        &self.landmarks
    }

    /// Returns the landmarks in metric world coordinates.
    pub fn world_landmarks(&self) -> &HandLandmarks<WorldSpace> {
        &self.world_landmarks
    }

    /// Returns the landmarks in the coordinate space `S`.
    pub fn landmarks_in<S: DetectedSpace>(&self) -> &HandLandmarks<S> {
        S::landmarks_of(self)
    }

    /// Returns the ranked handedness categories, best first.
    pub fn handedness(&self) -> &[Category] {
        &self.handedness
    }

    /// Returns the highest-ranked handedness category, if the detector reported any.
    pub fn top_handedness(&self) -> Option<&Category> {
        self.handedness.first()
    }

    /// Returns the handedness according to the top-ranked category.
    ///
    /// A detection without handedness categories counts as a right hand.
    pub fn side(&self) -> Handedness {
        self.top_handedness()
            .map_or(Handedness::Right, |cat| Handedness::from_category_name(cat.name()))
    }
}

/// Coordinate spaces that a [`HandDetection`] carries landmarks for.
pub trait DetectedSpace: CoordinateSpace {
    fn landmarks_of(hand: &HandDetection) -> &HandLandmarks<Self>;
}

impl DetectedSpace for ImageSpace {
    fn landmarks_of(hand: &HandDetection) -> &HandLandmarks<Self> {
        hand.landmarks()
    }
}

impl DetectedSpace for WorldSpace {
    fn landmarks_of(hand: &HandDetection) -> &HandLandmarks<Self> {
        hand.world_landmarks()
    }
}

/// The hands found in a single image or video frame.
///
/// The order of [`DetectionResult::hands`] is chosen by the detector and says nothing about which
/// hand is which. Use [`SlotAssignment`] to sort them into left and right.
///
/// [`SlotAssignment`]: crate::slot::SlotAssignment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionResult {
    hands: Vec<HandDetection>,
}

impl DetectionResult {
    pub fn new(hands: Vec<HandDetection>) -> Self {
        Self { hands }
    }

    pub fn hands(&self) -> &[HandDetection] {
        &self.hands
    }

    pub fn len(&self) -> usize {
        self.hands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::hand;

    #[test]
    fn handedness_from_category_name() {
        assert_eq!(Handedness::from_category_name("Left"), Handedness::Left);
        assert_eq!(Handedness::from_category_name("LEFT"), Handedness::Left);
        assert_eq!(Handedness::from_category_name("left"), Handedness::Left);
        assert_eq!(Handedness::from_category_name("Right"), Handedness::Right);
        assert_eq!(Handedness::from_category_name("unknown"), Handedness::Right);
        assert_eq!(Handedness::from_category_name(""), Handedness::Right);
    }

    #[test]
    fn side_uses_top_ranked_category() {
        let mut det = hand("Right", 0.0);
        det.handedness = vec![Category::new("Left", 0.9), Category::new("Right", 0.1)];
        assert_eq!(det.side(), Handedness::Left);

        det.handedness.clear();
        assert_eq!(det.side(), Handedness::Right);
    }

    #[test]
    fn landmarks_in_selects_space() {
        let det = hand("Left", 3.0);
        assert_eq!(det.landmarks_in::<ImageSpace>(), det.landmarks());
        assert_eq!(det.landmarks_in::<WorldSpace>(), det.world_landmarks());
    }
}
