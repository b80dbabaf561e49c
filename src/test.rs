//! Detection fixtures for unit tests.

use crate::hand::{Category, DetectionResult, HandDetection};
use crate::landmark::{Axis, HandLandmarks, NUM_LANDMARKS};

/// A hand whose landmarks all sit at `value` on every axis, in both coordinate spaces.
pub fn hand(side: &str, value: f32) -> HandDetection {
    hand_with(side, |_, _| value)
}

/// A hand whose coordinates are computed by `coord(landmark_index, axis)`, in both spaces.
pub fn hand_with(side: &str, coord: impl Fn(usize, Axis) -> f32) -> HandDetection {
    let positions = (0..NUM_LANDMARKS)
        .map(|i| Axis::ALL.map(|axis| coord(i, axis)))
        .collect::<Vec<_>>();
    HandDetection::new(
        HandLandmarks::from_positions(positions.iter().copied()).unwrap(),
        HandLandmarks::from_positions(positions).unwrap(),
        vec![Category::new(side, 0.9)],
    )
}

pub fn frame(hands: Vec<HandDetection>) -> DetectionResult {
    DetectionResult::new(hands)
}
