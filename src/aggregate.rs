//! Per-video aggregation of hand landmarks into summary statistics.
//!
//! A [`VideoAccumulator`] collects the slot-assigned landmarks of every frame of one video, and
//! reduces them to a [`FeatureRow`] of means and standard deviations once the video is done.

use crate::hand::{DetectedSpace, DetectionResult};
use crate::landmark::{Axis, HandLandmarks, WorldSpace, NUM_LANDMARKS};
use crate::num::mean_std;
use crate::slot::{Slot, SlotAssignment};

/// Fill value for features of a slot that was never observed.
///
/// Downstream consumers match on this exact value, so it must not be replaced by NaN.
pub const SENTINEL: f64 = -11111111.0;

/// Number of features emitted per slot (landmarks × axes × statistics).
pub const FEATURES_PER_SLOT: usize = NUM_LANDMARKS * Axis::ALL.len() * Stat::ALL.len();

/// Number of numeric features in a [`FeatureRow`].
pub const NUM_FEATURES: usize = Slot::ALL.len() * FEATURES_PER_SLOT;

/// Number of coordinates one hand contributes to a per-frame row.
pub const COORDS_PER_HAND: usize = NUM_LANDMARKS * Axis::ALL.len();

/// A summary statistic computed per landmark coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stat {
    Mean,
    Std,
}

impl Stat {
    /// All statistics, in column order.
    pub const ALL: [Stat; 2] = [Stat::Mean, Stat::Std];

    pub fn name(self) -> &'static str {
        match self {
            Stat::Mean => "mean",
            Stat::Std => "std",
        }
    }
}

/// One row of the per-video feature table: [`NUM_FEATURES`] statistics followed by the label.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    features: Vec<f64>,
    label: String,
}

impl FeatureRow {
    pub fn features(&self) -> &[f64] {
        &self.features
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the number of columns, including the label.
    pub fn len(&self) -> usize {
        self.features.len() + 1
    }

    /// Returns the features of `slot`.
    pub fn slot_features(&self, slot: Slot) -> &[f64] {
        let start = slot.index() * FEATURES_PER_SLOT;
        &self.features[start..start + FEATURES_PER_SLOT]
    }

    /// Formats the row as table fields.
    pub fn to_record(&self) -> Vec<String> {
        self.features
            .iter()
            .map(f64::to_string)
            .chain([self.label.clone()])
            .collect()
    }
}

/// Accumulates the landmarks of one video, in coordinate space `S`.
///
/// The video pipeline aggregates [`WorldSpace`] landmarks, which is the default.
pub struct VideoAccumulator<S: DetectedSpace = WorldSpace> {
    samples: [Vec<HandLandmarks<S>>; 2],
    frames: usize,
    empty_frames: usize,
}

impl<S: DetectedSpace> Default for VideoAccumulator<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: DetectedSpace> VideoAccumulator<S> {
    pub fn new() -> Self {
        Self {
            samples: [Vec::new(), Vec::new()],
            frames: 0,
            empty_frames: 0,
        }
    }

    /// Adds the detections of the next frame.
    ///
    /// Frames without hands are counted, but contribute nothing to the statistics.
    pub fn push(&mut self, result: &DetectionResult) {
        self.frames += 1;
        if result.is_empty() {
            self.empty_frames += 1;
            return;
        }

        self.push_assignment(&SlotAssignment::assign(result));
    }

    /// Adds an already-computed slot assignment.
    pub fn push_assignment(&mut self, assignment: &SlotAssignment<'_>) {
        for (slot, hand) in assignment.filled() {
            self.samples[slot.index()].push(*hand.landmarks_in::<S>());
        }
    }

    /// Returns the number of hands collected in `slot` so far.
    pub fn samples(&self, slot: Slot) -> usize {
        self.samples[slot.index()].len()
    }

    /// Returns the number of frames pushed so far, including empty ones.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Returns the number of pushed frames that contained no hands.
    pub fn empty_frames(&self) -> usize {
        self.empty_frames
    }

    /// Reduces the collected samples to a [`FeatureRow`] labeled `label`.
    ///
    /// Each slot is reduced on its own: a slot without any samples is filled with [`SENTINEL`],
    /// otherwise every landmark coordinate contributes its mean and population standard deviation.
    pub fn finish(self, label: impl Into<String>) -> FeatureRow {
        let mut features = Vec::with_capacity(NUM_FEATURES);
        let mut values = Vec::new();
        for slot in Slot::ALL {
            let samples = &self.samples[slot.index()];
            if samples.is_empty() {
                features.extend([SENTINEL; FEATURES_PER_SLOT]);
                continue;
            }

            for landmark in 0..NUM_LANDMARKS {
                for axis in Axis::ALL {
                    values.clear();
                    values.extend(
                        samples
                            .iter()
                            .map(|hand| f64::from(hand.as_slice()[landmark].coord(axis))),
                    );
                    if let Some((mean, std)) = mean_std(&values) {
                        features.extend([mean, std]);
                    }
                }
            }
        }

        debug_assert_eq!(features.len(), NUM_FEATURES);
        FeatureRow {
            features,
            label: label.into(),
        }
    }
}

/// Aggregates the per-frame detections of a whole video into a [`FeatureRow`].
pub fn aggregate_video<'a, I>(results: I, label: impl Into<String>) -> FeatureRow
where
    I: IntoIterator<Item = &'a DetectionResult>,
{
    let mut acc = VideoAccumulator::<WorldSpace>::new();
    for result in results {
        acc.push(result);
    }
    acc.finish(label)
}

/// One row of the per-frame table: the slot-assigned coordinates of a single frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRow {
    coords: Vec<f64>,
    frame: usize,
    video: String,
    label: String,
}

impl FrameRow {
    /// Builds the row for one frame, in coordinate space `S`.
    ///
    /// Returns [`None`] for frames without hands. An empty slot is filled with [`SENTINEL`].
    pub fn new<S: DetectedSpace>(
        result: &DetectionResult,
        frame: usize,
        video: impl Into<String>,
        label: impl Into<String>,
    ) -> Option<Self> {
        let assignment = SlotAssignment::assign(result);
        if assignment.is_absent() {
            return None;
        }

        let mut coords = Vec::with_capacity(Slot::ALL.len() * COORDS_PER_HAND);
        for slot in Slot::ALL {
            match assignment.get(slot) {
                Some(hand) => coords.extend(hand.landmarks_in::<S>().coords().map(f64::from)),
                None => coords.extend([SENTINEL; COORDS_PER_HAND]),
            }
        }

        Some(Self {
            coords,
            frame,
            video: video.into(),
            label: label.into(),
        })
    }

    pub fn coords(&self) -> &[f64] {
        &self.coords
    }

    pub fn frame(&self) -> usize {
        self.frame
    }

    /// Formats the row as table fields.
    pub fn to_record(&self) -> Vec<String> {
        self.coords
            .iter()
            .map(f64::to_string)
            .chain([self.frame.to_string(), self.video.clone(), self.label.clone()])
            .collect()
    }
}
