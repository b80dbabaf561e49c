//! The hand landmark detector seam.
//!
//! Everything downstream of detection works on [`DetectionResult`]s, so the pipelines take any
//! [`Landmarker`]. [`OnnxLandmarker`] is the implementation backed by neural networks (palm
//! detection followed by hand landmarks); tests use scripted ones.

mod onnx;
pub mod palm;

use std::path::PathBuf;

use image::RgbaImage;

use crate::{hand::DetectionResult, timer::Timer};

pub use onnx::{Letterbox, OnnxLandmarker};
pub use palm::PalmDetector;

/// Default path of the hand landmark network.
pub const DEFAULT_MODEL: &str = "hand_landmarker.onnx";

/// Default path of the palm detection network.
pub const DEFAULT_PALM_MODEL: &str = "palm_detection.onnx";

/// How a [`Landmarker`] is going to be fed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunningMode {
    /// Unrelated still images, passed to [`Landmarker::detect`].
    Image,
    /// Consecutive frames of decoded videos, passed to [`Landmarker::detect_for_video`] with
    /// increasing timestamps.
    Video,
    /// Frames from a live source. Like [`RunningMode::Video`], but results are consumed
    /// asynchronously.
    LiveStream,
}

impl RunningMode {
    /// Returns whether this mode feeds timestamped frames.
    pub fn is_timestamped(self) -> bool {
        matches!(self, RunningMode::Video | RunningMode::LiveStream)
    }
}

/// Configuration of a [`Landmarker`].
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkerOptions {
    /// Path to the ONNX hand landmark network.
    pub model: PathBuf,
    /// Path to the ONNX palm detection network.
    pub palm_model: PathBuf,
    pub running_mode: RunningMode,
    /// Maximum number of hands reported per frame.
    pub num_hands: usize,
    /// Minimum confidence of a palm detection.
    pub min_detection: f32,
    /// Minimum presence score for a hand to be reported.
    pub min_presence: f32,
}

impl LandmarkerOptions {
    pub fn new(model: impl Into<PathBuf>, running_mode: RunningMode) -> Self {
        Self {
            model: model.into(),
            running_mode,
            ..Self::default()
        }
    }
}

impl Default for LandmarkerOptions {
    fn default() -> Self {
        Self {
            model: PathBuf::from(DEFAULT_MODEL),
            palm_model: PathBuf::from(DEFAULT_PALM_MODEL),
            running_mode: RunningMode::Image,
            num_hands: 2,
            min_detection: PalmDetector::DEFAULT_THRESHOLD,
            min_presence: 0.5,
        }
    }
}

/// Detects hands and their landmarks in RGBA images.
///
/// The order of the returned hands carries no meaning.
pub trait Landmarker: Send {
    /// Detects hands in a still image.
    fn detect(&mut self, image: &RgbaImage) -> anyhow::Result<DetectionResult>;

    /// Detects hands in a video frame.
    ///
    /// `timestamp` must increase from one call to the next. Implementations that don't track hands
    /// across frames may ignore it.
    fn detect_for_video(
        &mut self,
        image: &RgbaImage,
        timestamp: u64,
    ) -> anyhow::Result<DetectionResult> {
        let _ = timestamp;
        self.detect(image)
    }

    /// Returns the profiling timers of this landmarker, for periodic logging.
    fn timers(&self) -> Vec<&Timer> {
        Vec::new()
    }
}

impl<L: Landmarker + ?Sized> Landmarker for Box<L> {
    fn detect(&mut self, image: &RgbaImage) -> anyhow::Result<DetectionResult> {
        (**self).detect(image)
    }

    fn detect_for_video(
        &mut self,
        image: &RgbaImage,
        timestamp: u64,
    ) -> anyhow::Result<DetectionResult> {
        (**self).detect_for_video(image, timestamp)
    }

    fn timers(&self) -> Vec<&Timer> {
        (**self).timers()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options() {
        let opts = LandmarkerOptions::new("net.onnx", RunningMode::Video);
        assert_eq!(opts.model, PathBuf::from("net.onnx"));
        assert_eq!(opts.running_mode, RunningMode::Video);
        assert_eq!(opts.palm_model, PathBuf::from(DEFAULT_PALM_MODEL));
        assert_eq!(opts.num_hands, 2);
        assert_eq!(opts.min_detection, 0.5);
        assert_eq!(opts.min_presence, 0.5);
    }

    #[test]
    fn timestamped_modes() {
        assert!(!RunningMode::Image.is_timestamped());
        assert!(RunningMode::Video.is_timestamped());
        assert!(RunningMode::LiveStream.is_timestamped());
    }

    #[test]
    fn boxed_landmarker_forwards() {
        struct Count(u64);

        impl Landmarker for Count {
            fn detect(&mut self, _: &RgbaImage) -> anyhow::Result<DetectionResult> {
                self.0 += 1;
                Ok(DetectionResult::default())
            }

            fn detect_for_video(
                &mut self,
                _: &RgbaImage,
                timestamp: u64,
            ) -> anyhow::Result<DetectionResult> {
                self.0 = timestamp;
                Ok(DetectionResult::default())
            }
        }

        fn run<L: Landmarker>(landmarker: &mut L) {
            let image = RgbaImage::new(1, 1);
            landmarker.detect(&image).unwrap();
            landmarker.detect_for_video(&image, 41).unwrap();
            landmarker.detect(&image).unwrap();
            assert!(landmarker.timers().is_empty());
        }

        let mut boxed = Box::new(Count(0));
        run(&mut boxed);
        assert_eq!(boxed.0, 42);
    }
}
