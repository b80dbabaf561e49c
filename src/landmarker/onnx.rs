//! Two-stage hand landmark estimation with ONNX networks.

use anyhow::{bail, ensure};
use image::{imageops, Rgba, RgbaImage};

use crate::{
    hand::{Category, DetectionResult, HandDetection, Handedness},
    landmark::{HandLandmarks, ImageSpace, WorldSpace, NUM_LANDMARKS},
    nn::{Cnn, NeuralNetwork},
    timer::Timer,
};

use super::{
    palm::{hand_region, Crop, PalmDetector},
    Landmarker, LandmarkerOptions, RunningMode,
};

/// Number of values in a flattened landmark output.
const LANDMARK_OUTPUTS: usize = NUM_LANDMARKS * 3;

/// Fits an image into a network input of a different aspect ratio by adding black bars, and maps
/// network coordinates back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    target: (u32, u32),
    scaled: (u32, u32),
    pad: (u32, u32),
}

impl Letterbox {
    /// Computes the letterbox that scales an image of size `src` to fit into `target`, centered.
    pub fn fit(src: (u32, u32), target: (u32, u32)) -> Self {
        let scale = f32::min(
            target.0 as f32 / src.0 as f32,
            target.1 as f32 / src.1 as f32,
        );
        let scaled = (
            ((src.0 as f32 * scale).round() as u32).clamp(1, target.0),
            ((src.1 as f32 * scale).round() as u32).clamp(1, target.1),
        );
        let pad = ((target.0 - scaled.0) / 2, (target.1 - scaled.1) / 2);
        Self {
            target,
            scaled,
            pad,
        }
    }

    /// Resizes `image` and places it in the center of a black canvas of the target size.
    pub fn apply(&self, image: &RgbaImage) -> RgbaImage {
        if image.dimensions() == self.target {
            return image.clone();
        }

        let resized = imageops::resize(
            image,
            self.scaled.0,
            self.scaled.1,
            imageops::FilterType::Triangle,
        );
        let mut canvas = RgbaImage::from_pixel(self.target.0, self.target.1, Rgba([0, 0, 0, 255]));
        imageops::replace(&mut canvas, &resized, self.pad.0.into(), self.pad.1.into());
        canvas
    }

    /// Maps a point in target pixels to normalized coordinates of the source image.
    ///
    /// Z is scaled like X.
    pub fn unmap(&self, [x, y, z]: [f32; 3]) -> [f32; 3] {
        let (w, h) = (self.scaled.0 as f32, self.scaled.1 as f32);
        [
            (x - self.pad.0 as f32) / w,
            (y - self.pad.1 as f32) / h,
            z / w,
        ]
    }
}

/// A [`Landmarker`] that finds palms and then runs a hand landmark network around each of them.
///
/// The landmark network is expected to have one RGB input and (at least) four outputs, in order:
/// screen landmarks (`[1, 63]`, input pixels), hand presence (`[1, 1]`), handedness (`[1, 1]`,
/// above 0.5 means right) and world landmarks (`[1, 63]`, meters). See [`PalmDetector`] for the
/// palm detection network.
///
/// Up to [`LandmarkerOptions::num_hands`] palms are processed per frame, most confident first.
pub struct OnnxLandmarker {
    palms: PalmDetector,
    cnn: Cnn,
    options: LandmarkerOptions,
    last_timestamp: Option<u64>,
    t_crop: Timer,
    t_resize: Timer,
    t_infer: Timer,
}

impl OnnxLandmarker {
    /// Loads the networks configured in `options`.
    pub fn new(options: LandmarkerOptions) -> anyhow::Result<Self> {
        ensure!(options.num_hands > 0, "`num_hands` must be at least 1");

        let mut palms = PalmDetector::new(NeuralNetwork::load(&options.palm_model)?)?;
        palms.set_threshold(options.min_detection);

        let nn = NeuralNetwork::load(&options.model)?;
        ensure!(
            nn.num_outputs() >= 4,
            "hand landmark network '{}' has {} outputs, expected 4",
            options.model.display(),
            nn.num_outputs(),
        );
        let cnn = Cnn::new(nn)?;
        log::debug!(
            "loaded hand landmark network '{}' ({:?} input {:?}, {:?} mode, up to {} hands)",
            options.model.display(),
            cnn.input_shape(),
            cnn.input_resolution(),
            options.running_mode,
            options.num_hands,
        );

        Ok(Self {
            palms,
            cnn,
            options,
            last_timestamp: None,
            t_crop: Timer::new("crop"),
            t_resize: Timer::new("resize"),
            t_infer: Timer::new("infer"),
        })
    }

    pub fn options(&self) -> &LandmarkerOptions {
        &self.options
    }

    /// Returns the expected input resolution of the landmark network.
    pub fn input_resolution(&self) -> (u32, u32) {
        self.cnn.input_resolution()
    }

    fn estimate(&mut self, image: &RgbaImage) -> anyhow::Result<DetectionResult> {
        let (w, h) = image.dimensions();
        ensure!(w > 0 && h > 0, "cannot detect hands in an empty {w}x{h} image");

        let palms = self.palms.detect(image)?;
        let mut hands = Vec::new();
        for palm in palms.iter().take(self.options.num_hands) {
            let crop = Crop::new(hand_region(palm));
            let region = self.t_crop.time(|| crop.apply(image));
            if let Some(hand) = self.estimate_hand(&region, &crop, (w, h))? {
                hands.push(hand);
            }
        }

        log::trace!("{} palms, {} hands", palms.len(), hands.len());
        Ok(DetectionResult::new(hands))
    }

    /// Runs the landmark network on the crop `region` of a `frame`-sized image.
    fn estimate_hand(
        &mut self,
        region: &RgbaImage,
        crop: &Crop,
        frame: (u32, u32),
    ) -> anyhow::Result<Option<HandDetection>> {
        let letterbox = Letterbox::fit(region.dimensions(), self.cnn.input_resolution());
        let input = self.t_resize.time(|| letterbox.apply(region));
        let cnn = &self.cnn;
        let outputs = self.t_infer.time(|| cnn.estimate(&input))?;

        let screen = &outputs[0];
        let presence = outputs[1].as_singular()?;
        let raw_handedness = outputs[2].as_singular()?;
        let world = &outputs[3];
        ensure!(
            screen.as_slice().len() == LANDMARK_OUTPUTS
                && world.as_slice().len() == LANDMARK_OUTPUTS,
            "unexpected landmark output shapes {:?} and {:?}",
            screen.shape(),
            world.shape(),
        );

        if presence < self.options.min_presence {
            log::trace!("no hand around palm (presence {presence:.3})");
            return Ok(None);
        }

        let landmarks = HandLandmarks::<ImageSpace>::from_positions(
            screen
                .as_slice()
                .chunks_exact(3)
                .map(|c| crop.unmap(letterbox.unmap([c[0], c[1], c[2]]), frame)),
        )?;
        let world_landmarks = HandLandmarks::<WorldSpace>::from_positions(
            world.as_slice().chunks_exact(3).map(|c| [c[0], c[1], c[2]]),
        )?;
        let handedness = ranked_handedness(raw_handedness);
        log::trace!(
            "hand with presence {presence:.3}, handedness {:?}",
            handedness
        );

        Ok(Some(HandDetection::new(
            landmarks,
            world_landmarks,
            handedness,
        )))
    }
}

impl Landmarker for OnnxLandmarker {
    fn detect(&mut self, image: &RgbaImage) -> anyhow::Result<DetectionResult> {
        if self.options.running_mode != RunningMode::Image {
            bail!(
                "`detect` called on a landmarker in {:?} mode",
                self.options.running_mode
            );
        }
        self.estimate(image)
    }

    fn detect_for_video(
        &mut self,
        image: &RgbaImage,
        timestamp: u64,
    ) -> anyhow::Result<DetectionResult> {
        if !self.options.running_mode.is_timestamped() {
            bail!("`detect_for_video` called on a landmarker in image mode");
        }
        if let Some(last) = self.last_timestamp {
            ensure!(
                timestamp > last,
                "timestamp {timestamp} is not after the previous one ({last})",
            );
        }
        self.last_timestamp = Some(timestamp);
        self.estimate(image)
    }

    fn timers(&self) -> Vec<&Timer> {
        let mut timers = self.palms.timers().to_vec();
        timers.extend([&self.t_crop, &self.t_resize, &self.t_infer]);
        timers
    }
}

/// Turns the raw handedness output into both categories, best first.
fn ranked_handedness(raw: f32) -> Vec<Category> {
    let right = Category::new(Handedness::Right.category_name(), raw);
    let left = Category::new(Handedness::Left.category_name(), 1.0 - raw);
    if raw > 0.5 {
        vec![right, left]
    } else {
        vec![left, right]
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn letterbox_wide_image() {
        let lb = Letterbox::fit((200, 100), (224, 224));
        assert_eq!(lb.scaled, (224, 112));
        assert_eq!(lb.pad, (0, 56));

        let [x, y, z] = lb.unmap([112.0, 112.0, 22.4]);
        assert_relative_eq!(x, 0.5);
        assert_relative_eq!(y, 0.5);
        assert_relative_eq!(z, 0.1);

        let [x, y, _] = lb.unmap([0.0, 56.0, 0.0]);
        assert_relative_eq!(x, 0.0);
        assert_relative_eq!(y, 0.0);
        let [x, y, _] = lb.unmap([224.0, 168.0, 0.0]);
        assert_relative_eq!(x, 1.0);
        assert_relative_eq!(y, 1.0);
    }

    #[test]
    fn letterbox_tall_image() {
        let lb = Letterbox::fit((50, 100), (224, 224));
        assert_eq!(lb.scaled, (112, 224));
        assert_eq!(lb.pad, (56, 0));
        let [x, y, _] = lb.unmap([56.0 + 28.0, 224.0, 0.0]);
        assert_relative_eq!(x, 0.25);
        assert_relative_eq!(y, 1.0);
    }

    #[test]
    fn letterbox_apply() {
        let image = RgbaImage::from_pixel(20, 10, Rgba([255, 255, 255, 255]));
        let lb = Letterbox::fit(image.dimensions(), (16, 16));
        let out = lb.apply(&image);
        assert_eq!(out.dimensions(), (16, 16));
        assert_eq!(out.get_pixel(8, 0), &Rgba([0, 0, 0, 255]));
        assert_eq!(out.get_pixel(8, 8), &Rgba([255, 255, 255, 255]));
        assert_eq!(out.get_pixel(8, 15), &Rgba([0, 0, 0, 255]));

        let same = RgbaImage::new(16, 16);
        assert_eq!(Letterbox::fit((16, 16), (16, 16)).apply(&same), same);
    }

    #[test]
    fn handedness_ranking() {
        let cats = ranked_handedness(0.8);
        assert_eq!(cats[0].name(), "Right");
        assert_relative_eq!(cats[0].score(), 0.8);
        assert_eq!(cats[1].name(), "Left");
        assert_relative_eq!(cats[1].score(), 0.2, epsilon = 1e-6);

        let cats = ranked_handedness(0.1);
        assert_eq!(cats[0].name(), "Left");
        assert_eq!(cats[1].name(), "Right");
    }

    #[test]
    fn zero_hands_is_rejected() {
        let options = LandmarkerOptions {
            num_hands: 0,
            ..LandmarkerOptions::default()
        };
        assert!(OnnxLandmarker::new(options).is_err());
    }
}
