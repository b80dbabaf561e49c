//! Palm detection.
//!
//! Palms are much easier to find than whole hands (they are rigid and roughly square), so the
//! landmarker looks for palms first and then estimates landmarks in a region around each of them.

use anyhow::{ensure, Context};
use image::RgbaImage;

use crate::{
    detection::{
        nms::NonMaxSuppression,
        ssd::{Anchors, LayerInfo},
        BoundingRect, Detection,
    },
    nn::{Cnn, NeuralNetwork, Outputs},
    timer::Timer,
};

use super::Letterbox;

/// Values per anchor in the box output: box center and size, then 7 palm keypoints.
const BOX_PARAMS: usize = 18;

/// Margin added to every side of a palm box to get a region enclosing the whole hand, relative to
/// the palm size.
const PALM_TO_HAND: f32 = 1.5;

/// A palm detection network with the MediaPipe output layout.
///
/// The network takes one RGB image and produces two outputs: boxes (`[1, N, 18]`, input pixels,
/// relative to the anchor) and scores (`[1, N, 1]`, logits). Anchors sit on feature maps with
/// strides 8 (2 per cell) and 16 (6 per cell), which makes `N = 2016` for a 192x192 input.
pub struct PalmDetector {
    cnn: Cnn,
    anchors: Anchors,
    threshold: f32,
    nms: NonMaxSuppression,
    t_resize: Timer,
    t_infer: Timer,
    t_nms: Timer,
}

impl PalmDetector {
    pub const DEFAULT_THRESHOLD: f32 = 0.5;

    pub fn new(nn: NeuralNetwork) -> anyhow::Result<Self> {
        ensure!(
            nn.num_outputs() >= 2,
            "palm detection network has {} outputs, expected 2",
            nn.num_outputs()
        );
        let cnn = Cnn::new(nn).context("invalid palm detection network")?;
        let anchors = palm_anchors(cnn.input_resolution());
        log::debug!(
            "palm detection network input {:?}, {} anchors",
            cnn.input_resolution(),
            anchors.len()
        );

        Ok(Self {
            cnn,
            anchors,
            threshold: Self::DEFAULT_THRESHOLD,
            nms: NonMaxSuppression::new(),
            t_resize: Timer::new("palm resize"),
            t_infer: Timer::new("palm infer"),
            t_nms: Timer::new("palm nms"),
        })
    }

    /// Sets the minimum confidence of a palm.
    pub fn set_threshold(&mut self, threshold: f32) {
        self.threshold = threshold;
    }

    /// Detects palms in `image`.
    ///
    /// Returned boxes are in pixel coordinates of `image`, most confident first.
    pub fn detect(&mut self, image: &RgbaImage) -> anyhow::Result<Vec<Detection>> {
        let letterbox = Letterbox::fit(image.dimensions(), self.cnn.input_resolution());
        let input = self.t_resize.time(|| letterbox.apply(image));
        let cnn = &self.cnn;
        let outputs = self.t_infer.time(|| cnn.estimate(&input))?;

        let candidates = extract(
            &outputs,
            &self.anchors,
            self.cnn.input_resolution(),
            self.threshold,
        )?;
        log::trace!("{} palm candidates", candidates.len());
        let nms = &self.nms;
        let mut palms = self.t_nms.time(|| nms.process(candidates));

        let (w, h) = image.dimensions();
        let to_image = |(x, y): (f32, f32)| {
            let [x, y, _] = letterbox.unmap([x, y, 0.0]);
            (x * w as f32, y * h as f32)
        };
        for palm in &mut palms {
            let rect = palm.bounding_rect();
            palm.set_bounding_rect(BoundingRect::from_corners(
                to_image(rect.top_left()),
                to_image(rect.bottom_right()),
            ));
        }
        Ok(palms)
    }

    pub fn timers(&self) -> [&Timer; 3] {
        [&self.t_resize, &self.t_infer, &self.t_nms]
    }
}

fn palm_anchors((w, h): (u32, u32)) -> Anchors {
    Anchors::calculate(&[
        LayerInfo::new(2, w / 8, h / 8),
        LayerInfo::new(6, w / 16, h / 16),
    ])
}

/// Decodes all palms with a score of at least `threshold`, in network input coordinates.
fn extract(
    outputs: &Outputs,
    anchors: &Anchors,
    (input_w, input_h): (u32, u32),
    threshold: f32,
) -> anyhow::Result<Vec<Detection>> {
    let boxes = &outputs[0];
    let scores = &outputs[1];
    ensure!(
        boxes.shape() == [1, anchors.len(), BOX_PARAMS] && scores.shape() == [1, anchors.len(), 1],
        "unexpected palm detection output shapes {:?} and {:?} for {} anchors",
        boxes.shape(),
        scores.shape(),
        anchors.len(),
    );

    let (input_w, input_h) = (input_w as f32, input_h as f32);
    let detections = scores
        .as_slice()
        .iter()
        .zip(boxes.as_slice().chunks_exact(BOX_PARAMS))
        .enumerate()
        .filter_map(|(index, (&logit, params))| {
            let confidence = sigmoid(logit);
            if confidence < threshold {
                return None;
            }
            let anchor = &anchors[index];
            let xc = params[0] + anchor.x_center() * input_w;
            let yc = params[1] + anchor.y_center() * input_h;
            Some(Detection::new(
                confidence,
                BoundingRect::from_center(xc, yc, params[2], params[3]),
            ))
        })
        .collect();
    Ok(detections)
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Returns the square region around a palm that is expected to contain the whole hand.
pub fn hand_region(palm: &Detection) -> BoundingRect {
    palm.bounding_rect().grow_rel(PALM_TO_HAND).grow_to_square()
}

/// A square cut out of a frame, padded with black where it extends past the frame's edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crop {
    x: i64,
    y: i64,
    size: u32,
}

impl Crop {
    /// Rounds a region to whole pixels.
    pub fn new(region: BoundingRect) -> Self {
        let (x, y) = region.top_left();
        Self {
            x: x.round() as i64,
            y: y.round() as i64,
            size: (region.width().max(region.height()).round() as u32).max(1),
        }
    }

    pub fn apply(&self, image: &RgbaImage) -> RgbaImage {
        let mut canvas = RgbaImage::from_pixel(self.size, self.size, image::Rgba([0, 0, 0, 255]));
        image::imageops::replace(&mut canvas, image, -self.x, -self.y);
        canvas
    }

    /// Maps a point normalized to the crop to a point normalized to the frame of size `frame`.
    ///
    /// Z is scaled like X.
    pub fn unmap(&self, [x, y, z]: [f32; 3], (frame_w, frame_h): (u32, u32)) -> [f32; 3] {
        let size = self.size as f32;
        [
            (self.x as f32 + x * size) / frame_w as f32,
            (self.y as f32 + y * size) / frame_h as f32,
            z * size / frame_w as f32,
        ]
    }
}
