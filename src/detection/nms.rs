//! Non-Maximum Suppression and Averaging.
//!
//! Single-Shot MultiBox Detectors (SSD) produce duplicate detections for individual objects.
//! Non-Maximum Suppression (NMS) filters these duplicates out, leaving a single detection for each
//! object. [`SuppressionMode::Remove`] keeps only the most confident of a group of overlapping
//! detections, [`SuppressionMode::Average`] replaces the group by its confidence-weighted average.

use super::{BoundingRect, Detection};

/// Describes how [`NonMaxSuppression`] deals with overlapping detections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressionMode {
    /// Remove overlapping detections, only retain the detection with highest confidence score.
    Remove,

    /// Compute a confidence-weighted average of overlapping detections.
    Average,
}

/// A non-maximum suppression algorithm.
#[derive(Debug, Clone)]
pub struct NonMaxSuppression {
    iou_thresh: f32,
    mode: SuppressionMode,
}

impl NonMaxSuppression {
    /// The default intersection-over-union threshold used to determine if two detections overlap.
    pub const DEFAULT_IOU_THRESH: f32 = 0.3;

    /// Creates a suppressor using [`SuppressionMode::Average`] and the default IOU threshold.
    pub fn new() -> Self {
        Self {
            iou_thresh: Self::DEFAULT_IOU_THRESH,
            mode: SuppressionMode::Average,
        }
    }

    pub fn set_iou_thresh(&mut self, iou_thresh: f32) {
        self.iou_thresh = iou_thresh;
    }

    pub fn set_mode(&mut self, mode: SuppressionMode) {
        self.mode = mode;
    }

    /// Performs non-maximum suppression on `detections`.
    ///
    /// The result is ordered by descending confidence. Averaged detections keep the confidence of
    /// the most confident member of their group.
    pub fn process(&self, mut detections: Vec<Detection>) -> Vec<Detection> {
        // Ascending confidence; the most confident detection is popped first.
        detections.sort_unstable_by(|a, b| a.confidence.total_cmp(&b.confidence));

        let mut out = Vec::new();
        while let Some(seed) = detections.pop() {
            let mut group = vec![seed];
            detections.retain(|other| {
                if seed.rect.iou(&other.rect) >= self.iou_thresh {
                    group.push(*other);
                    false
                } else {
                    true
                }
            });

            match self.mode {
                SuppressionMode::Remove => out.push(seed),
                SuppressionMode::Average => out.push(average(seed.confidence, &group)),
            }
        }
        out
    }
}

impl Default for NonMaxSuppression {
    fn default() -> Self {
        Self::new()
    }
}

fn average(confidence: f32, group: &[Detection]) -> Detection {
    let (mut x, mut y, mut w, mut h, mut divisor) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for det in group {
        let factor = det.confidence;
        x += det.rect.xc * factor;
        y += det.rect.yc * factor;
        w += det.rect.w * factor;
        h += det.rect.h * factor;
        divisor += factor;
    }

    if divisor <= 0.0 {
        return group[0];
    }
    Detection::new(
        confidence,
        BoundingRect::from_center(x / divisor, y / divisor, w / divisor, h / divisor),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suppresses_non_maximum() {
        let mut nms = NonMaxSuppression::new();
        nms.set_mode(SuppressionMode::Remove);

        let rect = BoundingRect::from_center(0.0, 0.0, 1.0, 1.0);
        let a = Detection::new(0.6, rect);
        let b = Detection::new(0.55, BoundingRect::from_center(0.0, 0.0, 1.5, 1.5));
        assert_eq!(nms.process(vec![b, a]), [a]);
    }

    #[test]
    fn ignores_non_overlapping() {
        let nms = NonMaxSuppression::new();
        let a = Detection::new(0.7, BoundingRect::from_center(0.0, 0.0, 1.0, 1.0));
        let b = Detection::new(0.9, BoundingRect::from_center(5.0, 0.0, 1.0, 1.0));
        assert_eq!(nms.process(vec![a, b]), [b, a]);
    }

    #[test]
    fn averages_detections() {
        let mut nms = NonMaxSuppression::new();
        nms.set_iou_thresh(0.0);

        let a = Detection::new(1.0, BoundingRect::from_center(-1.0, 3.0, 1.0, 1.0));
        let b = Detection::new(0.5, BoundingRect::from_center(-1.0, 3.0, 4.0, 4.0));
        let out = nms.process(vec![a, b]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].confidence(), 1.0);
        assert_eq!(
            out[0].bounding_rect(),
            BoundingRect::from_center(-1.0, 3.0, 2.0, 2.0)
        );
    }
}
