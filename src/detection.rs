//! Common functionality for object detection.
//!
//! The palm detector produces many overlapping candidate boxes per hand. The types here describe
//! those candidates, and the submodules turn raw network output into a short list of distinct
//! objects.

pub mod nms;
pub mod ssd;

/// A detected object: a [`BoundingRect`] and a confidence value between 0.0 and 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    confidence: f32,
    rect: BoundingRect,
}

impl Detection {
    pub fn new(confidence: f32, rect: BoundingRect) -> Self {
        Self { confidence, rect }
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn bounding_rect(&self) -> BoundingRect {
        self.rect
    }

    pub fn set_bounding_rect(&mut self, rect: BoundingRect) {
        self.rect = rect;
    }
}

/// Axis-aligned rectangle with float coordinates, stored as center and size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingRect {
    xc: f32,
    yc: f32,
    w: f32,
    h: f32,
}

impl BoundingRect {
    /// Creates a bounding rectangle centered at `(xc, yc)`.
    pub fn from_center(xc: f32, yc: f32, w: f32, h: f32) -> Self {
        Self { xc, yc, w, h }
    }

    /// Creates the rectangle spanning two opposite corners.
    pub fn from_corners((x0, y0): (f32, f32), (x1, y1): (f32, f32)) -> Self {
        Self {
            xc: (x0 + x1) / 2.0,
            yc: (y0 + y1) / 2.0,
            w: (x1 - x0).abs(),
            h: (y1 - y0).abs(),
        }
    }

    pub fn x_center(&self) -> f32 {
        self.xc
    }

    pub fn y_center(&self) -> f32 {
        self.yc
    }

    pub fn width(&self) -> f32 {
        self.w
    }

    pub fn height(&self) -> f32 {
        self.h
    }

    pub fn top_left(&self) -> (f32, f32) {
        (self.xc - self.w / 2.0, self.yc - self.h / 2.0)
    }

    pub fn bottom_right(&self) -> (f32, f32) {
        (self.xc + self.w / 2.0, self.yc + self.h / 2.0)
    }

    /// Grows this rectangle by adding a margin of `amount` times its width (or height) to every
    /// side.
    #[must_use]
    pub fn grow_rel(&self, amount: f32) -> Self {
        Self {
            w: self.w * (1.0 + 2.0 * amount),
            h: self.h * (1.0 + 2.0 * amount),
            ..*self
        }
    }

    /// Symmetrically extends the shorter side so that the rectangle becomes a square.
    #[must_use]
    pub fn grow_to_square(&self) -> Self {
        let side = self.w.max(self.h);
        Self {
            w: side,
            h: side,
            ..*self
        }
    }

    /// Returns the amount of area covered by `self`.
    pub fn area(&self) -> f32 {
        self.w * self.h
    }

    fn intersection_area(&self, other: &Self) -> f32 {
        let (l1, t1) = self.top_left();
        let (r1, b1) = self.bottom_right();
        let (l2, t2) = other.top_left();
        let (r2, b2) = other.bottom_right();
        let w = (r1.min(r2) - l1.max(l2)).max(0.0);
        let h = (b1.min(b2) - t1.max(t2)).max(0.0);
        w * h
    }

    /// Computes the Intersection over Union (IOU) of `self` and `other`.
    ///
    /// Two empty rectangles have an IOU of 0.
    pub fn iou(&self, other: &Self) -> f32 {
        let intersection = self.intersection_area(other);
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn zero_sized() {
        let zero = BoundingRect::from_center(0.0, 0.0, 0.0, 0.0);
        let also_zero = BoundingRect::from_center(1.0, 0.0, 0.0, 0.0);
        assert_eq!(zero.area(), 0.0);
        assert_eq!(zero.iou(&also_zero), 0.0);
    }

    #[test]
    fn iou() {
        let a = BoundingRect::from_center(1.0, 0.0, 1.0, 1.0);
        let b = BoundingRect::from_center(2.0, 0.0, 1.0, 1.0);
        assert_eq!(a.iou(&b), 0.0);

        let c = BoundingRect::from_center(1.5, 0.0, 1.0, 1.0);
        assert_relative_eq!(a.iou(&c), 0.5 / 1.5);

        // same center, different sizes
        let smaller = BoundingRect::from_center(9.0, 9.0, 1.0, 1.0);
        let bigger = BoundingRect::from_center(9.0, 9.0, 2.0, 2.0);
        assert_eq!(smaller.iou(&bigger), 0.25);
        assert_eq!(bigger.iou(&smaller), 0.25);
    }

    #[test]
    fn growing() {
        let rect = BoundingRect::from_center(10.0, 20.0, 4.0, 2.0);
        let grown = rect.grow_rel(0.5);
        assert_eq!(grown, BoundingRect::from_center(10.0, 20.0, 8.0, 4.0));
        assert_eq!(
            grown.grow_to_square(),
            BoundingRect::from_center(10.0, 20.0, 8.0, 8.0)
        );
    }

    #[test]
    fn corners() {
        let rect = BoundingRect::from_corners((4.0, 2.0), (0.0, 8.0));
        assert_eq!(rect, BoundingRect::from_center(2.0, 5.0, 4.0, 6.0));
        assert_eq!(rect.top_left(), (0.0, 2.0));
        assert_eq!(rect.bottom_right(), (4.0, 8.0));
    }
}
