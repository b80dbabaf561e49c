//! Anchor generation for Single Shot MultiBox Detectors (SSDs).
//!
//! Only covers what the palm detection network needs: anchors at the cell centers of a few square
//! feature maps, with a fixed number of anchors per cell.

use std::ops::Index;

/// An anchor of an SSD network. Coordinates range from 0 to 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    x_center: f32,
    y_center: f32,
}

impl Anchor {
    pub fn x_center(&self) -> f32 {
        self.x_center
    }

    pub fn y_center(&self) -> f32 {
        self.y_center
    }
}

/// Describes an output layer of an SSD network.
#[derive(Debug, Clone, Copy)]
pub struct LayerInfo {
    /// Number of anchors per feature map cell.
    boxes_per_cell: u32,
    width: u32,
    height: u32,
}

impl LayerInfo {
    /// Creates a layer description with a feature map of `width`x`height` cells.
    pub fn new(boxes_per_cell: u32, width: u32, height: u32) -> Self {
        Self {
            boxes_per_cell,
            width,
            height,
        }
    }
}

/// The anchors of all layers of an SSD network, in output order.
#[derive(Debug, Clone)]
pub struct Anchors {
    anchors: Vec<Anchor>,
}

impl Anchors {
    pub fn calculate(layers: &[LayerInfo]) -> Self {
        let mut anchors = Vec::new();
        for layer in layers {
            for y in 0..layer.height {
                for x in 0..layer.width {
                    let anchor = Anchor {
                        x_center: (x as f32 + 0.5) / layer.width as f32,
                        y_center: (y as f32 + 0.5) / layer.height as f32,
                    };
                    // Every box of a cell shares the cell center; only the regressed offsets
                    // differ.
                    anchors.extend((0..layer.boxes_per_cell).map(|_| anchor));
                }
            }
        }

        Self { anchors }
    }

    /// Returns the total number of anchors.
    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}

impl Index<usize> for Anchors {
    type Output = Anchor;

    fn index(&self, index: usize) -> &Anchor {
        &self.anchors[index]
    }
}
