//! Hand landmarks and the coordinate spaces they are expressed in.

use std::{fmt::Debug, marker::PhantomData};

use anyhow::ensure;

/// Number of landmarks predicted for every hand.
pub const NUM_LANDMARKS: usize = 21;

/// Marker trait for the coordinate spaces landmarks can be expressed in.
///
/// Landmarks from different spaces use different units and must not be mixed, so
/// [`HandLandmarks`] carries its space as a type parameter.
pub trait CoordinateSpace: Debug + Clone + Copy + PartialEq + Send + Sync + 'static {
    /// Human-readable name of the space, used in log output.
    const NAME: &'static str;
}

/// Normalized image coordinates.
///
/// X and Y are fractions of the image width and height (Y points down). Z is the landmark depth
/// relative to the wrist, using roughly the same scale as X.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImageSpace {}

impl CoordinateSpace for ImageSpace {
    const NAME: &'static str = "image";
}

/// Real-world metric coordinates, in meters, with the origin at the hand's approximate geometric
/// center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WorldSpace {}

impl CoordinateSpace for WorldSpace {
    const NAME: &'static str = "world";
}

/// A coordinate axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// All axes, in column order.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Returns the lowercase name used in table column names.
    pub fn name(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }

    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

/// A landmark in 3D space.
#[derive(Debug, PartialEq, PartialOrd, Clone, Copy)]
pub struct Landmark {
    pos: [f32; 3],
}

impl Landmark {
    pub fn new(position: [f32; 3]) -> Self {
        Self { pos: position }
    }

    #[inline]
    pub fn position(&self) -> [f32; 3] {
        self.pos
    }

    #[inline]
    pub fn x(&self) -> f32 {
        self.pos[0]
    }

    #[inline]
    pub fn y(&self) -> f32 {
        self.pos[1]
    }

    #[inline]
    pub fn z(&self) -> f32 {
        self.pos[2]
    }

    /// Returns the coordinate along `axis`.
    #[inline]
    pub fn coord(&self, axis: Axis) -> f32 {
        self.pos[axis.index()]
    }
}

/// The full set of [`NUM_LANDMARKS`] landmarks of one hand, in coordinate space `S`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandLandmarks<S: CoordinateSpace> {
    landmarks: [Landmark; NUM_LANDMARKS],
    _space: PhantomData<S>,
}

impl<S: CoordinateSpace> HandLandmarks<S> {
    pub fn new(landmarks: [Landmark; NUM_LANDMARKS]) -> Self {
        Self {
            landmarks,
            _space: PhantomData,
        }
    }

    /// Creates a landmark set from raw positions.
    ///
    /// Returns an error if `positions` does not yield exactly [`NUM_LANDMARKS`] entries.
    pub fn from_positions<I>(positions: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = [f32; 3]>,
    {
        let landmarks = positions.into_iter().map(Landmark::new).collect::<Vec<_>>();
        ensure!(
            landmarks.len() == NUM_LANDMARKS,
            "expected {} {} space landmarks, got {}",
            NUM_LANDMARKS,
            S::NAME,
            landmarks.len(),
        );

        let mut array = [Landmark::new([0.0; 3]); NUM_LANDMARKS];
        array.copy_from_slice(&landmarks);
        Ok(Self::new(array))
    }

    /// Returns the landmark at `index`.
    #[inline]
    pub fn get(&self, index: LandmarkIdx) -> Landmark {
        self.landmarks[index as usize]
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = Landmark> + '_ {
        self.landmarks.iter().copied()
    }

    pub fn as_slice(&self) -> &[Landmark] {
        &self.landmarks
    }

    /// Returns all coordinates in landmark-major order (`x0, y0, z0, x1, ...`).
    pub fn coords(&self) -> impl Iterator<Item = f32> + '_ {
        self.landmarks.iter().flat_map(|lm| lm.position())
    }
}

/// Names for the hand landmarks, in the order the landmark network predicts them.
///
/// # Terminology
///
/// - **CMC**: [Carpometacarpal joint], the lowest joint of the thumb, located near the wrist.
/// - **MCP**: [Metacarpophalangeal joint], the lower joint forming the knuckles near the palm of
///   the hand.
/// - **PIP**: Proximal Interphalangeal joint, the joint between the MCP and DIP.
/// - **DIP**: Distal Interphalangeal joint, the highest joint of a finger.
/// - **Tip**: This landmark is just placed on the tip of the finger, above the DIP.
///
/// [Carpometacarpal joint]: https://en.wikipedia.org/wiki/Carpometacarpal_joint
/// [Metacarpophalangeal joint]: https://en.wikipedia.org/wiki/Metacarpophalangeal_joint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandmarkIdx {
    Wrist,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexFingerMcp,
    IndexFingerPip,
    IndexFingerDip,
    IndexFingerTip,
    MiddleFingerMcp,
    MiddleFingerPip,
    MiddleFingerDip,
    MiddleFingerTip,
    RingFingerMcp,
    RingFingerPip,
    RingFingerDip,
    RingFingerTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_positions_requires_all_landmarks() {
        let positions = (0..NUM_LANDMARKS).map(|i| [i as f32, 0.0, -(i as f32)]);
        let hand = HandLandmarks::<WorldSpace>::from_positions(positions).unwrap();
        assert_eq!(hand.get(LandmarkIdx::Wrist).position(), [0.0, 0.0, 0.0]);
        assert_eq!(hand.get(LandmarkIdx::PinkyTip).x(), 20.0);
        assert_eq!(hand.get(LandmarkIdx::PinkyTip).coord(Axis::Z), -20.0);

        let err = HandLandmarks::<ImageSpace>::from_positions([[0.0; 3]; 20]).unwrap_err();
        assert!(err.to_string().contains("image space"), "{err}");
    }

    #[test]
    fn coords_are_landmark_major() {
        let positions = (0..NUM_LANDMARKS).map(|i| [i as f32, 100.0 + i as f32, 200.0]);
        let hand = HandLandmarks::<ImageSpace>::from_positions(positions).unwrap();
        let coords = hand.coords().collect::<Vec<_>>();
        assert_eq!(coords.len(), NUM_LANDMARKS * 3);
        assert_eq!(&coords[..6], &[0.0, 100.0, 200.0, 1.0, 101.0, 200.0]);
    }
}
