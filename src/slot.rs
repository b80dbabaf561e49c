//! Per-frame assignment of detected hands to left and right slots.
//!
//! The detector reports hands in no particular order, and its handedness classification can
//! contradict itself (eg. both hands called "Left"). [`SlotAssignment::assign`] greedily prefers
//! the detector's own labeling and falls back to the other slot on conflicts, so that every frame
//! contributes at most one hand per slot.

use crate::hand::{DetectionResult, HandDetection, Handedness};

/// A logical accumulation bucket for one of the two hands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Left,
    Right,
}

impl Slot {
    /// Both slots, in column order.
    pub const ALL: [Slot; 2] = [Slot::Left, Slot::Right];

    /// Returns the slot preferred by a hand, according to its top-ranked handedness category.
    pub fn preferred_by(hand: &HandDetection) -> Self {
        match hand.side() {
            Handedness::Left => Slot::Left,
            Handedness::Right => Slot::Right,
        }
    }

    pub fn other(self) -> Self {
        match self {
            Slot::Left => Slot::Right,
            Slot::Right => Slot::Left,
        }
    }

    /// Column name prefix (`l` or `r`).
    pub fn prefix(self) -> &'static str {
        match self {
            Slot::Left => "l",
            Slot::Right => "r",
        }
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// The hands of one frame, sorted into slots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SlotAssignment<'a> {
    /// No hand was detected.
    Absent,
    /// A single hand, placed in the given slot.
    One(Slot, &'a HandDetection),
    /// Both slots are filled.
    Two {
        left: &'a HandDetection,
        right: &'a HandDetection,
    },
}

impl<'a> SlotAssignment<'a> {
    /// Assigns the hands of `result` to slots.
    ///
    /// Hands are visited in detector order. Each goes into its preferred slot if that is still
    /// free, else into the other slot if *that* is free, else it is dropped.
    pub fn assign(result: &'a DetectionResult) -> Self {
        let mut slots: [Option<&'a HandDetection>; 2] = [None, None];
        for (i, hand) in result.hands().iter().enumerate() {
            let preferred = Slot::preferred_by(hand);
            let target = if slots[preferred.index()].is_none() {
                preferred
            } else if slots[preferred.other().index()].is_none() {
                log::trace!(
                    "hand #{i} prefers {:?} slot, which is taken; using {:?}",
                    preferred,
                    preferred.other(),
                );
                preferred.other()
            } else {
                log::trace!("both slots are taken, dropping hand #{i}");
                continue;
            };

            slots[target.index()] = Some(hand);
        }

        match slots {
            [None, None] => SlotAssignment::Absent,
            [Some(left), None] => SlotAssignment::One(Slot::Left, left),
            [None, Some(right)] => SlotAssignment::One(Slot::Right, right),
            [Some(left), Some(right)] => SlotAssignment::Two { left, right },
        }
    }

    /// Returns the hand placed in `slot`, if any.
    pub fn get(&self, slot: Slot) -> Option<&'a HandDetection> {
        match *self {
            SlotAssignment::Absent => None,
            SlotAssignment::One(s, hand) => (s == slot).then_some(hand),
            SlotAssignment::Two { left, right } => match slot {
                Slot::Left => Some(left),
                Slot::Right => Some(right),
            },
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, SlotAssignment::Absent)
    }

    /// Returns the number of filled slots.
    pub fn len(&self) -> usize {
        match self {
            SlotAssignment::Absent => 0,
            SlotAssignment::One(..) => 1,
            SlotAssignment::Two { .. } => 2,
        }
    }

    /// Returns an iterator over the filled slots, left before right.
    pub fn filled(&self) -> impl Iterator<Item = (Slot, &'a HandDetection)> + '_ {
        Slot::ALL
            .into_iter()
            .filter_map(move |slot| self.get(slot).map(|hand| (slot, hand)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{frame, hand};

    #[test]
    fn empty_frame_is_absent() {
        let result = frame(vec![]);
        let assignment = SlotAssignment::assign(&result);
        assert!(assignment.is_absent());
        assert_eq!(assignment.len(), 0);
        assert_eq!(assignment.filled().count(), 0);
    }

    #[test]
    fn single_hand_uses_preferred_slot() {
        let result = frame(vec![hand("Right", 1.0)]);
        assert_eq!(
            SlotAssignment::assign(&result),
            SlotAssignment::One(Slot::Right, &result.hands()[0]),
        );

        let result = frame(vec![hand("left", 1.0)]);
        assert_eq!(
            SlotAssignment::assign(&result),
            SlotAssignment::One(Slot::Left, &result.hands()[0]),
        );
    }

    #[test]
    fn detector_order_does_not_matter() {
        let result = frame(vec![hand("Right", 1.0), hand("Left", 2.0)]);
        let assignment = SlotAssignment::assign(&result);
        assert_eq!(assignment.get(Slot::Left), Some(&result.hands()[1]));
        assert_eq!(assignment.get(Slot::Right), Some(&result.hands()[0]));
    }

    #[test]
    fn conflicting_handedness_falls_back_to_other_slot() {
        let result = frame(vec![hand("Left", 1.0), hand("Left", 2.0)]);
        let assignment = SlotAssignment::assign(&result);
        assert_eq!(
            assignment,
            SlotAssignment::Two {
                left: &result.hands()[0],
                right: &result.hands()[1],
            },
        );

        let result = frame(vec![hand("Right", 1.0), hand("Right", 2.0)]);
        let assignment = SlotAssignment::assign(&result);
        assert_eq!(assignment.get(Slot::Right), Some(&result.hands()[0]));
        assert_eq!(assignment.get(Slot::Left), Some(&result.hands()[1]));
    }

    #[test]
    fn surplus_hands_are_dropped() {
        let result = frame(vec![
            hand("Left", 1.0),
            hand("Right", 2.0),
            hand("Left", 3.0),
        ]);
        let assignment = SlotAssignment::assign(&result);
        assert_eq!(assignment.len(), 2);
        assert_eq!(assignment.get(Slot::Left), Some(&result.hands()[0]));
        assert_eq!(assignment.get(Slot::Right), Some(&result.hands()[1]));
    }

    #[test]
    fn unknown_handedness_prefers_right() {
        let result = frame(vec![hand("Unknown", 1.0), hand("Right", 2.0)]);
        let assignment = SlotAssignment::assign(&result);
        assert_eq!(assignment.get(Slot::Right), Some(&result.hands()[0]));
        assert_eq!(assignment.get(Slot::Left), Some(&result.hands()[1]));
    }

    #[test]
    fn filled_iterates_left_first() {
        let result = frame(vec![hand("Right", 1.0), hand("Left", 2.0)]);
        let assignment = SlotAssignment::assign(&result);
        let slots = assignment.filled().map(|(slot, _)| slot).collect::<Vec<_>>();
        assert_eq!(slots, [Slot::Left, Slot::Right]);
    }
}
