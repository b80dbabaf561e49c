//! Live hand tracking preview.
//!
//! Frames are read on the calling thread and handed to a detection worker. Results are only
//! logged; nothing is written to a table.

use anyhow::bail;
use image::RgbaImage;
use itertools::Itertools;
use pawawwewism::Worker;

use crate::{
    hand::DetectionResult,
    landmark::LandmarkIdx,
    landmarker::Landmarker,
    slot::SlotAssignment,
    timer::FpsCounter,
    video::FrameSource,
};

/// Number of consecutive frame errors after which the source is considered dead.
const MAX_CONSECUTIVE_ERRORS: u32 = 10;

/// Streams frames from `source` to `landmarker` until the source ends.
///
/// Returns the number of frames submitted for detection.
pub fn run_live<L>(landmarker: L, source: &mut dyn FrameSource) -> anyhow::Result<u64>
where
    L: Landmarker + 'static,
{
    let mut landmarker = landmarker;
    let mut fps = FpsCounter::new("hand landmarker");
    let mut detector = Worker::builder().name("hand landmarker").spawn(
        move |(image, timestamp): (RgbaImage, u64)| {
            match landmarker.detect_for_video(&image, timestamp) {
                Ok(result) => log::info!("frame {}: {}", timestamp, describe(&result)),
                Err(e) => log::error!("detection failed on frame {}: {:#}", timestamp, e),
            }
            fps.tick_with(landmarker.timers());
        },
    )?;

    let mut source_fps = FpsCounter::new("frame source");
    let mut timestamp = 0;
    let mut errors = 0;
    loop {
        match source.next_frame() {
            Ok(Some(image)) => {
                errors = 0;
                detector.send((image, timestamp));
                timestamp += 1;
                source_fps.tick_with(source.timers());
            }
            Ok(None) => break,
            Err(e) => {
                errors += 1;
                log::error!("failed to read frame: {:#}", e);
                if errors >= MAX_CONSECUTIVE_ERRORS {
                    bail!("giving up after {} consecutive frame errors", errors);
                }
            }
        }
    }

    log::info!("source ended after {} frames", timestamp);
    Ok(timestamp)
}

/// Formats the slot-assigned hands of a frame for logging.
pub fn describe(result: &DetectionResult) -> String {
    let assignment = SlotAssignment::assign(result);
    if assignment.is_absent() {
        return "no hands".to_string();
    }

    let described = assignment
        .filled()
        .map(|(slot, hand)| {
            let wrist = hand.landmarks().get(LandmarkIdx::Wrist);
            let score = hand.top_handedness().map_or(0.0, |cat| cat.score());
            format!(
                "{:?} ({:.2}) wrist at ({:.3}, {:.3})",
                slot,
                score,
                wrist.x(),
                wrist.y()
            )
        })
        .join(", ");
    described
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{frame, hand};

    #[test]
    fn describes_frames() {
        assert_eq!(describe(&frame(vec![])), "no hands");
        assert_eq!(
            describe(&frame(vec![hand("Right", 0.5), hand("Left", 0.25)])),
            "Left (0.90) wrist at (0.250, 0.250), Right (0.90) wrist at (0.500, 0.500)",
        );
    }

    struct Failing(u32);

    impl FrameSource for Failing {
        fn next_frame(&mut self) -> anyhow::Result<Option<RgbaImage>> {
            self.0 += 1;
            bail!("broken pipe")
        }
    }

    struct Timed {
        frames: u32,
        polls: std::cell::Cell<u32>,
        t_read: crate::timer::Timer,
    }

    impl FrameSource for Timed {
        fn next_frame(&mut self) -> anyhow::Result<Option<RgbaImage>> {
            if self.frames == 0 {
                return Ok(None);
            }
            self.frames -= 1;
            Ok(Some(self.t_read.time(|| RgbaImage::new(2, 2))))
        }

        fn timers(&self) -> Vec<&crate::timer::Timer> {
            self.polls.set(self.polls.get() + 1);
            vec![&self.t_read]
        }
    }

    struct Nothing;

    impl Landmarker for Nothing {
        fn detect(&mut self, _: &RgbaImage) -> anyhow::Result<DetectionResult> {
            Ok(DetectionResult::default())
        }
    }

    #[test]
    fn gives_up_on_dead_source() {
        let mut source = Failing(0);
        let err = run_live(Nothing, &mut source).unwrap_err();
        assert!(err.to_string().contains("consecutive"), "{err}");
        assert_eq!(source.0, MAX_CONSECUTIVE_ERRORS);
    }

    #[test]
    fn reports_source_timers() {
        let mut source = Timed {
            frames: 3,
            polls: Default::default(),
            t_read: crate::timer::Timer::new("read"),
        };
        assert_eq!(run_live(Nothing, &mut source).unwrap(), 3);
        assert_eq!(source.polls.get(), 3);
        assert_eq!(source.t_read.count(), 3);
    }
}
