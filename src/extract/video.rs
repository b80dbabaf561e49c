//! Per-video feature extraction.

use std::{fs, io, path::Path};

use itertools::Itertools;

use crate::{
    aggregate::{FrameRow, VideoAccumulator},
    extract::{file_name, list_dir, Summary},
    labels::LabelTable,
    landmark::WorldSpace,
    landmarker::Landmarker,
    table::{frame_header, mean_std_header, TableWriter},
    timer::Timer,
    video::{self, FrameSource, DEFAULT_VIDEO_EXTENSIONS},
};

#[derive(Debug, Clone, PartialEq)]
pub struct VideoOptions {
    /// Write one row per hand-bearing frame instead of one aggregated row per video.
    pub per_frame: bool,
    /// File extensions of video files, in addition to frame directories.
    pub extensions: Vec<String>,
}

impl Default for VideoOptions {
    fn default() -> Self {
        Self {
            per_frame: false,
            extensions: DEFAULT_VIDEO_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

/// Runs a [`Landmarker`] over every labeled video in a directory.
///
/// Videos are processed one after another, in file name order. Each video's frames are assigned
/// to hand slots and reduced to a single row of world space statistics (or, with
/// [`VideoOptions::per_frame`], one row per frame).
pub struct VideoPipeline<L: Landmarker> {
    landmarker: L,
    labels: LabelTable,
    options: VideoOptions,
    /// Running frame counter across all videos, passed to the landmarker as the timestamp.
    timestamp: u64,
    t_decode: Timer,
    t_detect: Timer,
}

impl<L: Landmarker> VideoPipeline<L> {
    pub fn new(landmarker: L, labels: LabelTable, options: VideoOptions) -> Self {
        Self {
            landmarker,
            labels,
            options,
            timestamp: 0,
            t_decode: Timer::new("decode"),
            t_detect: Timer::new("detect"),
        }
    }

    /// Returns the header of the table this pipeline writes.
    pub fn header(&self) -> Vec<String> {
        if self.options.per_frame {
            frame_header()
        } else {
            mean_std_header()
        }
    }

    /// Processes every video in `input_dir`, writing rows to `table`.
    ///
    /// Entries that are not videos, unlabeled videos and videos that cannot be opened are
    /// skipped. Detection failures abort the run.
    pub fn run<W: io::Write>(
        &mut self,
        input_dir: &Path,
        table: &mut TableWriter<W>,
    ) -> anyhow::Result<Summary> {
        let mut summary = Summary::default();
        let (videos, others): (Vec<_>, Vec<_>) = list_dir(input_dir)?
            .into_iter()
            .partition(|path| video::is_video(path, &self.options.extensions));
        for path in others {
            if self.is_label_table(&path) {
                continue;
            }
            log::warn!("'{}' is not a video, skipping it", file_name(&path));
            summary.skipped += 1;
        }

        for (i, path) in videos.iter().enumerate() {
            let name = file_name(path);
            log::info!("Processing file {} of {} ({})...", i + 1, videos.len(), name);

            let Some(label) = self.labels.get(&name).map(str::to_lowercase) else {
                log::warn!("no label for '{}', skipping", name);
                summary.skipped += 1;
                continue;
            };

            let mut source = match video::open(path) {
                Ok(source) => source,
                Err(e) => {
                    log::warn!("skipping '{}': {:#}", name, e);
                    summary.skipped += 1;
                    continue;
                }
            };

            self.process_video(&mut source, &name, &label, table)?;
            summary.written += 1;
            log::debug!(
                "{}: {}, {}, {}",
                name,
                self.t_decode,
                self.t_detect,
                self.landmarker.timers().iter().join(", "),
            );
        }

        Ok(summary)
    }

    fn is_label_table(&self, path: &Path) -> bool {
        let Some(labels) = self.labels.path() else {
            return false;
        };
        match (fs::canonicalize(labels), fs::canonicalize(path)) {
            (Ok(labels), Ok(path)) => labels == path,
            _ => labels == path,
        }
    }

    /// Runs detection on every frame of `source` and writes the resulting rows.
    ///
    /// A frame that fails to decode ends the video; the frames before it are still used. Returns
    /// the number of rows written.
    pub fn process_video<W: io::Write>(
        &mut self,
        source: &mut dyn FrameSource,
        video: &str,
        label: &str,
        table: &mut TableWriter<W>,
    ) -> anyhow::Result<usize> {
        let mut acc = VideoAccumulator::<WorldSpace>::new();
        let mut rows = 0;
        let mut frame = 0;
        let mut empty_frames = 0;
        loop {
            let image = match self.t_decode.time(|| source.next_frame()) {
                Ok(Some(image)) => image,
                Ok(None) => break,
                Err(e) => {
                    log::warn!("{}: ending video at frame {}: {:#}", video, frame, e);
                    break;
                }
            };

            let timestamp = self.timestamp;
            self.timestamp += 1;
            let landmarker = &mut self.landmarker;
            let result = self
                .t_detect
                .time(|| landmarker.detect_for_video(&image, timestamp))?;
            log::trace!("{} frame {}: {} hands", video, frame, result.len());
            if result.is_empty() {
                empty_frames += 1;
            }

            if self.options.per_frame {
                if let Some(row) = FrameRow::new::<WorldSpace>(&result, frame, video, label) {
                    table.write_row(row.to_record())?;
                    rows += 1;
                }
            } else {
                acc.push(&result);
            }
            frame += 1;
        }

        log::debug!("{}: {} frames, {} without hands", video, frame, empty_frames);

        if !self.options.per_frame {
            table.write_row(acc.finish(label).to_record())?;
            rows += 1;
        }
        Ok(rows)
    }

    /// Consumes the pipeline and returns its landmarker.
    pub fn into_landmarker(self) -> L {
        self.landmarker
    }
}
