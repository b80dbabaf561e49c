#![allow(dead_code)]

use std::{
    collections::VecDeque,
    fs,
    path::{Path, PathBuf},
};

use anyhow::bail;
use image::{codecs::gif::GifEncoder, Delay, Frame, Rgba, RgbaImage};
use signmark::{
    hand::{Category, DetectionResult, HandDetection},
    landmark::HandLandmarks,
    landmarker::Landmarker,
    table::TableWriter,
};

/// A landmarker that returns pre-recorded results in order.
pub struct ScriptedLandmarker {
    script: VecDeque<DetectionResult>,
    pub timestamps: Vec<u64>,
    pub still_calls: usize,
}

impl ScriptedLandmarker {
    pub fn new(script: Vec<DetectionResult>) -> Self {
        Self {
            script: script.into(),
            timestamps: Vec::new(),
            still_calls: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }

    fn next(&mut self) -> anyhow::Result<DetectionResult> {
        match self.script.pop_front() {
            Some(result) => Ok(result),
            None => bail!("script exhausted"),
        }
    }
}

impl Landmarker for ScriptedLandmarker {
    fn detect(&mut self, _: &RgbaImage) -> anyhow::Result<DetectionResult> {
        self.still_calls += 1;
        self.next()
    }

    fn detect_for_video(
        &mut self,
        _: &RgbaImage,
        timestamp: u64,
    ) -> anyhow::Result<DetectionResult> {
        self.timestamps.push(timestamp);
        self.next()
    }
}

/// A hand with every coordinate set to `value`, in both coordinate spaces.
pub fn hand(side: &str, value: f32) -> HandDetection {
    let positions = [[value; 3]; 21];
    HandDetection::new(
        HandLandmarks::from_positions(positions).unwrap(),
        HandLandmarks::from_positions(positions).unwrap(),
        vec![Category::new(side, 0.9)],
    )
}

pub fn frame(hands: Vec<HandDetection>) -> DetectionResult {
    DetectionResult::new(hands)
}

/// A scratch directory that is removed on drop.
pub struct TempDir {
    path: PathBuf,
}

impl TempDir {
    pub fn new(prefix: &str) -> Self {
        let path = std::env::temp_dir().join(format!("signmark-{prefix}-{}", fastrand::u64(..)));
        fs::create_dir_all(&path).unwrap();
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    /// Writes a still PNG image.
    pub fn png(&self, name: &str) -> PathBuf {
        let path = self.path.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        RgbaImage::from_pixel(8, 6, Rgba([200, 120, 80, 255]))
            .save(&path)
            .unwrap();
        path
    }

    /// Writes an animated GIF with `frames` frames.
    pub fn gif(&self, name: &str, frames: usize) -> PathBuf {
        let path = self.path.join(name);
        let file = fs::File::create(&path).unwrap();
        let mut encoder = GifEncoder::new(file);
        for i in 0..frames {
            let shade = (i * 40) as u8;
            encoder
                .encode_frame(Frame::from_parts(
                    RgbaImage::from_pixel(8, 6, Rgba([shade, shade, shade, 255])),
                    0,
                    0,
                    Delay::from_numer_denom_ms(40, 1),
                ))
                .unwrap();
        }
        path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        fs::remove_dir_all(&self.path).ok();
    }
}

/// A table writer collecting into memory.
pub fn memory_table(header: &[String]) -> TableWriter<Vec<u8>> {
    TableWriter::from_writer(Vec::new(), header).unwrap()
}

/// Parses the CSV produced by [`memory_table`] into its header and rows.
pub fn parse_table(table: TableWriter<Vec<u8>>) -> (Vec<String>, Vec<Vec<String>>) {
    let data = table.into_inner().unwrap();
    let mut reader = csv::Reader::from_reader(&*data);
    let header = reader.headers().unwrap().iter().map(String::from).collect();
    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect();
    (header, rows)
}

/// Looks up the value of column `name` in `row`.
pub fn column<'a>(header: &[String], row: &'a [String], name: &str) -> &'a str {
    let idx = header
        .iter()
        .position(|h| h == name)
        .unwrap_or_else(|| panic!("no column `{name}`"));
    &row[idx]
}
