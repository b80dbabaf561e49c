//! Frame sources: decoded videos, frame directories and webcams.
//!
//! Container formats like MP4 are not decoded here. Such videos are expected to be exported as a
//! directory of still frames first (eg. with `ffmpeg -i hello.mp4 hello.mp4/%05d.png`); the
//! directory's name is then used as the video name.

pub mod webcam;

use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context};
use image::{
    codecs::{gif::GifDecoder, png::PngDecoder},
    AnimationDecoder, Frames, RgbaImage,
};

use crate::timer::Timer;

/// File extensions of still frames inside a frame directory.
pub const FRAME_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Default file extensions of animated videos.
pub const DEFAULT_VIDEO_EXTENSIONS: &[&str] = &["gif", "apng"];

/// A sequence of video frames.
pub trait FrameSource {
    /// Decodes the next frame.
    ///
    /// Returns `Ok(None)` once the source is exhausted. An error means that the frame could not be
    /// decoded; callers typically stop reading from the source at that point.
    fn next_frame(&mut self) -> anyhow::Result<Option<RgbaImage>>;

    /// Returns the profiling timers of this source, for periodic logging.
    fn timers(&self) -> Vec<&Timer> {
        Vec::new()
    }
}

impl<F: FrameSource + ?Sized> FrameSource for Box<F> {
    fn next_frame(&mut self) -> anyhow::Result<Option<RgbaImage>> {
        (**self).next_frame()
    }

    fn timers(&self) -> Vec<&Timer> {
        (**self).timers()
    }
}

/// Opens the video at `path`.
///
/// Directories are read as [`FrameDir`]s, files as [`Animation`]s.
pub fn open(path: &Path) -> anyhow::Result<Box<dyn FrameSource>> {
    if path.is_dir() {
        Ok(Box::new(FrameDir::open(path)?))
    } else {
        Ok(Box::new(Animation::open(path)?))
    }
}

/// Returns whether `path` looks like a video: a frame directory, or a file with one of the given
/// extensions (compared case-insensitively).
pub fn is_video<S: AsRef<str>>(path: &Path, extensions: &[S]) -> bool {
    if path.is_dir() {
        return true;
    }
    has_extension(path, extensions)
}

fn has_extension<S: AsRef<str>>(path: &Path, extensions: &[S]) -> bool {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };
    extensions
        .iter()
        .any(|e| e.as_ref().eq_ignore_ascii_case(ext))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationFormat {
    Gif,
    Apng,
}

impl AnimationFormat {
    fn from_path(path: &Path) -> anyhow::Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("gif") => Ok(AnimationFormat::Gif),
            Some(ext) if ext.eq_ignore_ascii_case("apng") || ext.eq_ignore_ascii_case("png") => {
                Ok(AnimationFormat::Apng)
            }
            Some(ext) => bail!("file extension `{ext}` is not supported for animations"),
            None => bail!("animation path must have a supported extension"),
        }
    }
}

/// An animated GIF or APNG, decoded one frame at a time.
pub struct Animation {
    frames: Frames<'static>,
}

impl Animation {
    /// Opens an animation file.
    ///
    /// The path must have a `gif`, `apng` or `png` extension.
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        Self::open_impl(path.as_ref())
    }

    fn open_impl(path: &Path) -> anyhow::Result<Self> {
        let format = AnimationFormat::from_path(path)?;
        let file =
            File::open(path).with_context(|| format!("failed to open '{}'", path.display()))?;
        Self::from_reader(BufReader::new(file), format)
            .with_context(|| format!("failed to decode '{}'", path.display()))
    }

    /// Decodes an animation from an in-memory byte slice.
    pub fn from_data(data: &[u8], format: AnimationFormat) -> anyhow::Result<Self> {
        Self::from_reader(std::io::Cursor::new(data.to_vec()), format)
    }

    fn from_reader<R: std::io::BufRead + std::io::Seek + 'static>(
        reader: R,
        format: AnimationFormat,
    ) -> anyhow::Result<Self> {
        let frames = match format {
            AnimationFormat::Gif => GifDecoder::new(reader)?.into_frames(),
            AnimationFormat::Apng => {
                let dec = PngDecoder::new(reader)?;
                if !dec.is_apng() {
                    bail!("attempted to load APNG animation from still image PNG");
                }
                dec.apng().into_frames()
            }
        };
        Ok(Self { frames })
    }
}

impl FrameSource for Animation {
    fn next_frame(&mut self) -> anyhow::Result<Option<RgbaImage>> {
        match self.frames.next() {
            Some(frame) => Ok(Some(frame?.into_buffer())),
            None => Ok(None),
        }
    }
}

/// A video stored as a directory of still frames, read in file name order.
pub struct FrameDir {
    frames: std::vec::IntoIter<PathBuf>,
}

impl FrameDir {
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        Self::open_impl(path.as_ref())
    }

    fn open_impl(path: &Path) -> anyhow::Result<Self> {
        let mut frames = Vec::new();
        let entries = std::fs::read_dir(path)
            .with_context(|| format!("failed to read frame directory '{}'", path.display()))?;
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && has_extension(&path, FRAME_EXTENSIONS) {
                frames.push(path);
            }
        }
        frames.sort();
        log::trace!("{} frames in '{}'", frames.len(), path.display());

        Ok(Self {
            frames: frames.into_iter(),
        })
    }

    /// Returns the number of frames not yet read.
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for FrameDir {
    fn next_frame(&mut self) -> anyhow::Result<Option<RgbaImage>> {
        let Some(path) = self.frames.next() else {
            return Ok(None);
        };
        let image = image::open(&path)
            .with_context(|| format!("failed to decode frame '{}'", path.display()))?;
        Ok(Some(image.to_rgba8()))
    }
}
