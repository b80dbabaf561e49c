//! V4L2 webcam access.
//!
//! Currently, only V4L2 `VIDEO_CAPTURE` devices yielding JFIF JPEG or Motion JPEG frames are
//! supported.

use anyhow::bail;
use image::{ImageFormat, RgbaImage};
use linuxvideo::{
    format::{FrameSizes, PixFormat, PixelFormat},
    stream::ReadStream,
    BufType, CapabilityFlags, Device,
};

use crate::timer::Timer;

use super::FrameSource;

/// Smallest frame width worth capturing; the landmark network works on much smaller inputs.
const MIN_WIDTH: u32 = 640;

/// A webcam yielding a stream of [`RgbaImage`]s.
pub struct Webcam {
    stream: ReadStream,
    width: u32,
    height: u32,
    t_dequeue: Timer,
    t_decode: Timer,
}

impl Webcam {
    /// Opens the first supported webcam found, or the one called `name`.
    ///
    /// This function can block for a significant amount of time while the webcam initializes (on
    /// the order of hundreds of milliseconds).
    pub fn open(name: Option<&str>) -> anyhow::Result<Self> {
        if let Some(name) = name {
            log::debug!("looking for webcam '{}'", name);
        }
        for res in linuxvideo::list()? {
            match res {
                Ok(dev) => match Self::open_impl(dev, name) {
                    Ok(Some(webcam)) => return Ok(webcam),
                    Ok(None) => {}
                    Err(e) => {
                        log::debug!("{}", e);
                    }
                },
                Err(e) => {
                    log::warn!("{}", e);
                }
            }
        }

        match name {
            Some(name) => bail!("no supported webcam named '{name}' found"),
            None => bail!("no supported webcam device found"),
        }
    }

    fn open_impl(dev: Device, name: Option<&str>) -> anyhow::Result<Option<Self>> {
        let caps = dev.capabilities()?;
        if let Some(name) = name {
            if caps.card() != name {
                return Ok(None);
            }
        }

        let cap_flags = caps.device_capabilities();
        let path = dev.path()?;
        log::debug!(
            "device {} ({}) capabilities: {:?}",
            caps.card(),
            path.display(),
            cap_flags,
        );

        if !cap_flags.contains(CapabilityFlags::VIDEO_CAPTURE) {
            return Ok(None);
        }

        let pixfmt = negotiate_format(&dev)?;
        let capture = dev.video_capture(pixfmt)?;

        let format = capture.format();
        let width = format.width();
        let height = format.height();
        match format.pixel_format() {
            PixelFormat::JPEG | PixelFormat::MJPG => {}
            e => bail!("unsupported pixel format {}", e),
        }

        log::info!(
            "opened {} ({}), {}x{}",
            caps.card(),
            path.display(),
            width,
            height,
        );

        let stream = capture.into_stream()?;

        Ok(Some(Self {
            stream,
            width,
            height,
            t_dequeue: Timer::new("dequeue"),
            t_decode: Timer::new("decode"),
        }))
    }

    /// Reads the next frame from the camera.
    ///
    /// If no frame is available, this method will block until one is.
    pub fn read(&mut self) -> anyhow::Result<RgbaImage> {
        let dequeue_guard = self.t_dequeue.start();
        self.stream
            .dequeue(|buf| {
                drop(dequeue_guard);
                let decoded = self
                    .t_decode
                    .time(|| image::load_from_memory_with_format(&buf, ImageFormat::Jpeg));
                let image = match decoded {
                    Ok(image) => image.to_rgba8(),
                    Err(e) => {
                        // Webcams produce the occasional corrupted MJPG frame. Skipping it would
                        // cause a latency spike, so a blank frame is handed out instead.
                        log::error!("webcam decode error: {}", e);
                        RgbaImage::new(self.width, self.height)
                    }
                };
                Ok(image)
            })
            .map_err(Into::into)
    }

}

impl FrameSource for Webcam {
    fn next_frame(&mut self) -> anyhow::Result<Option<RgbaImage>> {
        self.read().map(Some)
    }

    /// Returns profiling timers for webcam access and decoding.
    fn timers(&self) -> Vec<&Timer> {
        vec![&self.t_dequeue, &self.t_decode]
    }
}

/// Picks a JPEG format with the smallest discrete frame size at least [`MIN_WIDTH`] wide, or the
/// largest one if none is.
fn negotiate_format(device: &Device) -> anyhow::Result<PixFormat> {
    let mut pixel_format = None;
    for format in device.formats(BufType::VIDEO_CAPTURE) {
        let format = format?;
        if format.pixel_format() == PixelFormat::JPEG || format.pixel_format() == PixelFormat::MJPG {
            pixel_format = Some(format.pixel_format());
            break;
        }
    }

    let Some(pixel_format) = pixel_format else {
        bail!("no supported pixel format found");
    };

    let sizes = match device.frame_sizes(pixel_format)? {
        FrameSizes::Discrete(sizes) => sizes
            .into_iter()
            .map(|size| (size.width(), size.height()))
            .collect::<Vec<_>>(),
        FrameSizes::Stepwise(_) | FrameSizes::Continuous(_) => {
            bail!("stepwise or continuous resolutions are not supported");
        }
    };

    let Some((width, height)) = pick_size(&sizes) else {
        bail!("webcam reports no frame sizes");
    };
    Ok(PixFormat::new(width, height, pixel_format))
}

fn pick_size(sizes: &[(u32, u32)]) -> Option<(u32, u32)> {
    let key = |&&(w, h): &&(u32, u32)| u64::from(w) * u64::from(h);
    sizes
        .iter()
        .filter(|(w, _)| *w >= MIN_WIDTH)
        .min_by_key(key)
        .or_else(|| sizes.iter().max_by_key(key))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_smallest_sufficient_size() {
        let sizes = [(1920, 1080), (640, 480), (320, 240), (1280, 720)];
        assert_eq!(pick_size(&sizes), Some((640, 480)));
    }

    #[test]
    fn falls_back_to_largest_size() {
        let sizes = [(160, 120), (320, 240)];
        assert_eq!(pick_size(&sizes), Some((320, 240)));
        assert_eq!(pick_size(&[]), None);
    }
}
