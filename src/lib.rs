//! Hand landmark feature extraction for sign language datasets.
//!
//! Signmark runs a hand landmark detector over labeled videos and images, assigns the detected
//! hands to a stable left and right slot, and writes tabular datasets for classifier training.
//!
//! # Coordinate Spaces
//!
//! Landmarks come in two flavors, which are kept apart at the type level (see [`landmark`]):
//!
//! * [`ImageSpace`]: X and Y are fractions of the image width and height, with Y pointing *down*.
//!   Z is the depth relative to the wrist, roughly in the same scale as X. The still image
//!   pipeline writes these.
//! * [`WorldSpace`]: metric coordinates in meters, relative to the hand's approximate geometric
//!   center. The video pipeline aggregates these.
//!
//! # Environment Variables
//!
//! Every command line option of the `signmark` binary can also be set through an environment
//! variable. The most useful ones are:
//!
//! * `SIGNMARK_MODEL`: path to the ONNX hand landmark network.
//! * `SIGNMARK_PALM_MODEL`: path to the ONNX palm detection network.
//! * `SIGNMARK_WEBCAM_NAME`: forces the webcam device used by the live mode. If unset, the first
//!   device that supports a compatible image format will be used.
//! * `RUST_LOG`: overrides the log filter configured by [`init_logger!`].
//!
//! [`ImageSpace`]: landmark::ImageSpace
//! [`WorldSpace`]: landmark::WorldSpace

use log::LevelFilter;

pub mod aggregate;
pub mod detection;
pub mod extract;
pub mod hand;
pub mod labels;
pub mod landmark;
pub mod landmarker;
pub mod name;
pub mod nn;
pub mod num;
pub mod slot;
pub mod table;
pub mod timer;
pub mod video;

#[cfg(test)]
mod test;

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = LevelFilter::Debug;
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_PKG_NAME")), log_level)
        .filter(Some("tract_core"), LevelFilter::Warn)
        .filter(Some("tract_onnx"), LevelFilter::Warn)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// The calling crate and Signmark will log at *debug* level, everything else at *info* level.
/// `tract` is limited to *warn* level since it is very chatty while loading networks.
///
/// If a global logger is already registered, this macro will do nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}
