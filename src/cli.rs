//! Command-line interface of the `signmark` binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use signmark::landmarker::{
    LandmarkerOptions, RunningMode, DEFAULT_MODEL, DEFAULT_PALM_MODEL,
};

/// Extracts hand landmark features from labeled sign language videos and images
#[derive(Parser, Debug)]
#[command(name = "signmark")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Aggregate the hands in every labeled video into one row of statistics per video
    Videos(VideosArgs),

    /// Write one row of image coordinates per hand found in a directory of still images
    Images(ImagesArgs),

    /// Run the hand landmarker on a webcam or video and log what it sees
    Live(LiveArgs),
}

#[derive(Args, Debug)]
pub struct ModelArgs {
    /// Path to the ONNX hand landmark network
    #[arg(long, env = "SIGNMARK_MODEL", default_value = DEFAULT_MODEL)]
    pub model: PathBuf,

    /// Path to the ONNX palm detection network
    #[arg(long, env = "SIGNMARK_PALM_MODEL", default_value = DEFAULT_PALM_MODEL)]
    pub palm_model: PathBuf,

    /// Maximum number of hands detected per frame
    #[arg(long, env = "SIGNMARK_NUM_HANDS", default_value_t = 2)]
    pub num_hands: usize,

    /// Minimum palm detection confidence
    #[arg(long, env = "SIGNMARK_MIN_DETECTION", default_value_t = 0.5)]
    pub min_detection: f32,

    /// Minimum hand presence score for a hand to be reported
    #[arg(long, env = "SIGNMARK_MIN_PRESENCE", default_value_t = 0.5)]
    pub min_presence: f32,
}

impl ModelArgs {
    pub fn options(&self, running_mode: RunningMode) -> LandmarkerOptions {
        LandmarkerOptions {
            palm_model: self.palm_model.clone(),
            num_hands: self.num_hands,
            min_detection: self.min_detection,
            min_presence: self.min_presence,
            ..LandmarkerOptions::new(&self.model, running_mode)
        }
    }
}

#[derive(Args, Debug)]
pub struct VideosArgs {
    /// Directory containing the videos
    #[arg(short, long, env = "SIGNMARK_INPUT", default_value = "input")]
    pub input: PathBuf,

    /// Label table with `videos` and `word` columns [default: <INPUT>/labels.csv]
    #[arg(short, long, env = "SIGNMARK_LABELS")]
    pub labels: Option<PathBuf>,

    /// Output table
    #[arg(short, long, env = "SIGNMARK_OUTPUT", default_value = "output/table.csv")]
    pub output: PathBuf,

    #[command(flatten)]
    pub model: ModelArgs,

    /// Write one row per frame instead of one row per video
    #[arg(long)]
    pub per_frame: bool,

    /// Comma-separated file extensions of video files
    #[arg(long, value_delimiter = ',', default_value = "gif,apng")]
    pub extensions: Vec<String>,
}

impl VideosArgs {
    pub fn labels_path(&self) -> PathBuf {
        self.labels
            .clone()
            .unwrap_or_else(|| self.input.join("labels.csv"))
    }
}

#[derive(Args, Debug)]
pub struct ImagesArgs {
    /// Directory containing the images
    #[arg(short, long, env = "SIGNMARK_INPUT", default_value = "input")]
    pub input: PathBuf,

    /// Name of the dataset; output goes to `<DATASET>/<DATASET>.csv`
    #[arg(short, long, env = "SIGNMARK_DATASET")]
    pub dataset: String,

    #[command(flatten)]
    pub model: ModelArgs,

    /// Reuse an existing dataset directory, replacing its table
    #[arg(long)]
    pub overwrite: bool,
}

#[derive(Args, Debug)]
pub struct LiveArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Video file or frame directory to use instead of a webcam
    #[arg(short, long)]
    pub source: Option<PathBuf>,

    /// Name of the webcam device to open
    #[arg(long, env = "SIGNMARK_WEBCAM_NAME")]
    pub webcam: Option<String>,
}
