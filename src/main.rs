mod cli;

use anyhow::ensure;
use clap::Parser;
use signmark::extract::{
    image::{dataset_name, dataset_table_path, prepare_dataset_dir},
    live::run_live,
    ImagePipeline, VideoOptions, VideoPipeline,
};
use signmark::labels::LabelTable;
use signmark::landmarker::{OnnxLandmarker, RunningMode};
use signmark::table::TableWriter;
use signmark::video::{self, webcam::Webcam, FrameSource};

use cli::{Cli, Command, ImagesArgs, LiveArgs, VideosArgs};

fn main() -> anyhow::Result<()> {
    signmark::init_logger!();

    let cli = Cli::parse();
    match cli.command {
        Command::Videos(args) => videos(args),
        Command::Images(args) => images(args),
        Command::Live(args) => live(args),
    }
}

fn videos(args: VideosArgs) -> anyhow::Result<()> {
    ensure!(
        args.input.is_dir(),
        "input directory '{}' does not exist",
        args.input.display()
    );
    let labels = LabelTable::load(args.labels_path())?;
    let landmarker = OnnxLandmarker::new(args.model.options(RunningMode::Video))?;

    let options = VideoOptions {
        per_frame: args.per_frame,
        extensions: args.extensions,
    };
    let mut pipeline = VideoPipeline::new(landmarker, labels, options);
    let mut table = TableWriter::create(&args.output, &pipeline.header())?;
    let summary = pipeline.run(&args.input, &mut table)?;
    table.flush()?;

    log::info!(
        "done: {} ({} rows in '{}')",
        summary,
        table.rows(),
        args.output.display()
    );
    Ok(())
}

fn images(args: ImagesArgs) -> anyhow::Result<()> {
    ensure!(
        args.input.is_dir(),
        "input directory '{}' does not exist",
        args.input.display()
    );
    let name = dataset_name(&args.dataset);
    ensure!(!name.is_empty(), "dataset name must not be empty");
    let dataset_dir = std::path::PathBuf::from(&name);
    prepare_dataset_dir(&args.input, &dataset_dir, args.overwrite)?;

    let landmarker = OnnxLandmarker::new(args.model.options(RunningMode::Image))?;
    let mut pipeline = ImagePipeline::new(landmarker);
    let output = dataset_table_path(&dataset_dir, &name);
    let mut table = TableWriter::create(&output, &pipeline.header())?;
    let summary = pipeline.run(&args.input, &mut table)?;
    table.flush()?;

    log::info!(
        "done: {} ({} rows in '{}')",
        summary,
        table.rows(),
        output.display()
    );
    Ok(())
}

fn live(args: LiveArgs) -> anyhow::Result<()> {
    let landmarker = OnnxLandmarker::new(args.model.options(RunningMode::LiveStream))?;
    let mut source: Box<dyn FrameSource> = match &args.source {
        Some(path) => video::open(path)?,
        None => Box::new(Webcam::open(args.webcam.as_deref())?),
    };

    run_live(landmarker, &mut source)?;
    Ok(())
}
