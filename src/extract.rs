//! Extraction pipelines, from input directories to dataset tables.

pub mod image;
pub mod live;
pub mod video;

use std::{
    fmt,
    path::{Path, PathBuf},
};

use anyhow::{ensure, Context};

pub use self::image::ImagePipeline;
pub use self::video::{VideoOptions, VideoPipeline};

/// What a pipeline run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    /// Number of items (videos or images) that produced output.
    pub written: usize,
    /// Number of items that were skipped.
    pub skipped: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} written, {} skipped", self.written, self.skipped)
    }
}

/// Lists the entries of `dir`, sorted by path.
pub(crate) fn list_dir(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    ensure!(
        dir.is_dir(),
        "input directory '{}' does not exist",
        dir.display()
    );

    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory '{}'", dir.display()))?
    {
        entries.push(entry?.path());
    }
    entries.sort();
    Ok(entries)
}

/// Returns the last component of `path` as a string.
pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
