//! Still image extraction.
//!
//! Every image in the input directory is labeled by the first letter of its file name (`b3.jpg`
//! shows the sign for "b"), and every hand found in it becomes one row of image space coordinates.

use std::{
    collections::hash_map::DefaultHasher,
    fs,
    hash::{Hash, Hasher},
    io,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context};
use itertools::Itertools;

use crate::{
    extract::{file_name, list_dir, Summary},
    landmarker::Landmarker,
    table::{image_header, TableWriter},
    timer::Timer,
};

/// Turns a user-supplied dataset name into a directory and file name.
pub fn dataset_name(raw: &str) -> String {
    raw.trim().to_lowercase().replace(' ', "_")
}

/// Returns the path of the table of dataset `name` inside `dataset_dir`.
pub fn dataset_table_path(dataset_dir: &Path, name: &str) -> PathBuf {
    dataset_dir.join(format!("{name}.csv"))
}

/// Creates the output directory of a dataset, or reuses an existing one.
///
/// Fails if `dataset_dir` is or contains the input directory, or if it already exists and
/// `overwrite` is not set. Nothing inside an existing directory is removed; only the dataset table
/// is replaced once it is created.
pub fn prepare_dataset_dir(
    input_dir: &Path,
    dataset_dir: &Path,
    overwrite: bool,
) -> anyhow::Result<()> {
    if !dataset_dir.exists() {
        fs::create_dir_all(dataset_dir)
            .with_context(|| format!("failed to create '{}'", dataset_dir.display()))?;
        return Ok(());
    }

    let input = fs::canonicalize(input_dir)
        .with_context(|| format!("failed to resolve '{}'", input_dir.display()))?;
    let dataset = fs::canonicalize(dataset_dir)
        .with_context(|| format!("failed to resolve '{}'", dataset_dir.display()))?;
    if input.starts_with(&dataset) {
        bail!(
            "output directory '{}' is or contains the input directory",
            dataset_dir.display()
        );
    }
    if !overwrite {
        bail!(
            "output directory '{}' already exists (pass `--overwrite` to replace its table)",
            dataset_dir.display()
        );
    }

    log::info!("reusing existing dataset directory '{}'", dataset_dir.display());
    Ok(())
}

/// Derives the sign label from an image's file name.
///
/// The label is the first character, lowercased. Returns [`None`] if that character is not
/// alphabetic.
pub fn sign_from_file_name(name: &str) -> Option<String> {
    let first = name.chars().next()?;
    first
        .is_alphabetic()
        .then(|| first.to_lowercase().collect())
}

/// Stable 64-bit hash of a file name, shared by all hands found in that file.
pub fn name_hash(name: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    name.hash(&mut hasher);
    hasher.finish()
}

/// Runs a [`Landmarker`] over every image in a directory.
pub struct ImagePipeline<L: Landmarker> {
    landmarker: L,
    t_decode: Timer,
    t_detect: Timer,
}

impl<L: Landmarker> ImagePipeline<L> {
    pub fn new(landmarker: L) -> Self {
        Self {
            landmarker,
            t_decode: Timer::new("decode"),
            t_detect: Timer::new("detect"),
        }
    }

    pub fn header(&self) -> Vec<String> {
        image_header()
    }

    /// Processes every image in `input_dir`, writing one row per detected hand to `table`.
    ///
    /// Files without a valid sign letter, files that fail to decode, and images without hands are
    /// skipped.
    pub fn run<W: io::Write>(
        &mut self,
        input_dir: &Path,
        table: &mut TableWriter<W>,
    ) -> anyhow::Result<Summary> {
        let files = list_dir(input_dir)?
            .into_iter()
            .filter(|path| path.is_file())
            .collect::<Vec<_>>();

        let mut summary = Summary::default();
        for (i, path) in files.iter().enumerate() {
            let name = file_name(path);
            log::info!("Processing file {} of {} ({})...", i + 1, files.len(), name);

            let Some(sign) = sign_from_file_name(&name) else {
                log::warn!("'{}' does not start with a letter, skipping", name);
                summary.skipped += 1;
                continue;
            };

            let image = match self.t_decode.time(|| ::image::open(path)) {
                Ok(image) => image.to_rgba8(),
                Err(e) => {
                    log::warn!("skipping '{}': {}", name, e);
                    summary.skipped += 1;
                    continue;
                }
            };

            let landmarker = &mut self.landmarker;
            let result = self
                .t_detect
                .time(|| landmarker.detect(&image))?;
            if result.is_empty() {
                log::debug!("no hands in '{}'", name);
                summary.skipped += 1;
                continue;
            }

            let hash = name_hash(&name).to_string();
            for hand in result.hands() {
                let record = hand
                    .landmarks()
                    .coords()
                    .map(|c| c.to_string())
                    .chain([sign.clone(), hash.clone()]);
                table.write_row(record)?;
            }
            summary.written += 1;
        }

        log::debug!(
            "{}, {}, {}",
            self.t_decode,
            self.t_detect,
            self.landmarker.timers().iter().join(", "),
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signs() {
        assert_eq!(sign_from_file_name("A1.jpg").as_deref(), Some("a"));
        assert_eq!(sign_from_file_name("hello.png").as_deref(), Some("h"));
        assert_eq!(sign_from_file_name("\u{c4}rger.png").as_deref(), Some("\u{e4}"));
        assert_eq!(sign_from_file_name("1a.jpg"), None);
        assert_eq!(sign_from_file_name("_a.jpg"), None);
        assert_eq!(sign_from_file_name(""), None);
    }

    #[test]
    fn dataset_names() {
        assert_eq!(dataset_name("My Dataset"), "my_dataset");
        assert_eq!(dataset_name(" asl "), "asl");
        assert_eq!(
            dataset_table_path(Path::new("asl"), "asl"),
            Path::new("asl/asl.csv")
        );
    }

    #[test]
    fn hash_is_stable() {
        assert_eq!(name_hash("a1.jpg"), name_hash("a1.jpg"));
        assert_ne!(name_hash("a1.jpg"), name_hash("a2.jpg"));
    }

    #[test]
    fn input_directory_is_not_an_output() {
        let dir = std::env::temp_dir().join(format!("signmark-prepare-{}", fastrand::u64(..)));
        fs::create_dir_all(&dir).unwrap();

        let err = prepare_dataset_dir(&dir, &dir, true).unwrap_err();
        assert!(err.to_string().contains("contains the input directory"), "{err}");

        let out = dir.join("out");
        prepare_dataset_dir(&dir, &out, false).unwrap();
        fs::write(out.join("notes.txt"), "x").unwrap();
        let err = prepare_dataset_dir(&dir, &out, false).unwrap_err();
        assert!(err.to_string().contains("already exists"), "{err}");

        prepare_dataset_dir(&dir, &out, true).unwrap();
        assert!(out.is_dir());
        assert!(out.join("notes.txt").exists());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn nested_input_directory_survives_overwrite() {
        let root = std::env::temp_dir().join(format!("signmark-nested-{}", fastrand::u64(..)));
        let dataset = root.join("asl");
        let input = dataset.join("raw");
        fs::create_dir_all(&input).unwrap();
        fs::write(input.join("a1.png"), "image").unwrap();
        fs::write(dataset.join("notes.txt"), "keep me").unwrap();

        let err = prepare_dataset_dir(&input, &dataset, true).unwrap_err();
        assert!(err.to_string().contains("contains the input directory"), "{err}");
        assert!(input.join("a1.png").exists());
        assert!(dataset.join("notes.txt").exists());

        fs::remove_dir_all(&root).unwrap();
    }
}
