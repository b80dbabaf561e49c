//! Lookup of video labels from a side table.

use std::{
    collections::HashMap,
    fs::File,
    io,
    path::{Path, PathBuf},
};

use anyhow::Context;

use crate::name::normalize_name;

/// Column holding the video file names.
pub const VIDEOS_COLUMN: &str = "videos";

/// Column holding the label of each video.
pub const WORD_COLUMN: &str = "word";

/// Maps normalized video file names to their labels.
///
/// Built once per run from a CSV file with at least a `videos` and a `word` column.
#[derive(Debug, Clone, Default)]
pub struct LabelTable {
    labels: HashMap<String, String>,
    /// File the table was loaded from.
    path: Option<PathBuf>,
}

impl LabelTable {
    /// Loads the label table from a CSV file.
    ///
    /// Failing to open or parse the file is an error, since no video can be labeled without it.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        Self::load_impl(path.as_ref())
    }

    fn load_impl(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open label table '{}'", path.display()))?;
        let mut table = Self::from_reader(file)
            .with_context(|| format!("failed to read label table '{}'", path.display()))?;
        table.path = Some(path.to_path_buf());
        log::debug!(
            "loaded {} labels from '{}'",
            table.len(),
            path.display()
        );
        Ok(table)
    }

    /// Reads the label table from CSV data.
    ///
    /// Rows with an empty or missing `videos` or `word` field are skipped. When several rows
    /// normalize to the same video name, the first one wins.
    pub fn from_reader<R: io::Read>(reader: R) -> anyhow::Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(reader);

        let headers = reader.headers()?;
        let videos = headers.iter().position(|h| h == VIDEOS_COLUMN);
        let words = headers.iter().position(|h| h == WORD_COLUMN);
        if videos.is_none() || words.is_none() {
            log::warn!(
                "label table lacks a `{}` or `{}` column, no video will be labeled",
                VIDEOS_COLUMN,
                WORD_COLUMN,
            );
        }

        let mut labels = HashMap::new();
        for record in reader.records() {
            let record = record?;
            let field = |index: Option<usize>| index.and_then(|i| record.get(i));
            let (Some(video), Some(word)) = (field(videos), field(words)) else {
                continue;
            };
            if video.is_empty() || word.is_empty() {
                continue;
            }

            labels
                .entry(normalize_name(video))
                .or_insert_with(|| word.to_string());
        }

        Ok(Self { labels, path: None })
    }

    /// Looks up the label of a video by its raw file name.
    pub fn get(&self, file_name: &str) -> Option<&str> {
        self.labels
            .get(&normalize_name(file_name))
            .map(String::as_str)
    }

    /// Returns the file this table was loaded from, if it came from one.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(csv: &str) -> LabelTable {
        LabelTable::from_reader(csv.as_bytes()).unwrap()
    }

    #[test]
    fn lookup_normalizes_both_sides() {
        let labels = table("videos,word\nMy%20Video%20(1).MP4,Hello\ncaf\u{e9}.mp4,Coffee\n");
        assert_eq!(labels.len(), 2);
        assert_eq!(labels.get("my video (1).mp4"), Some("Hello"));
        assert_eq!(labels.get("input/My_Video_(1).mp4"), Some("Hello"));
        assert_eq!(labels.get("cafe\u{301}.mp4"), Some("Coffee"));
        assert_eq!(labels.get("unknown.mp4"), None);
    }

    #[test]
    fn first_duplicate_wins() {
        let labels = table("videos,word\na.mp4,first\nA.MP4,second\na%2Emp4,third\n");
        assert_eq!(labels.len(), 1);
        assert_eq!(labels.get("a.mp4"), Some("first"));
    }

    #[test]
    fn incomplete_rows_are_skipped() {
        let labels = table("id,videos,word,notes\n1,a.mp4,,x\n2,,b\n3,c.mp4,see,\n4,d.mp4\n");
        assert_eq!(labels.len(), 1);
        assert_eq!(labels.get("a.mp4"), None);
        assert_eq!(labels.get("c.mp4"), Some("see"));
        assert_eq!(labels.get("d.mp4"), None);
    }

    #[test]
    fn empty_word_does_not_block_later_rows() {
        let labels = table("videos,word\na.mp4,\na.mp4,later\n");
        assert_eq!(labels.get("a.mp4"), Some("later"));
    }

    #[test]
    fn quoted_fields() {
        let labels = table("word,videos\n\"thank, you\",\"Thank You.mp4\"\n");
        assert_eq!(labels.get("thank_you.mp4"), Some("thank, you"));
    }

    #[test]
    fn missing_columns_yield_empty_table() {
        assert!(table("file,label\na.mp4,hello\n").is_empty());
        assert!(table("videos,word\n").is_empty());
    }

    #[test]
    fn remembers_its_file() {
        assert_eq!(table("videos,word\n").path(), None);

        let path = std::env::temp_dir().join(format!("signmark-labels-{}.csv", fastrand::u64(..)));
        std::fs::write(&path, "videos,word\na.mp4,A\n").unwrap();
        let labels = LabelTable::load(&path).unwrap();
        assert_eq!(labels.path(), Some(&*path));
        assert_eq!(labels.get("a.mp4"), Some("A"));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = LabelTable::load("/nonexistent/labels.csv").unwrap_err();
        assert!(format!("{err:#}").contains("failed to open label table"));
    }
}
