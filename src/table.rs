//! Column headers and CSV output of the extracted datasets.

use std::{fs, io, path::Path};

use anyhow::Context;
use itertools::iproduct;

use crate::{
    aggregate::Stat,
    landmark::{Axis, NUM_LANDMARKS},
    slot::Slot,
};

/// Header of the per-video table.
///
/// `"{slot}_{axis}_{landmark}_{stat}"` for every slot, landmark, axis and statistic (in that
/// nesting order), followed by `"sign"`. This is the order [`VideoAccumulator::finish`] emits
/// features in.
///
/// [`VideoAccumulator::finish`]: crate::aggregate::VideoAccumulator::finish
pub fn mean_std_header() -> Vec<String> {
    iproduct!(Slot::ALL, 0..NUM_LANDMARKS, Axis::ALL, Stat::ALL)
        .map(|(slot, i, axis, stat)| {
            format!("{}_{}_{i}_{}", slot.prefix(), axis.name(), stat.name())
        })
        .chain(["sign".to_string()])
        .collect()
}

/// Header of the per-frame table: `"{slot}_{axis}_{landmark}"`, then `frame`, `video`, `sign`.
pub fn frame_header() -> Vec<String> {
    iproduct!(Slot::ALL, 0..NUM_LANDMARKS, Axis::ALL)
        .map(|(slot, i, axis)| format!("{}_{}_{i}", slot.prefix(), axis.name()))
        .chain(["frame", "video", "sign"].map(String::from))
        .collect()
}

/// Header of the still image table: `"{landmark}_{axis}"`, then `sign` and `hash`.
pub fn image_header() -> Vec<String> {
    iproduct!(0..NUM_LANDMARKS, Axis::ALL)
        .map(|(i, axis)| format!("{i}_{}", axis.name()))
        .chain(["sign", "hash"].map(String::from))
        .collect()
}

/// Writes rows of a fixed width to a CSV table.
///
/// Every row has to have as many fields as the header.
pub struct TableWriter<W: io::Write> {
    writer: csv::Writer<W>,
    columns: usize,
    rows: usize,
}

impl TableWriter<fs::File> {
    /// Creates the table file at `path` (and its parent directories), and writes `header`.
    pub fn create<P: AsRef<Path>>(path: P, header: &[String]) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create output directory '{}'", parent.display())
            })?;
        }
        let file = fs::File::create(path)
            .with_context(|| format!("failed to create table '{}'", path.display()))?;
        Self::from_writer(file, header)
    }
}

impl<W: io::Write> TableWriter<W> {
    /// Wraps `writer` and writes `header` to it.
    pub fn from_writer(writer: W, header: &[String]) -> anyhow::Result<Self> {
        let mut writer = csv::WriterBuilder::new().from_writer(writer);
        writer.write_record(header)?;
        Ok(Self {
            writer,
            columns: header.len(),
            rows: 0,
        })
    }

    /// Appends one row.
    pub fn write_row<I, T>(&mut self, record: I) -> anyhow::Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let record = record.into_iter().collect::<csv::ByteRecord>();
        anyhow::ensure!(
            record.len() == self.columns,
            "row has {} fields, but the table has {} columns",
            record.len(),
            self.columns,
        );
        self.writer.write_byte_record(&record)?;
        self.rows += 1;
        Ok(())
    }

    /// Returns the number of rows written so far, not counting the header.
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn flush(&mut self) -> anyhow::Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flushes the table and returns the underlying writer.
    pub fn into_inner(self) -> anyhow::Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("failed to flush table: {}", e.error()))
    }
}
