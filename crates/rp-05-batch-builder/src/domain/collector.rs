//! Row collection and file rendering.

use std::collections::BTreeMap;

use super::csv::{line, ExportFile};
use super::rows::ExportRow;

/// Rows grouped by file, keyed for deduplication. The first row added under
/// a key wins; callers add rows in a fixed order so the result is stable.
#[derive(Debug, Default)]
pub struct Collector {
    files: BTreeMap<ExportFile, BTreeMap<String, String>>,
}

/// A rendered file: header plus sorted rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    pub file: ExportFile,
    pub contents: String,
    pub rows: usize,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when a row with the same key was already present.
    pub fn add(&mut self, row: ExportRow) -> bool {
        let rows = self.files.entry(row.file).or_default();
        if rows.contains_key(&row.key) {
            return false;
        }
        rows.insert(row.key, row.line);
        true
    }

    pub fn extend(&mut self, rows: impl IntoIterator<Item = ExportRow>) {
        for row in rows {
            self.add(row);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.files.values().all(BTreeMap::is_empty)
    }

    pub fn row_count(&self) -> usize {
        self.files.values().map(BTreeMap::len).sum()
    }

    /// Files with at least one row, in [`ExportFile::ALL`] order.
    pub fn render(&self) -> Vec<RenderedFile> {
        ExportFile::ALL
            .iter()
            .filter_map(|file| {
                let rows = self.files.get(file).filter(|rows| !rows.is_empty())?;
                let mut lines: Vec<&str> = rows.values().map(String::as_str).collect();
                lines.sort_unstable();

                let mut contents = line(file.header());
                for l in lines {
                    contents.push_str(l);
                }
                Some(RenderedFile {
                    file: *file,
                    contents,
                    rows: rows.len(),
                })
            })
            .collect()
    }
}
