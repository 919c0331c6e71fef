//! Result rows and CSV export

use crate::config::Resolution;
use crate::error::BenchResult;
use std::fmt::Display;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Column names of a bare results table.
pub const COLUMNS: [&str; 5] = ["Resolution", "Total FPS", "CPU (Avg)", "CPU (Max)", "Frames"];

/// Summary of one (stream count, resolution) pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub resolution: Resolution,
    pub total_fps: f64,
    pub avg_cpu: f64,
    pub max_cpu: f64,
    /// Frames processed per stream, truncated
    pub avg_frames: u64,
}

impl ResultRow {
    /// Cells as displayed: one decimal for rates and percentages.
    #[must_use]
    pub fn cells(&self) -> Vec<String> {
        vec![
            self.resolution.to_string(),
            format!("{:.1}", self.total_fps),
            format!("{:.1}", self.avg_cpu),
            format!("{:.1}", self.max_cpu),
            self.avg_frames.to_string(),
        ]
    }
}

/// Insertion-ordered table of results.
#[derive(Debug, Clone)]
pub struct ResultsTable {
    title: Option<String>,
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Default for ResultsTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultsTable {
    #[must_use]
    pub fn new() -> Self {
        Self {
            title: None,
            columns: COLUMNS.iter().map(ToString::to_string).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: &ResultRow) {
        self.push_cells(row.cells());
    }

    /// Append a row of preformatted cells, padding or truncating to the
    /// current column count.
    pub fn push_cells(&mut self, mut cells: Vec<String>) {
        cells.resize(self.columns.len(), String::new());
        self.rows.push(cells);
    }

    /// Drop every row, keeping columns and title.
    pub fn clear_rows(&mut self) {
        self.rows.clear();
    }

    /// Add a column holding the same value on every row.
    pub fn add_column(&mut self, name: &str, value: impl Display) {
        let value = value.to_string();
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(value.clone());
        }
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Comma-separated lines, header first when requested. The title is
    /// never exported.
    #[must_use]
    pub fn csv_lines(&self, headers: bool) -> Vec<String> {
        let header = headers.then(|| csv_line(&self.columns));
        header
            .into_iter()
            .chain(self.rows.iter().map(|row| csv_line(row)))
            .collect()
    }

    /// Write the table as CSV, appending to or truncating `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be opened or written.
    pub fn write_csv(&self, path: &Path, append: bool, headers: bool) -> BenchResult<()> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(path)?;
        let mut out = BufWriter::new(file);
        for line in self.csv_lines(headers) {
            writeln!(out, "{line}")?;
        }
        out.flush()?;
        Ok(())
    }

    /// Append rows to an existing results file, or create it with a header.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be opened or written.
    pub fn save_csv(&self, path: &Path) -> BenchResult<()> {
        let exists = path.exists();
        tracing::debug!(path = %path.display(), append = exists, "exporting results");
        self.write_csv(path, exists, !exists)
    }
}

fn clean_cell(cell: &str) -> String {
    cell.chars()
        .filter(|c| !matches!(c, ',' | '|' | '\n' | '\r'))
        .collect::<String>()
        .trim()
        .to_string()
}

fn csv_line(cells: &[String]) -> String {
    cells
        .iter()
        .map(|cell| clean_cell(cell))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs;

    fn vga_row() -> ResultRow {
        ResultRow {
            resolution: Resolution::Vga,
            total_fps: 30.0,
            avg_cpu: 50.0,
            max_cpu: 80.0,
            avg_frames: 100,
        }
    }

    #[test]
    fn rows_format_one_decimal() {
        let row = ResultRow {
            resolution: Resolution::Hd1080,
            total_fps: 12.345,
            avg_cpu: 97.06,
            max_cpu: 100.0,
            avg_frames: 42,
        };
        assert_eq!(row.cells(), vec!["1080p", "12.3", "97.1", "100.0", "42"]);
    }

    #[test]
    fn new_file_gets_header_then_append_adds_only_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        let mut table = ResultsTable::new();
        table.push(&vga_row());

        table.save_csv(&path).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "Resolution,Total FPS,CPU (Avg),CPU (Max),Frames\nvga,30.0,50.0,80.0,100\n"
        );

        table.write_csv(&path, true, false).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "Resolution,Total FPS,CPU (Avg),CPU (Max),Frames\n\
             vga,30.0,50.0,80.0,100\n\
             vga,30.0,50.0,80.0,100\n"
        );
    }

    #[test]
    fn save_appends_when_file_exists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        let mut table = ResultsTable::new();
        table.push(&vga_row());

        table.save_csv(&path).unwrap();
        table.save_csv(&path).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 3);
        assert_eq!(contents.matches("Resolution").count(), 1);
    }

    #[test]
    fn static_columns_apply_to_every_row() {
        let mut table = ResultsTable::new();
        table.push(&vga_row());
        table.push(&ResultRow {
            resolution: Resolution::Hd720,
            ..vga_row()
        });
        table.add_column("CPU Model", " Intel Xeon, Platinum 8124M ");
        table.add_column("Streams", 4);

        let lines = table.csv_lines(true);
        assert_eq!(
            lines[0],
            "Resolution,Total FPS,CPU (Avg),CPU (Max),Frames,CPU Model,Streams"
        );
        assert_eq!(lines[1], "vga,30.0,50.0,80.0,100,Intel Xeon Platinum 8124M,4");
        assert!(lines[2].starts_with("720p,"));
    }

    #[test]
    fn title_is_not_exported() {
        let mut table = ResultsTable::new();
        table.set_title("OpenALPR Speed: 1 stream(s) on 8 threads");
        table.push(&vga_row());
        assert_eq!(table.csv_lines(false), vec!["vga,30.0,50.0,80.0,100"]);
    }

    #[test]
    fn clear_rows_keeps_columns() {
        let mut table = ResultsTable::new();
        table.push(&vga_row());
        table.clear_rows();
        assert!(table.is_empty());
        assert_eq!(table.columns().len(), COLUMNS.len());
    }
}
