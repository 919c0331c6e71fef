//! Box-drawn table rendering for benchmark results

use alprbench_core::ResultsTable;
use std::io::Write;

pub struct TableBuilder {
    title: Option<String>,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    column_widths: Vec<usize>,
    use_color: bool,
}

fn width_of(cell: &str) -> usize {
    cell.chars().count()
}

impl TableBuilder {
    #[must_use]
    pub fn new(headers: Vec<String>) -> Self {
        let use_color = std::env::var("NO_COLOR").is_err();
        let column_widths = headers.iter().map(|h| width_of(h)).collect();

        Self {
            title: None,
            headers,
            rows: Vec::new(),
            column_widths,
            use_color,
        }
    }

    /// Builder over every column and row of a results table.
    #[must_use]
    pub fn from_results(results: &ResultsTable) -> Self {
        let mut table = Self::new(results.columns().to_vec());
        table.title = results.title().map(str::to_string);
        for row in results.rows() {
            table.add_row(row.clone());
        }
        table
    }

    #[must_use]
    pub const fn with_color(mut self, use_color: bool) -> Self {
        self.use_color = use_color;
        self
    }

    pub fn add_row(&mut self, row: Vec<String>) {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = self.column_widths.get_mut(i) {
                *width = (*width).max(width_of(cell));
            }
        }
        self.rows.push(row);
    }

    pub fn render<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        if let Some(title) = &self.title {
            writeln!(writer, "{title}")?;
        }
        self.write_border(writer, '┌', '┬', '┐')?;
        self.write_row(writer, &self.headers, true)?;
        self.write_border(writer, '├', '┼', '┤')?;
        for row in &self.rows {
            self.write_row(writer, row, false)?;
        }
        self.write_border(writer, '└', '┴', '┘')
    }

    fn write_border<W: Write>(
        &self,
        writer: &mut W,
        left: char,
        mid: char,
        right: char,
    ) -> std::io::Result<()> {
        let segments: Vec<String> = self
            .column_widths
            .iter()
            .map(|width| "─".repeat(width + 2))
            .collect();
        writeln!(writer, "{left}{}{right}", segments.join(&mid.to_string()))
    }

    fn write_row<W: Write>(
        &self,
        writer: &mut W,
        cells: &[String],
        is_header: bool,
    ) -> std::io::Result<()> {
        write!(writer, "│")?;
        for (i, width) in self.column_widths.iter().enumerate() {
            let cell = cells.get(i).map_or("", String::as_str);
            let pad = width - width_of(cell);
            if is_header && self.use_color {
                write!(writer, " \x1b[1;36m{cell}\x1b[0m{} │", " ".repeat(pad))?;
            } else {
                write!(writer, " {cell}{} │", " ".repeat(pad))?;
            }
        }
        writeln!(writer)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use alprbench_core::{ResultRow, Resolution};

    fn render(table: &TableBuilder) -> String {
        let mut output = Vec::new();
        table.render(&mut output).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn results_render_with_title_and_aligned_rows() {
        let mut results = ResultsTable::new();
        results.set_title("OpenALPR Speed: 2 stream(s) on 8 threads");
        results.push(&ResultRow {
            resolution: Resolution::Vga,
            total_fps: 123.45,
            avg_cpu: 88.0,
            max_cpu: 99.5,
            avg_frames: 300,
        });
        results.push(&ResultRow {
            resolution: Resolution::Uhd4k,
            total_fps: 4.0,
            avg_cpu: 97.25,
            max_cpu: 100.0,
            avg_frames: 75,
        });

        let rendered = render(&TableBuilder::from_results(&results).with_color(false));
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines[0], "OpenALPR Speed: 2 stream(s) on 8 threads");
        assert!(lines[2].contains("Resolution") && lines[2].contains("Total FPS"));
        assert!(lines[4].contains("123.5"));
        assert!(lines[5].contains("4k"));
        let widths: Vec<usize> = lines[1..].iter().map(|l| l.chars().count()).collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn short_rows_are_padded() {
        let mut table =
            TableBuilder::new(vec!["Name".to_string(), "Value".to_string()]).with_color(false);
        table.add_row(vec!["only".to_string()]);

        let rendered = render(&table);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[3], "│ only │       │");
    }
}
