//! Semicolon-delimited report output
//!
//! Layout: `Card Id;Created date;<list 1>;...;<list N>;Card name`, one
//! line per card. Card names are always quoted.

use crate::config::MonitoredStage;
use crate::report::ReportRow;
use chrono::SecondsFormat;
use std::io::{self, Write};

/// Field separator
pub const SEPARATOR: char = ';';

/// Report writer over any byte sink
///
/// Each row is formatted in full before it is written, so a row is never
/// split across writes of different rows.
#[derive(Debug)]
pub struct ReportWriter<W: Write> {
    writer: W,
    rows_written: usize,
}

impl<W: Write> ReportWriter<W> {
    /// Create a new report writer
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            rows_written: 0,
        }
    }

    /// Write the header line with one column per monitored list
    pub fn write_header(&mut self, monitored: &[MonitoredStage]) -> io::Result<()> {
        let line = header(monitored);
        writeln!(self.writer, "{line}")
    }

    /// Write one card row
    pub fn write_row(&mut self, row: &ReportRow) -> io::Result<()> {
        let line = format_row(row);
        writeln!(self.writer, "{line}")?;
        self.rows_written += 1;
        Ok(())
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Flush and hand back the underlying writer
    pub fn finish(mut self) -> io::Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

/// Generate the header line
pub fn header(monitored: &[MonitoredStage]) -> String {
    let mut fields = vec!["Card Id".to_string(), "Created date".to_string()];
    fields.extend(monitored.iter().map(|stage| stage.name.clone()));
    fields.push("Card name".to_string());
    fields.join(&SEPARATOR.to_string())
}

/// Quote a field, doubling embedded quotes
///
/// Line breaks become spaces so every card stays on one line.
fn quote_field(field: &str) -> String {
    let single_line = field.replace("\r\n", " ").replace(['\n', '\r'], " ");
    format!("\"{}\"", single_line.replace('"', "\"\""))
}

/// Format a report row as one line (without the newline)
pub fn format_row(row: &ReportRow) -> String {
    let mut fields = vec![
        row.unit_id.to_string(),
        row.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
    ];
    fields.extend(row.cells.iter().map(|cell| cell.to_string()));
    fields.push(quote_field(&row.unit_name));
    fields.join(&SEPARATOR.to_string())
}
