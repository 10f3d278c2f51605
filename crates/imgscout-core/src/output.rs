//! Run reports in JSON or JSON Lines.
//!
//! A JSON report is one document holding every row and the final stats.
//! A JSONL report streams one row per line as rows finish, followed by a
//! final stats line, so partial runs still leave a usable file.

use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::types::{RowReport, RunStats};

/// Report format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Single JSON document
    Json,
    /// One JSON object per line (newline-delimited JSON)
    JsonLines,
}

impl OutputFormat {
    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }
}

/// Whole-run document written in JSON mode.
#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    pub rows: &'a [RowReport],
    pub stats: &'a RunStats,
}

#[derive(Serialize)]
struct StatsLine<'a> {
    stats: &'a RunStats,
}

/// Writes row reports as they arrive and the stats at the end.
pub struct ReportWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    buffered: Vec<RowReport>,
    rows_written: usize,
}

impl ReportWriter<BufWriter<File>> {
    /// Create (or truncate) a report file.
    pub fn create(path: &Path, format: OutputFormat) -> io::Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?), format))
    }
}

impl<W: Write> ReportWriter<W> {
    pub fn new(writer: W, format: OutputFormat) -> Self {
        Self {
            writer,
            format,
            buffered: Vec::new(),
            rows_written: 0,
        }
    }

    /// Record one row. JSONL writes it immediately; JSON holds it until `finish`.
    pub fn row(&mut self, report: &RowReport) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => self.buffered.push(report.clone()),
            OutputFormat::JsonLines => {
                serde_json::to_writer(&mut self.writer, report).map_err(io::Error::other)?;
                writeln!(self.writer)?;
                self.writer.flush()?;
            }
        }
        self.rows_written += 1;
        Ok(())
    }

    /// Write the stats (and, for JSON, the buffered rows) and flush.
    pub fn finish(mut self, stats: &RunStats) -> io::Result<W> {
        match self.format {
            OutputFormat::Json => {
                let report = RunReport {
                    rows: &self.buffered,
                    stats,
                };
                serde_json::to_writer_pretty(&mut self.writer, &report)
                    .map_err(io::Error::other)?;
            }
            OutputFormat::JsonLines => {
                serde_json::to_writer(&mut self.writer, &StatsLine { stats })
                    .map_err(io::Error::other)?;
            }
        }
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(self.writer)
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }
}

/// Serialize an item to a JSON string.
pub fn to_json<T: Serialize>(item: &T, pretty: bool) -> Result<String, serde_json::Error> {
    if pretty {
        serde_json::to_string_pretty(item)
    } else {
        serde_json::to_string(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ProviderKind, ProviderOutcome, ProviderStatus};

    fn report(row: usize) -> RowReport {
        let mut outcome = ProviderOutcome::new(ProviderKind::Bing, ProviderStatus::Uploaded);
        outcome.hosted_urls.push(format!("http://hosted/{row}"));
        RowReport {
            row,
            product: Some(format!("Item {row}")),
            skipped_blank: false,
            outcomes: vec![outcome],
        }
    }

    fn stats() -> RunStats {
        RunStats {
            rows_total: 2,
            rows_processed: 2,
            uploads_succeeded: 2,
            ..RunStats::default()
        }
    }

    #[test]
    fn test_jsonl_rows_then_stats() {
        let mut writer = ReportWriter::new(Vec::new(), OutputFormat::JsonLines);
        writer.row(&report(0)).unwrap();
        writer.row(&report(1)).unwrap();
        assert_eq!(writer.rows_written(), 2);

        let output = String::from_utf8(writer.finish(&stats()).unwrap()).unwrap();
        let lines: Vec<&str> = output.trim().lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("\"row\":0"));
        assert!(lines[2].starts_with("{\"stats\":"));
    }

    #[test]
    fn test_json_single_document() {
        let mut writer = ReportWriter::new(Vec::new(), OutputFormat::Json);
        writer.row(&report(0)).unwrap();

        let output = String::from_utf8(writer.finish(&stats()).unwrap()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["rows"].as_array().unwrap().len(), 1);
        assert_eq!(value["rows"][0]["outcomes"][0]["status"], "uploaded");
        assert_eq!(value["stats"]["uploads_succeeded"], 2);
    }

    #[test]
    fn test_create_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.jsonl");
        let mut writer = ReportWriter::create(&path, OutputFormat::JsonLines).unwrap();
        writer.row(&report(0)).unwrap();
        writer.finish(&stats()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(OutputFormat::parse("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("NDJSON"), Some(OutputFormat::JsonLines));
        assert_eq!(OutputFormat::parse("xml"), None);
    }
}
