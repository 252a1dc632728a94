use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};

use camino::{Utf8Path, Utf8PathBuf};

use crate::domain::{BatchSummary, FileLinkSet, OutputRow};
use crate::error::ExplorerError;

pub const FTP_HOST_PREFIX: &str = "ftp.sra.ebi.ac.uk/";
pub const ASPERA_PREFIX: &str = "era-fasp@fasp.sra.ebi.ac.uk:";

pub const HEADER: [&str; 8] = [
    "Accession",
    "Title",
    "Platform",
    "Total Bases",
    "Date Created",
    "FASTQ",
    "FASTQ_FTP",
    "FASTQ_Aspera",
];

#[derive(Debug, Clone)]
pub struct RowFormatter {
    aspera_prefix: String,
}

impl Default for RowFormatter {
    fn default() -> Self {
        Self::new(ASPERA_PREFIX)
    }
}

impl RowFormatter {
    pub fn new(aspera_prefix: impl Into<String>) -> Self {
        Self {
            aspera_prefix: aspera_prefix.into(),
        }
    }

    pub fn format_batch(
        &self,
        summary: &BatchSummary,
        accessions: &[String],
        links: &[FileLinkSet],
    ) -> Vec<OutputRow> {
        let title = slug_title(&summary.title);
        let total_bases = format_total_bases(summary.total_bases);
        let mut rows = Vec::new();
        for (accession, set) in accessions.iter().zip(links) {
            for path in set.paths() {
                rows.push(OutputRow {
                    accession: accession.clone(),
                    title: title.clone(),
                    platform: summary.platform.clone(),
                    total_bases: total_bases.clone(),
                    created_date: summary.created_date.clone(),
                    filename: file_name(path).to_string(),
                    fastq_ftp_url: path.clone(),
                    fastq_aspera_url: self.aspera_url(path),
                });
            }
        }
        rows
    }

    pub fn aspera_url(&self, ftp_path: &str) -> String {
        ftp_path.replace(FTP_HOST_PREFIX, &self.aspera_prefix)
    }
}

/// `{:.2e}` with a signed, at-least-two-digit exponent: `1.23e+09`.
pub fn format_total_bases(total: u64) -> String {
    let formatted = format!("{:.2e}", total as f64);
    let Some((mantissa, exponent)) = formatted.split_once('e') else {
        return formatted;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{mantissa}e{sign}{:02}", exponent.abs())
}

pub fn slug_title(title: &str) -> String {
    title.split_whitespace().collect::<Vec<_>>().join("_")
}

pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

pub fn row_line(row: &OutputRow) -> String {
    [
        row.accession.as_str(),
        row.title.as_str(),
        row.platform.as_str(),
        row.total_bases.as_str(),
        row.created_date.as_str(),
        row.filename.as_str(),
        row.fastq_ftp_url.as_str(),
        row.fastq_aspera_url.as_str(),
    ]
    .join("\t")
}

pub struct TsvSink {
    path: Utf8PathBuf,
    writer: BufWriter<File>,
    rows_written: usize,
}

impl TsvSink {
    pub fn open_append(path: &Utf8Path) -> Result<Self, ExplorerError> {
        if let Some(parent) = path.parent() {
            if !parent.as_str().is_empty() {
                std::fs::create_dir_all(parent.as_std_path())
                    .map_err(|err| ExplorerError::Filesystem(format!("create {parent}: {err}")))?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_std_path())
            .map_err(|err| ExplorerError::Filesystem(format!("open {path}: {err}")))?;
        let mut sink = Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            rows_written: 0,
        };
        sink.write_line(&HEADER.join("\t"))?;
        Ok(sink)
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    pub fn write_rows(&mut self, rows: &[OutputRow]) -> Result<(), ExplorerError> {
        for row in rows {
            self.write_line(&row_line(row))?;
            self.rows_written += 1;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), ExplorerError> {
        self.writer
            .flush()
            .map_err(|err| ExplorerError::Filesystem(format!("flush {}: {err}", self.path)))
    }

    fn write_line(&mut self, line: &str) -> Result<(), ExplorerError> {
        writeln!(self.writer, "{line}")
            .map_err(|err| ExplorerError::Filesystem(format!("write {}: {err}", self.path)))
    }
}
