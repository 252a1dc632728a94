use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::MAX_PAGE_SIZE;
use crate::domain::{OutputRow, ProjectAccession, SearchHandle};
use crate::ena::{FileReportService, resolve_file_links};
use crate::error::ExplorerError;
use crate::eutils::MetadataService;
use crate::extract::decode_summary_page;
use crate::table::{RowFormatter, TsvSink};

#[derive(Debug, Clone, Serialize)]
pub struct ExploreResult {
    pub project: String,
    pub pages: usize,
    pub runs_processed: usize,
    pub rows_written: usize,
    pub output: String,
    pub finished_at: String,
}

#[derive(Debug, Clone, Default)]
pub struct PageOutcome {
    pub runs: usize,
    pub rows: Vec<OutputRow>,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Debug)]
enum DriverState {
    Searching,
    FetchingPage { handle: SearchHandle, offset: usize },
    Done,
}

#[derive(Debug, Clone, Copy, Default)]
struct Totals {
    pages: usize,
    runs: usize,
}

pub struct Explorer<M: MetadataService, R: FileReportService> {
    metadata: M,
    files: R,
    formatter: RowFormatter,
    page_size: usize,
}

impl<M: MetadataService, R: FileReportService> Explorer<M, R> {
    pub fn new(metadata: M, files: R) -> Self {
        Self {
            metadata,
            files,
            formatter: RowFormatter::default(),
            page_size: MAX_PAGE_SIZE,
        }
    }

    pub fn with_formatter(mut self, formatter: RowFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn metadata(&self) -> &M {
        &self.metadata
    }

    // The sink is flushed after each page and again before an error is
    // returned, so the file holds exactly the pages that completed.
    pub fn explore(
        &self,
        project: &ProjectAccession,
        sink: &mut TsvSink,
        progress: &dyn ProgressSink,
    ) -> Result<ExploreResult, ExplorerError> {
        let totals = match self.drive(project, sink, progress) {
            Ok(totals) => totals,
            Err(err) => {
                if let Err(flush_err) = sink.flush() {
                    warn!(error = %flush_err, "failed to flush output after error");
                }
                return Err(err);
            }
        };
        sink.flush()?;

        Ok(ExploreResult {
            project: project.to_string(),
            pages: totals.pages,
            runs_processed: totals.runs,
            rows_written: sink.rows_written(),
            output: sink.path().to_string(),
            finished_at: chrono::Utc::now().to_rfc3339(),
        })
    }

    pub fn process_page(&self, payload: &Value) -> Result<PageOutcome, ExplorerError> {
        let batches = decode_summary_page(payload)?;
        let mut outcome = PageOutcome::default();
        for batch in &batches {
            let accessions = batch.accessions();
            let links = resolve_file_links(&self.files, &accessions)?;
            if links.len() != accessions.len() {
                return Err(ExplorerError::MalformedBatch {
                    uid: batch.uid.clone(),
                    reason: format!(
                        "{} runs but {} file link sets",
                        accessions.len(),
                        links.len()
                    ),
                });
            }
            outcome
                .rows
                .extend(self.formatter.format_batch(&batch.summary, &accessions, &links));
            outcome.runs += accessions.len();
        }
        Ok(outcome)
    }

    fn drive(
        &self,
        project: &ProjectAccession,
        sink: &mut TsvSink,
        progress: &dyn ProgressSink,
    ) -> Result<Totals, ExplorerError> {
        let mut totals = Totals::default();
        let mut state = DriverState::Searching;
        loop {
            state = match state {
                DriverState::Searching => {
                    let started = Instant::now();
                    let handle = self.metadata.search(project)?;
                    info!(
                        project = %project,
                        namespace = %project.namespace(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "search resolved"
                    );
                    DriverState::FetchingPage { handle, offset: 0 }
                }
                DriverState::FetchingPage { handle, offset } => {
                    let started = Instant::now();
                    let payload = self.metadata.summary_page(&handle, offset, self.page_size)?;
                    let page = self.process_page(&payload)?;
                    sink.write_rows(&page.rows)?;
                    sink.flush()?;

                    totals.pages += 1;
                    totals.runs += page.runs;
                    info!(
                        offset,
                        runs = page.runs,
                        rows = page.rows.len(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "page processed"
                    );
                    progress.event(ProgressEvent {
                        message: page.runs.to_string(),
                    });

                    if page.runs == self.page_size {
                        DriverState::FetchingPage {
                            handle,
                            offset: offset + self.page_size,
                        }
                    } else {
                        DriverState::Done
                    }
                }
                DriverState::Done => return Ok(totals),
            };
        }
    }
}
