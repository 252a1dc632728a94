use tracing::debug;

use crate::domain::FileLinkSet;
use crate::error::ExplorerError;
use crate::remote::{JsonFetch, build_query_url};

pub const ENA_PORTAL_BASE: &str = "https://www.ebi.ac.uk/ena/portal/api";

pub trait FileReportService {
    // raw fastq_ftp value, `;`-joined and possibly empty
    fn fastq_ftp(&self, accession: &str) -> Result<String, ExplorerError>;
}

pub struct EnaPortalClient<F: JsonFetch> {
    fetch: F,
    base_url: String,
}

impl<F: JsonFetch> EnaPortalClient<F> {
    pub fn new(fetch: F, base_url: impl Into<String>) -> Self {
        Self {
            fetch,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn filereport_url(&self, accession: &str) -> String {
        build_query_url(
            &format!("{}/filereport", self.base_url),
            &[
                ("result", "read_run"),
                ("fields", "fastq_ftp"),
                ("format", "JSON"),
                ("accession", accession),
            ],
        )
    }
}

impl<F: JsonFetch> FileReportService for EnaPortalClient<F> {
    fn fastq_ftp(&self, accession: &str) -> Result<String, ExplorerError> {
        let payload = self.fetch.get_json(&self.filereport_url(accession))?;
        let record = payload
            .as_array()
            .and_then(|records| records.first())
            .ok_or_else(|| ExplorerError::FileLinkResolution {
                accession: accession.to_string(),
                message: "file report returned no records".to_string(),
            })?;
        record
            .get("fastq_ftp")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| ExplorerError::FileLinkResolution {
                accession: accession.to_string(),
                message: "file report record has no fastq_ftp field".to_string(),
            })
    }
}

pub fn resolve_file_links<S: FileReportService + ?Sized>(
    service: &S,
    accessions: &[String],
) -> Result<Vec<FileLinkSet>, ExplorerError> {
    let mut links = Vec::with_capacity(accessions.len());
    for accession in accessions {
        let raw = service.fastq_ftp(accession).map_err(|err| match err {
            ExplorerError::FileLinkResolution { .. } => err,
            other => ExplorerError::FileLinkResolution {
                accession: accession.clone(),
                message: other.to_string(),
            },
        })?;
        let set = FileLinkSet::parse(&raw);
        debug!(accession = accession.as_str(), files = set.paths().len(), "resolved file links");
        links.push(set);
    }
    Ok(links)
}
