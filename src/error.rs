use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ExplorerError {
    #[error("invalid project accession: {0}")]
    #[diagnostic(help("expected GSE*, SRP*/ERP*/DRP* or PRJNA*/PRJEB*/PRJDB* followed by digits"))]
    InvalidProjectAccession(String),

    #[error("config file not found: {0}")]
    MissingConfig(PathBuf),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("request to {url} failed: {message}")]
    RemoteHttp { url: String, message: String },

    #[error("{url} returned status {status}: {message}")]
    RemoteStatus {
        url: String,
        status: u16,
        message: String,
    },

    #[error("response from {url} is not valid JSON: {message}")]
    RemoteDecode { url: String, message: String },

    #[error("unexpected search response: {0}")]
    SearchResponse(String),

    #[error("embedded markup could not be parsed: {0}")]
    Markup(String),

    #[error("malformed batch {uid}: {reason}")]
    MalformedBatch { uid: String, reason: String },

    #[error("failed to resolve file links for {accession}: {message}")]
    FileLinkResolution { accession: String, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl ExplorerError {
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            ExplorerError::RemoteHttp { .. }
                | ExplorerError::RemoteStatus { .. }
                | ExplorerError::RemoteDecode { .. }
        )
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            ExplorerError::InvalidProjectAccession(_)
            | ExplorerError::MissingConfig(_)
            | ExplorerError::ConfigRead(_)
            | ExplorerError::ConfigParse(_) => 2,
            ExplorerError::RemoteHttp { .. }
            | ExplorerError::RemoteStatus { .. }
            | ExplorerError::RemoteDecode { .. }
            | ExplorerError::FileLinkResolution { .. } => 3,
            ExplorerError::SearchResponse(_)
            | ExplorerError::Markup(_)
            | ExplorerError::MalformedBatch { .. } => 4,
            ExplorerError::Filesystem(_) => 1,
        }
    }
}
