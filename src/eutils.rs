use serde_json::Value;
use tracing::info;

use crate::domain::{ProjectAccession, SearchHandle};
use crate::error::ExplorerError;
use crate::remote::{JsonFetch, build_query_url};

pub const EUTILS_BASE: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

pub trait MetadataService {
    fn search(&self, project: &ProjectAccession) -> Result<SearchHandle, ExplorerError>;
    fn summary_page(
        &self,
        handle: &SearchHandle,
        start: usize,
        max: usize,
    ) -> Result<Value, ExplorerError>;
}

pub struct EutilsClient<F: JsonFetch> {
    fetch: F,
    base_url: String,
    api_key: Option<String>,
}

impl<F: JsonFetch> EutilsClient<F> {
    pub fn new(fetch: F, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            fetch,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        }
    }

    pub fn search_url(&self, project: &ProjectAccession) -> String {
        let mut params = vec![
            ("db", "sra"),
            ("usehistory", "y"),
            ("retmode", "json"),
            ("term", project.as_str()),
        ];
        if let Some(key) = self.api_key.as_deref() {
            params.push(("api_key", key));
        }
        build_query_url(&format!("{}/esearch.fcgi", self.base_url), &params)
    }

    pub fn summary_url(&self, handle: &SearchHandle, start: usize, max: usize) -> String {
        let start = start.to_string();
        let max = max.to_string();
        let mut params = vec![
            ("db", "sra"),
            ("retmode", "json"),
            ("query_key", handle.query_key.as_str()),
            ("WebEnv", handle.session_token.as_str()),
            ("retstart", start.as_str()),
            ("retmax", max.as_str()),
        ];
        if let Some(key) = self.api_key.as_deref() {
            params.push(("api_key", key));
        }
        build_query_url(&format!("{}/esummary.fcgi", self.base_url), &params)
    }
}

impl<F: JsonFetch> MetadataService for EutilsClient<F> {
    fn search(&self, project: &ProjectAccession) -> Result<SearchHandle, ExplorerError> {
        let payload = self.fetch.get_json(&self.search_url(project))?;
        let handle = parse_search_handle(&payload)?;
        info!(project = project.as_str(), query_key = %handle.query_key, "search resolved");
        Ok(handle)
    }

    fn summary_page(
        &self,
        handle: &SearchHandle,
        start: usize,
        max: usize,
    ) -> Result<Value, ExplorerError> {
        info!(start, max, "requesting summary page");
        self.fetch.get_json(&self.summary_url(handle, start, max))
    }
}

pub fn parse_search_handle(payload: &Value) -> Result<SearchHandle, ExplorerError> {
    let result = payload.get("esearchresult").ok_or_else(|| {
        ExplorerError::SearchResponse("esearch response has no esearchresult".to_string())
    })?;
    if let Some(message) = result.get("ERROR").and_then(|v| v.as_str()) {
        return Err(ExplorerError::SearchResponse(message.to_string()));
    }
    let session_token = result
        .get("webenv")
        .and_then(|v| v.as_str())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ExplorerError::SearchResponse("missing webenv".to_string()))?;
    let query_key = match result.get("querykey") {
        Some(Value::String(key)) if !key.is_empty() => key.clone(),
        Some(Value::Number(key)) => key.to_string(),
        _ => return Err(ExplorerError::SearchResponse("missing querykey".to_string())),
    };
    Ok(SearchHandle {
        session_token: session_token.to_string(),
        query_key,
    })
}
