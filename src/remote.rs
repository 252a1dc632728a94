use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use tracing::debug;

use crate::error::ExplorerError;

pub trait JsonFetch {
    fn get_json(&self, url: &str) -> Result<Value, ExplorerError>;
}

impl<T: JsonFetch + ?Sized> JsonFetch for &T {
    fn get_json(&self, url: &str) -> Result<Value, ExplorerError> {
        (**self).get_json(url)
    }
}

#[derive(Clone)]
pub struct HttpJsonClient {
    client: Client,
}

impl HttpJsonClient {
    pub fn new(timeout: Duration) -> Result<Self, ExplorerError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("kira-sra/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| ExplorerError::Filesystem(err.to_string()))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| ExplorerError::RemoteHttp {
                url: String::new(),
                message: err.to_string(),
            })?;
        Ok(Self { client })
    }
}

impl JsonFetch for HttpJsonClient {
    fn get_json(&self, url: &str) -> Result<Value, ExplorerError> {
        debug!(url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| ExplorerError::RemoteHttp {
                url: url.to_string(),
                message: err.to_string(),
            })?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "request failed".to_string());
            return Err(ExplorerError::RemoteStatus {
                url: url.to_string(),
                status,
                message,
            });
        }
        let body = response.text().map_err(|err| ExplorerError::RemoteHttp {
            url: url.to_string(),
            message: err.to_string(),
        })?;
        serde_json::from_str(&body).map_err(|err| ExplorerError::RemoteDecode {
            url: url.to_string(),
            message: err.to_string(),
        })
    }
}

pub fn encode_url_component(value: &str) -> String {
    let mut out = String::new();
    for byte in value.as_bytes() {
        let ch = *byte as char;
        if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.' || ch == '~' {
            out.push(ch);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

pub fn build_query_url(base: &str, params: &[(&str, &str)]) -> String {
    if params.is_empty() {
        return base.to_string();
    }
    let query = params
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                encode_url_component(key),
                encode_url_component(value)
            )
        })
        .collect::<Vec<_>>()
        .join("&");
    format!("{base}?{query}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_url_is_encoded_in_order() {
        let url = build_query_url(
            "https://example.org/esearch.fcgi",
            &[("db", "sra"), ("term", "PRJNA1 OR x&y")],
        );
        assert_eq!(
            url,
            "https://example.org/esearch.fcgi?db=sra&term=PRJNA1%20OR%20x%26y"
        );
    }

    #[test]
    fn query_url_without_params() {
        assert_eq!(build_query_url("https://a/b", &[]), "https://a/b");
    }
}
