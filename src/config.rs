use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ena::ENA_PORTAL_BASE;
use crate::error::ExplorerError;
use crate::eutils::EUTILS_BASE;
use crate::table::ASPERA_PREFIX;

pub const MAX_PAGE_SIZE: usize = 500;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_CONFIG_FILE: &str = "kira-sra.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub eutils_base_url: Option<String>,
    #[serde(default)]
    pub ena_portal_base_url: Option<String>,
    #[serde(default)]
    pub page_size: Option<usize>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub aspera_prefix: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub eutils_base_url: String,
    pub ena_portal_base_url: String,
    pub page_size: usize,
    pub timeout: Duration,
    pub aspera_prefix: String,
    pub ncbi_api_key: Option<String>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    // An explicit path must exist. Without one, kira-sra.json in the current
    // directory is read when present.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, ExplorerError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        let api_key = std::env::var("NCBI_API_KEY").ok();

        if !config_path.exists() {
            if path.is_some() {
                return Err(ExplorerError::MissingConfig(config_path));
            }
            return Ok(Self::resolve_config(Config::default(), api_key));
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| ExplorerError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| ExplorerError::ConfigParse(err.to_string()))?;

        Ok(Self::resolve_config(config, api_key))
    }

    pub fn resolve_config(config: Config, ncbi_api_key: Option<String>) -> ResolvedConfig {
        ResolvedConfig {
            eutils_base_url: config
                .eutils_base_url
                .unwrap_or_else(|| EUTILS_BASE.to_string()),
            ena_portal_base_url: config
                .ena_portal_base_url
                .unwrap_or_else(|| ENA_PORTAL_BASE.to_string()),
            page_size: config
                .page_size
                .unwrap_or(MAX_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
            timeout: Duration::from_secs(config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            aspera_prefix: config
                .aspera_prefix
                .unwrap_or_else(|| ASPERA_PREFIX.to_string()),
            ncbi_api_key: ncbi_api_key
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty()),
        }
    }
}
