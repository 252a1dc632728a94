use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ExplorerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectNamespace {
    Geo,
    Sra,
    Ena,
    Ddbj,
    BioProject,
}

impl fmt::Display for ProjectNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectNamespace::Geo => write!(f, "geo"),
            ProjectNamespace::Sra => write!(f, "sra"),
            ProjectNamespace::Ena => write!(f, "ena"),
            ProjectNamespace::Ddbj => write!(f, "ddbj"),
            ProjectNamespace::BioProject => write!(f, "bioproject"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectAccession(String);

impl ProjectAccession {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn namespace(&self) -> ProjectNamespace {
        let value = self.0.as_str();
        if value.starts_with("GSE") {
            ProjectNamespace::Geo
        } else if value.starts_with("PRJ") {
            ProjectNamespace::BioProject
        } else if value.starts_with("ERP") {
            ProjectNamespace::Ena
        } else if value.starts_with("DRP") {
            ProjectNamespace::Ddbj
        } else {
            ProjectNamespace::Sra
        }
    }
}

impl fmt::Display for ProjectAccession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProjectAccession {
    type Err = ExplorerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_uppercase();
        let re = Regex::new(r"^(GSE|SRP|ERP|DRP|PRJNA|PRJEB|PRJDB)\d+$")
            .map_err(|err| ExplorerError::InvalidProjectAccession(err.to_string()))?;
        if !re.is_match(&normalized) {
            return Err(ExplorerError::InvalidProjectAccession(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHandle {
    pub session_token: String,
    pub query_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRecord {
    pub accession: String,
}

// The service emits a bare object for a single run and an array once there
// are several.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunList {
    Single(RunRecord),
    Many(Vec<RunRecord>),
}

impl RunList {
    pub fn accessions(&self) -> Vec<String> {
        match self {
            RunList::Single(run) => vec![run.accession.clone()],
            RunList::Many(runs) => runs.iter().map(|run| run.accession.clone()).collect(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            RunList::Single(_) => 1,
            RunList::Many(runs) => runs.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub title: String,
    pub platform: String,
    pub total_bases: u64,
    pub created_date: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileLinkSet {
    paths: Vec<String>,
}

impl FileLinkSet {
    pub fn parse(raw: &str) -> Self {
        let paths = raw
            .split(';')
            .map(str::trim)
            .filter(|path| !path.is_empty())
            .map(str::to_string)
            .collect();
        Self { paths }
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputRow {
    pub accession: String,
    pub title: String,
    pub platform: String,
    pub total_bases: String,
    pub created_date: String,
    pub filename: String,
    pub fastq_ftp_url: String,
    pub fastq_aspera_url: String,
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_project_accession_valid() {
        let acc: ProjectAccession = " prjna588856 ".parse().unwrap();
        assert_eq!(acc.as_str(), "PRJNA588856");
        assert_eq!(acc.namespace(), ProjectNamespace::BioProject);

        let geo: ProjectAccession = "GSE30567".parse().unwrap();
        assert_eq!(geo.namespace(), ProjectNamespace::Geo);
        let ena: ProjectAccession = "ERP009109".parse().unwrap();
        assert_eq!(ena.namespace(), ProjectNamespace::Ena);
        let sra: ProjectAccession = "SRP043510".parse().unwrap();
        assert_eq!(sra.namespace(), ProjectNamespace::Sra);
    }

    #[test]
    fn parse_project_accession_invalid() {
        let err = "SRR000001".parse::<ProjectAccession>().unwrap_err();
        assert_matches!(err, ExplorerError::InvalidProjectAccession(_));
        let err = "GSE".parse::<ProjectAccession>().unwrap_err();
        assert_matches!(err, ExplorerError::InvalidProjectAccession(_));
    }

    #[test]
    fn file_link_set_drops_empty_segments() {
        assert!(FileLinkSet::parse("").paths().is_empty());
        let pair = FileLinkSet::parse("a/x_1.fastq.gz;a/x_2.fastq.gz");
        assert_eq!(pair.paths().len(), 2);
        assert_eq!(pair.paths()[1], "a/x_2.fastq.gz");
        assert_eq!(FileLinkSet::parse("a/x.fastq.gz;").paths().len(), 1);
    }
}
