use serde_json::Value;
use tracing::debug;

use crate::domain::{BatchSummary, RunList, RunRecord};
use crate::error::ExplorerError;
use crate::markup::decode_embedded_markup;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBatch {
    pub uid: String,
    pub summary: BatchSummary,
    pub runs: RunList,
}

impl DecodedBatch {
    pub fn accessions(&self) -> Vec<String> {
        self.runs.accessions()
    }
}

impl RunList {
    pub fn from_runs_tree(uid: &str, tree: &Value) -> Result<Self, ExplorerError> {
        let node = tree.get("Run").ok_or_else(|| malformed(uid, "run list is missing"))?;
        match node {
            Value::Array(entries) => {
                if entries.is_empty() {
                    return Err(malformed(uid, "run list is empty"));
                }
                let runs = entries
                    .iter()
                    .enumerate()
                    .map(|(idx, entry)| run_record(uid, entry, idx))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(RunList::Many(runs))
            }
            Value::Object(_) => Ok(RunList::Single(run_record(uid, node, 0)?)),
            _ => Err(malformed(uid, "run entry has no attributes")),
        }
    }
}

pub fn extract_accessions(uid: &str, runs_tree: &Value) -> Result<Vec<String>, ExplorerError> {
    Ok(RunList::from_runs_tree(uid, runs_tree)?.accessions())
}

pub fn extract_batch_summary(
    uid: &str,
    experiment: &Value,
    created: &Value,
) -> Result<BatchSummary, ExplorerError> {
    let summary = experiment
        .get("Summary")
        .ok_or_else(|| malformed(uid, "experiment summary is missing"))?;
    let title = text_of(summary.get("Title")).unwrap_or_default();
    let platform = summary
        .get("Platform")
        .and_then(|v| v.get("@instrument_model"))
        .and_then(|v| v.as_str())
        .ok_or_else(|| malformed(uid, "platform instrument model is missing"))?
        .to_string();
    let total_bases = summary
        .get("Statistics")
        .and_then(|v| v.get("@total_bases"))
        .and_then(|v| v.as_str())
        .ok_or_else(|| malformed(uid, "total base count is missing"))?;
    let total_bases = total_bases
        .trim()
        .parse::<u64>()
        .map_err(|_| malformed(uid, &format!("total base count is not an integer: {total_bases}")))?;
    let created_date = first_text(created).unwrap_or_default();

    Ok(BatchSummary {
        title,
        platform,
        total_bases,
        created_date,
    })
}

pub fn decode_batch(uid: &str, entry: &Value) -> Result<DecodedBatch, ExplorerError> {
    let expxml = markup_field(uid, entry, "expxml")?;
    let runs = markup_field(uid, entry, "runs")?;
    let created = markup_field(uid, entry, "createdate")?;

    let experiment = decode_embedded_markup(expxml)?;
    let runs = decode_embedded_markup(runs)?;
    let created = decode_embedded_markup(created)?;

    let summary = extract_batch_summary(uid, &experiment, &created)?;
    let runs = RunList::from_runs_tree(uid, &runs)?;
    debug!(uid, runs = runs.len(), "decoded batch");
    Ok(DecodedBatch {
        uid: uid.to_string(),
        summary,
        runs,
    })
}

pub fn decode_summary_page(payload: &Value) -> Result<Vec<DecodedBatch>, ExplorerError> {
    let Some(result) = payload.get("result") else {
        return match payload.get("esummaryresult") {
            // retstart past the end of the result set
            Some(messages) if is_empty_result(messages) => Ok(Vec::new()),
            Some(messages) => Err(ExplorerError::SearchResponse(format!(
                "esummary failed: {messages}"
            ))),
            None => Err(ExplorerError::SearchResponse(
                "esummary response has no result".to_string(),
            )),
        };
    };
    let uids = result
        .get("uids")
        .and_then(|v| v.as_array())
        .ok_or_else(|| ExplorerError::SearchResponse("esummary result has no uids".to_string()))?;

    let mut batches = Vec::with_capacity(uids.len());
    for uid in uids {
        let uid = uid
            .as_str()
            .ok_or_else(|| ExplorerError::SearchResponse("uid is not a string".to_string()))?;
        let entry = result
            .get(uid)
            .ok_or_else(|| malformed(uid, "listed uid has no summary entry"))?;
        batches.push(decode_batch(uid, entry)?);
    }
    Ok(batches)
}

fn is_empty_result(messages: &Value) -> bool {
    let mentions_empty = |text: &str| text.contains("Empty result");
    match messages {
        Value::String(text) => mentions_empty(text),
        Value::Array(items) => {
            !items.is_empty()
                && items
                    .iter()
                    .all(|item| item.as_str().is_some_and(mentions_empty))
        }
        _ => false,
    }
}

fn run_record(uid: &str, entry: &Value, idx: usize) -> Result<RunRecord, ExplorerError> {
    let accession = entry
        .get("@acc")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|acc| !acc.is_empty())
        .ok_or_else(|| malformed(uid, &format!("run entry {idx} has no accession")))?;
    Ok(RunRecord {
        accession: accession.to_string(),
    })
}

fn markup_field<'a>(uid: &str, entry: &'a Value, field: &str) -> Result<&'a str, ExplorerError> {
    entry
        .get(field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| malformed(uid, &format!("field {field} is missing")))
}

fn text_of(node: Option<&Value>) -> Option<String> {
    match node? {
        Value::String(text) => Some(text.clone()),
        Value::Object(map) => map.get("#text").and_then(|v| v.as_str()).map(str::to_string),
        _ => None,
    }
}

// The creation date decodes to a bare string, but tolerate it arriving
// wrapped in an element as well.
fn first_text(node: &Value) -> Option<String> {
    match node {
        Value::String(text) => Some(text.clone()),
        Value::Object(map) => map.values().find_map(first_text),
        Value::Array(items) => items.iter().find_map(first_text),
        _ => None,
    }
}

fn malformed(uid: &str, reason: &str) -> ExplorerError {
    ExplorerError::MalformedBatch {
        uid: uid.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn single_and_one_element_many_extract_the_same() {
        let single = json!({ "Run": { "@acc": "SRR000001", "@total_spots": "5" } });
        let many = json!({ "Run": [{ "@acc": "SRR000001", "@total_spots": "5" }] });

        let single_list = RunList::from_runs_tree("1", &single).unwrap();
        let many_list = RunList::from_runs_tree("1", &many).unwrap();
        assert_matches!(single_list, RunList::Single(_));
        assert_matches!(many_list, RunList::Many(_));
        assert_eq!(single_list.accessions(), many_list.accessions());
    }

    #[test]
    fn accession_order_follows_source() {
        let tree = json!({ "Run": [{ "@acc": "SRR3" }, { "@acc": "SRR1" }, { "@acc": "SRR2" }] });
        let accs = extract_accessions("1", &tree).unwrap();
        assert_eq!(accs, vec!["SRR3", "SRR1", "SRR2"]);
    }

    #[test]
    fn missing_accession_in_many_is_malformed() {
        let tree = json!({ "Run": [{ "@acc": "SRR1" }, { "@total_spots": "3" }] });
        let err = extract_accessions("42", &tree).unwrap_err();
        assert_matches!(err, ExplorerError::MalformedBatch { uid, .. } if uid == "42");
    }

    #[test]
    fn missing_accession_in_single_is_malformed() {
        let tree = json!({ "Run": { "@total_spots": "3" } });
        let err = extract_accessions("7", &tree).unwrap_err();
        assert_matches!(err, ExplorerError::MalformedBatch { .. });
    }

    #[test]
    fn batch_summary_fields() {
        let experiment = json!({
            "Summary": {
                "Title": "Sample One",
                "Platform": { "@instrument_model": "X", "#text": "ILLUMINA" },
                "Statistics": { "@total_bases": "1234567890" }
            }
        });
        let summary = extract_batch_summary("1", &experiment, &json!("2020-01-01")).unwrap();
        assert_eq!(summary.title, "Sample One");
        assert_eq!(summary.platform, "X");
        assert_eq!(summary.total_bases, 1_234_567_890);
        assert_eq!(summary.created_date, "2020-01-01");
    }

    #[test]
    fn non_numeric_total_bases_is_malformed() {
        let experiment = json!({
            "Summary": {
                "Title": "t",
                "Platform": { "@instrument_model": "X" },
                "Statistics": { "@total_bases": "lots" }
            }
        });
        let err = extract_batch_summary("1", &experiment, &json!("2020-01-01")).unwrap_err();
        assert_matches!(err, ExplorerError::MalformedBatch { .. });
    }

    #[test]
    fn empty_summary_page() {
        let payload = json!({ "header": {}, "esummaryresult": ["Empty result - nothing todo"] });
        assert!(decode_summary_page(&payload).unwrap().is_empty());
        let payload = json!({ "result": { "uids": [] } });
        assert!(decode_summary_page(&payload).unwrap().is_empty());
    }

    #[test]
    fn expired_session_is_a_search_error() {
        let payload = json!({
            "header": { "type": "esummary", "version": "0.3" },
            "esummaryresult": ["Unable to obtain query #1"]
        });
        let err = decode_summary_page(&payload).unwrap_err();
        assert_matches!(err, ExplorerError::SearchResponse(ref message) if message.contains("Unable to obtain query"));
        assert_eq!(err.exit_code(), 4);
    }
}
