use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde_json::{Map, Value};

use crate::error::ExplorerError;

const ROOT: &str = "document";

// Attributes become "@name" keys, text beside attributes or children goes
// under "#text", repeated siblings collapse into an array.
pub fn decode_embedded_markup(raw: &str) -> Result<Value, ExplorerError> {
    let wrapped = format!("<{ROOT}>{}</{ROOT}>", raw.trim());
    let mut reader = Reader::from_str(&wrapped);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<Value> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|err| markup_error(&reader, err))?;
        match event {
            Event::Start(start) => {
                ensure_open_root(&stack, &root)?;
                stack.push(Frame::open(&start)?);
            }
            Event::Empty(start) => {
                ensure_open_root(&stack, &root)?;
                let value = Frame::open(&start)?.into_value();
                attach(&mut stack, &mut root, element_name(&start), value);
            }
            Event::End(_) => {
                let frame = stack
                    .pop()
                    .ok_or_else(|| ExplorerError::Markup("unbalanced closing tag".to_string()))?;
                let name = frame.name.clone();
                attach(&mut stack, &mut root, name, frame.into_value());
            }
            Event::Text(text) => {
                let value = text
                    .unescape()
                    .map_err(|err| ExplorerError::Markup(err.to_string()))?;
                push_text(&mut stack, &value)?;
            }
            Event::CData(data) => {
                let value = String::from_utf8_lossy(&data.into_inner()).into_owned();
                push_text(&mut stack, &value)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(ExplorerError::Markup(format!(
            "unexpected end of input inside <{}>",
            stack.last().map(|frame| frame.name.as_str()).unwrap_or(ROOT)
        )));
    }
    root.ok_or_else(|| ExplorerError::Markup("empty document".to_string()))
}

struct Frame {
    name: String,
    fields: Map<String, Value>,
    text: String,
}

impl Frame {
    fn open(start: &BytesStart<'_>) -> Result<Self, ExplorerError> {
        let mut fields = Map::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|err| ExplorerError::Markup(err.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|err| ExplorerError::Markup(err.to_string()))?;
            fields.insert(format!("@{key}"), Value::String(value.into_owned()));
        }
        Ok(Self {
            name: element_name(start),
            fields,
            text: String::new(),
        })
    }

    fn into_value(self) -> Value {
        if self.fields.is_empty() {
            if self.text.is_empty() {
                return Value::Null;
            }
            return Value::String(self.text);
        }
        let mut fields = self.fields;
        if !self.text.is_empty() {
            fields.insert("#text".to_string(), Value::String(self.text));
        }
        Value::Object(fields)
    }

    fn add_child(&mut self, name: String, value: Value) {
        match self.fields.get_mut(&name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                self.fields.insert(name, value);
            }
        }
    }
}

fn element_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.name().as_ref()).into_owned()
}

fn ensure_open_root(stack: &[Frame], root: &Option<Value>) -> Result<(), ExplorerError> {
    if stack.is_empty() && root.is_some() {
        return Err(ExplorerError::Markup(
            "content after the end of the document".to_string(),
        ));
    }
    Ok(())
}

fn attach(stack: &mut [Frame], root: &mut Option<Value>, name: String, value: Value) {
    match stack.last_mut() {
        Some(parent) => parent.add_child(name, value),
        None => *root = Some(value),
    }
}

fn push_text(stack: &mut [Frame], value: &str) -> Result<(), ExplorerError> {
    let frame = stack
        .last_mut()
        .ok_or_else(|| ExplorerError::Markup("text outside of the document".to_string()))?;
    if !frame.text.is_empty() {
        frame.text.push(' ');
    }
    frame.text.push_str(value);
    Ok(())
}

fn markup_error(reader: &Reader<&[u8]>, err: quick_xml::Error) -> ExplorerError {
    ExplorerError::Markup(format!("{err} at byte {}", reader.buffer_position()))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn single_run_is_an_object() {
        let tree = decode_embedded_markup(
            r#"<Run acc="SRR000001" total_spots="10" total_bases="1000" is_public="true"/>"#,
        )
        .unwrap();
        assert_eq!(tree["Run"]["@acc"], json!("SRR000001"));
        assert!(tree["Run"].is_object());
    }

    #[test]
    fn repeated_runs_become_an_array() {
        let tree = decode_embedded_markup(
            r#"<Run acc="SRR000001"/><Run acc="SRR000002"/><Run acc="SRR000003"/>"#,
        )
        .unwrap();
        let runs = tree["Run"].as_array().unwrap();
        let accs: Vec<_> = runs.iter().map(|run| run["@acc"].as_str().unwrap()).collect();
        assert_eq!(accs, vec!["SRR000001", "SRR000002", "SRR000003"]);
    }

    #[test]
    fn plain_text_becomes_a_string() {
        let tree = decode_embedded_markup("2020/01/01").unwrap();
        assert_eq!(tree, json!("2020/01/01"));
    }

    #[test]
    fn experiment_summary_shape() {
        let raw = r#"
            <Summary>
              <Title>RNA-seq of liver &amp; kidney</Title>
              <Platform instrument_model="Illumina HiSeq 2500">ILLUMINA</Platform>
              <Statistics total_runs="1" total_spots="100" total_bases="1234567890" total_size="99" load_done="true"/>
            </Summary>
            <Submitter acc="SRA000001" center_name="GEO"/>
            <Bioproject>PRJNA000001</Bioproject>
        "#;
        let tree = decode_embedded_markup(raw).unwrap();
        let summary = &tree["Summary"];
        assert_eq!(summary["Title"], json!("RNA-seq of liver & kidney"));
        assert_eq!(
            summary["Platform"]["@instrument_model"],
            json!("Illumina HiSeq 2500")
        );
        assert_eq!(summary["Platform"]["#text"], json!("ILLUMINA"));
        assert_eq!(summary["Statistics"]["@total_bases"], json!("1234567890"));
        assert_eq!(tree["Bioproject"], json!("PRJNA000001"));
    }

    #[test]
    fn empty_element_is_null() {
        let tree = decode_embedded_markup("<Library_descriptor><Name/></Library_descriptor>").unwrap();
        assert_eq!(tree["Library_descriptor"]["Name"], Value::Null);
    }

    #[test]
    fn mismatched_tags_are_rejected() {
        let err = decode_embedded_markup("<Run acc=\"SRR1\"></Experiment>").unwrap_err();
        assert_matches!(err, ExplorerError::Markup(_));
    }

    #[test]
    fn unclosed_tags_are_rejected() {
        let err = decode_embedded_markup("<Summary><Title>x</Title>").unwrap_err();
        assert_matches!(err, ExplorerError::Markup(_));
    }
}
