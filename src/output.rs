use std::io::{self, Write};

use serde::Serialize;

use crate::explorer::{ExploreResult, ProgressEvent, ProgressSink};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_explore(result: &ExploreResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn render_json<T: Serialize>(value: &T) -> io::Result<String> {
        serde_json::to_string_pretty(value).map_err(io::Error::other)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = Self::render_json(value)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

pub struct ConsoleOutput;

impl ConsoleOutput {
    pub fn print_explore(result: &ExploreResult) -> io::Result<()> {
        let mut stdout = io::stdout();
        writeln!(stdout, "Analyzed: {} samples", result.runs_processed)?;
        Ok(())
    }
}

impl ProgressSink for ConsoleOutput {
    fn event(&self, event: ProgressEvent) {
        let mut stdout = io::stdout().lock();
        let _ = writeln!(stdout, "{}", event.message);
    }
}
