use std::io::{self, Write};

use serde::Serialize;

use crate::app::{BanksResult, ClearResult, ExportResult, PassReport};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_banks(result: &BanksResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_fetch(result: &PassReport) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_export(result: &ExportResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_clear(result: &ClearResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl crate::app::ProgressSink for JsonOutput {
    fn event(&self, event: crate::app::ProgressEvent) {
        tracing::debug!(message = %event.message, "progress");
    }
}
