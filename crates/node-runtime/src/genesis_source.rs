//! Genesis dataset file adapter.
//!
//! The one-shot genesis collaborator is modeled as a JSON-lines file:
//! record lines `{"type": "...", "data": {...}}` and end-of-type marker
//! lines `{"end": "..."}`. Kinds may interleave; each kind's marker must
//! follow its last record.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use shared_types::{GenesisRecord, GenesisRecordKind};

#[derive(Debug)]
pub enum GenesisStreamEvent {
    Record(GenesisRecord),
    EndOfType(GenesisRecordKind),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Line {
    End { end: GenesisRecordKind },
    Record(GenesisRecord),
}

pub struct GenesisFileSource {
    reader: BufReader<File>,
    line_num: usize,
}

impl GenesisFileSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("opening genesis dataset {}", path.display()))?;
        Ok(Self {
            reader: BufReader::new(file),
            line_num: 0,
        })
    }

    /// Next event, or `None` at end of file. Blank lines are skipped.
    pub fn next_event(&mut self) -> Result<Option<GenesisStreamEvent>> {
        loop {
            let mut line = String::new();
            let read = self
                .reader
                .read_line(&mut line)
                .with_context(|| format!("reading genesis line {}", self.line_num + 1))?;
            if read == 0 {
                return Ok(None);
            }
            self.line_num += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let parsed: Line = serde_json::from_str(trimmed)
                .with_context(|| format!("parsing genesis line {}", self.line_num))?;
            return Ok(Some(match parsed {
                Line::End { end } => GenesisStreamEvent::EndOfType(end),
                Line::Record(record) => GenesisStreamEvent::Record(record),
            }));
        }
    }
}
