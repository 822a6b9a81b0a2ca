//! Block stream adapters.
//!
//! The chain-subscription transport is an external collaborator: anything
//! able to push ordered [`BlockEnvelope`]s and a fork signal into a
//! [`BlockSink`] can drive the pipeline. The file adapter here replays a
//! captured stream - block lines plus an optional `{"fork": true}` marker
//! - for local runs and tests.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use lt_02_projection::pipeline::BlockSink;
use shared_types::BlockEnvelope;

#[derive(Deserialize)]
#[serde(untagged)]
enum Line {
    Fork { fork: bool },
    Block(Box<BlockEnvelope>),
}

/// Replay a block file into the sink. Returns the number of blocks
/// submitted; stops early (and returns) once a fork marker is replayed,
/// mirroring the subscription's halt-on-fork contract.
pub fn replay_block_file(path: impl AsRef<Path>, sink: &BlockSink) -> Result<u64> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("opening block file {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut submitted = 0u64;
    for (index, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("reading block line {}", index + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let parsed: Line = serde_json::from_str(trimmed)
            .with_context(|| format!("parsing block line {}", index + 1))?;
        match parsed {
            Line::Fork { fork } => {
                if fork {
                    info!("replaying fork signal");
                    sink.signal_fork();
                    break;
                }
            }
            Line::Block(block) => {
                if sink.submit_block(*block) {
                    submitted += 1;
                }
            }
        }
    }

    info!(submitted, "block replay finished");
    Ok(submitted)
}
