//! Run modes: live pipeline and one-shot genesis import.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{error, info};

use lt_01_content_store::{ContentStore, KeyValueStore};
use lt_02_projection::{DispersalPipeline, PipelineOutcome, Projector, UndoPruner};
use lt_03_genesis_import::{GenesisImporter, ImportReport};

use crate::config::RuntimeConfig;
use crate::genesis_source::{GenesisFileSource, GenesisStreamEvent};
use crate::subscription::replay_block_file;

/// How the live run ended; the binary maps this to its exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveOutcome {
    /// Fork reverted - exit zero so the supervisor restarts cleanly.
    ForkReverted,
    /// Operator stop (Ctrl-C) or end of a replay file.
    Stopped,
}

/// Start the live pipeline and its pruner and wait for either to end.
pub async fn run_live<K>(config: RuntimeConfig, store: Arc<ContentStore<K>>) -> Result<LiveOutcome>
where
    K: KeyValueStore + 'static,
{
    let checkpoint = store.checkpoint()?;
    info!(
        last_block = checkpoint.last_block_num,
        "starting live projection from checkpoint"
    );

    let projector = Projector::new(Arc::clone(&store), config.projection.clone());
    let pipeline = DispersalPipeline::spawn(projector);

    let pruner = UndoPruner::new(Arc::clone(&store), config.projection.clone());
    let mut pruner_task = tokio::spawn(pruner.run());

    // The subscription transport pushes into a sink from outside this
    // process boundary; the optional replay file stands in for it on
    // local runs. Without either, the sink stays parked until Ctrl-C.
    let sink = pipeline.sink();
    let _transport_sink = match &config.replay_blocks_path {
        Some(path) => {
            replay_block_file(path, &sink)?;
            drop(sink);
            None
        }
        None => Some(sink),
    };

    let mut pipeline_join = std::pin::pin!(pipeline.join());

    tokio::select! {
        outcome = &mut pipeline_join => {
            match outcome? {
                PipelineOutcome::ForkReverted => Ok(LiveOutcome::ForkReverted),
                PipelineOutcome::SourceClosed => {
                    if config.replay_blocks_path.is_some() {
                        info!("replay source drained, stopping");
                        Ok(LiveOutcome::Stopped)
                    } else {
                        bail!("block source closed unexpectedly")
                    }
                }
            }
        }
        result = &mut pruner_task => {
            // The pruner only returns on failure; that is fatal.
            match result {
                Ok(Err(err)) => {
                    error!(%err, "undo pruning failed");
                    Err(err.into())
                }
                Ok(Ok(())) => bail!("pruner stopped unexpectedly"),
                Err(err) => Err(err).context("pruner task died"),
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, stopping");
            pruner_task.abort();
            Ok(LiveOutcome::Stopped)
        }
    }
}

/// Drive the one-shot genesis import from the configured dataset file.
/// Assumes a pristine store; any batch failure aborts the run.
pub async fn run_genesis<K>(
    config: RuntimeConfig,
    store: Arc<ContentStore<K>>,
) -> Result<ImportReport>
where
    K: KeyValueStore + 'static,
{
    let path = config
        .genesis_path
        .as_ref()
        .context("LT_GENESIS_PATH is required in genesis import mode")?;

    info!(path = %path.display(), "starting genesis import");
    let mut source = GenesisFileSource::open(path)?;
    let mut importer = GenesisImporter::new(store, config.import.clone());

    while let Some(event) = source.next_event()? {
        match event {
            GenesisStreamEvent::Record(record) => importer.handle(record).await?,
            GenesisStreamEvent::EndOfType(kind) => importer.end_of_type(kind).await?,
        }
    }

    let report = importer.finish();
    info!(
        profiles = report.profiles,
        posts = report.posts,
        comments = report.comments,
        leaders = report.leaders,
        subscriptions = report.subscriptions,
        orphaned_comments = report.orphaned_comments,
        "genesis import finished"
    );
    Ok(report)
}
