//! Lattice projection service entry point.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use lt_01_content_store::{ContentStore, FileKv, KeyValueStore, MemoryKv};
use node_runtime::runner::{self, LiveOutcome};
use node_runtime::{RuntimeConfig, StoreBackend};

#[tokio::main]
async fn main() -> Result<()> {
    lattice_telemetry::logging::init()?;
    lattice_telemetry::metrics::register_metrics()?;

    let config = RuntimeConfig::from_env();

    info!("===========================================");
    info!("  Lattice Projection v0.1.0");
    info!("===========================================");
    info!(backend = ?config.backend, data_dir = %config.data_dir.display(), "configuration loaded");

    match config.backend {
        StoreBackend::Memory => run(config, MemoryKv::new()).await,
        StoreBackend::File => {
            let path = config.data_dir.join("projection.db");
            run(config, FileKv::open(path)?).await
        }
        #[cfg(feature = "rocksdb")]
        StoreBackend::Rocks => {
            let path = config.data_dir.join("rocksdb");
            run(config, lt_01_content_store::adapters::RocksKv::open(path)?).await
        }
    }
}

async fn run<K>(config: RuntimeConfig, kv: K) -> Result<()>
where
    K: KeyValueStore + 'static,
{
    let store = Arc::new(ContentStore::new(kv));

    if config.genesis_import {
        runner::run_genesis(config, store).await?;
        return Ok(());
    }

    match runner::run_live(config, store).await? {
        LiveOutcome::ForkReverted => {
            // Clean-restart contract: the supervisor resubscribes from
            // the rewound checkpoint.
            info!("fork revert complete, exiting for restart");
            std::process::exit(0);
        }
        LiveOutcome::Stopped => Ok(()),
    }
}
