//! Environment-driven runtime configuration.
//!
//! Every knob has a default; `LT_*` variables override.

use std::path::PathBuf;
use std::time::Duration;

use lt_02_projection::ProjectionConfig;
use lt_03_genesis_import::ImportConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    File,
    #[cfg(feature = "rocksdb")]
    Rocks,
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub backend: StoreBackend,
    pub data_dir: PathBuf,
    /// One-shot genesis import mode instead of the live pipeline.
    pub genesis_import: bool,
    /// Genesis dataset file (JSON lines), required in import mode.
    pub genesis_path: Option<PathBuf>,
    /// Optional block file to replay into the live pipeline.
    pub replay_blocks_path: Option<PathBuf>,
    pub projection: ProjectionConfig,
    pub import: ImportConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::File,
            data_dir: PathBuf::from("./data"),
            genesis_import: false,
            genesis_path: None,
            replay_blocks_path: None,
            projection: ProjectionConfig::default(),
            import: ImportConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from the environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(backend) = std::env::var("LT_STORE_BACKEND") {
            match backend.as_str() {
                "memory" => config.backend = StoreBackend::Memory,
                "file" => config.backend = StoreBackend::File,
                #[cfg(feature = "rocksdb")]
                "rocksdb" => config.backend = StoreBackend::Rocks,
                other => tracing::warn!(backend = other, "unknown store backend, keeping default"),
            }
        }
        if let Ok(dir) = std::env::var("LT_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        config.genesis_import = std::env::var("LT_GENESIS_IMPORT")
            .map(|flag| flag == "1" || flag == "true")
            .unwrap_or(false);
        if let Ok(path) = std::env::var("LT_GENESIS_PATH") {
            config.genesis_path = Some(PathBuf::from(path));
        }
        if let Ok(path) = std::env::var("LT_REPLAY_BLOCKS") {
            config.replay_blocks_path = Some(PathBuf::from(path));
        }

        if let Some(community) = env_string("LT_COMMUNITY") {
            config.projection.default_community = community.clone();
            config.import.default_community = community;
        }
        if let Some(depth) = env_parse("LT_MAX_NESTED_DEPTH") {
            config.projection.max_nested_index_depth = depth;
            config.import.max_nested_index_depth = depth;
        }
        if let Some(length) = env_parse("LT_PREVIEW_LENGTH") {
            config.projection.preview_length = length;
            config.import.preview_length = length;
        }
        if let Some(round) = env_parse("LT_ROUND_LENGTH") {
            config.projection.round_length = round;
        }
        if let Some(multiplier) = env_parse("LT_FORK_WINDOW_MULT") {
            config.projection.fork_window_multiplier = multiplier;
        }
        if let Some(secs) = env_parse::<u64>("LT_PRUNE_INTERVAL_SECS") {
            config.projection.prune_interval = Duration::from_secs(secs.max(1));
        }
        if let Some(size) = env_parse("LT_GENESIS_BATCH_SIZE") {
            config.import.batch_size = size;
        }
        if let Some(capacity) = env_parse("LT_GENESIS_CACHE_CAPACITY") {
            config.import.cache_capacity = capacity;
        }
        if let Some(concurrency) = env_parse("LT_GENESIS_POOL_CONCURRENCY") {
            config.import.pool_concurrency = concurrency;
        }

        config
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|value| value.parse().ok())
}
