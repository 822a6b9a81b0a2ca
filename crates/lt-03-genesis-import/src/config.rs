//! Genesis import configuration.

#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Community attributed to imported content.
    pub default_community: String,
    /// Entries accumulated per collection before one bulk write.
    pub batch_size: usize,
    /// Bounded capacity of the comment parent cache.
    pub cache_capacity: usize,
    /// Maximum reconciliation tasks in flight.
    pub pool_concurrency: usize,
    /// Maximum depth encoded into comment ordering keys; must match the
    /// live path so both produce identical entity shapes.
    pub max_nested_index_depth: u32,
    /// Body preview length, in characters.
    pub preview_length: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            default_community: "gls".to_string(),
            batch_size: 1000,
            cache_capacity: 10_000,
            pool_concurrency: 10,
            max_nested_index_depth: 8,
            preview_length: 600,
        }
    }
}
