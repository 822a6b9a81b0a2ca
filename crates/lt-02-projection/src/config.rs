//! Projection configuration.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ProjectionConfig {
    /// Community attributed to content that does not carry one.
    pub default_community: String,
    /// Maximum depth encoded into comment ordering keys. Deeper replies
    /// keep arrival order but share the truncated prefix.
    pub max_nested_index_depth: u32,
    /// Chain round length in blocks.
    pub round_length: u64,
    /// Undo frames are retained for `round_length * fork_window_multiplier`
    /// blocks behind the checkpoint - headroom beyond any observed fork
    /// depth.
    pub fork_window_multiplier: u64,
    /// How often the pruner wakes up.
    pub prune_interval: Duration,
    /// Body preview length, in characters.
    pub preview_length: usize,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            default_community: "gls".to_string(),
            max_nested_index_depth: 8,
            round_length: 21,
            fork_window_multiplier: 3,
            prune_interval: Duration::from_secs(300),
            preview_length: 600,
        }
    }
}

impl ProjectionConfig {
    /// Retained undo-log depth, in blocks.
    pub fn safety_window(&self) -> u64 {
        self.round_length * self.fork_window_multiplier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_safety_window() {
        assert_eq!(ProjectionConfig::default().safety_window(), 63);
    }
}
