// src/config.rs

pub const DEFAULT_MAX_BLOCK: usize = 512;
pub const DEFAULT_MAX_PENDING_NOTES: usize = 256;
pub const DEFAULT_COMMAND_CAPACITY: usize = 1024;
pub const DEFAULT_FEEDBACK_CAPACITY: usize = 256;

/// Sizing and seeding for an engine and its bridge.
///
/// Everything the audio thread needs is allocated up front from these
/// values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Largest block the engine processes in one pass (frames). Longer
    /// host blocks are split.
    pub max_block_size: usize,

    /// Note-offs that can be pending at once.
    pub max_pending_notes: usize,

    /// UI -> engine command queue length.
    pub command_capacity: usize,

    /// Engine -> UI feedback queue length.
    pub feedback_capacity: usize,

    /// Seed for the probability and velocity draws. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_block_size: DEFAULT_MAX_BLOCK,
            max_pending_notes: DEFAULT_MAX_PENDING_NOTES,
            command_capacity: DEFAULT_COMMAND_CAPACITY,
            feedback_capacity: DEFAULT_FEEDBACK_CAPACITY,
            seed: None,
        }
    }
}

impl EngineConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}
