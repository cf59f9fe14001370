//! Construction parameters of the [`UnboundedQueue`].
//!
//! [`UnboundedQueue`]: crate::UnboundedQueue

/// Slots per block when none is configured.
#[cfg(not(loom))]
pub(crate) const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Slots per block when none is configured.
///
/// When using loom, we shrink the blocks so that block hand-over and recycling are reached
/// within a handful of operations.
#[cfg(loom)]
pub(crate) const DEFAULT_CHUNK_SIZE: usize = 2;

/// Retired blocks kept for reuse when none is configured.
#[cfg(not(loom))]
pub(crate) const DEFAULT_FREE_BLOCKS: usize = 4;

/// Retired blocks kept for reuse when none is configured.
#[cfg(loom)]
pub(crate) const DEFAULT_FREE_BLOCKS: usize = 1;

/// Sizes the blocks of an [`UnboundedQueue`] and its recycling pool.
///
/// # Examples
///
/// ```
/// use lf_ring::{UnboundedConfig, UnboundedQueue};
///
/// let config = UnboundedConfig::new().chunk_size(64).free_blocks(2);
/// let queue = UnboundedQueue::<u32>::with_config(config);
///
/// assert_eq!(queue.chunk_size(), 64);
/// ```
///
/// [`UnboundedQueue`]: crate::UnboundedQueue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnboundedConfig {
    pub(crate) chunk_size: usize,
    pub(crate) free_blocks: usize,
}

impl UnboundedConfig {
    /// Creates the default configuration: 1024 slots per block and up to 4 recycled blocks.
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            free_blocks: DEFAULT_FREE_BLOCKS,
        }
    }

    /// Sets the number of slots per block.
    ///
    /// # Panics
    ///
    /// Panics if `chunk_size` is 0.
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "chunk size must be non-zero");
        self.chunk_size = chunk_size;
        self
    }

    /// Sets how many drained blocks are kept for reuse instead of being freed.
    ///
    /// With 0, every drained block is freed and every new block is allocated.
    pub fn free_blocks(mut self, free_blocks: usize) -> Self {
        self.free_blocks = free_blocks;
        self
    }
}

impl Default for UnboundedConfig {
    fn default() -> Self {
        Self::new()
    }
}
