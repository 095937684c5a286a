//! Allocator configuration parameters.

use crate::{
  block::{HEADER_SIZE, MAX_WORD_SIZE},
  error::ConfigError,
};

/// Configuration for an [`Allocator`](crate::Allocator).
///
/// The defaults give the full allocator: first-fit reuse, splitting,
/// immediate coalescing and wilderness extension. [`AllocatorConfig::bump`]
/// and [`AllocatorConfig::first_fit`] switch those features off to get the
/// simpler behaviours back. Validated when the allocator is built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllocatorConfig {
  /// Largest single request in bytes. Larger or zero sized requests fail.
  ///
  /// Default: 100_000_000.
  pub max_request: usize,

  /// Granularity of payload sizes and block addresses.
  ///
  /// Default: 4. Must be a power of two no larger than the header alignment.
  pub word_size: usize,

  /// Smallest payload worth carving out as its own block when splitting.
  ///
  /// A block is split only when the leftover is at least this plus one
  /// header. Default: 128.
  pub min_split_payload: usize,

  /// Search released blocks before growing the arena.
  pub reuse_free_blocks: bool,

  /// Split reused blocks whose leftover clears the split threshold.
  pub split: bool,

  /// Merge released blocks with free neighbours.
  pub coalesce: bool,

  /// Grow a free or reallocated tail block in place instead of appending.
  pub extend_wilderness: bool,
}

impl AllocatorConfig {
  pub const DEFAULT_MAX_REQUEST: usize = 100_000_000;

  pub const DEFAULT_WORD_SIZE: usize = 4;

  pub const DEFAULT_MIN_SPLIT_PAYLOAD: usize = 128;

  /// Upper bound on `max_request`, leaving room for header and rounding
  /// arithmetic without overflow.
  pub const MAX_REQUEST_LIMIT: usize = isize::MAX as usize / 2;

  /// The full allocator.
  pub fn new() -> Self {
    Self {
      max_request: Self::DEFAULT_MAX_REQUEST,
      word_size: Self::DEFAULT_WORD_SIZE,
      min_split_payload: Self::DEFAULT_MIN_SPLIT_PAYLOAD,
      reuse_free_blocks: true,
      split: true,
      coalesce: true,
      extend_wilderness: true,
    }
  }

  /// Every allocation grows the arena; released memory is never handed out
  /// again.
  pub fn bump() -> Self {
    Self {
      reuse_free_blocks: false,
      split: false,
      coalesce: false,
      extend_wilderness: false,
      ..Self::new()
    }
  }

  /// First-fit reuse of released blocks, which are handed out whole and
  /// never split or merged.
  pub fn first_fit() -> Self {
    Self {
      split: false,
      coalesce: false,
      extend_wilderness: false,
      ..Self::new()
    }
  }

  /// Leftover payload (after one header) a block must have to be split.
  pub fn split_threshold(&self) -> usize {
    self.min_split_payload + HEADER_SIZE
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if !self.word_size.is_power_of_two() || self.word_size > MAX_WORD_SIZE {
      return Err(ConfigError::WordSize {
        word_size: self.word_size,
        max: MAX_WORD_SIZE,
      });
    }

    if self.max_request == 0 || self.max_request > Self::MAX_REQUEST_LIMIT {
      return Err(ConfigError::MaxRequest {
        max_request: self.max_request,
        limit: Self::MAX_REQUEST_LIMIT,
      });
    }

    Ok(())
  }
}

impl Default for AllocatorConfig {
  fn default() -> Self {
    Self::new()
  }
}
