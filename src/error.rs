//! Error types surfaced by the allocator.

use thiserror::Error;

/// Recoverable failures of `allocate`, `reallocate` and `zero_allocate`.
///
/// Both variants guarantee that the block chain was left untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum AllocError {
  /// The request was zero bytes, larger than the configured maximum, or
  /// overflowed while computing `count * element_size`.
  #[error("invalid allocation size {requested}: must be between 1 and {max} bytes")]
  InvalidSize {
    /// Number of bytes requested (saturated on overflow).
    requested: usize,
    /// Configured maximum single allocation.
    max: usize,
  },
  /// The growth primitive refused to extend the arena.
  #[error("arena exhausted: could not extend the heap by {requested} bytes")]
  ArenaExhausted {
    /// Number of bytes the arena was asked to grow by.
    requested: usize,
  },
}

/// Rejected [`AllocatorConfig`](crate::AllocatorConfig) values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
  #[error("word size {word_size} must be a power of two no larger than {max}")]
  WordSize { word_size: usize, max: usize },
  #[error("maximum request {max_request} must be between 1 and {limit} bytes")]
  MaxRequest { max_request: usize, limit: usize },
}

/// A structural invariant of the block chain that does not hold.
///
/// Only produced by [`Allocator::verify`](crate::Allocator::verify); a
/// healthy allocator never returns one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ChainError {
  #[error("block at {address:#x} is not aligned to {word} bytes")]
  Misaligned { address: usize, word: usize },
  #[error("block at {address:#x} has usable size {size} which is not a multiple of {word}")]
  UnalignedSize {
    address: usize,
    size: usize,
    word: usize,
  },
  #[error("gap in chain: block ends at {end:#x} but the next header starts at {next:#x}")]
  Gap { end: usize, next: usize },
  #[error("adjacent free blocks at {first:#x} and {second:#x}")]
  AdjacentFree { first: usize, second: usize },
  #[error("block at {address:#x} has a back link that does not match its predecessor")]
  BrokenLink { address: usize },
  #[error("tail pointer does not match the last block reached from the head")]
  TailMismatch,
  #[error("last block ends at {end:#x} but the arena break is at {brk:#x}")]
  HighWaterMismatch { end: usize, brk: usize },
}
