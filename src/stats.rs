//! Read-only statistics over the block chain.

use crate::{allocator::Allocator, block::HEADER_SIZE, grower::ArenaGrower};

/// A snapshot of the chain, taken in a single walk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeapStats {
  /// Blocks currently free.
  pub free_blocks: usize,
  /// Payload bytes in free blocks.
  pub free_bytes: usize,
  /// All blocks, free or in use.
  pub blocks: usize,
  /// Payload bytes in all blocks, free or in use.
  pub bytes: usize,
  /// Bytes spent on headers.
  pub meta_data_bytes: usize,
}

impl<G: ArenaGrower> Allocator<G> {
  pub fn num_free_blocks(&self) -> usize {
    self.chain.iter().filter(|block| block.is_free()).count()
  }

  pub fn num_free_bytes(&self) -> usize {
    self
      .chain
      .iter()
      .filter(|block| block.is_free())
      .map(|block| block.usable_size())
      .sum()
  }

  /// Number of blocks in the chain, free ones included.
  pub fn num_allocated_blocks(&self) -> usize {
    self.chain.iter().count()
  }

  /// Payload bytes across the chain, free ones included. Headers are not
  /// counted.
  pub fn num_allocated_bytes(&self) -> usize {
    self.chain.iter().map(|block| block.usable_size()).sum()
  }

  pub fn num_meta_data_bytes(&self) -> usize {
    self.num_allocated_blocks() * HEADER_SIZE
  }

  /// Size of one block header.
  pub fn size_meta_data(&self) -> usize {
    HEADER_SIZE
  }

  pub fn stats(&self) -> HeapStats {
    let mut stats = HeapStats::default();

    for block in self.chain.iter() {
      stats.blocks += 1;
      stats.bytes += block.usable_size();

      if block.is_free() {
        stats.free_blocks += 1;
        stats.free_bytes += block.usable_size();
      }
    }

    stats.meta_data_bytes = stats.blocks * HEADER_SIZE;
    stats
  }
}
