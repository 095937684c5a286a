//! Splitting oversized blocks and folding free neighbours back together.

use crate::{
  block::{Block, HEADER_SIZE},
  chain::Chain,
};

impl Chain {
  /// Absorbs free neighbours of `block` and returns the surviving block.
  ///
  /// The predecessor is checked first: if it is free, `block` folds into it
  /// and the predecessor becomes the survivor. The survivor's successor is
  /// then absorbed if free. Because no two free blocks are ever adjacent on
  /// entry, one step in each direction is enough.
  ///
  /// The free flag of `block` itself is not read or changed.
  pub fn merge(
    &mut self,
    block: Block,
  ) -> Block {
    let mut survivor = block;

    if let Some(prev) = block.prev().filter(|prev| prev.is_free()) {
      log::trace!("merge {:p} into predecessor {:p}", block.address(), prev.address());
      prev.set_usable_size(prev.usable_size() + block.usable_size() + HEADER_SIZE);
      self.remove(block);
      survivor = prev;
    }

    if let Some(next) = survivor.next().filter(|next| next.is_free()) {
      log::trace!("merge successor {:p} into {:p}", next.address(), survivor.address());
      survivor.set_usable_size(survivor.usable_size() + next.usable_size() + HEADER_SIZE);
      self.remove(next);
    }

    survivor
  }

  /// Shrinks `block` to `size` payload bytes and turns the rest into a new
  /// free block linked right after it.
  ///
  /// The caller guarantees `block.usable_size() >= size + HEADER_SIZE` and
  /// that `size` keeps the new header word aligned.
  pub fn split(
    &mut self,
    block: Block,
    size: usize,
  ) -> Block {
    let rest = block.usable_size() - size - HEADER_SIZE;

    block.set_usable_size(size);
    // SAFETY: the remainder lies inside the payload `block` just gave up.
    let remainder = unsafe { Block::format(block.end(), rest) };
    remainder.set_free(true);
    self.insert_after(block, remainder);

    log::trace!(
      "split {:p}: kept {} bytes, new free block {:p} with {} bytes",
      block.address(),
      size,
      remainder.address(),
      rest
    );

    remainder
  }
}
