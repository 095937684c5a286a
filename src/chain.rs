use std::ptr::NonNull;

use crate::{block::Block, error::ChainError};

/// Address ordered, doubly linked list of every block in the arena.
///
/// The chain only does pointer surgery on headers it is handed. Keeping the
/// blocks contiguous is the caller's job; [`Chain::verify`] checks it.
pub(crate) struct Chain {
  first: Option<Block>,
  last: Option<Block>,
}

impl Chain {
  pub const fn new() -> Self {
    Self {
      first: None,
      last: None,
    }
  }

  pub fn first(&self) -> Option<Block> {
    self.first
  }

  /// The wilderness block, adjacent to the arena break.
  pub fn last(&self) -> Option<Block> {
    self.last
  }

  pub fn iter(&self) -> Blocks {
    Blocks {
      current: self.first(),
    }
  }

  /// Appends a block freshly carved from the top of the arena.
  pub fn push_back(
    &mut self,
    block: Block,
  ) {
    block.set_prev(self.last);
    block.set_next(None);

    match self.last {
      Some(last) => last.set_next(Some(block)),
      None => self.first = Some(block),
    }
    self.last = Some(block);
  }

  /// Links `new` directly after `block`.
  pub fn insert_after(
    &mut self,
    block: Block,
    new: Block,
  ) {
    let next = block.next();

    new.set_prev(Some(block));
    new.set_next(next);
    block.set_next(Some(new));

    match next {
      Some(next) => next.set_prev(Some(new)),
      None => self.last = Some(new),
    }
  }

  /// Unlinks `block`. Its memory is expected to be absorbed by a neighbour.
  pub fn remove(
    &mut self,
    block: Block,
  ) {
    let prev = block.prev();
    let next = block.next();

    match prev {
      Some(prev) => prev.set_next(next),
      None => self.first = next,
    }
    match next {
      Some(next) => next.set_prev(prev),
      None => self.last = prev,
    }
  }

  /// Walks the whole chain and checks the structural invariants.
  ///
  /// `brk` is the current arena break; the last block must end exactly there.
  /// Adjacent free blocks are only an error when `coalescing` is on.
  pub fn verify(
    &self,
    word: usize,
    brk: NonNull<u8>,
    coalescing: bool,
  ) -> Result<(), ChainError> {
    let mut prev: Option<Block> = None;

    for block in self.iter() {
      let address = block.address().as_ptr() as usize;

      if address % word != 0 {
        return Err(ChainError::Misaligned { address, word });
      }
      if block.usable_size() % word != 0 {
        return Err(ChainError::UnalignedSize {
          address,
          size: block.usable_size(),
          word,
        });
      }
      if block.prev() != prev {
        return Err(ChainError::BrokenLink { address });
      }

      if let Some(prev) = prev {
        let end = prev.end().as_ptr() as usize;
        if end != address {
          return Err(ChainError::Gap { end, next: address });
        }
        if coalescing && prev.is_free() && block.is_free() {
          return Err(ChainError::AdjacentFree {
            first: prev.address().as_ptr() as usize,
            second: address,
          });
        }
      }

      prev = Some(block);
    }

    if prev != self.last {
      return Err(ChainError::TailMismatch);
    }

    if let Some(last) = self.last {
      let end = last.end().as_ptr() as usize;
      let brk = brk.as_ptr() as usize;
      if end != brk {
        return Err(ChainError::HighWaterMismatch { end, brk });
      }
    }

    Ok(())
  }
}

/// Iterator over the chain in address order.
pub(crate) struct Blocks {
  current: Option<Block>,
}

impl Iterator for Blocks {
  type Item = Block;

  fn next(&mut self) -> Option<Block> {
    let block = self.current?;
    self.current = block.next();
    Some(block)
  }
}
