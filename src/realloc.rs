//! Resizing live allocations.

use std::ptr::{self, NonNull};

use crate::{
  allocator::Allocator,
  block::{Block, HEADER_SIZE},
  error::AllocError,
  grower::ArenaGrower,
};

impl<G: ArenaGrower> Allocator<G> {
  /// Resizes the allocation at `address` to hold at least `size` bytes.
  ///
  /// `None` behaves like [`allocate`](Self::allocate). Otherwise the cheapest
  /// applicable strategy wins, in this order:
  ///
  /// 1. the block is already big enough: shrink in place, freeing any slack
  ///    that clears the split threshold;
  /// 2. the block is the wilderness: grow the arena by the shortfall;
  /// 3. the next block is free and the two together are big enough: absorb
  ///    it, freeing any slack;
  /// 4. move the payload into a fresh allocation and release the old one.
  ///
  /// Strategies 1 to 3 keep the address. On error the original allocation is
  /// untouched and still owned by the caller.
  ///
  /// # Safety
  ///
  /// `address`, if present, must have been returned by this allocator and not
  /// released since. After a successful call only the returned pointer is
  /// valid.
  pub unsafe fn reallocate(
    &mut self,
    address: Option<NonNull<u8>>,
    size: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    let rounded = self.round_request(size)?;

    let Some(address) = address else {
      return self.allocate(size);
    };

    let block = unsafe { Block::from_payload(address) };

    if block.usable_size() >= rounded {
      log::trace!("reallocate({:p}, {}): in place", address, rounded);
      self.carve(block, rounded);
      return Ok(address);
    }

    if self.config().extend_wilderness && self.chain.last() == Some(block) {
      let shortfall = rounded - block.usable_size();

      if self.grow(shortfall).is_ok() {
        log::trace!("reallocate({:p}, {}): widened wilderness", address, rounded);
        block.set_usable_size(rounded);
        return Ok(address);
      }

      if let Some(moved) = unsafe { self.absorb_predecessor(block, rounded) } {
        return Ok(moved);
      }
    }

    if self.config().coalesce {
      if let Some(next) = block.next().filter(|next| next.is_free()) {
        let combined = block.usable_size() + HEADER_SIZE + next.usable_size();

        if combined >= rounded {
          log::trace!("reallocate({:p}, {}): absorbed next block", address, rounded);
          self.chain.remove(next);
          block.set_usable_size(combined);
          self.carve(block, rounded);
          return Ok(address);
        }
      }
    }

    unsafe { self.relocate(block, size) }
  }

  /// Grows the wilderness `block` backwards into a free predecessor after the
  /// arena refused to grow by the full shortfall.
  ///
  /// Only taken when the predecessor is where a first-fit search would land
  /// after the merge; an earlier free block that fits is left to relocation.
  /// If the two blocks together are still short, the arena is asked for the
  /// smaller remaining shortfall. Nothing is modified unless the result is
  /// guaranteed to fit, in which case the payload is moved down to the
  /// predecessor's payload address and that address is returned.
  unsafe fn absorb_predecessor(
    &mut self,
    block: Block,
    size: usize,
  ) -> Option<NonNull<u8>> {
    if !self.config().coalesce {
      return None;
    }

    let prev = block.prev().filter(|prev| prev.is_free())?;

    let earlier_fit = self.find_free_block(size).is_some_and(|fit| fit != prev);
    if self.config().reuse_free_blocks && earlier_fit {
      return None;
    }

    let combined = prev.usable_size() + HEADER_SIZE + block.usable_size();

    if combined < size {
      self.grow(size - combined).ok()?;
    }

    let length = block.usable_size();
    let source = block.payload();
    let target = prev.payload();

    self.chain.remove(block);
    prev.set_usable_size(combined.max(size));
    prev.set_free(false);

    // SAFETY: both ranges lie inside the merged block; they may overlap.
    unsafe { ptr::copy(source.as_ptr(), target.as_ptr(), length) };

    log::trace!("reallocate({:p}, {}): moved into predecessor {:p}", source, size, target);
    self.carve(prev, size);

    Some(target)
  }

  /// Copies `block`'s payload into a new allocation of `size` bytes and
  /// releases `block`.
  unsafe fn relocate(
    &mut self,
    block: Block,
    size: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    let target = self.allocate(size)?;

    let source = block.payload();
    let length = block.usable_size().min(unsafe { self.usable_size(target) });

    // SAFETY: `block` is still in use, so `allocate` cannot have handed out
    // any of its bytes.
    unsafe {
      ptr::copy_nonoverlapping(source.as_ptr(), target.as_ptr(), length);
      self.release(source);
    }

    log::trace!("reallocate({:p}, {}): relocated to {:p}", source, size, target);

    Ok(target)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{allocator::tests::allocator, config::AllocatorConfig, grower::FixedArena};

  unsafe fn fill(
    ptr: NonNull<u8>,
    len: usize,
    seed: u8,
  ) {
    for i in 0..len {
      unsafe { ptr.as_ptr().add(i).write(seed.wrapping_add(i as u8)) };
    }
  }

  unsafe fn check(
    ptr: NonNull<u8>,
    len: usize,
    seed: u8,
  ) -> bool {
    (0..len).all(|i| unsafe { ptr.as_ptr().add(i).read() } == seed.wrapping_add(i as u8))
  }

  #[test]
  fn rejects_invalid_sizes() {
    let mut allocator = allocator();

    unsafe {
      let a = allocator.allocate(64).unwrap();

      assert!(matches!(
        allocator.reallocate(Some(a), 0),
        Err(AllocError::InvalidSize { .. })
      ));
      assert!(matches!(
        allocator.reallocate(Some(a), AllocatorConfig::DEFAULT_MAX_REQUEST + 1),
        Err(AllocError::InvalidSize { .. })
      ));
      assert!(matches!(
        allocator.reallocate(None, 0),
        Err(AllocError::InvalidSize { .. })
      ));

      assert_eq!(allocator.num_allocated_blocks(), 1);
      assert_eq!(allocator.num_free_blocks(), 0);
    }
  }

  #[test]
  fn null_address_allocates() {
    let mut allocator = allocator();

    unsafe {
      let a = allocator.reallocate(None, 40).unwrap();

      assert_eq!(allocator.usable_size(a), 40);
      assert_eq!(allocator.num_allocated_blocks(), 1);
    }
  }

  #[test]
  fn shrink_keeps_address() {
    let mut allocator = allocator();

    unsafe {
      let a = allocator.allocate(128).unwrap();
      allocator.allocate(16).unwrap();

      for size in [128, 100, 64, 4] {
        assert_eq!(allocator.reallocate(Some(a), size).unwrap(), a);
      }

      // 128 bytes never leave room for a split.
      assert_eq!(allocator.num_allocated_blocks(), 2);
      assert_eq!(allocator.verify(), Ok(()));
    }
  }

  #[test]
  fn shrink_splits_off_large_slack() {
    let mut allocator = allocator();

    unsafe {
      let a = allocator.allocate(1024).unwrap();
      allocator.allocate(16).unwrap();
      fill(a, 64, 7);

      let b = allocator.reallocate(Some(a), 64).unwrap();

      assert_eq!(b, a);
      assert!(check(b, 64, 7));
      assert_eq!(allocator.usable_size(b), 64);
      assert_eq!(allocator.num_allocated_blocks(), 3);
      assert_eq!(allocator.num_free_bytes(), 1024 - 64 - HEADER_SIZE);
      assert_eq!(allocator.verify(), Ok(()));
    }
  }

  #[test]
  fn shrink_slack_merges_with_free_successor() {
    let mut allocator = allocator();

    unsafe {
      let a = allocator.allocate(1024).unwrap();
      let b = allocator.allocate(64).unwrap();
      allocator.allocate(16).unwrap();
      allocator.release(b);

      allocator.reallocate(Some(a), 64).unwrap();

      assert_eq!(allocator.num_free_blocks(), 1);
      assert_eq!(allocator.num_free_bytes(), 1024 - 64 + 64);
      assert_eq!(allocator.num_allocated_blocks(), 3);
      assert_eq!(allocator.verify(), Ok(()));
    }
  }

  #[test]
  fn grows_wilderness_in_place() {
    let mut allocator = allocator();

    unsafe {
      allocator.allocate(32).unwrap();
      let tail = allocator.allocate(64).unwrap();
      fill(tail, 64, 3);

      let grown = allocator.reallocate(Some(tail), 4096).unwrap();

      assert_eq!(grown, tail);
      assert!(check(grown, 64, 3));
      assert_eq!(allocator.grower().last_request(), Some(4096 - 64));
      assert_eq!(allocator.usable_size(grown), 4096);
      assert_eq!(allocator.verify(), Ok(()));
    }
  }

  #[test]
  fn wilderness_failure_reclaims_free_predecessor() {
    let capacity = 3 * HEADER_SIZE + 512 + 256 + 64;
    let mut allocator = Allocator::with_grower(FixedArena::new(capacity));

    unsafe {
      let guard = allocator.allocate(64).unwrap();
      let prev = allocator.allocate(512).unwrap();
      let tail = allocator.allocate(256).unwrap();
      fill(tail, 256, 11);
      allocator.release(prev);

      // The arena is full, but 512 + header + 256 holds 700 bytes with too
      // little slack to split.
      let moved = allocator.reallocate(Some(tail), 700).unwrap();

      assert_eq!(moved, prev);
      assert!(check(moved, 256, 11));
      assert_eq!(allocator.num_free_blocks(), 0);
      assert_eq!(allocator.usable_size(moved), 512 + HEADER_SIZE + 256);
      assert_eq!(allocator.usable_size(guard), 64);
      assert_eq!(allocator.verify(), Ok(()));
    }
  }

  #[test]
  fn wilderness_failure_prefers_earlier_first_fit() {
    let capacity = 4 * HEADER_SIZE + 1024 + 16 + 512 + 256;
    let mut allocator = Allocator::with_grower(FixedArena::new(capacity));

    unsafe {
      let early = allocator.allocate(1024).unwrap();
      allocator.allocate(16).unwrap();
      let prev = allocator.allocate(512).unwrap();
      let tail = allocator.allocate(256).unwrap();
      fill(tail, 256, 13);
      allocator.release(early);
      allocator.release(prev);

      let moved = allocator.reallocate(Some(tail), 700).unwrap();

      assert_eq!(moved, early);
      assert!(check(moved, 256, 13));
      assert_eq!(allocator.usable_size(moved), 700);
      // The split-off rest of `early`, and `prev` merged with the old tail.
      assert_eq!(allocator.num_free_blocks(), 2);
      assert_eq!(
        allocator.num_free_bytes(),
        (1024 - 700 - HEADER_SIZE) + 512 + HEADER_SIZE + 256
      );
      assert_eq!(allocator.verify(), Ok(()));
    }
  }

  #[test]
  fn wilderness_failure_grows_by_remaining_shortfall() {
    let capacity = 2 * HEADER_SIZE + 256 + 256 + 64;
    let mut allocator = Allocator::with_grower(FixedArena::new(capacity));

    unsafe {
      let prev = allocator.allocate(256).unwrap();
      let tail = allocator.allocate(256).unwrap();
      fill(tail, 256, 5);
      allocator.release(prev);

      let size = 256 + HEADER_SIZE + 256 + 64;
      let moved = allocator.reallocate(Some(tail), size).unwrap();

      assert_eq!(moved, prev);
      assert!(check(moved, 256, 5));
      assert_eq!(
        allocator.grower().requests(),
        &[HEADER_SIZE + 256, HEADER_SIZE + 256, size - 256, 64]
      );
      assert_eq!(allocator.num_allocated_blocks(), 1);
      assert_eq!(allocator.verify(), Ok(()));
    }
  }

  #[test]
  fn wilderness_failure_without_room_is_untouched() {
    let capacity = 2 * HEADER_SIZE + 64 + 64;
    let mut allocator = Allocator::with_grower(FixedArena::new(capacity));

    unsafe {
      let prev = allocator.allocate(64).unwrap();
      let tail = allocator.allocate(64).unwrap();
      fill(tail, 64, 9);
      allocator.release(prev);

      assert!(matches!(
        allocator.reallocate(Some(tail), 1024),
        Err(AllocError::ArenaExhausted { .. })
      ));

      assert!(check(tail, 64, 9));
      assert_eq!(allocator.num_allocated_blocks(), 2);
      assert_eq!(allocator.num_free_blocks(), 1);
      assert_eq!(allocator.usable_size(tail), 64);
      assert_eq!(allocator.verify(), Ok(()));
    }
  }

  #[test]
  fn absorbs_free_successor() {
    let mut allocator = allocator();

    unsafe {
      let a = allocator.allocate(64).unwrap();
      let b = allocator.allocate(64).unwrap();
      allocator.allocate(16).unwrap();
      fill(a, 64, 1);
      allocator.release(b);

      let grown = allocator.reallocate(Some(a), 96).unwrap();

      assert_eq!(grown, a);
      assert!(check(grown, 64, 1));
      assert_eq!(allocator.usable_size(grown), 64 + HEADER_SIZE + 64);
      assert_eq!(allocator.num_allocated_blocks(), 2);
      assert_eq!(allocator.num_free_blocks(), 0);
      assert_eq!(allocator.verify(), Ok(()));
    }
  }

  #[test]
  fn absorbs_free_successor_and_splits_surplus() {
    let mut allocator = allocator();

    unsafe {
      let a = allocator.allocate(64).unwrap();
      let b = allocator.allocate(1024).unwrap();
      allocator.allocate(16).unwrap();
      allocator.release(b);

      let grown = allocator.reallocate(Some(a), 128).unwrap();

      assert_eq!(grown, a);
      assert_eq!(allocator.usable_size(grown), 128);
      assert_eq!(allocator.num_allocated_blocks(), 3);
      assert_eq!(allocator.num_free_bytes(), 64 + 1024 - 128);
      assert_eq!(allocator.verify(), Ok(()));
    }
  }

  #[test]
  fn relocates_and_preserves_payload() {
    let mut allocator = allocator();

    unsafe {
      let a = allocator.allocate(64).unwrap();
      allocator.allocate(16).unwrap();
      fill(a, 64, 42);

      let moved = allocator.reallocate(Some(a), 256).unwrap();

      assert_ne!(moved, a);
      assert!(check(moved, 64, 42));
      assert_eq!(allocator.num_free_blocks(), 1);
      assert_eq!(allocator.num_free_bytes(), 64);
      assert_eq!(allocator.verify(), Ok(()));
    }
  }

  #[test]
  fn relocation_failure_keeps_original() {
    let capacity = 2 * HEADER_SIZE + 64 + 16;
    let mut allocator = Allocator::with_grower(FixedArena::new(capacity));

    unsafe {
      let a = allocator.allocate(64).unwrap();
      allocator.allocate(16).unwrap();
      fill(a, 64, 8);

      assert!(matches!(
        allocator.reallocate(Some(a), 256),
        Err(AllocError::ArenaExhausted { .. })
      ));
      assert!(check(a, 64, 8));
      assert_eq!(allocator.num_free_blocks(), 0);
      assert_eq!(allocator.verify(), Ok(()));
    }
  }

  mod proptests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Clone, Debug)]
    enum Op {
      Allocate(usize),
      Release(usize),
      Reallocate(usize, usize),
      ZeroAllocate(usize, usize),
    }

    fn arb_op() -> impl Strategy<Value = Op> {
      prop_oneof![
        (1usize..2048).prop_map(Op::Allocate),
        any::<usize>().prop_map(Op::Release),
        (any::<usize>(), 1usize..4096).prop_map(|(i, size)| Op::Reallocate(i, size)),
        (1usize..64, 1usize..32).prop_map(|(count, size)| Op::ZeroAllocate(count, size)),
      ]
    }

    proptest! {
      #[test]
      fn random_operations_keep_invariants_and_payloads(
        ops in proptest::collection::vec(arb_op(), 1..200),
      ) {
        let mut allocator = Allocator::with_grower(FixedArena::new(1 << 22));
        let mut live: Vec<(NonNull<u8>, usize, u8)> = Vec::new();

        for (step, op) in ops.into_iter().enumerate() {
          let seed = step as u8;

          unsafe {
            match op {
              Op::Allocate(size) => {
                let ptr = allocator.allocate(size).unwrap();
                fill(ptr, size, seed);
                live.push((ptr, size, seed));
              }
              Op::ZeroAllocate(count, size) => {
                let ptr = allocator.zero_allocate(count, size).unwrap();
                prop_assert!(check_zero(ptr, count * size));
                fill(ptr, count * size, seed);
                live.push((ptr, count * size, seed));
              }
              Op::Release(index) if !live.is_empty() => {
                let (ptr, _, _) = live.swap_remove(index % live.len());
                allocator.release(ptr);
              }
              Op::Reallocate(index, size) if !live.is_empty() => {
                let index = index % live.len();
                let (ptr, len, old_seed) = live[index];
                let moved = allocator.reallocate(Some(ptr), size).unwrap();
                prop_assert!(check(moved, len.min(size), old_seed));
                fill(moved, size, seed);
                live[index] = (moved, size, seed);
              }
              _ => {}
            }
          }

          prop_assert_eq!(allocator.verify(), Ok(()));
        }

        for &(ptr, len, seed) in &live {
          let intact = unsafe { check(ptr, len, seed) };
          prop_assert!(intact);
        }

        let stats = allocator.stats();
        prop_assert_eq!(stats.free_blocks + live.len(), stats.blocks);
        let requested: usize = live.iter().map(|&(_, len, _)| len).sum();
        prop_assert!(allocator.num_allocated_bytes() >= requested);
      }
    }

    unsafe fn check_zero(
      ptr: NonNull<u8>,
      len: usize,
    ) -> bool {
      (0..len).all(|i| unsafe { ptr.as_ptr().add(i).read() } == 0)
    }
  }
}
