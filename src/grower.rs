//! Primitives that extend the contiguous region the allocator carves up.

use std::{
  alloc::{self, Layout},
  ptr::NonNull,
};

use libc::{c_void, intptr_t, sbrk};

/// Something that hands out a contiguous, monotonically growing region.
///
/// # Safety
///
/// Implementors must guarantee that every successful [`extend`] returns the
/// previous break, that the returned region directly follows the one handed
/// out before it, that it stays valid and exclusively owned by the caller for
/// as long as the grower lives, and that a failed call leaves the break where
/// it was.
///
/// [`extend`]: ArenaGrower::extend
pub unsafe trait ArenaGrower {
  /// Current end of the region.
  fn program_break(&self) -> NonNull<u8>;

  /// Grows the region by `delta` bytes and returns the start of the new
  /// bytes, or `None` if the region cannot grow.
  fn extend(
    &mut self,
    delta: usize,
  ) -> Option<NonNull<u8>>;
}

/// The process data segment, grown with `sbrk(2)`.
///
/// Nothing else in the process may move the program break while an allocator
/// owns an `Sbrk`, or the arena stops being contiguous. In particular the
/// system allocator must not be `brk` based when this grower is in use. glibc's
/// `malloc` is, which is why chain level checks such as
/// [`Allocator::verify`](crate::Allocator::verify) are only exercised over
/// [`FixedArena`]; a single growth is still one contiguous region.
#[derive(Debug, Default)]
pub struct Sbrk;

unsafe impl ArenaGrower for Sbrk {
  fn program_break(&self) -> NonNull<u8> {
    let current = unsafe { sbrk(0) };
    NonNull::new(current as *mut u8).unwrap_or(NonNull::dangling())
  }

  fn extend(
    &mut self,
    delta: usize,
  ) -> Option<NonNull<u8>> {
    let delta = intptr_t::try_from(delta).ok()?;

    let address = unsafe { sbrk(delta) };

    if address == usize::MAX as *mut c_void {
      return None;
    }

    NonNull::new(address as *mut u8)
  }
}

/// A bounded arena backed by one up-front allocation.
///
/// Behaves like a private program break: `extend` bumps a cursor and fails
/// once the capacity is used up. Every requested delta is recorded, which
/// lets callers observe exactly how the allocator grew the arena.
pub struct FixedArena {
  memory: NonNull<u8>,
  layout: Layout,
  capacity: usize,
  offset: usize,
  brk: usize,
  requests: Vec<usize>,
}

impl FixedArena {
  /// Alignment of the backing memory.
  pub const ALIGN: usize = 16;

  /// Creates an arena of `capacity` bytes whose break starts aligned.
  pub fn new(capacity: usize) -> Self {
    Self::with_offset(capacity, 0)
  }

  /// Creates an arena whose break starts `offset` bytes past an aligned
  /// address, to exercise start-of-arena padding.
  ///
  /// # Panics
  ///
  /// Panics if `offset + capacity` overflows a valid layout.
  pub fn with_offset(
    capacity: usize,
    offset: usize,
  ) -> Self {
    let size = (offset + capacity).max(1);
    let layout = match Layout::from_size_align(size, Self::ALIGN) {
      Ok(layout) => layout,
      Err(err) => panic!("fixed arena of {size} bytes: {err}"),
    };

    let memory = match NonNull::new(unsafe { alloc::alloc(layout) }) {
      Some(memory) => memory,
      None => alloc::handle_alloc_error(layout),
    };

    Self {
      memory,
      layout,
      capacity,
      offset,
      brk: offset,
      requests: Vec::new(),
    }
  }

  /// Bytes handed out so far, including any start padding requests.
  pub fn used(&self) -> usize {
    self.brk - self.offset
  }

  /// Bytes still available.
  pub fn remaining(&self) -> usize {
    self.capacity - self.used()
  }

  /// Every successful and failed `extend` delta, in call order.
  pub fn requests(&self) -> &[usize] {
    &self.requests
  }

  /// The most recent `extend` delta.
  pub fn last_request(&self) -> Option<usize> {
    self.requests.last().copied()
  }
}

unsafe impl ArenaGrower for FixedArena {
  fn program_break(&self) -> NonNull<u8> {
    // SAFETY: `brk` never exceeds `offset + capacity`, the allocation size
    // (or 0 within the one byte allocated for an empty arena).
    unsafe { self.memory.add(self.brk) }
  }

  fn extend(
    &mut self,
    delta: usize,
  ) -> Option<NonNull<u8>> {
    self.requests.push(delta);

    if delta > self.remaining() {
      return None;
    }

    let start = self.program_break();
    self.brk += delta;
    Some(start)
  }
}

impl Drop for FixedArena {
  fn drop(&mut self) {
    unsafe { alloc::dealloc(self.memory.as_ptr(), self.layout) }
  }
}
