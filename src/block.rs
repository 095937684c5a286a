use std::{mem, ptr::NonNull};

/// Metadata stored in front of every payload in the arena.
///
/// Headers sit on word boundaries, which on 64 bit targets is looser than the
/// natural alignment of this struct, so it is never accessed through a
/// reference. All reads and writes go through [`Block`].
#[repr(C)]
struct Header {
  next: *mut Header,
  prev: *mut Header,
  usable_size: usize,
  free: bool,
}

/// Bytes occupied by a block header. Payloads start this far past the header.
pub const HEADER_SIZE: usize = mem::size_of::<Header>();

/// Largest word size the allocator can honour: header sizes stay a multiple
/// of it, so every block boundary stays word aligned.
pub const MAX_WORD_SIZE: usize = mem::align_of::<Header>();

/// A handle to a live block header inside the arena.
///
/// Creating a `Block` is unsafe and asserts that the address points at a
/// header written by [`Block::format`] that is still part of the chain. Under
/// that contract the accessors are safe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Block(NonNull<Header>);

impl Block {
  /// Writes a fresh, in-use, unlinked header at `at`.
  ///
  /// # Safety
  ///
  /// `at` must be valid for writes of `HEADER_SIZE + usable_size` bytes that
  /// the caller owns.
  pub unsafe fn format(
    at: NonNull<u8>,
    usable_size: usize,
  ) -> Self {
    let header = at.cast::<Header>();
    unsafe {
      header.as_ptr().write_unaligned(Header {
        next: std::ptr::null_mut(),
        prev: std::ptr::null_mut(),
        usable_size,
        free: false,
      });
    }
    Self(header)
  }

  /// Recovers the block that owns `payload`.
  ///
  /// # Safety
  ///
  /// `payload` must have been produced by [`Block::payload`] on a block that
  /// is still in the chain.
  pub unsafe fn from_payload(payload: NonNull<u8>) -> Self {
    Self(unsafe { payload.sub(HEADER_SIZE) }.cast())
  }

  /// # Safety
  ///
  /// `raw` must be null or point at a live header.
  unsafe fn from_raw(raw: *mut Header) -> Option<Self> {
    NonNull::new(raw).map(Self)
  }

  fn into_raw(block: Option<Self>) -> *mut Header {
    block.map_or(std::ptr::null_mut(), |block| block.0.as_ptr())
  }

  /// The header's own address.
  pub fn address(self) -> NonNull<u8> {
    self.0.cast()
  }

  /// The address handed to callers.
  pub fn payload(self) -> NonNull<u8> {
    // SAFETY: every header is followed by its payload inside the arena.
    unsafe { self.address().add(HEADER_SIZE) }
  }

  /// One past the last payload byte, which is where the next header starts.
  pub fn end(self) -> NonNull<u8> {
    // SAFETY: the payload lies entirely inside the arena.
    unsafe { self.payload().add(self.usable_size()) }
  }

  pub fn next(self) -> Option<Self> {
    unsafe { Self::from_raw((&raw const (*self.0.as_ptr()).next).read_unaligned()) }
  }

  pub fn set_next(
    self,
    next: Option<Self>,
  ) {
    unsafe { (&raw mut (*self.0.as_ptr()).next).write_unaligned(Self::into_raw(next)) }
  }

  pub fn prev(self) -> Option<Self> {
    unsafe { Self::from_raw((&raw const (*self.0.as_ptr()).prev).read_unaligned()) }
  }

  pub fn set_prev(
    self,
    prev: Option<Self>,
  ) {
    unsafe { (&raw mut (*self.0.as_ptr()).prev).write_unaligned(Self::into_raw(prev)) }
  }

  pub fn usable_size(self) -> usize {
    unsafe { (&raw const (*self.0.as_ptr()).usable_size).read_unaligned() }
  }

  pub fn set_usable_size(
    self,
    usable_size: usize,
  ) {
    unsafe { (&raw mut (*self.0.as_ptr()).usable_size).write_unaligned(usable_size) }
  }

  pub fn is_free(self) -> bool {
    unsafe { (&raw const (*self.0.as_ptr()).free).read_unaligned() }
  }

  pub fn set_free(
    self,
    free: bool,
  ) {
    unsafe { (&raw mut (*self.0.as_ptr()).free).write_unaligned(free) }
  }
}
