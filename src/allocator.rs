use std::ptr::{self, NonNull};

use crate::{
  align::padding_for,
  align_to,
  block::{Block, HEADER_SIZE},
  chain::Chain,
  config::AllocatorConfig,
  error::{AllocError, ChainError, ConfigError},
  grower::{ArenaGrower, Sbrk},
};

/// A first-fit allocator with splitting, coalescing and wilderness extension
/// over a single contiguous arena.
///
/// All state lives in this value, so several allocators can coexist as long
/// as each owns a distinct [`ArenaGrower`]. The allocator is single threaded:
/// every operation takes `&mut self` and the type is neither `Send` nor
/// `Sync`.
pub struct Allocator<G: ArenaGrower = Sbrk> {
  grower: G,
  pub(crate) chain: Chain,
  config: AllocatorConfig,
  aligned: bool,
}

impl Allocator<Sbrk> {
  /// An allocator over the process data segment with the default config.
  pub fn new() -> Self {
    Self::with_grower(Sbrk)
  }
}

impl Default for Allocator<Sbrk> {
  fn default() -> Self {
    Self::new()
  }
}

impl<G: ArenaGrower> Allocator<G> {
  pub fn with_grower(grower: G) -> Self {
    Self {
      grower,
      chain: Chain::new(),
      config: AllocatorConfig::new(),
      aligned: false,
    }
  }

  pub fn with_config(
    grower: G,
    config: AllocatorConfig,
  ) -> Result<Self, ConfigError> {
    config.validate()?;

    Ok(Self {
      grower,
      chain: Chain::new(),
      config,
      aligned: false,
    })
  }

  pub fn config(&self) -> &AllocatorConfig {
    &self.config
  }

  pub fn grower(&self) -> &G {
    &self.grower
  }

  /// Validates a request and rounds it up to the word size.
  pub(crate) fn round_request(
    &self,
    size: usize,
  ) -> Result<usize, AllocError> {
    if size == 0 || size > self.config.max_request {
      return Err(AllocError::InvalidSize {
        requested: size,
        max: self.config.max_request,
      });
    }

    Ok(align_to!(size, self.config.word_size))
  }

  pub(crate) fn grow(
    &mut self,
    delta: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    let start = self
      .grower
      .extend(delta)
      .ok_or(AllocError::ArenaExhausted { requested: delta })?;

    log::debug!(
      "arena grew by {} bytes at {:p}, break = {:p}",
      delta,
      start,
      self.grower.program_break()
    );

    Ok(start)
  }

  /// Pads the arena start to a word boundary, once.
  fn align_arena_start(&mut self) -> Result<(), AllocError> {
    if self.aligned {
      return Ok(());
    }

    let brk = self.grower.program_break().as_ptr() as usize;
    let padding = padding_for(brk, self.config.word_size);
    if padding != 0 {
      self.grow(padding)?;
    }

    self.aligned = true;
    Ok(())
  }

  pub(crate) fn find_free_block(
    &self,
    size: usize,
  ) -> Option<Block> {
    self
      .chain
      .iter()
      .find(|block| block.is_free() && block.usable_size() >= size)
  }

  /// Splits the slack off `block` once it holds `size` bytes, if the slack
  /// clears the split threshold. The new free block is merged forward.
  pub(crate) fn carve(
    &mut self,
    block: Block,
    size: usize,
  ) {
    if !self.config.split || block.usable_size() - size < self.config.split_threshold() {
      return;
    }

    let rest = self.chain.split(block, size);
    if self.config.coalesce {
      self.chain.merge(rest);
    }
  }

  /// Allocates at least `size` bytes.
  ///
  /// Free blocks are searched first-fit in address order; an oversized fit is
  /// split. Failing that, a free tail block is widened by exactly the
  /// shortfall, and only then is a new block appended to the arena.
  ///
  /// The returned memory is aligned to the configured word size and stays
  /// valid until it is passed to [`release`](Self::release) or
  /// [`reallocate`](Self::reallocate).
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    let size = self.round_request(size)?;
    self.align_arena_start()?;

    if self.config.reuse_free_blocks {
      if let Some(block) = self.find_free_block(size) {
        log::trace!("allocate({}): first fit {:p}", size, block.address());
        block.set_free(false);
        self.carve(block, size);
        return Ok(block.payload());
      }
    }

    if self.config.extend_wilderness {
      let tail = self
        .chain
        .last()
        .filter(|tail| tail.is_free() && tail.usable_size() < size);

      if let Some(tail) = tail {
        self.grow(size - tail.usable_size())?;
        log::trace!("allocate({}): widened wilderness {:p}", size, tail.address());
        tail.set_usable_size(size);
        tail.set_free(false);
        return Ok(tail.payload());
      }
    }

    let start = self.grow(HEADER_SIZE + size)?;
    debug_assert!(self.chain.last().is_none_or(|last| last.end() == start));

    // SAFETY: the grower just handed us `HEADER_SIZE + size` fresh bytes.
    let block = unsafe { Block::format(start, size) };
    self.chain.push_back(block);
    log::trace!("allocate({}): new block {:p}", size, block.address());

    Ok(block.payload())
  }

  /// Allocates `count * element_size` zeroed bytes.
  pub fn zero_allocate(
    &mut self,
    count: usize,
    element_size: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    let size = count.checked_mul(element_size).ok_or(AllocError::InvalidSize {
      requested: usize::MAX,
      max: self.config.max_request,
    })?;

    let payload = self.allocate(size)?;

    // SAFETY: `payload` was just returned by `allocate`.
    unsafe {
      let block = Block::from_payload(payload);
      ptr::write_bytes(payload.as_ptr(), 0, block.usable_size());
    }

    Ok(payload)
  }

  /// Returns the block behind `address` to the allocator, merging it with any
  /// free neighbour.
  ///
  /// # Safety
  ///
  /// `address` must have been returned by this allocator and not released
  /// since.
  pub unsafe fn release(
    &mut self,
    address: NonNull<u8>,
  ) {
    let block = unsafe { Block::from_payload(address) };

    let block = if self.config.coalesce {
      self.chain.merge(block)
    } else {
      block
    };

    log::trace!("release({:p}): free block {:p}", address, block.address());
    block.set_free(true);
  }

  /// Capacity of the live allocation at `address`, which may exceed the size
  /// originally requested.
  ///
  /// # Safety
  ///
  /// `address` must be a live allocation of this allocator.
  pub unsafe fn usable_size(
    &self,
    address: NonNull<u8>,
  ) -> usize {
    unsafe { Block::from_payload(address) }.usable_size()
  }

  /// Checks that the block chain is contiguous, word aligned, doubly linked
  /// consistently, ends at the arena break and, when coalescing is enabled,
  /// holds no two adjacent free blocks.
  pub fn verify(&self) -> Result<(), ChainError> {
    self.chain.verify(
      self.config.word_size,
      self.grower.program_break(),
      self.config.coalesce,
    )
  }
}
