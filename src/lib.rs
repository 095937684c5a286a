//! # brkalloc - A Splitting, Coalescing Heap Allocator
//!
//! This crate provides a general purpose **first-fit allocator** that manages a
//! single contiguous arena grown with the `sbrk` system call (or any other
//! [`ArenaGrower`]).
//!
//! ## Overview
//!
//! Every allocation is a block: a header followed by the payload handed to the
//! caller. Blocks tile the arena with no gaps and are threaded into a doubly
//! linked list in address order:
//!
//! ```text
//!   Arena:
//!
//!   ┌────────┬─────────┬────────┬──────────────┬────────┬───────┐
//!   │ header │ used A  │ header │    free      │ header │ used C│
//!   └────────┴─────────┴────────┴──────────────┴────────┴───────┘
//!   ▲                  ▲                       ▲               ▲
//!   first ──next──▶    block B   ──next──▶     last      Program
//!         ◀──prev──              ◀──prev──  (wilderness)   Break
//! ```
//!
//! On top of that list the allocator implements:
//!
//! - **First-fit reuse**: released blocks are searched in address order.
//! - **Splitting**: a reused block with at least `128 + header` bytes of slack
//!   is cut in two and the tail becomes a new free block.
//! - **Coalescing**: a released block is merged with free neighbours right
//!   away, so no two free blocks are ever adjacent.
//! - **Wilderness extension**: when the last block is free but too small, the
//!   arena grows by exactly the shortfall instead of appending a new block.
//! - **Alignment**: sizes and block addresses are multiples of the word size
//!   (4 bytes by default).
//!
//! ## Crate Structure
//!
//! ```text
//!   brkalloc
//!   ├── align      - Word rounding (align_to!)
//!   ├── block      - Block header view (internal)
//!   ├── chain      - Address ordered block list and invariant checks
//!   ├── coalesce   - Splitting and merging of blocks
//!   ├── grower     - Arena growth primitives (Sbrk, FixedArena)
//!   ├── config     - AllocatorConfig
//!   ├── error      - AllocError, ConfigError, ChainError
//!   ├── allocator  - Allocator: allocate, release, zero_allocate
//!   ├── realloc    - Allocator::reallocate
//!   └── stats      - Introspection counters
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use brkalloc::{Allocator, FixedArena};
//!
//! let mut allocator = Allocator::with_grower(FixedArena::new(64 * 1024));
//!
//! let ptr = allocator.allocate(100).unwrap();
//! unsafe {
//!     ptr.as_ptr().write_bytes(0x2A, 100);
//!
//!     let ptr = allocator.reallocate(Some(ptr), 400).unwrap();
//!     assert_eq!(*ptr.as_ptr(), 0x2A);
//!
//!     allocator.release(ptr);
//! }
//!
//! assert_eq!(allocator.num_free_blocks(), 1);
//! assert_eq!(allocator.verify(), Ok(()));
//! ```
//!
//! ## How Reallocation Works
//!
//! ```text
//!   reallocate(p, n):
//!
//!   fits already? ──yes──▶ shrink in place, split off the slack
//!        │ no
//!   last block?   ──yes──▶ grow the arena by the shortfall
//!        │ no                (or reclaim a free predecessor if it can't grow)
//!   next is free
//!   and big enough? ─yes─▶ absorb it, split off the slack
//!        │ no
//!        ▼
//!   allocate(n), copy, release(p)
//! ```
//!
//! ## Limitations
//!
//! - **Single-threaded only**: `Allocator` is neither `Send` nor `Sync`.
//! - **Never shrinks**: memory is reused but never returned to the OS.
//! - **No pointer validation**: releasing a foreign pointer is undefined
//!   behaviour, which is why `release` and `reallocate` are `unsafe`.
//!
//! ## Logging
//!
//! Strategy decisions are reported through the [`log`] facade at `trace`
//! level, arena growth at `debug` level. Nothing is logged on error paths;
//! failures are returned as [`AllocError`].

pub mod align;
mod allocator;
mod block;
mod chain;
mod coalesce;
mod config;
mod error;
mod grower;
mod realloc;
mod stats;

pub use allocator::Allocator;
pub use block::HEADER_SIZE;
pub use config::AllocatorConfig;
pub use error::{AllocError, ChainError, ConfigError};
pub use grower::{ArenaGrower, FixedArena, Sbrk};
pub use stats::HeapStats;
