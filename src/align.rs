/// Rounds `value` up to the next multiple of `word`.
///
/// `word` must be a power of two. Every payload size the allocator hands out
/// goes through this macro, which is what keeps block headers on word
/// boundaries once the arena start itself is aligned.
///
/// # Examples
///
/// ```rust
/// use brkalloc::align_to;
///
/// assert_eq!(align_to!(13, 4), 16);
/// assert_eq!(align_to!(16, 4), 16);
/// assert_eq!(align_to!(1, 8), 8);
/// ```
#[macro_export]
macro_rules! align_to {
  ($value:expr, $word:expr) => {
    ($value + $word - 1) & !($word - 1)
  };
}

/// Number of bytes needed to move `address` forward to a multiple of `word`.
pub(crate) fn padding_for(
  address: usize,
  word: usize,
) -> usize {
  align_to!(address, word) - address
}
