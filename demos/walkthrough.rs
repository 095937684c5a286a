use std::io::{IsTerminal, Read};

use brkalloc::{Allocator, ArenaGrower, FixedArena};

/// Waits until the user presses ENTER, when run interactively.
/// Useful to inspect the arena between steps with a debugger.
fn block_until_enter_pressed() {
  if !std::io::stdin().is_terminal() {
    return;
  }
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

/// Prints the chain counters and the arena break.
fn print_heap(
  label: &str,
  allocator: &Allocator<FixedArena>,
) {
  let stats = allocator.stats();
  println!(
    "[{}] blocks = {}, free blocks = {}, free bytes = {}, payload bytes = {}, \
     header bytes = {}, break = {:?}",
    label,
    stats.blocks,
    stats.free_blocks,
    stats.free_bytes,
    stats.bytes,
    stats.meta_data_bytes,
    allocator.grower().program_break(),
  );
}

fn main() {
  // A private 1 MiB arena that behaves like the program break, so printing
  // (which allocates through the system allocator) can't interleave with it.
  let mut allocator = Allocator::with_grower(FixedArena::with_offset(1 << 20, 1));

  unsafe {
    print_heap("start", &allocator);
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 1) Three allocations. The first one also pads the arena start, which
    //    was deliberately created one byte off a word boundary.
    // --------------------------------------------------------------------
    let a = allocator.allocate(100).unwrap();
    let b = allocator.allocate(100).unwrap();
    let c = allocator.allocate(100).unwrap();
    println!("\n[1] a = {:?}, b = {:?}, c = {:?}", a, b, c);
    println!("[1] growth requests = {:?}", allocator.grower().requests());
    print_heap("1", &allocator);

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 2) Release b then a. The second release merges into one free block.
    // --------------------------------------------------------------------
    allocator.release(b);
    allocator.release(a);
    println!("\n[2] released b and a");
    print_heap("2", &allocator);

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 3) A small allocation reuses the merged block and splits off the rest.
    // --------------------------------------------------------------------
    let d = allocator.allocate(16).unwrap();
    println!(
      "\n[3] d = {:?} (reused a: {}), capacity = {}",
      d,
      d == a,
      allocator.usable_size(d)
    );
    print_heap("3", &allocator);

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 4) Growing the wilderness block widens it in place.
    // --------------------------------------------------------------------
    c.as_ptr().write_bytes(0xAB, 100);
    let grown = allocator.reallocate(Some(c), 64 * 1024).unwrap();
    println!(
      "\n[4] c grown in place: {}, last growth = {:?}, first byte = {:#X}",
      grown == c,
      allocator.grower().last_request(),
      *grown.as_ptr()
    );
    print_heap("4", &allocator);

    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 5) Zeroed allocation and final consistency check.
    // --------------------------------------------------------------------
    let zeroed = allocator.zero_allocate(8, 4).unwrap();
    println!("\n[5] zeroed = {:?}, first byte = {}", zeroed, *zeroed.as_ptr());

    allocator.release(d);
    allocator.release(zeroed);
    allocator.release(grown);
    print_heap("5", &allocator);
    println!("[5] verify = {:?}", allocator.verify());
  }
}
