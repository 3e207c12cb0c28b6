use aok::{OK, Void};
use ssim_ftl::ftl::block::Block;

#[static_init::constructor(0)]
extern "C" fn _log_init() {
  log_init::init();
}

const PAGES: u32 = 8;
const UNITS: usize = 2;

fn unit_total(b: &Block) -> u64 {
  b.valid_unit_count() + b.invalid_unit_count() + b.erased_unit_count()
}

#[test]
fn test_write_and_counters() -> Void {
  let mut b = Block::new(0, PAGES, UNITS, 0);
  assert_eq!(b.erased_unit_count(), u64::from(PAGES) * UNITS as u64);

  b.write(0, 10, 0, 100)?;
  b.write(0, 10, 1, 100)?;
  b.write(1, 11, 0, 200)?;

  assert_eq!(b.valid_unit_count(), 3);
  assert_eq!(b.valid_page_count(), 2);
  assert_eq!(b.next_write_page(0), 2);
  assert_eq!(b.next_write_page(1), 1);
  assert_eq!(b.last_accessed_time(), 200);
  // The three states always cover the whole block
  assert_eq!(unit_total(&b), u64::from(PAGES) * UNITS as u64);

  let (valid, lpns) = b.page_info(0);
  assert!(valid.test(0) && valid.test(1));
  assert_eq!(lpns, [10, 10]);
  OK
}

#[test]
fn test_program_order_enforced() -> Void {
  let mut b = Block::new(0, PAGES, UNITS, 0);

  // Skipping the write pointer is rejected
  assert!(b.write(1, 10, 0, 0).is_err());

  b.write(0, 10, 0, 0)?;
  // A slot cannot be programmed twice between erases
  assert!(b.write(0, 11, 0, 0).is_err());
  OK
}

#[test]
fn test_invalidate_idempotent() -> Void {
  let mut b = Block::new(0, PAGES, UNITS, 0);
  b.write(0, 10, 0, 0)?;

  b.invalidate(0, 0);
  assert_eq!(b.valid_unit_count(), 0);
  assert_eq!(b.invalid_unit_count(), 1);

  b.invalidate(0, 0);
  assert_eq!(b.valid_unit_count(), 0);
  assert_eq!(b.invalid_unit_count(), 1);
  assert_eq!(unit_total(&b), u64::from(PAGES) * UNITS as u64);
  OK
}

#[test]
fn test_full_follows_highest_pointer() -> Void {
  let mut b = Block::new(0, PAGES, UNITS, 0);

  // Only unit 0 advances; the block still fills when that pointer ends
  for page in 0..PAGES {
    b.write(page, u64::from(page), 0, 0)?;
  }
  assert_eq!(b.write_pointer(), PAGES);
  assert!(b.is_full());
  assert_eq!(b.next_write_page(1), 0);
  OK
}

#[test]
fn test_erase_resets_state() -> Void {
  let mut b = Block::new(0, PAGES, UNITS, 3);
  for page in 0..PAGES {
    b.write(page, u64::from(page), 0, 0)?;
    b.write(page, u64::from(page), 1, 0)?;
  }
  b.invalidate(2, 0);
  assert!(b.is_full());
  assert_eq!(b.erase_count(), 3);

  b.erase();

  assert_eq!(b.erase_count(), 4);
  assert_eq!(b.valid_unit_count(), 0);
  assert_eq!(b.erased_unit_count(), u64::from(PAGES) * UNITS as u64);
  for unit in 0..UNITS {
    assert_eq!(b.next_write_page(unit), 0);
  }
  // Reprogrammable from the start
  b.write(0, 99, 0, 0)?;
  OK
}

#[test]
fn test_error_count_never_lowers() -> Void {
  let mut b = Block::new(0, PAGES, UNITS, 0);
  b.note_error_count(7);
  b.note_error_count(3);
  assert_eq!(b.max_error_count(), 7);
  b.note_error_count(20);
  assert_eq!(b.max_error_count(), 20);
  OK
}
