use aok::{OK, Void};
use ssim_ftl::ftl::map::{MappingTable, PagePtr};

#[static_init::constructor(0)]
extern "C" fn _log_init() {
  log_init::init();
}

const SENTINEL: PagePtr = PagePtr { block: 16, page: 8 };

#[test]
fn test_insert_lookup_erase() -> Void {
  let mut t = MappingTable::new(64, 2, SENTINEL);
  assert_eq!(t.len(), 0);
  assert!(t.lookup(5).is_none());

  let entry = t.insert_or_get(5);
  assert_eq!(entry, [SENTINEL, SENTINEL]);
  entry[0] = PagePtr { block: 1, page: 3 };

  assert_eq!(t.len(), 1);
  assert!(t.contains(5));
  assert_eq!(t.lookup(5).unwrap()[0], PagePtr { block: 1, page: 3 });
  assert_eq!(t.lookup(5).unwrap()[1], SENTINEL);

  // Re-inserting returns the live entry, not a fresh one
  assert_eq!(t.insert_or_get(5)[0], PagePtr { block: 1, page: 3 });
  assert_eq!(t.len(), 1);

  assert!(t.erase(5));
  assert!(!t.erase(5));
  assert_eq!(t.len(), 0);
  assert!(t.lookup(5).is_none());

  // Slots come back as sentinels after an erase
  assert_eq!(t.insert_or_get(5), [SENTINEL, SENTINEL]);
  OK
}

#[test]
fn test_present_in_range() -> Void {
  let mut t = MappingTable::new(64, 1, SENTINEL);
  for lpn in [3u64, 10, 11, 40] {
    t.insert_or_get(lpn);
  }

  let hits: Vec<u64> = t.present_in(4, 40).collect();
  assert_eq!(hits, [10, 11]);
  let all: Vec<u64> = t.present_in(0, 1000).collect();
  assert_eq!(all, [3, 10, 11, 40]);
  OK
}
