use aok::{OK, Void};
use log::info;
use ssim_ftl::{
  AbstractFtl, FtlConf, PageMapping, Request,
  ftl::{
    conf::{EvictPolicy, GcMode},
    map::PagePtr,
  },
  ftl_trait::LpnRange,
};
use ssim_pal::{TimingDram, TimingPal};

#[static_init::constructor(0)]
extern "C" fn _log_init() {
  log_init::init();
}

type Ftl = PageMapping<TimingPal, TimingDram>;

fn gc_conf() -> FtlConf {
  FtlConf {
    io_units_per_page: 1,
    pages_in_block: 8,
    total_physical_blocks: 6,
    total_logical_blocks: 3,
    page_count_to_max_perf: 1,
    gc_threshold_ratio: 0.25,
    gc_mode: GcMode::Threshold,
    gc_reclaim_threshold: 0.1,
    gc_evict_policy: EvictPolicy::Greedy,
    refresh_period: 0,
    random_seed: 42,
    use_random_io_tweak: false,
    ..FtlConf::default()
  }
}

fn new_ftl(conf: FtlConf) -> Ftl {
  PageMapping::new(conf, TimingPal::default(), TimingDram::default()).unwrap()
}

fn write(ftl: &mut Ftl, lpn: u64, tick: &mut u64) {
  ftl.write(&Request::super_page(lpn, 1), tick).unwrap();
}

fn assert_accounting(ftl: &Ftl) {
  let total = ftl.conf().total_physical_blocks as usize;
  assert_eq!(
    ftl.free_block_count() + ftl.in_use_block_count() + ftl.retired_block_count(),
    total
  );
  let pool = ftl.free_block_ids().to_vec();
  for w in pool.windows(2) {
    assert!(
      ftl.block(w[0]).unwrap().erase_count() <= ftl.block(w[1]).unwrap().erase_count(),
      "free pool out of order"
    );
  }
}

#[test]
fn test_gc_reclaims_fully_invalid_block() -> Void {
  let mut ftl = new_ftl(gc_conf());
  let mut tick = 0u64;

  // Fill blocks 0..2, then invalidate every page of block 0 by overwrite
  for lpn in 0..24 {
    write(&mut ftl, lpn, &mut tick);
  }
  for lpn in 0..8 {
    write(&mut ftl, lpn, &mut tick);
  }
  assert_eq!(ftl.block(0).unwrap().valid_unit_count(), 0);
  assert_eq!(ftl.stat().gc_count, 0);

  // One more write sinks the pool below the threshold and triggers GC
  write(&mut ftl, 8, &mut tick);

  assert_eq!(ftl.stat().gc_count, 1);
  assert_eq!(ftl.stat().reclaimed_blocks, 1);
  // The worst block was empty, so reclaiming it copied nothing
  assert_eq!(ftl.stat().valid_page_copies, 0);
  assert_eq!(ftl.block(0).unwrap().erase_count(), 1);
  assert!(!ftl.is_block_in_use(0));
  assert!(ftl.free_block_ids().contains(&0));
  assert_accounting(&ftl);
  OK
}

#[test]
fn test_gc_migrates_valid_pages() -> Void {
  let mut ftl = new_ftl(gc_conf());
  let mut tick = 0u64;

  for lpn in 0..24 {
    write(&mut ftl, lpn, &mut tick);
  }
  // Leave LPN 6 and 7 alive in block 0
  for lpn in 0..6 {
    write(&mut ftl, lpn, &mut tick);
  }
  write(&mut ftl, 8, &mut tick);
  write(&mut ftl, 9, &mut tick);

  // Block 3 is now full; this write rolls over and triggers GC
  write(&mut ftl, 10, &mut tick);

  assert_eq!(ftl.stat().gc_count, 1);
  assert_eq!(ftl.stat().valid_page_copies, 2);
  assert_eq!(ftl.stat().valid_super_page_copies, 2);
  // The survivors moved to the fresh block right behind LPN 10
  assert_eq!(ftl.mapping(6).unwrap()[0], PagePtr { block: 4, page: 1 });
  assert_eq!(ftl.mapping(7).unwrap()[0], PagePtr { block: 4, page: 2 });
  assert_eq!(ftl.block(0).unwrap().erase_count(), 1);
  assert_accounting(&ftl);

  // The migrated pages read back from their new home
  ftl.read(&Request::super_page(6, 1), &mut tick)?;
  OK
}

#[test]
fn test_cost_benefit_prefers_stale_block() -> Void {
  let mut conf = gc_conf();
  conf.gc_mode = GcMode::Fixed;
  conf.gc_reclaim_block = 1;
  conf.gc_evict_policy = EvictPolicy::CostBenefit;
  let mut ftl = new_ftl(conf);
  let mut tick = 0u64;

  // Two full blocks at equal utilization, block 0 written earlier
  for lpn in 0..16 {
    write(&mut ftl, lpn, &mut tick);
  }
  for lpn in [0u64, 1, 2, 3, 8, 9, 10, 11] {
    write(&mut ftl, lpn, &mut tick);
  }

  tick += 1_000_000;
  let victims = ftl.select_victim_blocks(&[], &mut tick);
  info!("victims: {victims:?}");
  // Equal ratio, so the staler block 0 weighs less
  assert_eq!(victims[0], 0);

  // Touching block 0 makes it the younger of the two
  tick += 1_000_000_000;
  ftl.read(&Request::super_page(4, 1), &mut tick)?;
  tick += 1_000_000;
  let victims = ftl.select_victim_blocks(&[], &mut tick);
  assert_eq!(victims, vec![1]);
  OK
}

#[test]
fn test_random_policy_samples_full_blocks() -> Void {
  let mut conf = gc_conf();
  conf.gc_mode = GcMode::Fixed;
  conf.gc_reclaim_block = 2;
  conf.gc_evict_policy = EvictPolicy::Random;
  let mut ftl = new_ftl(conf);
  let mut tick = 0u64;

  for lpn in 0..24 {
    write(&mut ftl, lpn, &mut tick);
  }

  let victims = ftl.select_victim_blocks(&[], &mut tick);
  assert!(!victims.is_empty() && victims.len() <= 3);
  let mut sorted = victims.clone();
  sorted.sort_unstable();
  sorted.dedup();
  assert_eq!(sorted.len(), victims.len(), "duplicate victims");
  for b in victims {
    assert!(b < 3, "victim {b} is not a full block");
  }
  OK
}

#[test]
fn test_except_list_respected_by_sampling() -> Void {
  let mut conf = gc_conf();
  conf.gc_mode = GcMode::Fixed;
  conf.gc_reclaim_block = 2;
  conf.gc_evict_policy = EvictPolicy::DChoice;
  conf.gc_d_choice_param = 2;
  let mut ftl = new_ftl(conf);
  let mut tick = 0u64;

  for lpn in 0..24 {
    write(&mut ftl, lpn, &mut tick);
  }

  for _ in 0..8 {
    let victims = ftl.select_victim_blocks(&[1], &mut tick);
    assert!(!victims.contains(&1));
  }
  OK
}

#[test]
fn test_format_erases_affected_blocks() -> Void {
  let mut ftl = new_ftl(gc_conf());
  let mut tick = 0u64;

  // A half-written block: format must tolerate a non-full GC victim
  for lpn in 0..4 {
    write(&mut ftl, lpn, &mut tick);
  }
  ftl.format(LpnRange { slpn: 0, nlp: 4 }, &mut tick)?;

  assert_eq!(ftl.mapped_page_count(), 0);
  assert_eq!(ftl.block(0).unwrap().erase_count(), 1);
  assert!(ftl.free_block_ids().contains(&0));
  assert_accounting(&ftl);

  // The allocator recovers from losing its active target
  write(&mut ftl, 0, &mut tick);
  assert!(ftl.mapping(0).is_some());
  OK
}

#[test]
fn test_bad_block_retirement() -> Void {
  let mut conf = gc_conf();
  conf.total_physical_blocks = 4;
  conf.total_logical_blocks = 1;
  conf.gc_mode = GcMode::Fixed;
  conf.gc_threshold_ratio = 0.05;
  conf.bad_block_threshold = 2;
  let mut ftl = new_ftl(conf);
  let mut tick = 0u64;

  // Each cycle fills one block and format-erases it; erase order rotates
  // through the pool, so the fifth cycle erases block 0 a second time
  for cycle in 0..5 {
    for lpn in 0..8 {
      write(&mut ftl, lpn, &mut tick);
    }
    ftl.format(LpnRange { slpn: 0, nlp: 8 }, &mut tick)?;
    info!("cycle {cycle}: free {:?}", ftl.free_block_ids());
    assert_accounting(&ftl);
  }

  // Block 0 hit the threshold and was retired
  assert_eq!(ftl.block(0).unwrap().erase_count(), 2);
  assert_eq!(ftl.retired_block_count(), 1);
  assert!(!ftl.free_block_ids().contains(&0));
  assert_eq!(
    ftl.free_block_count() + ftl.in_use_block_count(),
    3,
    "retired block must leave circulation"
  );

  // The device still takes writes on the surviving blocks
  for lpn in 0..8 {
    write(&mut ftl, lpn, &mut tick);
  }
  assert_eq!(ftl.mapped_page_count(), 8);
  assert_accounting(&ftl);
  OK
}

#[test]
fn test_erase_count_never_decreases() -> Void {
  let mut conf = gc_conf();
  conf.total_physical_blocks = 4;
  conf.total_logical_blocks = 1;
  conf.gc_mode = GcMode::Fixed;
  conf.gc_threshold_ratio = 0.05;
  let mut ftl = new_ftl(conf);
  let mut tick = 0u64;

  let mut last: Vec<u32> = (0..4).map(|i| ftl.block(i).unwrap().erase_count()).collect();

  for _ in 0..6 {
    for lpn in 0..8 {
      write(&mut ftl, lpn, &mut tick);
    }
    ftl.format(LpnRange { slpn: 0, nlp: 8 }, &mut tick)?;

    for (i, prev) in last.iter_mut().enumerate() {
      let now = ftl.block(i as u32).unwrap().erase_count();
      assert!(now >= *prev);
      *prev = now;
    }
  }
  OK
}
