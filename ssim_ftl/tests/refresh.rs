use aok::{OK, Void};
use log::info;
use ssim_ftl::{
  AbstractFtl, FtlConf, PageMapping, Request,
  ftl::{conf::RefreshPolicy, map::PagePtr, refresh::refresh_key},
};
use ssim_pal::{EventEngine, NS_PER_SEC, TimingDram, TimingPal};

#[static_init::constructor(0)]
extern "C" fn _log_init() {
  log_init::init();
}

type Ftl = PageMapping<TimingPal, TimingDram>;

fn refresh_conf() -> FtlConf {
  FtlConf {
    io_units_per_page: 1,
    pages_in_block: 8,
    total_physical_blocks: 16,
    total_logical_blocks: 3,
    page_count_to_max_perf: 1,
    gc_threshold_ratio: 0.05,
    refresh_period: 400,
    refresh_filter_num: 4,
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

fn check_mapping_coherent(ftl: &Ftl) {
  let conf = ftl.conf().clone();
  for lpn in 0..conf.total_logical_pages() {
    if let Some(entry) = ftl.mapping(lpn) {
      for (idx, ptr) in entry.iter().enumerate() {
        if ptr.block < conf.total_physical_blocks && ptr.page < conf.pages_in_block {
          let (valid, lpns) = ftl.block(ptr.block).unwrap().page_info(ptr.page);
          assert!(valid.test(idx), "lpn {lpn} maps to a stale slot");
          assert_eq!(lpns[idx], lpn);
        }
      }
    }
  }
}

#[test]
fn test_registration_levels_follow_predicted_rber() -> Void {
  // With af = 1 and one-hour base period, rber(level L) = 0.004 * (1 + 2^L):
  // level 0 stays under the 0.01 ECC limit, level 1 and up exceed it
  let conf = FtlConf {
    temperature: 300.0,
    epsilon: 0.004,
    alpha: 0.0,
    beta: 1.0,
    refresh_period: 3600,
    refresh_filter_num: 4,
    ..refresh_conf()
  };
  let mut ftl = new_ftl(conf);
  let mut tick = 0u64;

  write(&mut ftl, 0, &mut tick);

  let key = refresh_key(0, 0);
  assert_eq!(ftl.refresh_min_level(key), Some(1));
  assert!(ftl.bloom_contains(1, key));
  assert!(ftl.bloom_contains(2, key));
  // Catch-all level always carries every written unit
  assert!(ftl.bloom_contains(3, key));
  // Nothing was ever inserted at level 0, its table is still empty
  assert!(!ftl.bloom_contains(0, key));
  OK
}

#[test]
fn test_bloom_sweep_rewrites_flagged_pages() -> Void {
  // epsilon = 1 saturates the predicted RBER, so every write lands in every
  // level including the finest
  let conf = FtlConf {
    epsilon: 1.0,
    ..refresh_conf()
  };
  let period_ns = conf.refresh_period * NS_PER_SEC;

  let mut engine = EventEngine::new();
  let mut ftl = new_ftl(conf);
  ftl.initialize(&mut engine)?;

  let mut tick = 0u64;
  for lpn in 0..20 {
    write(&mut ftl, lpn, &mut tick);
  }

  let key = refresh_key(2, 3);
  assert!(ftl.bloom_contains(0, key));
  assert_eq!(ftl.refresh_min_level(key), Some(0));
  assert_eq!(ftl.mapping(19).unwrap()[0], PagePtr { block: 2, page: 3 });

  // First fire sweeps level 0 and rewrites all 20 still-valid pages
  assert_eq!(engine.next_tick(), Some(period_ns));
  engine.dispatch_one(&mut ftl).unwrap();

  let stat = *ftl.stat();
  info!("copies {}", stat.refresh_page_copies);
  assert_eq!(stat.refresh_call_count, 2);
  assert!(stat.refresh_page_copies >= 20);
  assert!(stat.layer_check_count >= 20);
  assert_ne!(ftl.mapping(19).unwrap()[0], PagePtr { block: 2, page: 3 });

  // The handler rescheduled itself one period after its fire tick
  assert_eq!(engine.next_tick(), Some(2 * period_ns));
  check_mapping_coherent(&ftl);
  OK
}

#[test]
fn test_sweep_cadence_reaches_catch_all() -> Void {
  // epsilon = 0 keeps fine levels empty; only the catch-all level 3 fills,
  // and it is first swept on the 8th fire (trailing zeros of call count 8)
  let conf = FtlConf {
    epsilon: 0.0,
    refresh_period: 1,
    ..refresh_conf()
  };

  let mut engine = EventEngine::new();
  let mut ftl = new_ftl(conf);
  ftl.initialize(&mut engine)?;

  let mut tick = 0u64;
  for lpn in 0..8 {
    write(&mut ftl, lpn, &mut tick);
  }
  let key = refresh_key(0, 0);
  assert_eq!(ftl.refresh_min_level(key), Some(3));
  assert!(!ftl.bloom_contains(0, key));

  for fire in 1..8 {
    engine.dispatch_one(&mut ftl).unwrap();
    assert_eq!(ftl.stat().refresh_page_copies, 0, "early copy at fire {fire}");
  }

  engine.dispatch_one(&mut ftl).unwrap();
  assert_eq!(ftl.stat().refresh_call_count, 9);
  assert!(ftl.stat().refresh_page_copies > 0);
  check_mapping_coherent(&ftl);
  OK
}

#[test]
fn test_time_threshold_policy_migrates_old_blocks() -> Void {
  let conf = FtlConf {
    refresh_policy: RefreshPolicy::TimeThreshold,
    refresh_retention_threshold: 1000,
    refresh_period: 1,
    ..refresh_conf()
  };

  let mut engine = EventEngine::new();
  let mut ftl = new_ftl(conf);
  ftl.initialize(&mut engine)?;

  let mut tick = 0u64;
  for lpn in 0..12 {
    write(&mut ftl, lpn, &mut tick);
  }

  // Both written blocks are far older than the 1 us threshold at fire time
  engine.dispatch_one(&mut ftl).unwrap();

  let stat = *ftl.stat();
  assert_eq!(stat.refresh_count, 1);
  assert_eq!(stat.refreshed_blocks, 2);
  assert_eq!(stat.refresh_page_copies, 16);
  assert_eq!(ftl.block(0).unwrap().valid_unit_count(), 0);
  assert_eq!(ftl.block(1).unwrap().valid_unit_count(), 0);
  // Everything now lives in the two fresh blocks
  assert_eq!(ftl.mapping(4).unwrap()[0], PagePtr { block: 2, page: 0 });
  assert_eq!(ftl.mapping(8).unwrap()[0], PagePtr { block: 2, page: 4 });
  assert_eq!(ftl.mapping(0).unwrap()[0], PagePtr { block: 3, page: 0 });
  check_mapping_coherent(&ftl);
  OK
}

#[test]
fn test_refresh_disabled_when_period_zero() -> Void {
  let conf = FtlConf {
    refresh_period: 0,
    ..refresh_conf()
  };

  let mut engine = EventEngine::new();
  let mut ftl = new_ftl(conf);
  ftl.initialize(&mut engine)?;
  assert_eq!(engine.pending(), 0);
  OK
}

#[test]
fn test_refresh_log_written() -> Void {
  let path = std::env::temp_dir().join(format!("ssim_refresh_{}.log", std::process::id()));
  let conf = FtlConf {
    epsilon: 1.0,
    refresh_log_path: Some(path.clone()),
    ..refresh_conf()
  };

  let mut engine = EventEngine::new();
  let mut ftl = new_ftl(conf);
  ftl.initialize(&mut engine)?;

  let header = std::fs::read_to_string(&path)?;
  assert!(header.contains("bloomfilter_stat"));

  let mut tick = 0u64;
  for lpn in 0..8 {
    write(&mut ftl, lpn, &mut tick);
  }
  engine.dispatch_one(&mut ftl).unwrap();

  let body = std::fs::read_to_string(&path)?;
  assert!(body.len() > header.len());
  assert!(body.contains("Refresh at"));

  let _ = std::fs::remove_file(&path);
  OK
}
