//! Synthetic workload driver: warm the device, run a random overwrite mix
//! with periodic refresh, then print the statistic table.
//! 合成负载驱动：预热设备，运行带周期刷新的随机覆盖写负载，最后打印统计表。

use ssim_ftl::{AbstractFtl, FtlConf, PageMapping, Request};
use ssim_pal::{EventEngine, IoMap, NS_PER_SEC, TimingDram, TimingPal};

fn main() {
  log_init::init();

  let conf = FtlConf {
    total_physical_blocks: 128,
    total_logical_blocks: 100,
    pages_in_block: 64,
    gc_threshold_ratio: 0.1,
    fill_ratio: 0.6,
    invalid_page_ratio: 0.1,
    refresh_period: 2,
    refresh_filter_num: 4,
    ..FtlConf::default()
  };
  let units = conf.io_units_per_page;
  let total = conf.total_logical_pages();

  let mut engine = EventEngine::new();
  let mut ftl = PageMapping::new(conf, TimingPal::default(), TimingDram::default())
    .expect("ftl construction");
  ftl.initialize(&mut engine).expect("warmup");

  let mut tick: u64 = 0;
  let mut rng = fastrand::Rng::with_seed(7);

  for i in 0..50_000u64 {
    let lpn = rng.u64(0..total);
    let req = Request::new(lpn, IoMap::full(units));

    if rng.u8(0..10) < 7 {
      ftl.write(&req, &mut tick).expect("write");
    } else {
      ftl.read(&req, &mut tick).expect("read");
    }

    // Let due refresh events interleave with the host stream
    // 让到期的刷新事件与主机流交错执行
    engine.run_until(&mut ftl, tick);

    if i % 10_000 == 0 {
      println!(
        "op {i:>6} | tick {:>14} ({}s) | free blocks {}",
        tick,
        tick / NS_PER_SEC,
        ftl.free_block_count()
      );
    }
  }

  let status = ftl.get_status(0, total);
  println!(
    "\nmapped {}/{} logical pages, {} free physical blocks\n",
    status.mapped_logical_pages, status.total_logical_pages, status.free_physical_blocks
  );

  let names = ftl.get_stat_list("");
  let values = ftl.get_stat_values();
  for (info, value) in names.iter().zip(values) {
    println!("{:<44} {:>16.2}  # {}", info.name, value, info.desc);
  }
}
