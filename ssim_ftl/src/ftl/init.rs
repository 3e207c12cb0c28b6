use std::{
  fs::File,
  io::{BufWriter, Write},
};

use log::{debug, info, warn};
use rand::Rng;
use ssim_pal::{Dram, EventEngine, Pal, Tick};

use crate::{
  PageMapping, Request,
  error::Result,
  ftl::conf::FillingMode,
};

impl<P: Pal, D: Dram> PageMapping<P, D> {
  /// Warm the device up, open the refresh statistics log, and arm the
  /// periodic refresh event.
  /// 预热设备、打开刷新统计日志，并装载周期性刷新事件。
  ///
  /// Warmup writes run outside simulated time: they charge no PAL/DRAM
  /// latency, register no refresh entries, and must never sink low enough to
  /// trigger GC.
  /// 预热写不占仿真时间：不计 PAL/DRAM 延迟、不登记刷新条目，也绝不允许
  /// 低到触发 GC。
  pub fn initialize(&mut self, engine: &mut EventEngine<Self>) -> Result<()> {
    debug!("initialization started");

    let total = self.conf.total_logical_pages();
    let n_warmup = (total as f64 * self.conf.fill_ratio) as u64;
    let mut n_invalidate = (total as f64 * self.conf.invalid_page_ratio) as u64;
    let mode = self.conf.filling_mode;

    // Free blocks the device must still hold once warmup is done
    // 预热结束后设备仍须保有的空闲块数
    let max_pages_before_gc = (f64::from(self.conf.pages_in_block)
      * (f64::from(self.conf.total_physical_blocks) * (1.0 - self.conf.gc_threshold_ratio)
        - f64::from(self.conf.page_count_to_max_perf))) as u64;

    if n_warmup + n_invalidate > max_pages_before_gc {
      warn!("ftl: too high filling ratio, adjusting invalid_page_ratio");
      n_invalidate = max_pages_before_gc.saturating_sub(n_warmup);
    }

    info!("total logical pages: {total}");
    info!(
      "total logical pages to fill: {n_warmup} ({:.2} %)",
      n_warmup as f64 * 100.0 / total as f64
    );
    info!(
      "total invalidated pages to create: {n_invalidate} ({:.2} %)",
      n_invalidate as f64 * 100.0 / total as f64
    );

    let units = self.conf.io_units_per_page;

    // Step 1, filling
    // 第一步：填充
    match mode {
      FillingMode::SeqSeq | FillingMode::SeqRand => {
        for lpn in 0..n_warmup {
          let mut tick: Tick = 0;
          self.write_internal(&Request::super_page(lpn, units), &mut tick, false)?;
        }
      }
      FillingMode::RandRand => {
        for _ in 0..n_warmup {
          let mut tick: Tick = 0;
          let lpn = self.rng.random_range(0..total);
          self.write_internal(&Request::super_page(lpn, units), &mut tick, false)?;
        }
      }
    }

    // Step 2, invalidating by overwrite
    // 第二步：以覆盖写制造无效页
    match mode {
      FillingMode::SeqSeq => {
        for lpn in 0..n_invalidate {
          let mut tick: Tick = 0;
          self.write_internal(&Request::super_page(lpn, units), &mut tick, false)?;
        }
      }
      FillingMode::SeqRand => {
        // Step 1 was sequential, so restricting the LPN range yields the
        // exact requested number of invalid pages
        // 第一步是顺序写，限制 LPN 范围即可得到恰好数量的无效页
        if n_warmup > 0 {
          for _ in 0..n_invalidate {
            let mut tick: Tick = 0;
            let lpn = self.rng.random_range(0..n_warmup);
            self.write_internal(&Request::super_page(lpn, units), &mut tick, false)?;
          }
        }
      }
      FillingMode::RandRand => {
        for _ in 0..n_invalidate {
          let mut tick: Tick = 0;
          let lpn = self.rng.random_range(0..total);
          self.write_internal(&Request::super_page(lpn, units), &mut tick, false)?;
        }
      }
    }

    self.open_refresh_log()?;

    // Arm the periodic refresh; the handler reschedules itself relative to
    // its fire tick, not its completion tick
    // 装载周期刷新；处理器按触发时刻而非完成时刻重新调度自身
    if self.conf.refresh_period > 0 {
      let id = engine.allocate_event(Box::new(|ftl: &mut Self, tick| {
        let fire = *tick;
        if let Err(e) = ftl.on_refresh(tick) {
          log::error!("refresh failed: {e}");
          return None;
        }
        Some(fire + ftl.conf.refresh_period_ns())
      }));
      engine.schedule_event(id, self.conf.refresh_period_ns());
      self.refresh_event = Some(id);
    }

    self.stat.refresh_call_count = 1;
    debug!(
      "refresh setting done, {} bloom filters",
      self.blooms.level_count()
    );

    // Report
    // 报告
    let (valid, invalid) = self.calculate_total_pages();
    info!("filling finished, page status:");
    info!(
      "  total valid physical pages: {valid} (target {n_warmup}, error {})",
      valid as i64 - n_warmup as i64
    );
    info!(
      "  total invalid physical pages: {invalid} (target {n_invalidate}, error {})",
      invalid as i64 - n_invalidate as i64
    );
    debug!("initialization finished");

    Ok(())
  }

  /// Write the Bloom sizing decisions and initial per-filter stat blocks.
  /// 写出 Bloom 定容决策和每个滤波器的初始统计块。
  fn open_refresh_log(&mut self) -> Result<()> {
    let Some(path) = &self.conf.refresh_log_path else {
      return Ok(());
    };

    let mut log = BufWriter::new(File::create(path)?);

    for params in &self.bloom_params {
      writeln!(
        log,
        "{}, {}, {}, {}, {}",
        params.number_of_hashes,
        params.table_size,
        params.false_positive_probability,
        params.random_seed,
        params.projected_element_count
      )?;
      writeln!(log)?;
    }

    for (i, filter) in self.blooms.filters.iter().enumerate() {
      writeln!(log, "bloomfilter_stat {i}")?;
      writeln!(log, "false_positive : {}", filter.false_positive)?;
      writeln!(log, "true_positive : {}", filter.true_positive)?;
      writeln!(log, "true_negative : {}", filter.true_negative)?;
      writeln!(log, "bloom filter size : {}", filter.table_size)?;
      writeln!(log, "bloom filter hash : {}", filter.salt_count)?;
      writeln!(log, "actual insertion : {}", filter.actual_insert)?;
      writeln!(log)?;
    }

    log.flush()?;
    self.refresh_log = Some(log);
    Ok(())
  }
}
