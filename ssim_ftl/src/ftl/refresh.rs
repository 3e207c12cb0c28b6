use std::io::Write;

use log::debug;
use rapidhash::RapidHashMap;
use ssim_pal::{Dram, IoMap, Pal, PalRequest, Tick};

use crate::{
  PageMapping,
  error::{Error, Result},
  ftl::{conf::RefreshPolicy, latency, map::PagePtr},
};

/// Key of one (block, layer) refresh unit.
/// 一个 (block, layer) 刷新单元的键。
#[inline]
#[must_use]
pub fn refresh_key(block: u32, layer: u32) -> u64 {
  (u64::from(block) << 32) | u64::from(layer)
}

/// Exact side-map from refresh key to the smallest Bloom level it was
/// inserted into. The Bloom hierarchy stays authoritative for refresh
/// decisions; this table only classifies its hits for telemetry.
/// 从刷新键到其插入过的最小 Bloom 层级的精确旁路映射。刷新决策仍以 Bloom
/// 层级为准；该表只为遥测对命中分类。
#[derive(Debug, Default)]
pub struct RefreshTable {
  map: RapidHashMap<u64, u32>,
}

impl RefreshTable {
  /// Record `level` for `key`; true when this lowered (or created) the
  /// recorded minimum.
  /// 为 `key` 记录 `level`；当这降低（或创建）了记录的最小值时返回真。
  pub fn record(&mut self, key: u64, level: u32) -> bool {
    match self.map.get_mut(&key) {
      None => {
        self.map.insert(key, level);
        true
      }
      Some(existing) if *existing > level => {
        *existing = level;
        true
      }
      Some(_) => false,
    }
  }

  #[inline]
  #[must_use]
  pub fn min_level(&self, key: u64) -> Option<u32> {
    self.map.get(&key).copied()
  }

  #[inline]
  #[must_use]
  pub fn len(&self) -> usize {
    self.map.len()
  }

  #[inline]
  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.map.is_empty()
  }
}

impl<P: Pal, D: Dram> PageMapping<P, D> {
  /// Insert a refresh unit at `level` and keep the exact side-map current.
  /// 在 `level` 插入一个刷新单元，并同步精确旁路映射。
  pub(crate) fn set_refresh_period(&mut self, block: u32, layer: u32, level: u32) {
    let key = refresh_key(block, layer);
    if self.refresh_table.record(key, level) {
      self.blooms.filters[level as usize].actual_insert += 1;
    }
    self.blooms.insert(level as usize, key);
  }

  /// Classify a freshly written page into Bloom levels by predicted RBER.
  /// 按预测 RBER 将新写入的页归类到各 Bloom 层。
  ///
  /// The highest level is the catch-all; every finer level `L` is entered
  /// when the page is predicted to exceed the ECC limit within that level's
  /// sweep period `base · 2^L`. Shorter predicted retention therefore lands
  /// in finer-grained levels.
  /// 最高层是兜底层；当页被预测会在第 `L` 层的扫描周期 `base · 2^L` 内超过
  /// ECC 上限时，就进入更细的第 `L` 层。预测保持越短，落入的层级越细。
  pub(crate) fn register_refresh(&mut self, block: u32, layer: u32, pe: u32) {
    let levels = self.blooms.level_count();
    if levels == 0 {
      return;
    }

    self.set_refresh_period(block, layer, (levels - 1) as u32);

    for level in (0..levels - 1).rev() {
      let dt = self.conf.refresh_period_ns() * (1u64 << level);
      let rber = self.error_model.rber(dt, pe, layer);
      if rber > self.conf.refresh_rber_threshold {
        self.set_refresh_period(block, layer, level as u32);
      }
    }
  }

  /// Periodic refresh fire. Dispatches on the configured policy.
  /// 周期性刷新触发。按配置的策略分派。
  pub fn on_refresh(&mut self, tick: &mut Tick) -> Result<()> {
    match self.conf.refresh_policy {
      RefreshPolicy::BloomSweep => self.refresh_bloom_sweep(tick),
      RefreshPolicy::TimeThreshold => self.refresh_time_threshold(tick),
    }
  }

  /// Sweep one Bloom level and rewrite every matching (block, layer) unit.
  /// 扫描一层 Bloom，重写所有命中的 (block, layer) 单元。
  ///
  /// The level is the lowest set bit of the pre-increment call count, capped
  /// at the top level, so level `i` is swept once per `2^(i+1)` fires with
  /// the count starting at 1.
  /// 层号取自增前调用计数的最低置位位，并以最高层封顶；计数从 1 起，第 `i`
  /// 层每 `2^(i+1)` 次触发被扫描一次。
  fn refresh_bloom_sweep(&mut self, tick: &mut Tick) -> Result<()> {
    let levels = self.blooms.level_count();
    if levels == 0 {
      return Ok(());
    }

    let call = self.stat.refresh_call_count.max(1);
    let target = (call.trailing_zeros() as usize).min(levels - 1);

    debug!("refresh at {tick}, sweeping bloom level {target}");
    if let Some(log) = &mut self.refresh_log {
      writeln!(log, "Refresh at {tick}")?;
      writeln!(log, "Check bloom filter {target}")?;
    }

    let mut layer_check_count = 0u64;

    for block in 0..self.conf.total_physical_blocks {
      for layer in 0..self.conf.layers_per_block {
        let key = refresh_key(block, layer);

        if self.blooms.contains(target, key) {
          let known = self
            .refresh_table
            .min_level(key)
            .is_some_and(|lvl| lvl <= target as u32);
          let filter = &mut self.blooms.filters[target];
          if known {
            filter.true_positive += 1;
          } else {
            filter.false_positive += 1;
          }

          layer_check_count += 1;
          self.refresh_page(block, layer, tick)?;
        } else {
          self.blooms.filters[target].true_negative += 1;
        }
      }
    }

    self.stat.refresh_call_count += 1;
    self.stat.layer_check_count += layer_check_count;

    let total = u64::from(self.conf.total_physical_blocks) * u64::from(self.conf.layers_per_block);
    debug!("{layer_check_count} / {total} layers checked");

    if let Some(log) = &mut self.refresh_log {
      let filter = &self.blooms.filters[target];
      writeln!(log, "{layer_check_count} / {total} layers checked")?;
      writeln!(log, "bloomfilter_stat {target}")?;
      writeln!(log, "false_positive : {}", filter.false_positive)?;
      writeln!(log, "true_positive : {}", filter.true_positive)?;
      writeln!(log, "true_negative : {}", filter.true_negative)?;
      writeln!(log, "actual insertion : {}", filter.actual_insert)?;
      writeln!(log)?;
      log.flush()?;
    }

    Ok(())
  }

  /// Rewrite the still-valid units of one (block, layer), running a GC cycle
  /// first when the free pool is low. Reclamation of the source block itself
  /// happens later through normal GC as its invalidations pile up.
  /// 重写一个 (block, layer) 中仍有效的单元；空闲池吃紧时先跑一轮 GC。源块
  /// 本身的回收随失效累积，留给后续常规 GC。
  pub fn refresh_page(&mut self, block_idx: u32, layer: u32, tick: &mut Tick) -> Result<()> {
    if self.free_block_ratio() < self.conf.gc_threshold_ratio {
      let mut begin_at = *tick;
      let victims = self.select_victim_blocks(&[], &mut begin_at);
      debug!("GC   | Refreshing | {} blocks will be reclaimed", victims.len());
      self.do_garbage_collection(&victims, &mut begin_at)?;
      self.stat.gc_count += 1;
      self.stat.reclaimed_blocks += victims.len() as u64;
    }

    // A hit on a block no longer in use is a tolerated Bloom false positive
    // 命中已不在用的块属于可容忍的 Bloom 误报
    if !self.arena.is_in_use(block_idx) {
      return Ok(());
    }

    let units = self.conf.io_units_per_page;
    let mut read_reqs: Vec<PalRequest> = Vec::new();
    let mut write_reqs: Vec<PalRequest> = Vec::new();

    let mut page = layer;
    while page < self.conf.pages_in_block {
      let has_valid = self
        .arena
        .get(block_idx)
        .is_some_and(|b| b.valid_unit_count() > 0);

      if has_valid {
        let (valid, lpns) = {
          let (m, l) = self.arena.in_use(block_idx)?.page_info(page);
          (m, l.to_vec())
        };

        let bit = if self.random_tweak {
          valid
        } else {
          IoMap::full(units)
        };

        let target = self.get_last_free_block(bit, *tick)?;
        read_reqs.push(PalRequest::new(block_idx, page, bit));

        for idx in 0..self.unit_count {
          if bit.test(idx) && valid.test(idx) {
            self.arena.in_use_mut(block_idx)?.invalidate(page, idx);

            let lpn = lpns[idx];
            // A missing entry is another tolerated false positive
            // 条目缺失同样是可容忍的误报
            if !self.table.contains(lpn) {
              continue;
            }
            let addr = self.map_addr(lpn);
            self.dram.read(addr, 8 * units as u64, tick);

            let new_page = self.arena.in_use(target)?.next_write_page(idx);
            let entry = self
              .table
              .lookup_mut(lpn)
              .ok_or(Error::MappingMissing(lpn))?;
            entry[idx] = PagePtr {
              block: target,
              page: new_page,
            };

            self
              .arena
              .in_use_mut(target)?
              .write(new_page, lpn, idx, *tick)?;

            let wmap = if self.random_tweak {
              IoMap::one(idx)
            } else {
              IoMap::full(units)
            };
            write_reqs.push(PalRequest::new(target, new_page, wmap));

            self.stat.refresh_page_copies += 1;
          }
        }

        self.stat.refresh_super_page_copies += 1;
      }

      page += self.conf.layers_per_block;
    }

    let mut read_finished_at = *tick;
    let mut write_finished_at = *tick;

    for req in &read_reqs {
      let mut begin_at = *tick;
      self.pal.read(req, &mut begin_at);
      read_finished_at = read_finished_at.max(begin_at);
    }

    for req in &write_reqs {
      let mut begin_at = read_finished_at;
      self.pal.write(req, &mut begin_at);
      write_finished_at = write_finished_at.max(begin_at);
    }

    *tick = write_finished_at.max(read_finished_at);
    *tick += latency::DO_GARBAGE_COLLECTION;
    Ok(())
  }

  /// Blocks whose retention age crossed the threshold, for `TimeThreshold`.
  /// 保持时长越过阈值的块，供 `TimeThreshold` 策略使用。
  pub fn select_refresh_victims(&mut self, tick: &mut Tick) -> Vec<u32> {
    let threshold = self.conf.refresh_retention_threshold;
    let now = *tick;

    let list = self
      .arena
      .iter_in_use()
      .filter(|b| now.saturating_sub(b.last_written_time()) >= threshold)
      .map(|b| b.index())
      .collect();

    *tick += latency::SELECT_VICTIM_BLOCK;
    list
  }

  /// Migrate every valid page of every over-age block. Blocks that a
  /// free-pool-pressure GC claims first are dropped from the refresh list.
  /// 迁移所有超龄块的全部有效页。被空闲池压力 GC 先行认领的块从刷新列表中
  /// 剔除。
  fn refresh_time_threshold(&mut self, tick: &mut Tick) -> Result<()> {
    let mut victims = self.select_refresh_victims(tick);
    if victims.is_empty() {
      return Ok(());
    }

    while (self.free.len() as f64) < victims.len() as f64 * 1.5 {
      let mut begin_at = *tick;
      let list = self.select_victim_blocks(&[], &mut begin_at);
      if list.is_empty() {
        break;
      }

      victims.retain(|b| !list.contains(b));
      debug!("GC   | Refreshing | {} blocks will be reclaimed", list.len());
      self.do_garbage_collection(&list, &mut begin_at)?;
      self.stat.gc_count += 1;
      self.stat.reclaimed_blocks += list.len() as u64;
    }

    let units = self.conf.io_units_per_page;
    let mut read_reqs: Vec<PalRequest> = Vec::new();
    let mut write_reqs: Vec<PalRequest> = Vec::new();

    for &victim in &victims {
      for page in 0..self.conf.pages_in_block {
        let has_valid = self
          .arena
          .get(victim)
          .is_some_and(|b| b.valid_unit_count() > 0);
        if !has_valid {
          continue;
        }

        let (valid, lpns) = {
          let (m, l) = self.arena.in_use(victim)?.page_info(page);
          (m, l.to_vec())
        };

        let bit = if self.random_tweak {
          valid
        } else {
          IoMap::full(units)
        };

        let target = self.get_last_free_block(bit, *tick)?;
        read_reqs.push(PalRequest::new(victim, page, bit));

        for idx in 0..self.unit_count {
          if bit.test(idx) && valid.test(idx) {
            self.arena.in_use_mut(victim)?.invalidate(page, idx);

            let lpn = lpns[idx];
            let addr = self.map_addr(lpn);
            self.dram.read(addr, 8 * units as u64, tick);

            let new_page = self.arena.in_use(target)?.next_write_page(idx);
            let entry = self
              .table
              .lookup_mut(lpn)
              .ok_or(Error::MappingMissing(lpn))?;
            entry[idx] = PagePtr {
              block: target,
              page: new_page,
            };

            self
              .arena
              .in_use_mut(target)?
              .write(new_page, lpn, idx, *tick)?;

            let wmap = if self.random_tweak {
              IoMap::one(idx)
            } else {
              IoMap::full(units)
            };
            write_reqs.push(PalRequest::new(target, new_page, wmap));

            self.stat.refresh_page_copies += 1;
          }
        }

        self.stat.refresh_super_page_copies += 1;
      }
    }

    let mut read_finished_at = *tick;
    let mut write_finished_at = *tick;

    for req in &read_reqs {
      let mut begin_at = *tick;
      self.pal.read(req, &mut begin_at);
      read_finished_at = read_finished_at.max(begin_at);
    }

    for req in &write_reqs {
      let mut begin_at = read_finished_at;
      self.pal.write(req, &mut begin_at);
      write_finished_at = write_finished_at.max(begin_at);
    }

    self.stat.refresh_count += 1;
    self.stat.refreshed_blocks += victims.len() as u64;

    *tick = write_finished_at.max(read_finished_at);
    *tick += latency::DO_GARBAGE_COLLECTION;
    Ok(())
  }
}
