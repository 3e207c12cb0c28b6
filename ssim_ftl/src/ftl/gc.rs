use log::debug;
use rand::Rng;
use ssim_pal::{Dram, IoMap, Pal, PalRequest, Tick};

use crate::{
  PageMapping,
  error::{Error, Result},
  ftl::{
    conf::{EvictPolicy, GcMode},
    latency,
    map::PagePtr,
  },
};

impl<P: Pal, D: Dram> PageMapping<P, D> {
  /// Per-block reclaim weight under the configured policy. Only full blocks
  /// (write pointer at the end) are candidates.
  /// 按配置策略计算的每块回收权重。只有写满（写指针到底）的块才是候选。
  fn calculate_victim_weight(&self, policy: EvictPolicy, tick: Tick) -> Vec<(u32, f32)> {
    let mut weight = Vec::with_capacity(self.arena.in_use_count());

    match policy {
      EvictPolicy::Greedy | EvictPolicy::Random | EvictPolicy::DChoice => {
        for block in self.arena.iter_in_use() {
          if !block.is_full() {
            continue;
          }
          weight.push((block.index(), block.valid_unit_count() as f32));
        }
      }
      EvictPolicy::CostBenefit => {
        for block in self.arena.iter_in_use() {
          if !block.is_full() {
            continue;
          }
          let u = block.valid_unit_count() as f32 / self.conf.pages_in_block as f32;
          let age = tick.saturating_sub(block.last_accessed_time()) as f32;
          weight.push((block.index(), u / ((1.0 - u) * age)));
        }
      }
    }

    weight
  }

  /// Pick the blocks one GC cycle will reclaim, cheapest weight first.
  /// 选出一轮 GC 要回收的块，权重最低者优先。
  pub fn select_victim_blocks(&mut self, except: &[u32], tick: &mut Tick) -> Vec<u32> {
    let policy = self.conf.gc_evict_policy;

    let mut n_blocks = match self.conf.gc_mode {
      GcMode::Fixed => self.conf.gc_reclaim_block,
      GcMode::Threshold => {
        let goal = f64::from(self.conf.total_physical_blocks) * self.conf.gc_reclaim_threshold;
        (goal as i64 - self.free.len() as i64).max(0) as u64
      }
    };

    // Reclaim extra when a write target was exhausted since the last cycle
    // 自上一轮以来有写目标被耗尽时，多回收一些
    if self.reclaim_more {
      n_blocks += u64::from(self.conf.page_count_to_max_perf);
      self.reclaim_more = false;
    }

    let mut weight = self.calculate_victim_weight(policy, *tick);

    if matches!(policy, EvictPolicy::Random | EvictPolicy::DChoice) {
      let sample_goal = if policy == EvictPolicy::Random {
        n_blocks
      } else {
        self.conf.gc_d_choice_param * n_blocks
      };
      let eligible = weight.iter().filter(|(b, _)| !except.contains(b)).count();
      let sample = (sample_goal as usize).min(eligible);
      let mut selected = Vec::with_capacity(sample);

      while selected.len() < sample {
        let pick = self.rng.random_range(0..weight.len());
        let (block, w) = weight[pick];
        if block != u32::MAX && !except.contains(&block) {
          selected.push((block, w));
          weight[pick].0 = u32::MAX;
        }
      }

      weight = selected;
    }

    weight.sort_by(|a, b| a.1.total_cmp(&b.1));

    let n = (n_blocks as usize).min(weight.len());
    let list = weight[..n].iter().map(|(b, _)| *b).collect();

    *tick += latency::SELECT_VICTIM_BLOCK;
    list
  }

  /// Migrate every valid io-unit out of the victims, then erase them.
  /// 将牺牲块中的所有有效 io-unit 迁出，然后擦除。
  ///
  /// Timing model: all PAL reads issue concurrently from the entry tick;
  /// writes start once the slowest read finished; erases also start at that
  /// point, in parallel with the writes. The cycle ends at the later of the
  /// two plus a fixed CPU charge.
  /// 时序模型：所有 PAL 读从进入时刻并发下发；写在最慢的读完成后开始；擦除
  /// 也从该时刻开始，与写并行。整轮在两者较晚者加固定 CPU 开销处结束。
  pub fn do_garbage_collection(&mut self, victims: &[u32], tick: &mut Tick) -> Result<()> {
    if victims.is_empty() {
      return Ok(());
    }

    let units = self.conf.io_units_per_page;
    let mut read_reqs: Vec<PalRequest> = Vec::new();
    let mut write_reqs: Vec<PalRequest> = Vec::new();
    let mut erase_reqs: Vec<PalRequest> = Vec::new();

    for &victim in victims {
      // A victim outside the in-use set means selection and state diverged
      // 牺牲块不在在用集中说明选择与状态已经脱节
      self.arena.in_use(victim)?;

      for page in 0..self.conf.pages_in_block {
        let (valid, lpns) = {
          let (m, l) = self.arena.in_use(victim)?.page_info(page);
          (m, l.to_vec())
        };
        if !valid.any() {
          continue;
        }

        let bit = if self.random_tweak {
          valid
        } else {
          IoMap::full(units)
        };

        let target = self.get_last_free_block(bit, *tick)?;
        read_reqs.push(PalRequest::new(victim, page, bit));

        for idx in 0..self.unit_count {
          if bit.test(idx) {
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

            self.stat.valid_page_copies += 1;
          }
        }

        self.stat.valid_super_page_copies += 1;
      }

      erase_reqs.push(PalRequest::new(victim, 0, IoMap::full(units)));
    }

    let mut read_finished_at = *tick;
    let mut write_finished_at = *tick;
    let mut erase_finished_at = *tick;

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

    for req in &erase_reqs {
      let mut begin_at = read_finished_at;
      self.erase_internal(req, &mut begin_at)?;
      erase_finished_at = erase_finished_at.max(begin_at);
    }

    *tick = write_finished_at.max(erase_finished_at);
    *tick += latency::DO_GARBAGE_COLLECTION;
    Ok(())
  }

  /// Erase one victim and recycle or retire it.
  /// 擦除一个牺牲块并令其回收或退役。
  pub(crate) fn erase_internal(&mut self, req: &PalRequest, tick: &mut Tick) -> Result<()> {
    {
      let block = self.arena.in_use_mut(req.block)?;
      if block.valid_unit_count() != 0 {
        return Err(Error::ValidPagesInVictim(req.block));
      }
      block.erase();
    }

    self.pal.erase(req, tick);

    let erase_count = self
      .arena
      .get(req.block)
      .map_or(u32::MAX, |b| b.erase_count());

    if erase_count < self.conf.bad_block_threshold {
      self.arena.set_in_use(req.block, false);
      self.free.insert_sorted(req.block, &self.arena);
    } else {
      debug!("block {} retired after {erase_count} erases", req.block);
      self.arena.retire(req.block);
    }

    *tick += latency::ERASE_INTERNAL;
    Ok(())
  }
}
