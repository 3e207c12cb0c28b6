use log::debug;
use ssim_pal::{Dram, IoMap, Pal, PalRequest, Tick};

use crate::{
  PageMapping, Request,
  error::{Error, Result},
  ftl::{latency, map::PagePtr},
  ftl_trait::LpnRange,
};

impl<P: Pal, D: Dram> PageMapping<P, D> {
  /// Bytes of one mapping entry, the unit of DRAM traffic charged per lookup.
  /// 单个映射条目的字节数，即每次查表计费的 DRAM 流量单位。
  #[inline]
  pub(crate) fn map_addr(&self, lpn: u64) -> u64 {
    lpn * self.unit_count as u64 * 8
  }

  #[inline]
  pub(crate) fn is_mapped(&self, ptr: PagePtr) -> bool {
    ptr.block < self.conf.total_physical_blocks && ptr.page < self.conf.pages_in_block
  }

  pub(crate) fn read_internal(&mut self, req: &Request, tick: &mut Tick) -> Result<()> {
    let Some(entry) = self.table.lookup(req.lpn) else {
      return Ok(());
    };
    let entry: Vec<PagePtr> = entry.to_vec();

    let bytes = if self.random_tweak {
      8 * req.iomap.count() as u64
    } else {
      8
    };
    self.dram.read(self.map_addr(req.lpn), bytes, tick);

    let mut finished_at = *tick;

    for idx in 0..self.unit_count {
      if req.iomap.test(idx) || !self.random_tweak {
        let mapping = entry[idx];
        if !self.is_mapped(mapping) {
          continue;
        }

        let pal_iomap = if self.random_tweak {
          IoMap::one(idx)
        } else {
          IoMap::full(self.conf.io_units_per_page)
        };

        let mut begin_at = *tick;
        let (retention, pe) = {
          let block = self.arena.in_use_mut(mapping.block)?;
          block.read(mapping.page, idx, begin_at);
          (
            begin_at.saturating_sub(block.last_written_time()),
            block.erase_count(),
          )
        };

        // Sample the retention error and remember the worst case per block;
        // feeds the average-error statistic.
        // 抽样保持误码并记录每块的最坏值；供平均误码统计使用。
        let layer = mapping.page % self.conf.layers_per_block;
        let errors = self.error_model.random_errors(retention, pe, layer);
        if let Ok(block) = self.arena.in_use_mut(mapping.block) {
          block.note_error_count(errors);
        }

        self
          .pal
          .read(&PalRequest::new(mapping.block, mapping.page, pal_iomap), &mut begin_at);

        finished_at = finished_at.max(begin_at);
      }
    }

    *tick = finished_at;
    *tick += latency::READ_INTERNAL;
    Ok(())
  }

  /// The write data path: invalidate the old location, program the current
  /// write target, update the mapping, register refresh entries, then run GC
  /// if the free pool dropped below the threshold.
  /// 写数据路径：失效旧位置、编程当前写目标、更新映射、登记刷新条目，最后
  /// 在空闲池低于阈值时执行 GC。
  ///
  /// Warmup passes `send_to_pal = false`, which skips PAL/DRAM timing, skips
  /// refresh registration, and makes a GC trigger fatal.
  /// 预热传入 `send_to_pal = false`：跳过 PAL/DRAM 时序、跳过刷新登记，且
  /// 触发 GC 视为致命错误。
  pub(crate) fn write_internal(
    &mut self,
    req: &Request,
    tick: &mut Tick,
    send_to_pal: bool,
  ) -> Result<()> {
    let mut finished_at = *tick;
    let sentinel = self.table.sentinel();
    let mut old = vec![sentinel; self.unit_count];

    if let Some(entry) = self.table.lookup(req.lpn) {
      old.copy_from_slice(entry);
      // Invalidate the slots this request supersedes
      // 失效被本请求取代的槽
      for idx in 0..self.unit_count {
        if (req.iomap.test(idx) || !self.random_tweak)
          && self.is_mapped(old[idx])
          && let Some(block) = self.arena.get_mut(old[idx].block)
        {
          block.invalidate(old[idx].page, idx);
        }
      }
    } else {
      self.table.insert_or_get(req.lpn);
    }

    let target = self.get_last_free_block(req.iomap, *tick)?;

    if send_to_pal {
      let bytes = if self.random_tweak {
        8 * req.iomap.count() as u64
      } else {
        8
      };
      self.dram.read(self.map_addr(req.lpn), bytes, tick);
      self.dram.write(self.map_addr(req.lpn), bytes, tick);
    }

    // Without random tweak a partial request must fetch the untouched units
    // from the superseded page before programming the new one.
    // 没有 random tweak 时，部分写请求必须先从被取代页读回未触及的单元，
    // 再编程新页。
    let read_before_write = !self.random_tweak && !req.iomap.all(self.conf.io_units_per_page);

    for idx in 0..self.unit_count {
      if req.iomap.test(idx) || !self.random_tweak {
        let page = {
          let block = self.arena.in_use(target)?;
          block.next_write_page(idx)
        };

        let mut begin_at = *tick;
        self
          .arena
          .in_use_mut(target)?
          .write(page, req.lpn, idx, begin_at)?;

        if read_before_write && send_to_pal && self.is_mapped(old[idx]) {
          let fetch = req.iomap.flip(self.conf.io_units_per_page);
          self
            .pal
            .read(&PalRequest::new(old[idx].block, old[idx].page, fetch), &mut begin_at);
        }

        let entry = self
          .table
          .lookup_mut(req.lpn)
          .ok_or(Error::MappingMissing(req.lpn))?;
        entry[idx] = PagePtr { block: target, page };

        if send_to_pal {
          let iomap = if self.random_tweak {
            IoMap::one(idx)
          } else {
            IoMap::full(self.conf.io_units_per_page)
          };
          self
            .pal
            .write(&PalRequest::new(target, page, iomap), &mut begin_at);
        }

        finished_at = finished_at.max(begin_at);

        if send_to_pal {
          let pe = self.arena.in_use(target)?.erase_count();
          let layer = page % self.conf.layers_per_block;
          self.register_refresh(target, layer, pe);
        }
      }
    }

    // CPU work is free during warmup
    // 预热期间不计 CPU 开销
    if send_to_pal {
      *tick = finished_at;
      *tick += latency::WRITE_INTERNAL;
    }

    if self.free_block_ratio() < self.conf.gc_threshold_ratio {
      if !send_to_pal {
        return Err(Error::GcDuringInit);
      }

      let mut begin_at = *tick;
      let victims = self.select_victim_blocks(&[], &mut begin_at);
      debug!("GC   | On-demand | {} blocks will be reclaimed", victims.len());
      self.do_garbage_collection(&victims, &mut begin_at)?;
      debug!("GC   | Done | {} - {} ({})", tick, begin_at, begin_at - *tick);
      self.stat.gc_count += 1;
      self.stat.reclaimed_blocks += victims.len() as u64;
    }

    Ok(())
  }

  pub(crate) fn trim_internal(&mut self, req: &Request, tick: &mut Tick) -> Result<()> {
    let Some(entry) = self.table.lookup(req.lpn) else {
      return Ok(());
    };
    let entry: Vec<PagePtr> = entry.to_vec();

    let bytes = if self.random_tweak {
      8 * req.iomap.count() as u64
    } else {
      8
    };
    self.dram.read(self.map_addr(req.lpn), bytes, tick);

    for (idx, &mapping) in entry.iter().enumerate() {
      // Sentinel slots belong to io-units this LPN never wrote
      // 哨兵槽对应该 LPN 从未写过的 io-unit
      if self.is_mapped(mapping)
        && let Some(block) = self.arena.get_mut(mapping.block)
      {
        block.invalidate(mapping.page, idx);
      }
    }

    self.table.erase(req.lpn);
    *tick += latency::TRIM_INTERNAL;
    Ok(())
  }

  /// Trim every LPN in the range, then force-erase the affected blocks by
  /// garbage-collecting exactly that set. Victims need not be full; the GC
  /// page loop simply finds nothing valid in them.
  /// 修剪区间内的每个 LPN，然后对受影响的块集合做一次定向 GC 以强制擦除。
  /// 牺牲块不必写满；GC 的页循环在其中找不到有效数据而已。
  pub(crate) fn format_internal(&mut self, range: LpnRange, tick: &mut Tick) -> Result<()> {
    let mut list: Vec<u32> = Vec::new();
    let lpns: Vec<u64> = self
      .table
      .present_in(range.slpn, range.slpn + range.nlp)
      .collect();

    for lpn in lpns {
      let entry: Vec<PagePtr> = self
        .table
        .lookup(lpn)
        .ok_or(Error::MappingMissing(lpn))?
        .to_vec();

      for (idx, &mapping) in entry.iter().enumerate() {
        if self.is_mapped(mapping)
          && let Some(block) = self.arena.get_mut(mapping.block)
        {
          block.invalidate(mapping.page, idx);
          list.push(mapping.block);
        }
      }

      self.table.erase(lpn);
    }

    list.sort_unstable();
    list.dedup();

    self.do_garbage_collection(&list, tick)?;
    Ok(())
  }
}
