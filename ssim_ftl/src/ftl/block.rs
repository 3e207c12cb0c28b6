use ssim_pal::{IoMap, Tick};

use crate::error::{Error, Result};

/// State of one physical NAND block.
/// 一个物理 NAND 块的状态。
///
/// Every io-unit of every page is in exactly one of three states: erased
/// (never programmed since the last erase), valid, or invalid. Counters are
/// kept at io-unit grain so `valid + invalid + erased` always equals
/// `pages · io_units`.
/// 每页的每个 io-unit 恰处于三种状态之一：已擦除（自上次擦除后未编程）、
/// 有效、无效。计数器以 io-unit 为粒度维护，因此 `valid + invalid + erased`
/// 恒等于 `pages · io_units`。
#[derive(Debug, Clone)]
pub struct Block {
  index: u32,
  pages: u32,
  units: usize,
  /// Next programmable page, tracked per io-unit so random-tweak writes
  /// advance sub-slots independently.
  /// 每个 io-unit 独立跟踪的下一可编程页，使 random-tweak 写能独立推进子槽。
  next_write: Vec<u32>,
  /// Per-page valid bitmap over io-units.
  /// 每页的 io-unit 有效位图。
  valid: Vec<IoMap>,
  /// Per-page erased bitmap over io-units.
  /// 每页的 io-unit 已擦除位图。
  erased: Vec<IoMap>,
  /// LPN stored in each (page, io-unit) slot, `page * units + unit`.
  /// 每个 (page, io-unit) 槽存放的 LPN，下标为 `page * units + unit`。
  lpns: Vec<u64>,
  valid_units: u64,
  erased_units: u64,
  last_accessed: Tick,
  last_written: Tick,
  erase_count: u32,
  max_error_count: u64,
}

impl Block {
  #[must_use]
  pub fn new(index: u32, pages: u32, units: usize, initial_erase_count: u32) -> Self {
    let n = pages as usize * units;
    Self {
      index,
      pages,
      units,
      next_write: vec![0; units],
      valid: vec![IoMap::empty(); pages as usize],
      erased: vec![IoMap::full(units); pages as usize],
      lpns: vec![0; n],
      valid_units: 0,
      erased_units: n as u64,
      last_accessed: 0,
      last_written: 0,
      erase_count: initial_erase_count,
      max_error_count: 0,
    }
  }

  #[inline]
  #[must_use]
  pub fn index(&self) -> u32 {
    self.index
  }

  /// Write pointer of one io-unit.
  /// 单个 io-unit 的写指针。
  #[inline]
  #[must_use]
  pub fn next_write_page(&self, unit: usize) -> u32 {
    self.next_write[unit]
  }

  /// Highest write pointer across io-units. Victim selection and allocator
  /// rollover treat the block as full once this reaches `pages`.
  /// 各 io-unit 中最高的写指针。一旦到达 `pages`，牺牲块选择和分配器换块
  /// 都将该块视为已写满。
  #[inline]
  #[must_use]
  pub fn write_pointer(&self) -> u32 {
    self.next_write.iter().copied().max().unwrap_or(0)
  }

  #[inline]
  #[must_use]
  pub fn is_full(&self) -> bool {
    self.write_pointer() == self.pages
  }

  /// Program one io-unit slot. A slot can only be programmed once between
  /// erases, in write-pointer order.
  /// 编程一个 io-unit 槽。两次擦除之间每个槽只能按写指针顺序编程一次。
  pub fn write(&mut self, page: u32, lpn: u64, unit: usize, tick: Tick) -> Result<()> {
    if page != self.next_write[unit] || page >= self.pages || !self.erased[page as usize].test(unit)
    {
      return Err(Error::WriteOutOfOrder {
        block: self.index,
        page,
        unit,
      });
    }

    self.erased[page as usize].clear(unit);
    self.valid[page as usize].set(unit);
    self.lpns[page as usize * self.units + unit] = lpn;
    self.erased_units -= 1;
    self.valid_units += 1;
    self.next_write[unit] += 1;
    self.last_accessed = tick;
    Ok(())
  }

  /// Drop the valid bit of one slot. Idempotent.
  /// 清除一个槽的有效位。幂等。
  pub fn invalidate(&mut self, page: u32, unit: usize) {
    if page < self.pages && self.valid[page as usize].test(unit) {
      self.valid[page as usize].clear(unit);
      self.valid_units -= 1;
    }
  }

  /// Record a read touch for retention bookkeeping.
  /// 为保持时间记账记录一次读访问。
  #[inline]
  pub fn read(&mut self, _page: u32, _unit: usize, tick: Tick) {
    self.last_accessed = tick;
  }

  /// Valid bitmap and stored LPNs of one page.
  /// 一页的有效位图及其存放的 LPN。
  #[must_use]
  pub fn page_info(&self, page: u32) -> (IoMap, &[u64]) {
    let base = page as usize * self.units;
    (self.valid[page as usize], &self.lpns[base..base + self.units])
  }

  /// Reset all per-page state and advance the P/E counter.
  /// 重置所有页级状态并推进 P/E 计数。
  pub fn erase(&mut self) {
    for m in &mut self.valid {
      *m = IoMap::empty();
    }
    for m in &mut self.erased {
      *m = IoMap::full(self.units);
    }
    self.next_write.fill(0);
    self.valid_units = 0;
    self.erased_units = self.pages as u64 * self.units as u64;
    self.erase_count += 1;
  }

  /// Valid io-unit count (GC weight input).
  /// 有效 io-unit 数（GC 权重输入）。
  #[inline]
  #[must_use]
  pub fn valid_unit_count(&self) -> u64 {
    self.valid_units
  }

  /// Pages holding at least one valid io-unit.
  /// 至少含一个有效 io-unit 的页数。
  #[must_use]
  pub fn valid_page_count(&self) -> u64 {
    self.valid.iter().filter(|m| m.any()).count() as u64
  }

  #[inline]
  #[must_use]
  pub fn erased_unit_count(&self) -> u64 {
    self.erased_units
  }

  /// Programmed-but-invalid io-unit count.
  /// 已编程但无效的 io-unit 数。
  #[inline]
  #[must_use]
  pub fn invalid_unit_count(&self) -> u64 {
    self.pages as u64 * self.units as u64 - self.valid_units - self.erased_units
  }

  #[inline]
  #[must_use]
  pub fn erase_count(&self) -> u32 {
    self.erase_count
  }

  #[inline]
  #[must_use]
  pub fn last_accessed_time(&self) -> Tick {
    self.last_accessed
  }

  #[inline]
  #[must_use]
  pub fn last_written_time(&self) -> Tick {
    self.last_written
  }

  /// Retention clock origin, stamped when the block leaves the free pool.
  /// 保持时间的时钟起点，在块离开空闲池时打点。
  #[inline]
  pub fn set_last_written_time(&mut self, tick: Tick) {
    self.last_written = tick;
  }

  #[inline]
  #[must_use]
  pub fn max_error_count(&self) -> u64 {
    self.max_error_count
  }

  /// Raise the worst observed error count, never lowering it.
  /// 提升观测到的最大错误数，绝不降低。
  #[inline]
  pub fn note_error_count(&mut self, errors: u64) {
    if errors > self.max_error_count {
      self.max_error_count = errors;
    }
  }
}
