use ssim_pal::{Dram, Pal};

use crate::PageMapping;

/// Host-visible capacity snapshot.
/// 主机可见的容量快照。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Status {
  pub free_physical_blocks: u64,
  pub mapped_logical_pages: u64,
  pub total_logical_pages: u64,
}

/// One entry of the exported statistic table.
/// 导出统计表的一个条目。
#[derive(Debug, Clone)]
pub struct StatInfo {
  pub name: String,
  pub desc: String,
}

/// Counters accumulated by the GC and refresh engines.
/// GC 与刷新引擎累计的计数器。
#[derive(Debug, Clone, Copy, Default)]
pub struct FtlStat {
  pub gc_count: u64,
  pub reclaimed_blocks: u64,
  pub valid_super_page_copies: u64,
  pub valid_page_copies: u64,
  pub refresh_count: u64,
  pub refreshed_blocks: u64,
  pub refresh_super_page_copies: u64,
  pub refresh_page_copies: u64,
  pub refresh_call_count: u64,
  pub layer_check_count: u64,
}

impl<P: Pal, D: Dram> PageMapping<P, D> {
  #[inline]
  #[must_use]
  pub fn stat(&self) -> &FtlStat {
    &self.stat
  }

  /// Wear-leveling factor over all living blocks.
  /// 所有存活块上的磨损均衡因子。
  ///
  /// For the exact definition, see: Li, Yongkun, Patrick P. C. Lee, and John
  /// Lui. "Stochastic modeling of large-scale solid-state storage systems:
  /// analysis, design tradeoffs and optimization." ACM SIGMETRICS (2013).
  #[must_use]
  pub fn wear_leveling(&self) -> f64 {
    let mut total = 0u64;
    let mut squared = 0u64;

    for block in self.arena.iter_in_use() {
      let ec = u64::from(block.erase_count());
      total += ec;
      squared += ec * ec;
    }
    for &idx in self.free.as_slice() {
      if let Some(block) = self.arena.get(idx) {
        let ec = u64::from(block.erase_count());
        total += ec;
        squared += ec * ec;
      }
    }

    if squared == 0 {
      // No wear yet, the metric is undefined
      return -1.0;
    }

    let n = f64::from(self.conf.total_logical_blocks);
    (total * total) as f64 / (n * squared as f64)
  }

  /// Mean of the worst error counts observed per in-use block.
  /// 每个在用块观测到的最大错误数的平均值。
  #[must_use]
  pub fn average_error(&self) -> f64 {
    let mut total = 0u64;
    let mut blocks = 0u64;
    for block in self.arena.iter_in_use() {
      total += block.max_error_count();
      blocks += 1;
    }
    if blocks == 0 {
      return 0.0;
    }
    total as f64 / blocks as f64
  }

  /// Valid and invalid io-unit totals across the in-use set.
  /// 在用集上有效与无效 io-unit 的总数。
  #[must_use]
  pub fn calculate_total_pages(&self) -> (u64, u64) {
    let mut valid = 0;
    let mut invalid = 0;
    for block in self.arena.iter_in_use() {
      valid += block.valid_unit_count();
      invalid += block.invalid_unit_count();
    }
    (valid, invalid)
  }

  /// Names and descriptions of every exported statistic, in value order.
  /// 每项导出统计的名称与描述，顺序与取值一致。
  #[must_use]
  pub fn get_stat_list(&self, prefix: &str) -> Vec<StatInfo> {
    let entry = |name: &str, desc: &str| StatInfo {
      name: format!("{prefix}{name}"),
      desc: desc.to_string(),
    };

    let mut list = vec![
      entry("page_mapping.gc.count", "Total GC count"),
      entry("page_mapping.gc.reclaimed_blocks", "Total reclaimed blocks in GC"),
      entry(
        "page_mapping.gc.superpage_copies",
        "Total copied valid superpages during GC",
      ),
      entry("page_mapping.gc.page_copies", "Total copied valid pages during GC"),
      entry("page_mapping.refresh.count", "Total refresh count"),
      entry("page_mapping.refresh.refreshed_blocks", "Total blocks been refreshed"),
      entry(
        "page_mapping.refresh.superpage_copies",
        "Total copied valid superpages during refresh",
      ),
      entry(
        "page_mapping.refresh.page_copies",
        "Total copied valid pages during refresh",
      ),
      entry("page_mapping.refresh.call_count", "The number of refresh calls"),
      entry(
        "page_mapping.refresh.layer_check_count",
        "The number of layer checks",
      ),
      entry("page_mapping.refresh.error_counts", "The average number of errors"),
      entry("page_mapping.wear_leveling", "Wear-leveling factor"),
      entry("page_mapping.free_block_counts", "The number of free blocks left"),
    ];

    for i in 0..self.blooms.level_count() {
      list.push(entry(
        &format!("page_mapping.bloom_filter.{i}"),
        &format!("Element count of Bloom level {i}"),
      ));
    }

    list
  }

  /// Values matching `get_stat_list` order.
  /// 与 `get_stat_list` 顺序一致的取值。
  #[must_use]
  pub fn get_stat_values(&self) -> Vec<f64> {
    let mut values = vec![
      self.stat.gc_count as f64,
      self.stat.reclaimed_blocks as f64,
      self.stat.valid_super_page_copies as f64,
      self.stat.valid_page_copies as f64,
      self.stat.refresh_count as f64,
      self.stat.refreshed_blocks as f64,
      self.stat.refresh_super_page_copies as f64,
      self.stat.refresh_page_copies as f64,
      self.stat.refresh_call_count as f64,
      self.stat.layer_check_count as f64,
      self.average_error(),
      self.wear_leveling(),
      self.free.len() as f64,
    ];

    for filter in &self.blooms.filters {
      values.push(filter.element_count() as f64);
    }

    values
  }

  /// Zero every counter; Bloom tables and the refresh table stay intact.
  /// 清零所有计数器；Bloom 表与刷新表保持原样。
  pub fn reset_stat_values(&mut self) {
    self.stat = FtlStat::default();
    for filter in &mut self.blooms.filters {
      filter.true_positive = 0;
      filter.false_positive = 0;
      filter.true_negative = 0;
    }
  }
}
