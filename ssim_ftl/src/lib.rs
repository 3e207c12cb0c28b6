//! Page-mapped FTL core for a cycle-accurate SSD simulator.
//! 用于周期精确 SSD 仿真器的页映射 FTL 核心。
//!
//! Sits between the host block interface and the physical abstraction layer:
//! translates logical page numbers at io-unit granularity, runs wear-aware
//! block allocation and garbage collection, and proactively refreshes pages
//! whose predicted retention error crosses the ECC limit, scheduled through a
//! multi-level Bloom-filter hierarchy.
//! 位于主机块接口与物理抽象层之间：以 io-unit 粒度翻译逻辑页号，执行磨损
//! 感知的块分配与垃圾回收，并通过多层 Bloom 滤波器层级，主动刷新预测保持
//! 误码越过 ECC 上限的页。

pub mod error;
pub mod ftl;
mod ftl_impl;
pub mod ftl_trait;

use std::{fs::File, io::BufWriter};

use rand::{SeedableRng, rngs::StdRng};
use ssim_pal::{Dram, EventId, IoMap, Pal};

pub use crate::{
  error::{Error, Result},
  ftl::conf::FtlConf,
  ftl_trait::{AbstractFtl, LpnRange, Request},
};
use crate::ftl::{
  block::Block,
  bloom::{BloomParams, BloomSet},
  map::{MappingTable, PagePtr},
  pool::{BlockArena, FreeBlockPool},
  rber::ErrorModel,
  refresh::RefreshTable,
  stats::FtlStat,
};

/// The FTL instance: owns the mapping, the block arena, the free pool, the
/// Bloom hierarchy and every counter. PAL and DRAM are external collaborators
/// invoked by reference; the tick is the sole synchronization currency.
/// FTL 实例：拥有映射表、块 arena、空闲池、Bloom 层级和全部计数器。PAL 与
/// DRAM 是按引用调用的外部协作者；tick 是唯一的同步货币。
pub struct PageMapping<P: Pal, D: Dram> {
  conf: FtlConf,
  pal: P,
  dram: D,

  arena: BlockArena,
  free: FreeBlockPool,
  table: MappingTable,

  // Allocator state: one active write target per stripe
  // 分配器状态：每个条带一个活动写目标
  last_free_block: Vec<u32>,
  last_free_iomap: IoMap,
  last_free_index: usize,
  reclaim_more: bool,

  random_tweak: bool,
  /// Mapping entry width: io-unit count under random tweak, else 1.
  /// 映射条目宽度：random tweak 下为 io-unit 数，否则为 1。
  unit_count: usize,

  error_model: ErrorModel,
  blooms: BloomSet,
  bloom_params: Vec<BloomParams>,
  refresh_table: RefreshTable,
  refresh_event: Option<EventId>,
  refresh_log: Option<BufWriter<File>>,

  rng: StdRng,
  stat: FtlStat,
}

impl<P: Pal, D: Dram> PageMapping<P, D> {
  /// Build the FTL over `conf`, claiming one write target per stripe.
  /// 依据 `conf` 构建 FTL，并为每个条带占取一个写目标。
  pub fn new(conf: FtlConf, pal: P, dram: D) -> Result<Self> {
    let unit_count = conf.unit_count();
    let sentinel = PagePtr {
      block: conf.total_physical_blocks,
      page: conf.pages_in_block,
    };

    let (blooms, bloom_params) = BloomSet::build(
      conf.refresh_filter_num,
      conf.refresh_filter_size,
      // Offset keeps the filter hash families apart from the data-path RNG
      // 偏移使滤波器哈希族与数据路径 RNG 相互独立
      conf.random_seed + 1231,
    );

    let stripes = conf.page_count_to_max_perf as usize;
    let mut ftl = Self {
      arena: BlockArena::new(&conf),
      free: FreeBlockPool::with_all(conf.total_physical_blocks),
      table: MappingTable::new(conf.total_logical_pages(), unit_count, sentinel),
      last_free_block: vec![0; stripes],
      last_free_iomap: IoMap::empty(),
      last_free_index: 0,
      reclaim_more: false,
      random_tweak: conf.use_random_io_tweak,
      unit_count,
      error_model: ErrorModel::new(&conf),
      blooms,
      bloom_params,
      refresh_table: RefreshTable::default(),
      refresh_event: None,
      refresh_log: None,
      rng: StdRng::seed_from_u64(conf.random_seed.wrapping_add(1)),
      stat: FtlStat::default(),
      conf,
      pal,
      dram,
    };

    for stripe in 0..stripes {
      ftl.last_free_block[stripe] = ftl.get_free_block(stripe, 0)?;
    }

    Ok(ftl)
  }

  #[inline]
  #[must_use]
  pub fn conf(&self) -> &FtlConf {
    &self.conf
  }

  #[inline]
  #[must_use]
  pub fn pal(&self) -> &P {
    &self.pal
  }

  #[inline]
  #[must_use]
  pub fn dram(&self) -> &D {
    &self.dram
  }

  #[inline]
  #[must_use]
  pub fn block(&self, idx: u32) -> Option<&Block> {
    self.arena.get(idx)
  }

  #[inline]
  #[must_use]
  pub fn is_block_in_use(&self, idx: u32) -> bool {
    self.arena.is_in_use(idx)
  }

  #[inline]
  #[must_use]
  pub fn in_use_block_count(&self) -> usize {
    self.arena.in_use_count()
  }

  #[inline]
  #[must_use]
  pub fn retired_block_count(&self) -> usize {
    self.arena.retired_count()
  }

  /// Free pool contents, ascending erase count.
  /// 空闲池内容，按擦除次数升序。
  #[inline]
  #[must_use]
  pub fn free_block_ids(&self) -> &[u32] {
    self.free.as_slice()
  }

  /// Mapping entry of `lpn`, if present.
  /// `lpn` 的映射条目（如存在）。
  #[inline]
  #[must_use]
  pub fn mapping(&self, lpn: u64) -> Option<&[PagePtr]> {
    self.table.lookup(lpn)
  }

  #[inline]
  #[must_use]
  pub fn mapped_page_count(&self) -> usize {
    self.table.len()
  }

  #[inline]
  #[must_use]
  pub fn blooms(&self) -> &BloomSet {
    &self.blooms
  }

  #[inline]
  #[must_use]
  pub fn bloom_contains(&self, level: usize, key: u64) -> bool {
    self.blooms.contains(level, key)
  }

  /// Smallest Bloom level recorded for a (block, layer) key, telemetry only.
  /// 某 (block, layer) 键记录到的最小 Bloom 层级，仅用于遥测。
  #[inline]
  #[must_use]
  pub fn refresh_min_level(&self, key: u64) -> Option<u32> {
    self.refresh_table.min_level(key)
  }
}
