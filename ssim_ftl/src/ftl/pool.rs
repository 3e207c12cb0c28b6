use log::debug;
use ssim_pal::{Dram, IoMap, Pal, Tick};

use crate::{
  PageMapping,
  error::{Error, Result},
  ftl::{block::Block, conf::FtlConf},
};

/// Dense home of every block, indexed by block id.
/// 所有块的稠密居所，按块号索引。
///
/// Blocks never move; the free pool and the in-use set only shuffle indices.
/// A retired (bad) block is neither free nor in use.
/// 块从不搬移；空闲池与在用集只交换下标。退役（坏）块既不空闲也不在用。
#[derive(Debug)]
pub struct BlockArena {
  blocks: Vec<Block>,
  in_use: Vec<bool>,
  retired: Vec<bool>,
}

impl BlockArena {
  #[must_use]
  pub fn new(conf: &FtlConf) -> Self {
    let n = conf.total_physical_blocks;
    let blocks = (0..n)
      .map(|i| {
        Block::new(
          i,
          conf.pages_in_block,
          conf.io_units_per_page,
          conf.initial_erase_count,
        )
      })
      .collect();
    Self {
      blocks,
      in_use: vec![false; n as usize],
      retired: vec![false; n as usize],
    }
  }

  #[inline]
  #[must_use]
  pub fn get(&self, idx: u32) -> Option<&Block> {
    self.blocks.get(idx as usize)
  }

  #[inline]
  pub fn get_mut(&mut self, idx: u32) -> Option<&mut Block> {
    self.blocks.get_mut(idx as usize)
  }

  /// In-use block or `Error::BlockNotInUse`.
  /// 在用块，否则返回 `Error::BlockNotInUse`。
  pub fn in_use(&self, idx: u32) -> Result<&Block> {
    if self.is_in_use(idx) {
      Ok(&self.blocks[idx as usize])
    } else {
      Err(Error::BlockNotInUse(idx))
    }
  }

  pub fn in_use_mut(&mut self, idx: u32) -> Result<&mut Block> {
    if self.is_in_use(idx) {
      Ok(&mut self.blocks[idx as usize])
    } else {
      Err(Error::BlockNotInUse(idx))
    }
  }

  #[inline]
  #[must_use]
  pub fn is_in_use(&self, idx: u32) -> bool {
    self.in_use.get(idx as usize).copied().unwrap_or(false)
  }

  #[inline]
  #[must_use]
  pub fn is_retired(&self, idx: u32) -> bool {
    self.retired[idx as usize]
  }

  #[inline]
  pub fn set_in_use(&mut self, idx: u32, used: bool) {
    self.in_use[idx as usize] = used;
  }

  /// Permanently remove a worn-out block from circulation.
  /// 将磨损殆尽的块永久移出流转。
  pub fn retire(&mut self, idx: u32) {
    self.in_use[idx as usize] = false;
    self.retired[idx as usize] = true;
  }

  #[inline]
  #[must_use]
  pub fn len(&self) -> usize {
    self.blocks.len()
  }

  #[inline]
  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.blocks.is_empty()
  }

  #[must_use]
  pub fn in_use_count(&self) -> usize {
    self.in_use.iter().filter(|&&b| b).count()
  }

  #[must_use]
  pub fn retired_count(&self) -> usize {
    self.retired.iter().filter(|&&b| b).count()
  }

  /// Iterate blocks currently holding data.
  /// 迭代当前持有数据的块。
  pub fn iter_in_use(&self) -> impl Iterator<Item = &Block> {
    self
      .blocks
      .iter()
      .enumerate()
      .filter(|(i, _)| self.in_use[*i])
      .map(|(_, b)| b)
  }
}

/// Free block indices ordered by ascending erase count.
/// 按擦除次数升序排列的空闲块下标。
///
/// Younger blocks sit at the front so allocation naturally levels wear.
/// 年轻的块排在前面，使分配自然地均衡磨损。
#[derive(Debug, Default)]
pub struct FreeBlockPool {
  free: Vec<u32>,
}

impl FreeBlockPool {
  #[must_use]
  pub fn with_all(total: u32) -> Self {
    Self {
      free: (0..total).collect(),
    }
  }

  #[inline]
  #[must_use]
  pub fn len(&self) -> usize {
    self.free.len()
  }

  #[inline]
  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.free.is_empty()
  }

  #[inline]
  #[must_use]
  pub fn as_slice(&self) -> &[u32] {
    &self.free
  }

  /// Reinsert an erased block, keeping the erase-count order. Reverse scan
  /// from the tail: freshly erased blocks are usually among the oldest.
  /// 重新插入已擦除的块并保持擦除次数有序。从尾部反向扫描：新擦除的块
  /// 通常位于最老之列。
  pub fn insert_sorted(&mut self, idx: u32, arena: &BlockArena) {
    let ec = arena.get(idx).map_or(0, Block::erase_count);
    let mut pos = self.free.len();
    while pos > 0 {
      let prev = self.free[pos - 1];
      if arena.get(prev).map_or(0, Block::erase_count) <= ec {
        break;
      }
      pos -= 1;
    }
    self.free.insert(pos, idx);
  }

  /// Take the first free block on the requested stripe; when the stripe has
  /// none, fall back to the front of the pool.
  /// 取出请求条带上的第一个空闲块；该条带没有时退回池首。
  pub fn take_for_stripe(&mut self, stripe: u32, stripes: u32) -> Option<u32> {
    if self.free.is_empty() {
      return None;
    }
    let pos = self
      .free
      .iter()
      .position(|&b| b % stripes == stripe)
      .unwrap_or(0);
    Some(self.free.remove(pos))
  }
}

impl<P: Pal, D: Dram> PageMapping<P, D> {
  /// Fraction of physical blocks sitting in the free pool.
  /// 空闲池中物理块所占比例。
  #[inline]
  #[must_use]
  pub fn free_block_ratio(&self) -> f64 {
    self.free.len() as f64 / f64::from(self.conf.total_physical_blocks)
  }

  #[inline]
  #[must_use]
  pub fn free_block_count(&self) -> usize {
    self.free.len()
  }

  /// Stripe a block index belongs to.
  /// 块号所属的条带。
  #[inline]
  #[must_use]
  pub fn convert_block_idx(&self, idx: u32) -> u32 {
    idx % self.conf.page_count_to_max_perf
  }

  /// Move one free block of `stripe` into the in-use set and stamp its
  /// retention clock.
  /// 将 `stripe` 条带上的一个空闲块移入在用集，并为其保持时钟打点。
  pub(crate) fn get_free_block(&mut self, stripe: usize, tick: Tick) -> Result<u32> {
    if stripe >= self.conf.page_count_to_max_perf as usize {
      return Err(Error::StripeOutOfRange(stripe));
    }

    let Some(idx) = self
      .free
      .take_for_stripe(stripe as u32, self.conf.page_count_to_max_perf)
    else {
      return Err(Error::NoFreeBlock);
    };

    self.arena.set_in_use(idx, true);
    if let Some(block) = self.arena.get_mut(idx) {
      block.set_last_written_time(tick);
    }
    debug!("allocate block {idx} for stripe {stripe}");
    Ok(idx)
  }

  /// Current write target for `iomap`, rotating stripes and swapping in a new
  /// block when the target collided or filled up.
  /// `iomap` 对应的当前写目标；目标冲突或写满时轮换条带并换入新块。
  pub(crate) fn get_last_free_block(&mut self, iomap: IoMap, tick: Tick) -> Result<u32> {
    if !self.random_tweak || self.last_free_iomap.intersects(iomap) {
      self.last_free_index += 1;
      if self.last_free_index == self.conf.page_count_to_max_perf as usize {
        self.last_free_index = 0;
      }
      self.last_free_iomap = iomap;
    } else {
      self.last_free_iomap = self.last_free_iomap.union(iomap);
    }

    let slot = self.last_free_index;
    let current = self.last_free_block[slot];

    // Format can erase the active target out from under the allocator; the
    // arena keeps that observable instead of corrupting the in-use set.
    // format 可能在分配器眼皮底下擦掉活动目标；arena 让这一点可观测，而不是
    // 破坏在用集。
    let need_new = match self.arena.in_use(current) {
      Ok(block) => block.is_full(),
      Err(_) => true,
    };

    if need_new {
      self.last_free_block[slot] = self.get_free_block(slot, tick)?;
      self.reclaim_more = true;
    }

    Ok(self.last_free_block[slot])
  }
}
