use crate::{IoMap, Tick};

/// One NAND operation at block/page granularity.
/// 一次以块/页为粒度的 NAND 操作。
#[derive(Debug, Clone, Copy)]
pub struct PalRequest {
  pub block: u32,
  pub page: u32,
  pub iomap: IoMap,
}

impl PalRequest {
  #[inline]
  #[must_use]
  pub const fn new(block: u32, page: u32, iomap: IoMap) -> Self {
    Self { block, page, iomap }
  }
}

/// Physical abstraction layer: models NAND timing, mutates the shared tick.
/// 物理抽象层：对 NAND 时序建模，并推进共享的 tick。
///
/// The FTL never inspects data; only latencies matter to it.
/// FTL 从不检查数据，它只关心延迟。
pub trait Pal {
  fn read(&mut self, req: &PalRequest, tick: &mut Tick);
  fn write(&mut self, req: &PalRequest, tick: &mut Tick);
  fn erase(&mut self, req: &PalRequest, tick: &mut Tick);
}

/// Fixed-latency reference PAL with operation counters.
/// 带操作计数的固定延迟参考 PAL。
///
/// Stands in for a full channel/die model in tests and examples.
/// 在测试和示例中代替完整的通道/晶粒模型。
#[derive(Debug)]
pub struct TimingPal {
  pub read_ns: u64,
  pub write_ns: u64,
  pub erase_ns: u64,
  pub reads: u64,
  pub writes: u64,
  pub erases: u64,
}

impl Default for TimingPal {
  fn default() -> Self {
    // MLC-ish figures
    Self {
      read_ns: 50_000,
      write_ns: 500_000,
      erase_ns: 3_500_000,
      reads: 0,
      writes: 0,
      erases: 0,
    }
  }
}

impl Pal for TimingPal {
  fn read(&mut self, _req: &PalRequest, tick: &mut Tick) {
    self.reads += 1;
    *tick += self.read_ns;
  }

  fn write(&mut self, _req: &PalRequest, tick: &mut Tick) {
    self.writes += 1;
    *tick += self.write_ns;
  }

  fn erase(&mut self, _req: &PalRequest, tick: &mut Tick) {
    self.erases += 1;
    *tick += self.erase_ns;
  }
}
