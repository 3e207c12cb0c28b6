use crate::Tick;

/// DRAM model consumed by the FTL for mapping-table traffic.
/// FTL 用于映射表流量的 DRAM 模型。
pub trait Dram {
  fn read(&mut self, addr: u64, bytes: u64, tick: &mut Tick);
  fn write(&mut self, addr: u64, bytes: u64, tick: &mut Tick);
}

/// Flat-bandwidth reference DRAM.
/// 平坦带宽的参考 DRAM。
#[derive(Debug)]
pub struct TimingDram {
  /// Nanoseconds charged per 64-byte beat.
  /// 每 64 字节节拍计费的纳秒数。
  pub ns_per_beat: u64,
  pub read_bytes: u64,
  pub write_bytes: u64,
}

impl Default for TimingDram {
  fn default() -> Self {
    Self {
      ns_per_beat: 10,
      read_bytes: 0,
      write_bytes: 0,
    }
  }
}

impl TimingDram {
  #[inline]
  fn charge(&self, bytes: u64, tick: &mut Tick) {
    *tick += bytes.div_ceil(64).max(1) * self.ns_per_beat;
  }
}

impl Dram for TimingDram {
  fn read(&mut self, _addr: u64, bytes: u64, tick: &mut Tick) {
    self.read_bytes += bytes;
    self.charge(bytes, tick);
  }

  fn write(&mut self, _addr: u64, bytes: u64, tick: &mut Tick) {
    self.write_bytes += bytes;
    self.charge(bytes, tick);
  }
}
