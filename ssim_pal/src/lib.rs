//! Simulation substrate shared by the FTL core and its drivers.
//! FTL 核心及其驱动共享的仿真底座。

pub mod dram;
pub mod engine;
pub mod iomap;
pub mod nand;

pub use self::{
  dram::{Dram, TimingDram},
  engine::{EventEngine, EventId},
  iomap::IoMap,
  nand::{Pal, PalRequest, TimingPal},
};

/// Simulated time in nanoseconds, advanced by reference through every model.
/// 以纳秒计的仿真时间，按引用穿过每个模型并被推进。
pub type Tick = u64;

/// Nanoseconds per simulated second.
/// 每仿真秒的纳秒数。
pub const NS_PER_SEC: u64 = 1_000_000_000;
