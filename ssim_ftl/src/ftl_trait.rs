use ssim_pal::{IoMap, Tick};

use crate::{error::Result, ftl::stats::Status};

/// One host command over a logical page.
/// 一条针对逻辑页的主机命令。
#[derive(Debug, Clone, Copy)]
pub struct Request {
  pub lpn: u64,
  /// io-units touched by this command; a super-page command sets every bit.
  /// 该命令触及的 io-unit；super-page 命令置全部位。
  pub iomap: IoMap,
}

impl Request {
  #[inline]
  #[must_use]
  pub const fn new(lpn: u64, iomap: IoMap) -> Self {
    Self { lpn, iomap }
  }

  /// Super-page request over `units` io-units.
  /// 覆盖 `units` 个 io-unit 的 super-page 请求。
  #[inline]
  #[must_use]
  pub const fn super_page(lpn: u64, units: usize) -> Self {
    Self {
      lpn,
      iomap: IoMap::full(units),
    }
  }
}

/// Contiguous range of logical pages, `[slpn, slpn + nlp)`.
/// 连续的逻辑页区间，即 `[slpn, slpn + nlp)`。
#[derive(Debug, Clone, Copy)]
pub struct LpnRange {
  pub slpn: u64,
  pub nlp: u64,
}

/// Host-facing FTL operations.
/// 面向主机的 FTL 操作。
///
/// Every call executes inline and advances the shared tick; a write may run a
/// garbage collection cycle synchronously before returning.
/// 每个调用都内联执行并推进共享 tick；写操作可能在返回前同步运行一轮垃圾
/// 回收。
pub trait AbstractFtl {
  fn read(&mut self, req: &Request, tick: &mut Tick) -> Result<()>;
  fn write(&mut self, req: &Request, tick: &mut Tick) -> Result<()>;
  fn trim(&mut self, req: &Request, tick: &mut Tick) -> Result<()>;
  fn format(&mut self, range: LpnRange, tick: &mut Tick) -> Result<()>;
  fn get_status(&mut self, lpn_begin: u64, lpn_end: u64) -> Status;
}
