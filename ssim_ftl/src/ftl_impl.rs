use log::{debug, warn};
use ssim_pal::{Dram, Pal, Tick};

use crate::{
  AbstractFtl, PageMapping, Request,
  error::Result,
  ftl::{latency, stats::Status},
  ftl_trait::LpnRange,
};

impl<P: Pal, D: Dram> AbstractFtl for PageMapping<P, D> {
  fn read(&mut self, req: &Request, tick: &mut Tick) -> Result<()> {
    let begin = *tick;

    if req.iomap.count() > 0 {
      self.read_internal(req, tick)?;
      debug!(
        "READ  | LPN {} | {} - {} ({})",
        req.lpn,
        begin,
        tick,
        *tick - begin
      );
    } else {
      warn!("FTL got empty request");
    }

    *tick += latency::READ;
    Ok(())
  }

  fn write(&mut self, req: &Request, tick: &mut Tick) -> Result<()> {
    let begin = *tick;

    if req.iomap.count() > 0 {
      self.write_internal(req, tick, true)?;
      debug!(
        "WRITE | LPN {} | {} - {} ({})",
        req.lpn,
        begin,
        tick,
        *tick - begin
      );
    } else {
      warn!("FTL got empty request");
    }

    *tick += latency::WRITE;
    Ok(())
  }

  fn trim(&mut self, req: &Request, tick: &mut Tick) -> Result<()> {
    let begin = *tick;

    self.trim_internal(req, tick)?;
    debug!(
      "TRIM  | LPN {} | {} - {} ({})",
      req.lpn,
      begin,
      tick,
      *tick - begin
    );

    *tick += latency::TRIM;
    Ok(())
  }

  fn format(&mut self, range: LpnRange, tick: &mut Tick) -> Result<()> {
    self.format_internal(range, tick)?;
    *tick += latency::FORMAT;
    Ok(())
  }

  fn get_status(&mut self, lpn_begin: u64, lpn_end: u64) -> Status {
    let total_logical_pages = self.conf.total_logical_pages();

    let mapped_logical_pages = if lpn_begin == 0 && lpn_end >= total_logical_pages {
      self.table.len() as u64
    } else {
      self.table.present_in(lpn_begin, lpn_end).count() as u64
    };

    Status {
      free_physical_blocks: self.free.len() as u64,
      mapped_logical_pages,
      total_logical_pages,
    }
  }
}
