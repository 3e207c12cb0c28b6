use aok::{OK, Void};
use log::info;
use ssim_ftl::FtlConf;

#[static_init::constructor(0)]
extern "C" fn _log_init() {
  log_init::init();
}

#[test]
fn test() -> Void {
  let conf = FtlConf::default();
  info!(
    "> ssim_ftl {} blocks x {} pages",
    conf.total_physical_blocks, conf.pages_in_block
  );
  assert!(conf.total_logical_blocks <= conf.total_physical_blocks);
  OK
}
