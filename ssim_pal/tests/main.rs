use aok::{OK, Void};
use log::info;

#[static_init::constructor(0)]
extern "C" fn _log_init() {
  log_init::init();
}

#[test]
fn test() -> Void {
  info!("> ssim_pal {}", env!("CARGO_PKG_VERSION"));
  OK
}
