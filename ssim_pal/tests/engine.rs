use aok::{OK, Void};
use log::info;
use ssim_pal::EventEngine;

#[static_init::constructor(0)]
extern "C" fn _log_init() {
  log_init::init();
}

#[test]
fn test_order() -> Void {
  let mut engine: EventEngine<Vec<u32>> = EventEngine::new();
  let mut fired = Vec::new();

  let a = engine.allocate_event(Box::new(|log, _tick| {
    log.push(1);
    None
  }));
  let b = engine.allocate_event(Box::new(|log, _tick| {
    log.push(2);
    None
  }));

  engine.schedule_event(b, 200);
  engine.schedule_event(a, 100);
  assert_eq!(engine.next_tick(), Some(100));

  engine.dispatch_one(&mut fired);
  engine.dispatch_one(&mut fired);
  assert_eq!(fired, [1, 2]);
  assert_eq!(engine.pending(), 0);
  OK
}

#[test]
fn test_same_tick_fifo() -> Void {
  let mut engine: EventEngine<Vec<u32>> = EventEngine::new();
  let mut fired = Vec::new();

  let a = engine.allocate_event(Box::new(|log, _| {
    log.push(1);
    None
  }));
  let b = engine.allocate_event(Box::new(|log, _| {
    log.push(2);
    None
  }));

  engine.schedule_event(a, 50);
  engine.schedule_event(b, 50);
  engine.run_until(&mut fired, 50);
  assert_eq!(fired, [1, 2]);
  OK
}

#[test]
fn test_self_reschedule() -> Void {
  let mut engine: EventEngine<u64> = EventEngine::new();
  let mut count = 0u64;

  // Periodic event: fires at 10, 20, 30, …
  let ev = engine.allocate_event(Box::new(|count, tick| {
    *count += 1;
    Some(*tick + 10)
  }));
  engine.schedule_event(ev, 10);

  engine.run_until(&mut count, 55);
  info!("fired {count} times");
  assert_eq!(count, 5);
  // The next occurrence stays queued
  assert_eq!(engine.next_tick(), Some(60));
  OK
}

#[test]
fn test_handler_advances_tick() -> Void {
  let mut engine: EventEngine<()> = EventEngine::new();

  // Handler consumes simulated time before rescheduling from its fire tick
  let ev = engine.allocate_event(Box::new(|_, tick| {
    let fire = *tick;
    *tick += 7;
    Some(fire + 100)
  }));
  engine.schedule_event(ev, 100);

  let finished = engine.dispatch_one(&mut ()).unwrap();
  assert_eq!(finished, 107);
  assert_eq!(engine.next_tick(), Some(200));
  OK
}
