use std::{
  cmp::Reverse,
  collections::BinaryHeap,
};

use log::trace;

use crate::Tick;

/// Handle of an allocated event.
/// 已分配事件的句柄。
pub type EventId = usize;

/// Handler invoked at fire time with the event target and the tick cursor.
/// Returning `Some(next)` re-schedules the same event at `next`.
/// 触发时以事件目标和 tick 游标调用的处理器。返回 `Some(next)` 会把同一
/// 事件重新调度到 `next`。
pub type Handler<T> = Box<dyn FnMut(&mut T, &mut Tick) -> Option<Tick>>;

/// Single-threaded discrete-event engine.
/// 单线程离散事件引擎。
///
/// Handlers borrow the target only for the duration of one dispatch, so the
/// target owns no engine reference and the engine owns no target reference.
/// 处理器只在一次派发期间借用目标，因此目标不持有引擎引用，引擎也不持有
/// 目标引用。
pub struct EventEngine<T> {
  handlers: Vec<Handler<T>>,
  // Reverse for a min-heap on (tick, seq); seq keeps same-tick FIFO order.
  queue: BinaryHeap<Reverse<(Tick, u64, EventId)>>,
  seq: u64,
}

impl<T> Default for EventEngine<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T> EventEngine<T> {
  #[must_use]
  pub fn new() -> Self {
    Self {
      handlers: Vec::new(),
      queue: BinaryHeap::new(),
      seq: 0,
    }
  }

  /// Register a handler, returning its id. Handlers live for the whole run.
  /// 注册处理器并返回其 id。处理器在整个运行期内存活。
  pub fn allocate_event(&mut self, handler: Handler<T>) -> EventId {
    self.handlers.push(handler);
    self.handlers.len() - 1
  }

  /// Enqueue `id` to fire at `tick`.
  /// 将 `id` 排入队列，于 `tick` 触发。
  pub fn schedule_event(&mut self, id: EventId, tick: Tick) {
    assert!(id < self.handlers.len(), "schedule of unallocated event {id}");
    self.queue.push(Reverse((tick, self.seq, id)));
    self.seq += 1;
  }

  /// Tick of the next pending event, if any.
  /// 下一个待触发事件的 tick（如有）。
  #[must_use]
  pub fn next_tick(&self) -> Option<Tick> {
    self.queue.peek().map(|Reverse((t, ..))| *t)
  }

  #[must_use]
  pub fn pending(&self) -> usize {
    self.queue.len()
  }

  /// Pop and run the earliest event. Returns the tick the handler finished at.
  /// 取出并运行最早的事件，返回处理器结束时的 tick。
  pub fn dispatch_one(&mut self, target: &mut T) -> Option<Tick> {
    let Reverse((fire, _, id)) = self.queue.pop()?;
    let mut tick = fire;
    trace!("event {id} fires at {fire}");
    if let Some(next) = self.handlers[id](target, &mut tick) {
      self.schedule_event(id, next);
    }
    Some(tick)
  }

  /// Run every event scheduled at or before `deadline`.
  /// 运行截至 `deadline`（含）调度的所有事件。
  pub fn run_until(&mut self, target: &mut T, deadline: Tick) {
    while let Some(t) = self.next_tick()
      && t <= deadline
    {
      self.dispatch_one(target);
    }
  }
}
